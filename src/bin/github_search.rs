#![forbid(unsafe_code)]

//! `github-search` is the stdio tool host serving `github_search`.

use stdio_toolhost::tools::github;
use stdio_toolhost::{host, Result, ToolRegistry};

fn main() -> Result<()> {
    host::run("github-search", |config| {
        let mut registry = ToolRegistry::new();
        github::register(&mut registry, &config.search)?;
        Ok(registry)
    })
}
