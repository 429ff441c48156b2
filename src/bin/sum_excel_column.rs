#![forbid(unsafe_code)]

//! `sum-excel-column` is the stdio tool host serving `sum_excel_column`.

use stdio_toolhost::tools::excel;
use stdio_toolhost::{host, Result, ToolRegistry};

fn main() -> Result<()> {
    host::run("sum-excel-column", |_config| {
        let mut registry = ToolRegistry::new();
        excel::register(&mut registry)?;
        Ok(registry)
    })
}
