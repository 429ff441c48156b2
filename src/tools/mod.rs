//! Tool handlers shipped with the host.
//!
//! Each tool module exposes its `TOOL_NAME`, a `descriptor()`, and a
//! `register` function used by the matching binary.

pub mod excel;
pub mod github;
pub mod util;
