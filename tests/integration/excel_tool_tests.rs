//! End-to-end tests for `sum_excel_column` against real workbook files.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;
use serde_json::{json, Value};
use tempfile::TempDir;

use stdio_toolhost::tools::excel;
use stdio_toolhost::ToolRegistry;

use super::test_helpers::run_lines;

/// Sheet `Sales`: header, "3", "abc", 2.5, blank, 4, TRUE in column A and a
/// noise column B. Sheet `Offset` has data only in column C.
fn write_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("sales.xlsx");
    let mut workbook = Workbook::new();

    let sales = workbook.add_worksheet();
    sales.set_name("Sales").expect("sheet name");
    sales.write_string(0, 0, "Amount").expect("write");
    sales.write_string(1, 0, "3").expect("write");
    sales.write_string(2, 0, "abc").expect("write");
    sales.write_number(3, 0, 2.5).expect("write");
    sales.write_number(5, 0, 4).expect("write");
    sales.write_boolean(6, 0, true).expect("write");
    sales.write_number(1, 1, 1000).expect("write");
    sales.write_boolean(2, 1, true).expect("write");

    let offset = workbook.add_worksheet();
    offset.set_name("Offset").expect("sheet name");
    offset.write_number(4, 2, 7).expect("write");
    offset.write_number(5, 2, 0.5).expect("write");

    workbook.save(&path).expect("save workbook");
    path
}

fn excel_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    excel::register(&mut registry).expect("register");
    registry
}

fn call_line(id: u64, arguments: &Value) -> String {
    let request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": "sum_excel_column", "arguments": arguments }
    });
    format!("{request}\n")
}

#[tokio::test]
async fn sums_numeric_and_boolean_cells_and_skips_the_rest() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_fixture(dir.path());
    let registry = excel_registry();

    let input = call_line(
        2,
        &json!({ "file": file.display().to_string(), "sheet": "Sales", "column": "A" }),
    );
    let (lines, _) = run_lines(&registry, &input).await;

    assert_eq!(lines[1]["id"], 2);
    assert_eq!(lines[1]["result"], json!({ "sum": 10.5 }));
}

#[tokio::test]
async fn lowercase_column_and_offset_range_are_resolved() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_fixture(dir.path());
    let registry = excel_registry();

    let input = call_line(
        3,
        &json!({ "file": file.display().to_string(), "sheet": "Offset", "column": "c" }),
    );
    let (lines, _) = run_lines(&registry, &input).await;

    assert_eq!(lines[1]["result"], json!({ "sum": 7.5 }));
}

#[tokio::test]
async fn empty_column_sums_to_zero() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_fixture(dir.path());
    let registry = excel_registry();

    let input = call_line(
        4,
        &json!({ "file": file.display().to_string(), "sheet": "Sales", "column": "Z" }),
    );
    let (lines, _) = run_lines(&registry, &input).await;

    assert_eq!(lines[1]["result"], json!({ "sum": 0.0 }));
}

#[tokio::test]
async fn missing_file_is_a_transport_error() {
    let dir = TempDir::new().expect("tempdir");
    let registry = excel_registry();
    let missing = dir.path().join("missing.xlsx");

    let input = call_line(
        5,
        &json!({ "file": missing.display().to_string(), "sheet": "Sales", "column": "A" }),
    );
    let (lines, summary) = run_lines(&registry, &input).await;

    assert!(lines[1]["id"].is_null());
    let message = lines[1]["error"]["message"].as_str().expect("message");
    assert!(message.starts_with("tool: cannot open workbook"), "got: {message}");
    assert_eq!(summary.dispatch_failures, 1);
}

#[tokio::test]
async fn missing_sheet_is_a_transport_error() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_fixture(dir.path());
    let registry = excel_registry();

    let input = call_line(
        6,
        &json!({ "file": file.display().to_string(), "sheet": "Nope", "column": "A" }),
    );
    let (lines, _) = run_lines(&registry, &input).await;

    assert!(lines[1]["id"].is_null());
    let message = lines[1]["error"]["message"].as_str().expect("message");
    assert!(message.contains("cannot read sheet Nope"), "got: {message}");
}

#[tokio::test]
async fn missing_argument_is_a_transport_error() {
    let registry = excel_registry();

    let input = call_line(7, &json!({ "file": "whatever.xlsx", "sheet": "Sales" }));
    let (lines, _) = run_lines(&registry, &input).await;

    assert!(lines[1]["id"].is_null());
    assert_eq!(
        lines[1]["error"]["message"],
        "invalid params: missing required argument: column"
    );
}

#[tokio::test]
async fn session_survives_a_failed_call() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_fixture(dir.path());
    let registry = excel_registry();

    let mut input = call_line(8, &json!({ "file": "/nonexistent/x.xlsx", "sheet": "S", "column": "A" }));
    input.push_str(&call_line(
        9,
        &json!({ "file": file.display().to_string(), "sheet": "Sales", "column": "A" }),
    ));
    let (lines, _) = run_lines(&registry, &input).await;

    assert_eq!(lines.len(), 3);
    assert!(lines[1]["id"].is_null());
    assert_eq!(lines[2]["id"], 9);
    assert_eq!(lines[2]["result"]["sum"], 10.5);
}
