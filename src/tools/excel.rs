//! `sum_excel_column`: sum the numeric cells of one spreadsheet column.
//!
//! Workbooks are read with `calamine` on the blocking pool. Numbers count,
//! booleans count as 1 or 0, and strings count when they parse as a finite
//! number. Other text, dates, error values, and empty cells are skipped.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use futures_util::future::BoxFuture;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::util::required_str;
use crate::registry::{ParamType, ParameterSchema, ToolDescriptor, ToolHandler, ToolRegistry};
use crate::{AppError, Result};

/// Registry name of the tool.
pub const TOOL_NAME: &str = "sum_excel_column";

/// Highest column a worksheet can have (`XFD`).
const MAX_COLUMN_INDEX: usize = 16_383;

/// Descriptor advertised by `tools/list`.
#[must_use]
pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        TOOL_NAME,
        "Sum a numeric column in an Excel file.",
        ParameterSchema::new()
            .required("file", ParamType::String, "Path to the workbook")
            .required("sheet", ParamType::String, "Worksheet name")
            .required("column", ParamType::String, "Column letters, e.g. A or AB"),
    )
}

/// Register the tool in `registry`.
///
/// # Errors
///
/// Returns `AppError::Config` if the name is already taken.
pub fn register(registry: &mut ToolRegistry) -> Result<()> {
    registry.register(descriptor(), SumExcelColumn)
}

/// Handler for [`TOOL_NAME`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SumExcelColumn;

impl ToolHandler for SumExcelColumn {
    fn invoke(&self, arguments: Map<String, Value>) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let file = PathBuf::from(required_str(&arguments, "file")?);
            let sheet = required_str(&arguments, "sheet")?.to_owned();
            let column = required_str(&arguments, "column")?.to_owned();

            let total = tokio::task::spawn_blocking(move || sum_column(&file, &sheet, &column))
                .await
                .map_err(|err| AppError::Tool(format!("spreadsheet task failed: {err}")))??;

            Ok(json!({ "sum": total }))
        })
    }
}

/// Sum the numeric cells of `column` in `sheet` of the workbook at `path`.
///
/// # Errors
///
/// - [`AppError::InvalidParams`] for a malformed column reference.
/// - [`AppError::Tool`] when the workbook cannot be opened or the sheet does
///   not exist.
pub fn sum_column(path: &Path, sheet: &str, column: &str) -> Result<f64> {
    let index = column_index(column)?;

    let mut workbook = open_workbook_auto(path).map_err(|err| {
        AppError::Tool(format!("cannot open workbook {}: {err}", path.display()))
    })?;
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|err| AppError::Tool(format!("cannot read sheet {sheet}: {err}")))?;

    let total = sum_cells(column_cells(&range, index));
    debug!(path = %path.display(), sheet, column, total, "summed column");
    Ok(total)
}

/// Zero-based index of a column given by its letters (`A` = 0, `AA` = 26).
///
/// # Errors
///
/// Returns [`AppError::InvalidParams`] when `letters` is empty, contains a
/// non-letter, or lies beyond `XFD`.
pub fn column_index(letters: &str) -> Result<usize> {
    let invalid = || AppError::InvalidParams(format!("invalid column reference: {letters:?}"));

    let trimmed = letters.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut index = 0usize;
    for byte in trimmed.bytes() {
        if !byte.is_ascii_alphabetic() {
            return Err(invalid());
        }
        let digit = usize::from(byte.to_ascii_uppercase() - b'A') + 1;
        index = index
            .checked_mul(26)
            .and_then(|value| value.checked_add(digit))
            .filter(|value| *value <= MAX_COLUMN_INDEX + 1)
            .ok_or_else(invalid)?;
    }

    Ok(index - 1)
}

/// Sum the numeric values among `cells`, skipping everything else.
#[must_use]
pub fn sum_cells<'a, I>(cells: I) -> f64
where
    I: IntoIterator<Item = &'a Data>,
{
    cells
        .into_iter()
        .filter_map(numeric_value)
        .fold(0.0, |total, value| total + value)
}

#[allow(clippy::cast_precision_loss)]
fn numeric_value(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(value) => Some(*value),
        Data::Int(value) => Some(*value as f64),
        Data::Bool(flag) => Some(f64::from(u8::from(*flag))),
        Data::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite()),
        _ => None,
    }
}

/// Non-empty cells of the worksheet column at absolute index `column`.
fn column_cells(range: &Range<Data>, column: usize) -> impl Iterator<Item = &Data> {
    let offset = range.start().map_or(0, |(_, col)| col as usize);
    range
        .used_cells()
        .filter(move |(_, col, _)| offset + col == column)
        .map(|(_, _, cell)| cell)
}
