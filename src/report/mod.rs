//! Report rendering and export
//!
//! Turns tables into aligned plain text for the terminal and into CSV or JSON
//! files for downstream tools.

mod describe;
mod export;

pub use describe::describe;
pub use export::{export, write_csv, write_json, ExportFormat};

use crate::table::{ColumnType, Table, Value};
use std::fmt::Write;

/// Render a table as aligned plain text
///
/// Numeric columns are right-aligned and reals are printed with two decimals.
/// At most `max_rows` rows are shown; a trailing line counts the rest.
pub fn render_text(table: &Table, max_rows: Option<usize>) -> String {
    let columns = table.schema().columns();
    let shown = max_rows.map_or(table.len(), |n| n.min(table.len()));

    let cells: Vec<Vec<String>> = table.rows()[..shown]
        .iter()
        .map(|row| row.values().iter().map(format_cell).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(c, col)| {
            cells
                .iter()
                .map(|row| row[c].chars().count())
                .chain(std::iter::once(col.name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let numeric: Vec<bool> = columns.iter().map(|c| c.ty.is_numeric()).collect();

    let pad = |text: &str, c: usize| {
        if numeric[c] {
            format!("{:>w$}", text, w = widths[c])
        } else {
            format!("{:<w$}", text, w = widths[c])
        }
    };

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(c, col)| pad(&col.name, c))
        .collect();
    let _ = writeln!(out, "{}", header.join("  ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));

    for row in &cells {
        let line: Vec<String> = row.iter().enumerate().map(|(c, cell)| pad(cell, c)).collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    }

    if shown < table.len() {
        let _ = writeln!(out, "... {} more rows", table.len() - shown);
    }
    out
}

/// Render a schema as `name: type` lines
pub fn render_schema(table: &Table) -> String {
    let width = table
        .schema()
        .names()
        .map(|n| n.chars().count())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for column in table.schema().columns() {
        let kind = match &column.ty {
            ColumnType::Categorical { levels, .. } => {
                format!("{} ({} levels)", column.ty, levels.len())
            }
            other => other.to_string(),
        };
        let _ = writeln!(out, "{:<width$}  {}", column.name, kind, width = width);
    }
    out
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Real(r) => format!("{:.2}", r),
        other => other.to_string(),
    }
}
