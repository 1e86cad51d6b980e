//! Delimited-file loader
//!
//! Reads a header plus records into a [`Table`]. Column types are inferred
//! from content: a column whose non-empty fields all parse as integers is
//! `Integer`, one whose fields all parse as numbers is `Real`, anything else
//! is `Text`. Empty fields load as `Value::Null`.

use crate::error::{ErrorCode, PipelineError, Result};
use crate::table::{Column, ColumnType, Row, Schema, Table, Value};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, trace};

/// Loader options
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field delimiter byte
    pub delimiter: u8,
    /// Trim surrounding whitespace from every field
    pub trim: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: true,
        }
    }
}

impl LoadOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Load a delimited file from disk
pub fn load_path(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Table> {
    let path = path.as_ref();
    debug!("Loading {} (delimiter {:?})", path.display(), options.delimiter as char);

    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PipelineError::not_found(path).with_source(e),
        _ => PipelineError::from(e).with_context(path.display()),
    })?;

    load_reader(file, options)
}

/// Load delimited text from any reader
pub fn load_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(false)
        .trim(if options.trim {
            csv::Trim::All
        } else {
            csv::Trim::None
        })
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_error)?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(PipelineError::parse_at(
            ErrorCode::LOAD_EMPTY_HEADER,
            Some(1),
            "missing header row",
        ));
    }
    let names: Vec<String> = headers.iter().map(str::to_string).collect();

    let mut raw: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        raw.push(record.iter().map(str::to_string).collect());
    }
    debug!("Read {} records with {} columns", raw.len(), names.len());

    let types: Vec<ColumnType> = (0..names.len())
        .map(|c| infer_column_type(raw.iter().map(|r| r[c].as_str())))
        .collect();
    for (name, ty) in names.iter().zip(&types) {
        trace!("Inferred column '{}' as {}", name, ty);
    }

    let columns = names
        .into_iter()
        .zip(types.iter().cloned())
        .map(|(name, ty)| Column::new(name, ty))
        .collect();
    let schema = Schema::new(columns).map_err(|e| match e {
        PipelineError::DuplicateColumn { column, .. } => PipelineError::parse_at(
            ErrorCode::LOAD_DUPLICATE_HEADER,
            Some(1),
            format!("header names column '{}' more than once", column),
        ),
        other => other,
    })?;

    let rows = raw
        .into_iter()
        .map(|fields| {
            Row::new(
                fields
                    .iter()
                    .zip(&types)
                    .map(|(field, ty)| parse_field(field, ty))
                    .collect(),
            )
        })
        .collect();

    Table::new(schema, rows)
}

/// Infer the narrowest numeric type that fits every non-empty field
pub fn infer_column_type<'a>(fields: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut all_int = true;
    let mut all_num = true;
    let mut seen = false;

    for field in fields.filter(|f| !f.is_empty()) {
        seen = true;
        if all_int && field.parse::<i64>().is_err() {
            all_int = false;
        }
        if !all_int && !is_number(field) {
            all_num = false;
            break;
        }
    }

    match (seen, all_int, all_num) {
        (false, _, _) => ColumnType::Text,
        (true, true, _) => ColumnType::Integer,
        (true, false, true) => ColumnType::Real,
        _ => ColumnType::Text,
    }
}

fn is_number(field: &str) -> bool {
    field.parse::<f64>().is_ok_and(f64::is_finite)
}

fn parse_field(field: &str, ty: &ColumnType) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    match ty {
        ColumnType::Integer => field.parse().map_or(Value::Null, Value::Integer),
        ColumnType::Real => field.parse().map_or(Value::Null, Value::Real),
        _ => Value::Text(field.to_string()),
    }
}

fn csv_error(err: csv::Error) -> PipelineError {
    let line = err.position().map(|p| p.line());
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => PipelineError::parse_at(
            ErrorCode::LOAD_FIELD_COUNT,
            line,
            format!("expected {} fields but found {}", expected_len, len),
        ),
        csv::ErrorKind::Io(_) => PipelineError::io_with_code(
            ErrorCode::IO_ERROR,
            "failed to read input",
            None,
        )
        .with_source(err),
        _ => PipelineError::parse_at(ErrorCode::LOAD_MALFORMED, line, err.to_string())
            .with_source(err),
    }
}
