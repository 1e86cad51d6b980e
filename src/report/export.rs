//! Table export to CSV and JSON

use crate::error::{ErrorCode, PipelineError, Result};
use crate::table::Table;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output format for aggregate tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Aligned plain text (terminal only)
    #[default]
    Text,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> Option<&'static str> {
        match self {
            ExportFormat::Text => None,
            ExportFormat::Csv => Some("csv"),
            ExportFormat::Json => Some("json"),
        }
    }
}

/// Write `table` as `<dir>/<name>.<ext>`, returning the path written
///
/// Text format writes nothing and returns `None`.
pub fn export(table: &Table, dir: &Path, name: &str, format: ExportFormat) -> Result<Option<PathBuf>> {
    let Some(ext) = format.extension() else {
        return Ok(None);
    };
    let path = dir.join(format!("{}.{}", name, ext));
    let file = File::create(&path).map_err(|e| export_error(&path, e))?;

    match format {
        ExportFormat::Csv => write_csv(table, file).map_err(|e| e.with_context(path.display()))?,
        ExportFormat::Json => write_json(table, file).map_err(|e| e.with_context(path.display()))?,
        ExportFormat::Text => {}
    }

    debug!("Exported {} rows to {}", table.len(), path.display());
    Ok(Some(path))
}

/// Header plus one record per row; nulls are empty fields
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    let csv_err = |e: csv::Error| {
        PipelineError::io_with_code(ErrorCode::EXPORT_FAILED, "CSV write failed", None).with_source(e)
    };

    writer
        .write_record(table.schema().names())
        .map_err(csv_err)?;
    for row in table.rows() {
        writer
            .write_record(row.values().iter().map(|v| v.to_field()))
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

/// A JSON array of objects keyed by column name
pub fn write_json<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &table.to_records()?)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn export_error(path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::io_with_code(
        ErrorCode::EXPORT_FAILED,
        "cannot create export file",
        Some(path.to_path_buf()),
    )
    .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::salary_table;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_csv_export() {
        let dir = TempDir::new().unwrap();
        let path = export(&salary_table(), dir.path(), "salaries", ExportFormat::Csv)
            .unwrap()
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "salaries.csv");
        let text = fs::read_to_string(path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("ID,Department,Salary"));
        assert_eq!(lines.next(), Some("1,HR,-461.43"));
    }

    #[test]
    fn test_json_export() {
        let dir = TempDir::new().unwrap();
        let path = export(&salary_table(), dir.path(), "salaries", ExportFormat::Json)
            .unwrap()
            .unwrap();

        let records: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(records.as_array().unwrap().len(), 4);
        assert_eq!(records[1]["Department"], "IT");
    }

    #[test]
    fn test_text_format_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let written = export(&salary_table(), dir.path(), "x", ExportFormat::Text).unwrap();
        assert!(written.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_directory() {
        let err = export(&salary_table(), Path::new("/no/such/dir"), "x", ExportFormat::Csv).unwrap_err();
        assert_eq!(err.code(), ErrorCode::EXPORT_FAILED);
    }
}
