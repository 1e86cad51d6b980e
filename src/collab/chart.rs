//! Chart specifications and renderers
//!
//! A chart names the table it reads and the columns mapped to each encoding
//! channel. Rendering goes through the [`ChartRenderer`] trait; the bundled
//! [`VegaLiteRenderer`] writes a Vega-Lite document with the data inlined.

use crate::error::{ErrorCode, PipelineError, Result};
use crate::table::{ColumnType, Table};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Vega-Lite schema URL written into every document
pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Histogram,
    Boxplot,
    Scatter,
    Line,
    Pie,
}

impl ChartKind {
    /// Whether the kind needs a `y` column
    pub fn requires_y(self) -> bool {
        matches!(self, ChartKind::Boxplot | ChartKind::Scatter | ChartKind::Line)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::Histogram => "histogram",
            ChartKind::Boxplot => "boxplot",
            ChartKind::Scatter => "scatter",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
        };
        f.write_str(name)
    }
}

/// Declarative chart description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Output name, also the artifact file stem
    pub name: String,
    pub kind: ChartKind,
    /// Aggregate to read; the derived table when absent
    #[serde(default)]
    pub table: Option<String>,
    pub x: String,
    #[serde(default)]
    pub y: Option<String>,
    /// Grouping or fill column
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl ChartSpec {
    pub fn new(name: impl Into<String>, kind: ChartKind, x: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            table: None,
            x: x.into(),
            y: None,
            fill: None,
            title: None,
        }
    }

    pub fn with_y(mut self, y: impl Into<String>) -> Self {
        self.y = Some(y.into());
        self
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn from_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Columns referenced by the encodings
    pub fn columns(&self) -> Vec<&str> {
        std::iter::once(self.x.as_str())
            .chain(self.y.as_deref())
            .chain(self.fill.as_deref())
            .collect()
    }

    /// Structural checks that need no data
    pub fn check(&self) -> Result<()> {
        if self.kind.requires_y() && self.y.is_none() {
            return Err(PipelineError::invalid_rule(
                ErrorCode::CHART_INVALID_SPEC,
                format!("{} chart '{}' needs a y column", self.kind, self.name),
            ));
        }
        Ok(())
    }

    /// Check the spec against the table it will be rendered from
    pub fn validate(&self, table: &Table) -> Result<()> {
        self.check()?;
        let context = format!("chart '{}'", self.name);
        for column in self.columns() {
            table
                .schema()
                .require_for(column, ErrorCode::CHART_MISSING_COLUMN, &context)?;
        }
        Ok(())
    }
}

/// Turns a chart spec plus its table into an artifact on disk
pub trait ChartRenderer {
    /// File extension of the artifacts this renderer writes
    fn extension(&self) -> &'static str;

    fn render(&self, spec: &ChartSpec, table: &Table, path: &Path) -> Result<()>;
}

/// Writes Vega-Lite JSON documents
#[derive(Debug, Clone, Copy, Default)]
pub struct VegaLiteRenderer;

impl VegaLiteRenderer {
    /// Build the Vega-Lite document for a chart
    pub fn document(&self, spec: &ChartSpec, table: &Table) -> Result<Json> {
        spec.validate(table)?;

        let field = |name: &str, measure: bool| -> Json {
            let ty = table.schema().column(name).map(|c| &c.ty);
            let mut channel = Map::new();
            channel.insert("field".into(), json!(name));
            channel.insert("type".into(), json!(encoding_type(ty, measure)));
            if let Some(ColumnType::Categorical {
                levels,
                ordered: true,
            }) = ty
            {
                channel.insert("sort".into(), json!(levels));
            }
            Json::Object(channel)
        };
        let count = json!({ "aggregate": "count", "type": "quantitative" });
        let y = spec.y.as_deref();

        let (mark, mut encoding) = match spec.kind {
            ChartKind::Bar => (
                json!("bar"),
                json!({
                    "x": field(&spec.x, false),
                    "y": y.map_or(count.clone(), |y| field(y, true)),
                }),
            ),
            ChartKind::Histogram => (
                json!("bar"),
                json!({
                    "x": { "field": spec.x, "bin": true, "type": "quantitative" },
                    "y": count.clone(),
                }),
            ),
            ChartKind::Boxplot => (
                json!({ "type": "boxplot", "extent": 1.5 }),
                json!({
                    "x": field(&spec.x, false),
                    "y": y.map_or(Json::Null, |y| field(y, true)),
                }),
            ),
            ChartKind::Scatter => (
                json!("point"),
                json!({
                    "x": field(&spec.x, true),
                    "y": y.map_or(Json::Null, |y| field(y, true)),
                }),
            ),
            ChartKind::Line => (
                json!("line"),
                json!({
                    "x": field(&spec.x, false),
                    "y": y.map_or(Json::Null, |y| field(y, true)),
                }),
            ),
            ChartKind::Pie => (
                json!("arc"),
                json!({
                    "theta": y.map_or(count.clone(), |y| field(y, true)),
                    "color": field(&spec.x, false),
                }),
            ),
        };

        if let (Some(fill), Some(channels)) = (&spec.fill, encoding.as_object_mut()) {
            channels.insert("color".into(), field(fill, false));
        }

        let mut doc = json!({
            "$schema": VEGA_LITE_SCHEMA,
            "data": { "values": table.to_records()? },
            "mark": mark,
            "encoding": encoding,
        });
        if let (Some(title), Some(obj)) = (&spec.title, doc.as_object_mut()) {
            obj.insert("title".into(), json!(title));
        }
        Ok(doc)
    }
}

impl ChartRenderer for VegaLiteRenderer {
    fn extension(&self) -> &'static str {
        "vl.json"
    }

    fn render(&self, spec: &ChartSpec, table: &Table, path: &Path) -> Result<()> {
        let doc = self.document(spec, table)?;
        let text = serde_json::to_string_pretty(&doc)?;
        fs::write(path, text).map_err(|e| {
            PipelineError::io_with_code(
                ErrorCode::EXPORT_FAILED,
                format!("cannot write chart '{}'", spec.name),
                Some(path.to_path_buf()),
            )
            .with_source(e)
        })?;
        debug!("Wrote {} chart '{}' to {}", spec.kind, spec.name, path.display());
        Ok(())
    }
}

/// Vega-Lite measurement type for a column
fn encoding_type(ty: Option<&ColumnType>, measure: bool) -> &'static str {
    match ty {
        Some(ColumnType::Integer | ColumnType::Real) if measure => "quantitative",
        Some(ColumnType::Real) => "quantitative",
        Some(ColumnType::Date) => "temporal",
        Some(ColumnType::Categorical { ordered: true, .. }) => "ordinal",
        Some(ColumnType::Integer) => "ordinal",
        _ => "nominal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::salary_table;
    use tempfile::TempDir;

    #[test]
    fn test_bar_chart_document() {
        let spec = ChartSpec::new("salary", ChartKind::Bar, "Department")
            .with_y("Salary")
            .with_title("Salary by department");
        let doc = VegaLiteRenderer.document(&spec, &salary_table()).unwrap();

        assert_eq!(doc["mark"], "bar");
        assert_eq!(doc["encoding"]["x"]["type"], "nominal");
        assert_eq!(doc["encoding"]["y"]["type"], "quantitative");
        assert_eq!(doc["data"]["values"].as_array().unwrap().len(), 4);
        assert_eq!(doc["title"], "Salary by department");
    }

    #[test]
    fn test_histogram_counts_without_y() {
        let spec = ChartSpec::new("dist", ChartKind::Histogram, "Salary");
        let doc = VegaLiteRenderer.document(&spec, &salary_table()).unwrap();
        assert_eq!(doc["encoding"]["x"]["bin"], true);
        assert_eq!(doc["encoding"]["y"]["aggregate"], "count");
    }

    #[test]
    fn test_validate_reports_missing_columns() {
        let spec = ChartSpec::new("bad", ChartKind::Bar, "Department").with_fill("Gender");
        let err = spec.validate(&salary_table()).unwrap_err();
        assert_eq!(err.kind(), "MissingColumnError");
        assert_eq!(err.code(), ErrorCode::CHART_MISSING_COLUMN);

        let err = ChartSpec::new("bad", ChartKind::Scatter, "Salary").check().unwrap_err();
        assert_eq!(err.code(), ErrorCode::CHART_INVALID_SPEC);
    }

    #[test]
    fn test_render_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("salary.vl.json");
        let spec = ChartSpec::new("salary", ChartKind::Boxplot, "Department").with_y("Salary");

        VegaLiteRenderer.render(&spec, &salary_table(), &path).unwrap();
        let written: Json = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["$schema"], VEGA_LITE_SCHEMA);
        assert_eq!(written["mark"]["type"], "boxplot");
    }
}
