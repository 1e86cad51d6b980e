//! Declarative pipeline configuration
//!
//! A pipeline is described in YAML or TOML, chosen by file extension:
//!
//! ```yaml
//! input:
//!   path: employees.csv
//! clean:
//!   - filter: "Salary > 0"
//!   - coerce: { column: Join_Date, to: date }
//!   - coerce: { column: Performance_Score, to: ordered, levels: [Low, Medium, High] }
//! derive:
//!   - tenure: { column: Years_at_Company, from: Join_Date }
//! aggregate:
//!   - name: by_department
//!     group_by: [Department]
//!     reductions:
//!       - { name: mean_salary, column: Salary, kind: mean }
//! ```

pub mod presets;

use crate::collab::{ChartSpec, ModelSpec};
use crate::error::{ErrorCode, PipelineError, Result};
use crate::loader::LoadOptions;
use crate::pipeline::{Aggregation, CleanRule, CoerceTarget, DeriveRule, Pipeline};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Input file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ','
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: default_delimiter(),
        }
    }
}

impl InputConfig {
    /// Loader options for this input
    pub fn load_options(&self) -> Result<LoadOptions> {
        let delimiter = u8::try_from(self.delimiter).map_err(|_| {
            PipelineError::invalid_rule(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("delimiter {:?} is not a single-byte character", self.delimiter),
            )
        })?;
        Ok(LoadOptions::default().with_delimiter(delimiter))
    }
}

/// One cleaning rule as written in a config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanRuleConfig {
    /// Row filter expression
    Filter(String),
    /// Columns to remove
    Drop(Vec<String>),
    Coerce {
        column: String,
        #[serde(flatten)]
        target: CoerceTarget,
    },
    Rename {
        from: String,
        to: String,
    },
}

impl CleanRuleConfig {
    pub fn to_rule(&self) -> Result<CleanRule> {
        Ok(match self {
            CleanRuleConfig::Filter(expr) => CleanRule::filter(expr)
                .map_err(|e| e.with_context(format!("in filter \"{}\"", expr)))?,
            CleanRuleConfig::Drop(columns) => CleanRule::drop(columns.iter().cloned()),
            CleanRuleConfig::Coerce { column, target } => CleanRule::coerce(column, target.clone()),
            CleanRuleConfig::Rename { from, to } => CleanRule::rename(from, to),
        })
    }
}

/// A whole run: input, stage rules and downstream consumers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub clean: Vec<CleanRuleConfig>,
    #[serde(default)]
    pub derive: Vec<DeriveRule>,
    #[serde(default)]
    pub aggregate: Vec<Aggregation>,
    #[serde(default)]
    pub charts: Vec<ChartSpec>,
    #[serde(default)]
    pub models: Vec<ModelSpec>,
}

impl PipelineConfig {
    /// Load a config file, picking the format from its extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading pipeline configuration from {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                PipelineError::not_found_with_code(ErrorCode::CONFIG_NOT_FOUND, path).with_source(e)
            }
            _ => PipelineError::from(e).with_context(path.display()),
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let config = match extension.as_deref() {
            Some("yml" | "yaml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            other => Err(PipelineError::invalid_rule(
                ErrorCode::CONFIG_UNSUPPORTED_FORMAT,
                format!(
                    "cannot tell the format of {} from extension {:?}; use .yml, .yaml or .toml",
                    path.display(),
                    other.unwrap_or("")
                ),
            )),
        }?;

        debug!(
            "Configuration has {} clean rules, {} derivations, {} aggregations",
            config.clean.len(),
            config.derive.len(),
            config.aggregate.len()
        );
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Build the executable pipeline
    pub fn to_pipeline(&self) -> Result<Pipeline> {
        let clean_rules = self
            .clean
            .iter()
            .map(CleanRuleConfig::to_rule)
            .collect::<Result<Vec<_>>>()?;
        Ok(Pipeline {
            clean_rules,
            derive_rules: self.derive.clone(),
            aggregations: self.aggregate.clone(),
        })
    }

    /// Structural validation without loading any data
    pub fn validate(&self) -> Result<()> {
        self.input.load_options()?;
        self.to_pipeline()?.validate()?;

        let mut names = HashSet::new();
        for name in self
            .aggregate
            .iter()
            .map(|a| &a.name)
            .chain(self.charts.iter().map(|c| &c.name))
        {
            if !names.insert(name) {
                return Err(PipelineError::invalid_rule(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("output name '{}' is used more than once", name),
                ));
            }
        }

        for chart in &self.charts {
            chart.check()?;
            if let Some(table) = &chart.table {
                if !self.aggregate.iter().any(|a| &a.name == table) {
                    return Err(PipelineError::invalid_rule(
                        ErrorCode::CONFIG_INVALID_VALUE,
                        format!("chart '{}' reads unknown aggregate '{}'", chart.name, table),
                    ));
                }
            }
        }
        for model in &self.models {
            model.check()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::ChartKind;
    use crate::pipeline::ReductionKind;
    use std::io::Write;
    use tempfile::Builder;

    const YAML: &str = r#"
input:
  path: employees.csv
clean:
  - filter: "Salary > 0"
  - drop: [Name]
  - coerce: { column: Join_Date, to: date }
  - coerce: { column: Performance_Score, to: ordered, levels: [Low, Medium, High] }
  - rename: { from: Remote_Work, to: Remote }
derive:
  - tenure: { column: Years_at_Company, from: Join_Date }
  - bucket: { column: Experience_Level, from: Experience_Years, threshold: 10 }
aggregate:
  - name: by_department
    group_by: [Department]
    reductions:
      - { name: mean_salary, column: Salary, kind: mean }
      - { name: n, kind: count }
    sort: { by: mean_salary, order: desc }
charts:
  - { name: salary_chart, kind: bar, table: by_department, x: Department, y: mean_salary }
models:
  - { name: pay_gap, kind: t_test, dependent: Salary, independents: [Gender] }
"#;

    #[test]
    fn test_parse_yaml() {
        let config = PipelineConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.input.path, Some(PathBuf::from("employees.csv")));
        assert_eq!(config.input.delimiter, ',');
        assert_eq!(config.clean.len(), 5);
        assert_eq!(
            config.clean[3],
            CleanRuleConfig::Coerce {
                column: "Performance_Score".into(),
                target: CoerceTarget::ordered(["Low", "Medium", "High"]),
            }
        );
        assert_eq!(
            config.derive[1],
            DeriveRule::Bucket {
                column: "Experience_Level".into(),
                from: "Experience_Years".into(),
                threshold: 10.0,
                above: "Senior".into(),
                below: "Junior".into(),
            }
        );
        assert_eq!(config.aggregate[0].reductions[1].kind, ReductionKind::Count);
        assert_eq!(config.charts[0].kind, ChartKind::Bar);
        config.validate().unwrap();

        let pipeline = config.to_pipeline().unwrap();
        assert_eq!(pipeline.clean_rules.len(), 5);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[input]
path = "employees.tsv"
delimiter = "\t"

[[clean]]
filter = "Salary > 0"

[[clean]]
coerce = { column = "Gender", to = "categorical" }

[[aggregate]]
name = "by_gender"
group_by = ["Gender"]
reductions = [{ name = "n", kind = "count" }]
"#;
        let config = PipelineConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.input.load_options().unwrap().delimiter, b'\t');
        assert_eq!(config.clean.len(), 2);
        assert_eq!(config.aggregate[0].group_by, vec!["Gender"]);
    }

    #[test]
    fn test_invalid_filter_names_expression() {
        let config = PipelineConfig::from_yaml_str("clean:\n  - filter: \"Salary >\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::CLEAN_INVALID_FILTER);
        assert!(err.to_string().contains("Salary >"));
    }

    #[test]
    fn test_validate_rejects_unknown_chart_table_and_duplicates() {
        let mut config = PipelineConfig::from_yaml_str(YAML).unwrap();
        config.charts[0].table = Some("nope".into());
        assert_eq!(config.validate().unwrap_err().code(), ErrorCode::CONFIG_INVALID_VALUE);

        let mut config = PipelineConfig::from_yaml_str(YAML).unwrap();
        config.charts[0].name = "by_department".into();
        assert_eq!(config.validate().unwrap_err().code(), ErrorCode::CONFIG_INVALID_VALUE);
    }

    #[test]
    fn test_load_by_extension() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        assert!(PipelineConfig::load(file.path()).is_ok());

        let mut file = Builder::new().suffix(".ini").tempfile().unwrap();
        file.write_all(b"x").unwrap();
        let err = PipelineConfig::load(file.path()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_UNSUPPORTED_FORMAT);

        let err = PipelineConfig::load("/no/such/pipeline.yml").unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let err = PipelineConfig::from_yaml_str("clean: [").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_YAML);
    }
}
