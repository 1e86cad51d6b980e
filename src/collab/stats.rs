//! Statistics collaborator interface
//!
//! Tests themselves are not implemented here. This module describes a model,
//! prepares a null-free, type-checked [`ModelFrame`] for it and defines the
//! [`StatsBackend`] seam a statistics library plugs into.

use crate::error::{ErrorCode, PipelineError, Result};
use crate::table::{Column, ColumnType, Row, Schema, Table, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Two-sample t-test of a numeric column across a two-level factor
    TTest,
    /// One-way analysis of variance
    Anova,
    /// Chi-square test of independence between two factors
    ChiSquare,
    /// Ordinary least squares regression
    Regression,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::TTest => "t_test",
            ModelKind::Anova => "anova",
            ModelKind::ChiSquare => "chi_square",
            ModelKind::Regression => "regression",
        };
        f.write_str(name)
    }
}

/// Formula-like model description: `dependent ~ independents`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub kind: ModelKind,
    pub dependent: String,
    pub independents: Vec<String>,
}

impl ModelSpec {
    pub fn new<I, S>(
        name: impl Into<String>,
        kind: ModelKind,
        dependent: impl Into<String>,
        independents: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind,
            dependent: dependent.into(),
            independents: independents.into_iter().map(Into::into).collect(),
        }
    }

    /// Every column the model reads, dependent first
    pub fn columns(&self) -> Vec<&str> {
        std::iter::once(self.dependent.as_str())
            .chain(self.independents.iter().map(String::as_str))
            .collect()
    }

    /// Structural checks that need no data
    pub fn check(&self) -> Result<()> {
        let expected_one = !matches!(self.kind, ModelKind::Regression);
        if self.independents.is_empty() || (expected_one && self.independents.len() != 1) {
            return Err(PipelineError::invalid_rule(
                ErrorCode::MODEL_INVALID_SPEC,
                format!(
                    "{} model '{}' takes {} independent column(s), got {}",
                    self.kind,
                    self.name,
                    if expected_one { "exactly one" } else { "at least one" },
                    self.independents.len()
                ),
            ));
        }
        Ok(())
    }

    fn check_type(&self, column: &Column, dependent: bool) -> Result<()> {
        let numeric = column.ty.is_numeric();
        let factor = matches!(column.ty, ColumnType::Categorical { .. } | ColumnType::Text);
        let ok = match (self.kind, dependent) {
            (ModelKind::TTest | ModelKind::Anova, true) => numeric,
            (ModelKind::TTest | ModelKind::Anova, false) => factor,
            (ModelKind::ChiSquare, _) => factor,
            (ModelKind::Regression, _) => numeric,
        };
        if ok {
            return Ok(());
        }
        Err(PipelineError::invalid_rule(
            ErrorCode::MODEL_TYPE_MISMATCH,
            format!(
                "{} model '{}' cannot use {} column '{}' as {}",
                self.kind,
                self.name,
                column.ty,
                column.name,
                if dependent { "the dependent" } else { "an independent" }
            ),
        ))
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({} ~ {})",
            self.kind,
            self.dependent,
            self.independents.join(" + ")
        )
    }
}

/// The columns a model reads, with every incomplete row removed
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFrame {
    pub table: Table,
    /// Rows removed because one of the model's columns was null
    pub dropped: usize,
}

impl ModelFrame {
    /// Project the model's columns and drop rows holding a null in any of them
    pub fn from_table(table: &Table, spec: &ModelSpec) -> Result<Self> {
        spec.check()?;

        let schema = table.schema();
        let context = format!("model '{}'", spec.name);
        let mut indices = Vec::new();
        let mut columns = Vec::new();
        for (position, name) in spec.columns().into_iter().enumerate() {
            let i = schema.require_for(name, ErrorCode::MODEL_MISSING_COLUMN, &context)?;
            let column = &schema.columns()[i];
            spec.check_type(column, position == 0)?;
            indices.push(i);
            columns.push(column.clone());
        }

        let rows: Vec<Row> = table
            .rows()
            .iter()
            .map(|row| indices.iter().map(|&i| row.values()[i].clone()).collect::<Vec<_>>())
            .filter(|values| !values.iter().any(Value::is_null))
            .map(Row::new)
            .collect();

        let dropped = table.len() - rows.len();
        if dropped > 0 {
            warn!(
                "Model '{}' dropped {} of {} rows with missing values",
                spec.name,
                dropped,
                table.len()
            );
        }
        debug!("Prepared {} over {} rows", spec, rows.len());

        Ok(Self {
            table: Table::new(Schema::new(columns)?, rows)?,
            dropped,
        })
    }

    /// Numeric values of a frame column
    pub fn numeric(&self, column: &str) -> Result<Vec<f64>> {
        Ok(self
            .table
            .numeric_column(column)?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Distinct labels of a factor column, in first-occurrence order
    pub fn levels(&self, column: &str) -> Result<Vec<String>> {
        let mut levels: Vec<String> = Vec::new();
        for value in self.table.column(column)? {
            let label = value.to_string();
            if !levels.contains(&label) {
                levels.push(label);
            }
        }
        Ok(levels)
    }
}

/// One estimated regression term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    #[serde(default)]
    pub std_error: Option<f64>,
    #[serde(default)]
    pub p_value: Option<f64>,
}

/// Result of a statistical test or model fit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestOutcome {
    pub statistic: f64,
    /// Degrees of freedom, where the test defines them
    #[serde(default)]
    pub df: Option<f64>,
    pub p_value: f64,
    /// Regression estimates; empty for other tests
    #[serde(default)]
    pub coefficients: Vec<Coefficient>,
}

/// A statistics library able to run the modelled tests
pub trait StatsBackend {
    fn fit(&self, spec: &ModelSpec, frame: &ModelFrame) -> Result<TestOutcome>;
}
