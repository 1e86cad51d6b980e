//! Feature deriver stage
//!
//! Each derivation appends one column computed row by row. Derivations run in
//! order against the table as it stands at that point, so a later derivation
//! may read a column produced by an earlier one.

use crate::error::{ErrorCode, PipelineError, Result};
use crate::table::{Column, ColumnType, Row, RowRef, Schema, Table, Value};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Days per year used for tenure, averaging in leap years
pub const DAYS_PER_YEAR: f64 = 365.25;

/// A rule that computes one new column from existing ones
pub trait Derivation: Send + Sync + fmt::Debug {
    /// Name of the column this derivation appends
    fn name(&self) -> &str;

    /// Type of the appended column
    fn column_type(&self) -> ColumnType;

    /// Columns read by `compute`
    fn inputs(&self) -> Vec<&str>;

    /// Value of the new column for one row
    fn compute(&self, row: &RowRef<'_>) -> Result<Value>;
}

/// Fractional years between a date column and a fixed reference date
///
/// A null date yields a null tenure. Dates after the reference yield a
/// negative tenure.
#[derive(Debug, Clone, PartialEq)]
pub struct TenureYears {
    pub column: String,
    pub from: String,
    pub reference: NaiveDate,
}

impl TenureYears {
    pub fn new(column: impl Into<String>, from: impl Into<String>, reference: NaiveDate) -> Self {
        Self {
            column: column.into(),
            from: from.into(),
            reference,
        }
    }
}

impl Derivation for TenureYears {
    fn name(&self) -> &str {
        &self.column
    }

    fn column_type(&self) -> ColumnType {
        ColumnType::Real
    }

    fn inputs(&self) -> Vec<&str> {
        vec![self.from.as_str()]
    }

    fn compute(&self, row: &RowRef<'_>) -> Result<Value> {
        match row.get(&self.from) {
            None => Err(missing(&self.from, &self.column)),
            Some(Value::Null) => Ok(Value::Null),
            Some(Value::Date(date)) => {
                let days = (self.reference - *date).num_days() as f64;
                Ok(Value::Real(days / DAYS_PER_YEAR))
            }
            Some(other) => Err(type_mismatch(&self.from, &self.column, "date", other)),
        }
    }
}

/// Binary bucketing of a numeric column into an unordered categorical
///
/// Values strictly greater than `threshold` map to `above`, all others to
/// `below`; nulls stay null.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdBucket {
    pub column: String,
    pub from: String,
    pub threshold: f64,
    pub above: String,
    pub below: String,
}

impl ThresholdBucket {
    pub fn new(column: impl Into<String>, from: impl Into<String>, threshold: f64) -> Self {
        Self {
            column: column.into(),
            from: from.into(),
            threshold,
            above: "Senior".to_string(),
            below: "Junior".to_string(),
        }
    }

    pub fn with_labels(mut self, above: impl Into<String>, below: impl Into<String>) -> Self {
        self.above = above.into();
        self.below = below.into();
        self
    }
}

impl Derivation for ThresholdBucket {
    fn name(&self) -> &str {
        &self.column
    }

    fn column_type(&self) -> ColumnType {
        let mut levels = vec![self.below.clone(), self.above.clone()];
        levels.sort();
        levels.dedup();
        ColumnType::unordered(levels)
    }

    fn inputs(&self) -> Vec<&str> {
        vec![self.from.as_str()]
    }

    fn compute(&self, row: &RowRef<'_>) -> Result<Value> {
        let value = row
            .get(&self.from)
            .ok_or_else(|| missing(&self.from, &self.column))?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        let number = value
            .as_f64()
            .ok_or_else(|| type_mismatch(&self.from, &self.column, "number", value))?;
        let label = if number > self.threshold {
            &self.above
        } else {
            &self.below
        };
        Ok(Value::Category(label.clone()))
    }
}

type ComputeFn = dyn Fn(&RowRef<'_>) -> Result<Value> + Send + Sync;

/// A derivation backed by a closure
#[derive(Clone)]
pub struct FnDerivation {
    name: String,
    ty: ColumnType,
    inputs: Vec<String>,
    compute: Arc<ComputeFn>,
}

impl FnDerivation {
    pub fn new<I, S>(
        name: impl Into<String>,
        ty: ColumnType,
        inputs: I,
        compute: impl Fn(&RowRef<'_>) -> Result<Value> + Send + Sync + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            ty,
            inputs: inputs.into_iter().map(Into::into).collect(),
            compute: Arc::new(compute),
        }
    }
}

impl fmt::Debug for FnDerivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDerivation")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

impl Derivation for FnDerivation {
    fn name(&self) -> &str {
        &self.name
    }

    fn column_type(&self) -> ColumnType {
        self.ty.clone()
    }

    fn inputs(&self) -> Vec<&str> {
        self.inputs.iter().map(String::as_str).collect()
    }

    fn compute(&self, row: &RowRef<'_>) -> Result<Value> {
        (self.compute)(row)
    }
}

/// Declarative derivation, as written in a pipeline config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeriveRule {
    /// Years since the date in `from`, measured at the run's reference date
    Tenure { column: String, from: String },
    /// `above` when `from` exceeds `threshold`, otherwise `below`
    Bucket {
        column: String,
        from: String,
        threshold: f64,
        #[serde(default = "default_above")]
        above: String,
        #[serde(default = "default_below")]
        below: String,
    },
}

fn default_above() -> String {
    "Senior".to_string()
}

fn default_below() -> String {
    "Junior".to_string()
}

impl DeriveRule {
    /// Name of the column the rule appends
    pub fn column(&self) -> &str {
        match self {
            DeriveRule::Tenure { column, .. } | DeriveRule::Bucket { column, .. } => column,
        }
    }

    /// Bind the rule to a reference date
    pub fn build(&self, reference: NaiveDate) -> Box<dyn Derivation> {
        match self {
            DeriveRule::Tenure { column, from } => {
                Box::new(TenureYears::new(column, from, reference))
            }
            DeriveRule::Bucket {
                column,
                from,
                threshold,
                above,
                below,
            } => Box::new(ThresholdBucket::new(column, from, *threshold).with_labels(above, below)),
        }
    }
}

/// Append one column per derivation, in order
pub fn derive(table: &Table, derivations: &[Box<dyn Derivation>]) -> Result<Table> {
    debug!(
        "Deriving {} columns over {} rows",
        derivations.len(),
        table.len()
    );

    let mut current = table.clone();
    for derivation in derivations {
        trace!("Deriving column '{}'", derivation.name());
        current = derive_one(&current, derivation.as_ref())?;
    }

    debug!("Derived table has {} columns", current.schema().len());
    Ok(current)
}

fn derive_one(table: &Table, derivation: &dyn Derivation) -> Result<Table> {
    let schema = table.schema();
    for input in derivation.inputs() {
        schema.require_for(
            input,
            ErrorCode::DERIVE_MISSING_COLUMN,
            &format!("derivation of '{}'", derivation.name()),
        )?;
    }

    let next_schema: Schema =
        schema.with_column(Column::new(derivation.name(), derivation.column_type()))?;

    let mut rows = Vec::with_capacity(table.len());
    for (row, row_ref) in table.rows().iter().zip(table.iter()) {
        let value = derivation.compute(&row_ref)?;
        let mut values = row.values().to_vec();
        values.push(value);
        rows.push(Row::new(values));
    }

    Table::new(next_schema, rows)
}

fn missing(column: &str, derived: &str) -> PipelineError {
    PipelineError::missing_column(
        ErrorCode::DERIVE_MISSING_COLUMN,
        column,
        format!("derivation of '{}'", derived),
    )
}

fn type_mismatch(column: &str, derived: &str, expected: &str, found: &Value) -> PipelineError {
    PipelineError::invalid_rule(
        ErrorCode::DERIVE_TYPE_MISMATCH,
        format!(
            "derivation of '{}' expects column '{}' to hold a {}, found {}",
            derived,
            column,
            expected,
            found.type_name()
        ),
    )
}
