//! Validator/cleaner stage
//!
//! Applies an ordered list of cleaning rules to a table. Each rule returns a
//! new table; the input is never modified. `RowFilter` is the only rule that
//! removes rows: a coercion failure aborts the stage rather than dropping the
//! offending row.

use super::coerce::CoerceTarget;
use super::filter::FilterExpression;
use crate::error::{PipelineError, Result};
use crate::table::{Column, ColumnType, Row, RowRef, Schema, Table};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};

type PredicateFn = dyn Fn(&RowRef<'_>) -> bool + Send + Sync;

/// Predicate of a `RowFilter` rule
#[derive(Clone)]
pub enum RowPredicate {
    /// A parsed filter expression
    Expression(FilterExpression),
    /// An arbitrary closure with a label for diagnostics
    Custom {
        label: String,
        predicate: Arc<PredicateFn>,
    },
}

impl RowPredicate {
    /// Parse a filter expression string
    pub fn parse(expr: &str) -> Result<Self> {
        FilterExpression::parse(expr).map(RowPredicate::Expression)
    }

    pub fn custom(
        label: impl Into<String>,
        predicate: impl Fn(&RowRef<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        RowPredicate::Custom {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    fn check(&self, schema: &Schema) -> Result<()> {
        match self {
            RowPredicate::Expression(expr) => expr.check_columns(schema),
            RowPredicate::Custom { .. } => Ok(()),
        }
    }

    pub fn evaluate(&self, row: &RowRef<'_>) -> bool {
        match self {
            RowPredicate::Expression(expr) => expr.evaluate(row),
            RowPredicate::Custom { predicate, .. } => predicate(row),
        }
    }
}

impl fmt::Debug for RowPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowPredicate::Expression(expr) => f.debug_tuple("Expression").field(expr).finish(),
            RowPredicate::Custom { label, .. } => f.debug_tuple("Custom").field(label).finish(),
        }
    }
}

/// One cleaning rule
#[derive(Debug, Clone)]
pub enum CleanRule {
    /// Keep only rows satisfying the predicate
    RowFilter(RowPredicate),
    /// Remove the named columns
    ColumnDrop(Vec<String>),
    /// Convert a column to another type
    TypeCoerce { column: String, target: CoerceTarget },
    /// Rename a column in the schema
    Rename { from: String, to: String },
}

impl CleanRule {
    /// Build a `RowFilter` rule from an expression string
    pub fn filter(expr: &str) -> Result<Self> {
        RowPredicate::parse(expr).map(CleanRule::RowFilter)
    }

    pub fn drop<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CleanRule::ColumnDrop(columns.into_iter().map(Into::into).collect())
    }

    pub fn coerce(column: impl Into<String>, target: CoerceTarget) -> Self {
        CleanRule::TypeCoerce {
            column: column.into(),
            target,
        }
    }

    pub fn rename(from: impl Into<String>, to: impl Into<String>) -> Self {
        CleanRule::Rename {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Apply this rule, producing a new table
    pub fn apply(&self, table: &Table) -> Result<Table> {
        match self {
            CleanRule::RowFilter(predicate) => filter_rows(table, predicate),
            CleanRule::ColumnDrop(columns) => drop_columns(table, columns),
            CleanRule::TypeCoerce { column, target } => coerce_column(table, column, target),
            CleanRule::Rename { from, to } => rename_column(table, from, to),
        }
    }
}

impl fmt::Display for CleanRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanRule::RowFilter(RowPredicate::Custom { label, .. }) => {
                write!(f, "filter({})", label)
            }
            CleanRule::RowFilter(RowPredicate::Expression(expr)) => {
                write!(f, "filter(on {})", expr.columns().join(", "))
            }
            CleanRule::ColumnDrop(columns) => write!(f, "drop({})", columns.join(", ")),
            CleanRule::TypeCoerce { column, target } => write!(f, "coerce({} -> {})", column, target),
            CleanRule::Rename { from, to } => write!(f, "rename({} -> {})", from, to),
        }
    }
}

/// Apply rules in order; the first failing rule aborts the stage
pub fn clean(table: &Table, rules: &[CleanRule]) -> Result<Table> {
    debug!("Cleaning {} rows with {} rules", table.len(), rules.len());

    let mut current = table.clone();
    for rule in rules {
        trace!("Applying {}", rule);
        current = rule.apply(&current)?;
    }

    debug!(
        "Cleaning finished: {} of {} rows kept",
        current.len(),
        table.len()
    );
    Ok(current)
}

fn filter_rows(table: &Table, predicate: &RowPredicate) -> Result<Table> {
    predicate.check(table.schema())?;

    let rows: Vec<Row> = table
        .rows()
        .iter()
        .filter(|row| predicate.evaluate(&RowRef::new(table.schema(), row.values())))
        .cloned()
        .collect();

    let dropped = table.len() - rows.len();
    if dropped > 0 {
        info!("Row filter dropped {} of {} rows", dropped, table.len());
    }

    Table::new(table.schema().clone(), rows)
}

fn drop_columns(table: &Table, names: &[String]) -> Result<Table> {
    let schema = table.schema();
    let mut drop = Vec::with_capacity(names.len());
    for name in names {
        drop.push(schema.require(name)?);
    }

    let keep: Vec<usize> = (0..schema.len()).filter(|i| !drop.contains(i)).collect();
    let columns = keep.iter().map(|&i| schema.columns()[i].clone()).collect();
    let rows = table
        .rows()
        .iter()
        .map(|row| Row::new(keep.iter().map(|&i| row.values()[i].clone()).collect()))
        .collect();

    Table::new(Schema::new(columns)?, rows)
}

fn coerce_column(table: &Table, name: &str, target: &CoerceTarget) -> Result<Table> {
    let schema = table.schema();
    let index = schema.require(name)?;
    let current = &schema.columns()[index].ty;

    let ty = match (target, current) {
        // Keep existing levels so a repeated coercion is a no-op
        (CoerceTarget::Categorical { levels: None }, ColumnType::Categorical { ordered: false, .. }) => {
            current.clone()
        }
        _ => target.resolve_type(table.rows().iter().map(|r| &r.values()[index])),
    };

    let mut rows = Vec::with_capacity(table.len());
    for (r, row) in table.rows().iter().enumerate() {
        let cell = &row.values()[index];
        let coerced = target
            .coerce(cell, &ty)
            .ok_or_else(|| PipelineError::coercion(name, r, cell.to_field(), target))?;
        let mut values = row.values().to_vec();
        values[index] = coerced;
        rows.push(Row::new(values));
    }

    let mut columns = schema.columns().to_vec();
    columns[index] = Column::new(name, ty);
    Table::new(Schema::new(columns)?, rows)
}

fn rename_column(table: &Table, from: &str, to: &str) -> Result<Table> {
    let schema = table.schema();
    let index = schema.require(from)?;
    if from == to {
        return Ok(table.clone());
    }
    if schema.contains(to) {
        return Err(PipelineError::duplicate_column(to));
    }

    let mut columns = schema.columns().to_vec();
    columns[index].name = to.to_string();
    Table::new(Schema::new(columns)?, table.rows().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::salary_table;
    use crate::table::Value;

    #[test]
    fn test_salary_filter_drops_negative_row() {
        let table = salary_table();
        let cleaned = clean(&table, &[CleanRule::filter("Salary > 0").unwrap()]).unwrap();

        assert_eq!(cleaned.len(), 3);
        assert_eq!(table.len(), 4, "input table must be untouched");
        assert_eq!(cleaned.value(0, "ID"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_custom_predicate() {
        let rule = CleanRule::RowFilter(RowPredicate::custom("IT only", |row| {
            row.get("Department").and_then(Value::as_str) == Some("IT")
        }));
        let cleaned = rule.apply(&salary_table()).unwrap();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(rule.to_string(), "filter(IT only)");
    }

    #[test]
    fn test_filter_on_unknown_column_fails() {
        let err = CleanRule::filter("Bonus > 0")
            .unwrap()
            .apply(&salary_table())
            .unwrap_err();
        assert_eq!(err.kind(), "UnknownColumnError");
    }

    #[test]
    fn test_drop_columns() {
        let cleaned = CleanRule::drop(["ID"]).apply(&salary_table()).unwrap();
        assert_eq!(cleaned.schema().names().collect::<Vec<_>>(), vec!["Department", "Salary"]);
        assert_eq!(cleaned.value(3, "Salary"), Some(&Value::Real(40000.0)));

        let err = CleanRule::drop(["Nope"]).apply(&salary_table()).unwrap_err();
        assert_eq!(err.kind(), "UnknownColumnError");
    }

    #[test]
    fn test_rename() {
        let renamed = CleanRule::rename("Salary", "Pay").apply(&salary_table()).unwrap();
        assert!(renamed.schema().contains("Pay"));
        assert!(!renamed.schema().contains("Salary"));

        let err = CleanRule::rename("Salary", "ID").apply(&salary_table()).unwrap_err();
        assert_eq!(err.kind(), "DuplicateColumnError");
        let err = CleanRule::rename("Bonus", "X").apply(&salary_table()).unwrap_err();
        assert_eq!(err.kind(), "UnknownColumnError");
    }

    #[test]
    fn test_coerce_categorical_then_again_is_noop() {
        let rule = CleanRule::coerce("Department", CoerceTarget::categorical());
        let once = rule.apply(&salary_table()).unwrap();
        let twice = rule.apply(&once).unwrap();

        assert_eq!(
            once.schema().column("Department").unwrap().ty,
            ColumnType::unordered(["HR", "IT", "Sales"])
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn test_coercion_failure_aborts_instead_of_dropping() {
        let err = CleanRule::coerce("Department", CoerceTarget::Integer)
            .apply(&salary_table())
            .unwrap_err();
        assert_eq!(err.kind(), "CoercionError");
        assert!(matches!(err, PipelineError::Coercion { row: 0, .. }));
    }

    #[test]
    fn test_filter_before_coercion_avoids_bad_rows() {
        let rules = vec![
            CleanRule::filter("Department != 'HR'").unwrap(),
            CleanRule::coerce("Department", CoerceTarget::ordered(["Sales", "IT"])),
        ];
        let cleaned = clean(&salary_table(), &rules).unwrap();
        assert_eq!(cleaned.len(), 3);
        assert!(cleaned.schema().column("Department").unwrap().ty.is_ordered());

        // Without the filter the unlisted label is a hard failure
        let err = clean(&salary_table(), &rules[1..]).unwrap_err();
        assert_eq!(err.kind(), "CoercionError");
    }
}
