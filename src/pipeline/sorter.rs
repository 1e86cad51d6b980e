//! Sorting configuration and logic for tables
//!
//! Provides multi-column sorting with ascending/descending order and null
//! positioning. Categorical columns sort by level rank, so an ordered
//! categorical keeps its declared order. Sorting is stable.

use crate::error::{ErrorCode, PipelineError, Result};
use crate::table::{ColumnType, Row, Table, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sorting configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Sorter {
    /// Columns to sort by
    pub fields: Vec<SortField>,
}

impl Sorter {
    /// Sort by a single column
    pub fn by(column: impl Into<String>, order: SortOrder) -> Self {
        Self {
            fields: vec![SortField {
                column: column.into(),
                order,
                null_position: NullPosition::Last,
            }],
        }
    }

    /// Parse a sort specification string
    ///
    /// Format: `"col1 DESC, col2 ASC NULLS FIRST"` or just `"col1"`
    pub fn parse(spec: &str) -> Result<Self> {
        let mut fields = Vec::new();

        for field_spec in spec.split(',') {
            let parts: Vec<&str> = field_spec.split_whitespace().collect();
            let Some((column, rest)) = parts.split_first() else {
                continue;
            };

            let mut order = SortOrder::Ascending;
            let mut null_position = NullPosition::Last;
            let mut rest = rest.iter().map(|p| p.to_uppercase());

            let mut next = rest.next();
            match next.as_deref() {
                Some("DESC" | "DESCENDING") => {
                    order = SortOrder::Descending;
                    next = rest.next();
                }
                Some("ASC" | "ASCENDING") => next = rest.next(),
                _ => {}
            }

            if next.as_deref() == Some("NULLS") {
                null_position = match rest.next().as_deref() {
                    Some("FIRST") => NullPosition::First,
                    Some("LAST") => NullPosition::Last,
                    other => {
                        return Err(invalid(format!(
                            "Invalid null position: {}. Use NULLS FIRST or NULLS LAST",
                            other.unwrap_or("<missing>")
                        )))
                    }
                };
            } else if let Some(extra) = next {
                return Err(invalid(format!("Unexpected sort token '{}'", extra)));
            }

            fields.push(SortField {
                column: column.to_string(),
                order,
                null_position,
            });
        }

        if fields.is_empty() {
            return Err(invalid("No sort fields specified"));
        }

        Ok(Self { fields })
    }

    /// Return a new table with rows reordered
    pub fn sort(&self, table: &Table) -> Result<Table> {
        let schema = table.schema();
        let keys = self
            .fields
            .iter()
            .map(|field| {
                let index = schema.require(&field.column)?;
                Ok((index, &schema.columns()[index].ty, field))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut rows: Vec<Row> = table.rows().to_vec();
        rows.sort_by(|a, b| {
            for (index, ty, field) in &keys {
                let ordering = compare_values(
                    ty,
                    &a.values()[*index],
                    &b.values()[*index],
                    field.order,
                    field.null_position,
                );
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        Table::new(schema.clone(), rows)
    }
}

/// Compare two cells for sorting
///
/// Null position is independent of sort order: DESC reverses only the value
/// comparison.
pub fn compare_values(
    ty: &ColumnType,
    a: &Value,
    b: &Value,
    order: SortOrder,
    null_position: NullPosition,
) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => match null_position {
            NullPosition::First => Ordering::Less,
            NullPosition::Last => Ordering::Greater,
        },
        (false, true) => match null_position {
            NullPosition::First => Ordering::Greater,
            NullPosition::Last => Ordering::Less,
        },
        (false, false) => {
            let value_cmp = ty.compare(a, b);
            match order {
                SortOrder::Ascending => value_cmp,
                SortOrder::Descending => value_cmp.reverse(),
            }
        }
    }
}

fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::invalid_rule(ErrorCode::CONFIG_INVALID_VALUE, message)
}

/// Sort field configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    /// Column to sort by
    pub column: String,
    /// Sort order
    pub order: SortOrder,
    /// Position of null values
    pub null_position: NullPosition,
}

/// Sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

/// Position of null values in sorted output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPosition {
    First,
    Last,
}
