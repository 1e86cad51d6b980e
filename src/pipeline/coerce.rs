//! Per-cell type coercion
//!
//! Converting a cell that is already of the target type returns it unchanged,
//! so re-running a coercion over a coerced column is a no-op.

use crate::table::{ColumnType, Value, DEFAULT_DATE_FORMAT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Target of a `TypeCoerce` rule, including how to parse into it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", rename_all = "snake_case")]
pub enum CoerceTarget {
    Integer,
    Real,
    #[serde(rename = "string")]
    Text,
    /// Calendar date parsed with a chrono format string
    Date {
        #[serde(default = "default_date_format")]
        format: String,
    },
    /// Unordered categorical; levels default to the sorted distinct labels
    Categorical {
        #[serde(default)]
        levels: Option<Vec<String>>,
    },
    /// Ordered categorical with an explicit rank list
    Ordered { levels: Vec<String> },
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl CoerceTarget {
    pub fn date() -> Self {
        CoerceTarget::Date {
            format: default_date_format(),
        }
    }

    pub fn ordered(levels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        CoerceTarget::Ordered {
            levels: levels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn categorical() -> Self {
        CoerceTarget::Categorical { levels: None }
    }

    /// The column type this target produces for the given cells
    pub fn resolve_type<'a>(&self, cells: impl Iterator<Item = &'a Value>) -> ColumnType {
        match self {
            CoerceTarget::Integer => ColumnType::Integer,
            CoerceTarget::Real => ColumnType::Real,
            CoerceTarget::Text => ColumnType::Text,
            CoerceTarget::Date { .. } => ColumnType::Date,
            CoerceTarget::Categorical {
                levels: Some(levels),
            } => ColumnType::unordered(levels.iter().cloned()),
            CoerceTarget::Categorical { levels: None } => {
                let observed: BTreeSet<String> = cells
                    .filter(|v| !v.is_null())
                    .map(Value::to_string)
                    .collect();
                ColumnType::unordered(observed)
            }
            CoerceTarget::Ordered { levels } => ColumnType::ordered(levels.iter().cloned()),
        }
    }

    /// Convert one cell, or `None` when it has no representation in `ty`
    pub fn coerce(&self, value: &Value, ty: &ColumnType) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }
        match self {
            CoerceTarget::Integer => match value {
                Value::Integer(_) => Some(value.clone()),
                Value::Real(r) if r.fract() == 0.0 && r.abs() < i64::MAX as f64 => {
                    Some(Value::Integer(*r as i64))
                }
                Value::Text(s) | Value::Category(s) => s.trim().parse().ok().map(Value::Integer),
                _ => None,
            },
            CoerceTarget::Real => match value {
                Value::Real(_) => Some(value.clone()),
                Value::Integer(i) => Some(Value::Real(*i as f64)),
                Value::Text(s) | Value::Category(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|r| r.is_finite())
                    .map(Value::Real),
                _ => None,
            },
            CoerceTarget::Text => match value {
                Value::Text(_) => Some(value.clone()),
                other => Some(Value::Text(other.to_string())),
            },
            CoerceTarget::Date { format } => match value {
                Value::Date(_) => Some(value.clone()),
                Value::Text(s) | Value::Category(s) => {
                    NaiveDate::parse_from_str(s.trim(), format).ok().map(Value::Date)
                }
                _ => None,
            },
            CoerceTarget::Categorical { .. } | CoerceTarget::Ordered { .. } => {
                let label = value.to_string();
                ty.rank(&label).map(|_| Value::Category(label))
            }
        }
    }
}

impl fmt::Display for CoerceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoerceTarget::Integer => f.write_str("integer"),
            CoerceTarget::Real => f.write_str("real"),
            CoerceTarget::Text => f.write_str("string"),
            CoerceTarget::Date { format } => write!(f, "date ({})", format),
            CoerceTarget::Categorical { .. } => f.write_str("categorical"),
            CoerceTarget::Ordered { levels } => write!(f, "ordered [{}]", levels.join(" < ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_parses_and_formats_back() {
        let target = CoerceTarget::date();
        let ty = ColumnType::Date;
        let value = target.coerce(&Value::Text("2020-01-01".into()), &ty).unwrap();

        assert_eq!(value.to_string(), "2020-01-01");
        assert!(target.coerce(&Value::Text("2020-02-30".into()), &ty).is_none());
        assert!(target.coerce(&Value::Text("01/02/2020".into()), &ty).is_none());
    }

    #[test]
    fn test_custom_date_format() {
        let target = CoerceTarget::Date {
            format: "%d/%m/%Y".into(),
        };
        let value = target
            .coerce(&Value::Text("15/06/2018".into()), &ColumnType::Date)
            .unwrap();
        assert_eq!(value.to_string(), "2018-06-15");
    }

    #[test]
    fn test_ordered_rejects_unknown_label() {
        let target = CoerceTarget::ordered(["Low", "Medium", "High"]);
        let ty = target.resolve_type(std::iter::empty());
        assert!(ty.is_ordered());
        assert_eq!(
            target.coerce(&Value::Text("High".into()), &ty),
            Some(Value::Category("High".into()))
        );
        assert_eq!(target.coerce(&Value::Text("Excellent".into()), &ty), None);
    }

    #[test]
    fn test_categorical_levels_default_to_sorted_labels() {
        let cells = [
            Value::Text("M".into()),
            Value::Null,
            Value::Text("F".into()),
            Value::Text("M".into()),
        ];
        let ty = CoerceTarget::categorical().resolve_type(cells.iter());
        assert_eq!(ty, ColumnType::unordered(["F", "M"]));
    }

    #[test]
    fn test_numeric_conversions() {
        let int = CoerceTarget::Integer;
        assert_eq!(int.coerce(&Value::Real(4.0), &ColumnType::Integer), Some(Value::Integer(4)));
        assert_eq!(int.coerce(&Value::Real(4.5), &ColumnType::Integer), None);
        assert_eq!(
            CoerceTarget::Real.coerce(&Value::Text(" 2.5 ".into()), &ColumnType::Real),
            Some(Value::Real(2.5))
        );
        assert_eq!(CoerceTarget::Real.coerce(&Value::Null, &ColumnType::Real), Some(Value::Null));
    }

    #[test]
    fn test_deserialize_targets() {
        let target: CoerceTarget = serde_json::from_str(r#"{"to":"date"}"#).unwrap();
        assert_eq!(target, CoerceTarget::date());
        let target: CoerceTarget =
            serde_json::from_str(r#"{"to":"ordered","levels":["Low","High"]}"#).unwrap();
        assert_eq!(target, CoerceTarget::ordered(["Low", "High"]));
    }
}
