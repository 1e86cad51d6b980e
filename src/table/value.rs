//! Cell values and column types
//!
//! A column's type is fixed once the cleaning stage has run; every cell of the
//! column is either `Value::Null` or the variant that type admits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Date format used when no explicit format is given
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// A single typed cell
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
    /// A categorical label; the permitted labels live on the column type
    Category(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of integer and real cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Label view of text and categorical cells
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Category(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Short name of the variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "string",
            Value::Date(_) => "date",
            Value::Category(_) => "categorical",
        }
    }

    /// Render the cell the way it would appear in a delimited file
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Category(a), Value::Category(b)) => a == b,
            _ => false,
        }
    }
}

// Reals compare by bit pattern so values can key a hash map.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Integer(i) => i.hash(state),
            Value::Real(r) => r.to_bits().hash(state),
            Value::Text(s) | Value::Category(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NA"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) | Value::Category(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format(DEFAULT_DATE_FORMAT)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(r) => serializer.serialize_f64(*r),
            Value::Text(s) | Value::Category(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(&d.format(DEFAULT_DATE_FORMAT)),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// The type of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Real,
    #[serde(rename = "string")]
    Text,
    Date,
    /// A categorical column with its permitted labels, in rank order when `ordered`
    Categorical { levels: Vec<String>, ordered: bool },
}

impl ColumnType {
    pub fn unordered(levels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ColumnType::Categorical {
            levels: levels.into_iter().map(Into::into).collect(),
            ordered: false,
        }
    }

    pub fn ordered(levels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ColumnType::Categorical {
            levels: levels.into_iter().map(Into::into).collect(),
            ordered: true,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Real)
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, ColumnType::Categorical { .. })
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, ColumnType::Categorical { ordered: true, .. })
    }

    /// Position of a label in the level list
    pub fn rank(&self, label: &str) -> Option<usize> {
        match self {
            ColumnType::Categorical { levels, .. } => levels.iter().position(|l| l == label),
            _ => None,
        }
    }

    /// Whether a cell is representable in this column type
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ColumnType::Integer, Value::Integer(_)) => true,
            (ColumnType::Real, Value::Real(_)) => true,
            (ColumnType::Text, Value::Text(_)) => true,
            (ColumnType::Date, Value::Date(_)) => true,
            (ColumnType::Categorical { levels, .. }, Value::Category(label)) => {
                levels.iter().any(|l| l == label)
            }
            _ => false,
        }
    }

    /// Total order over two non-null cells of this type
    ///
    /// Categorical cells order by level rank, so an ordered column keeps its
    /// declared order and an unordered one keeps its level order.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Category(x), Value::Category(y)) => {
                match (self.rank(x), self.rank(y)) {
                    (Some(rx), Some(ry)) => rx.cmp(&ry),
                    _ => x.cmp(y),
                }
            }
            (Value::Text(x), Value::Text(y)) => x.cmp(y),
            (Value::Date(x), Value::Date(y)) => x.cmp(y),
            (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.type_name().cmp(b.type_name()),
            },
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => f.write_str("integer"),
            ColumnType::Real => f.write_str("real"),
            ColumnType::Text => f.write_str("string"),
            ColumnType::Date => f.write_str("date"),
            ColumnType::Categorical { levels, ordered } => {
                let kind = if *ordered { "ordered" } else { "categorical" };
                write!(f, "{}[{}]", kind, levels.join(if *ordered { " < " } else { ", " }))
            }
        }
    }
}
