//! In-memory typed tables
//!
//! Tables are immutable once built: every pipeline stage reads one table and
//! returns a freshly constructed one, so intermediate tables stay reusable.
//! Rows are validated against the schema when the table is constructed, not
//! on each access.

mod value;

pub use value::{ColumnType, Value, DEFAULT_DATE_FORMAT};

use crate::error::{ErrorCode, PipelineError, Result};
use crate::pipeline::Sorter;
use serde::Serialize;
use serde_json::Map;
use std::collections::HashMap;

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered column set shared by every row of a table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema, rejecting duplicate column names
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if index.insert(col.name.clone(), i).is_some() {
                return Err(PipelineError::duplicate_column(&col.name));
            }
        }
        Ok(Self { columns, index })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index_of(name).map(|i| &self.columns[i])
    }

    /// Look up a column index, failing with `UnknownColumn`
    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| PipelineError::unknown_column(name))
    }

    /// Look up a column index on behalf of `context`, failing with `MissingColumn`
    pub fn require_for(&self, name: &str, code: u16, context: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| PipelineError::missing_column(code, name, context))
    }

    /// A copy of this schema with one more column appended
    pub fn with_column(&self, column: Column) -> Result<Self> {
        let mut columns = self.columns.clone();
        columns.push(column);
        Self::new(columns)
    }
}

/// One record of a table, aligned with the table's schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Name-based read access to one row
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    schema: &'a Schema,
    values: &'a [Value],
}

impl<'a> RowRef<'a> {
    pub fn new(schema: &'a Schema, values: &'a [Value]) -> Self {
        Self { schema, values }
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.schema
            .index_of(name)
            .and_then(|i| self.values.get(i))
    }

    pub fn column_type(&self, name: &str) -> Option<&'a ColumnType> {
        self.schema.column(name).map(|c| &c.ty)
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }
}

/// An ordered collection of uniformly typed rows
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table, validating every row against the schema
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        for (r, row) in rows.iter().enumerate() {
            if row.values.len() != schema.len() {
                return Err(PipelineError::parse_at(
                    ErrorCode::CLEAN_SCHEMA_MISMATCH,
                    None,
                    format!(
                        "row {} has {} values but the schema has {} columns",
                        r,
                        row.values.len(),
                        schema.len()
                    ),
                ));
            }
            for (value, column) in row.values.iter().zip(schema.columns()) {
                if !column.ty.admits(value) {
                    return Err(PipelineError::coercion(
                        &column.name,
                        r,
                        value.to_field(),
                        &column.ty,
                    ));
                }
            }
        }
        Ok(Self { schema, rows })
    }

    /// An empty table with the given schema
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows
            .get(index)
            .map(|row| RowRef::new(&self.schema, &row.values))
    }

    pub fn iter(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows
            .iter()
            .map(|row| RowRef::new(&self.schema, &row.values))
    }

    /// Cell at `row` in column `name`
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let col = self.schema.index_of(name)?;
        self.rows.get(row)?.values.get(col)
    }

    /// All cells of one column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let col = self.schema.require(name)?;
        Ok(self.rows.iter().map(|r| &r.values[col]).collect())
    }

    /// Numeric view of a column; non-numeric and null cells become `None`
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.column(name)?.into_iter().map(Value::as_f64).collect())
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_records(&self) -> Result<Vec<Map<String, serde_json::Value>>> {
        self.rows
            .iter()
            .map(|row| {
                self.schema
                    .columns()
                    .iter()
                    .zip(&row.values)
                    .map(|(col, value)| -> Result<(String, serde_json::Value)> {
                        Ok((col.name.clone(), serde_json::to_value(value)?))
                    })
                    .collect()
            })
            .collect()
    }

    /// A copy of this table with rows reordered by `sorter`
    pub fn sort_by(&self, sorter: &Sorter) -> Result<Table> {
        sorter.sort(self)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_rejects_duplicate_names() {
        let err = Schema::new(vec![
            Column::new("A", ColumnType::Integer),
            Column::new("A", ColumnType::Real),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), "DuplicateColumnError");
    }

    #[test]
    fn test_table_validates_row_width_and_types() {
        let schema = Schema::new(vec![Column::new("A", ColumnType::Integer)]).unwrap();

        let err = Table::new(
            schema.clone(),
            vec![Row::new(vec![Value::Integer(1), Value::Integer(2)])],
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CLEAN_SCHEMA_MISMATCH);

        let err = Table::new(schema, vec![Row::new(vec![Value::Text("x".into())])]).unwrap_err();
        assert_eq!(err.kind(), "CoercionError");
    }

    #[test]
    fn test_value_access_by_name() {
        let table = fixtures::salary_table();
        assert_eq!(table.len(), 4);
        assert_eq!(table.value(1, "Department"), Some(&Value::Text("IT".into())));
        assert_eq!(table.value(1, "Bonus"), None);
        assert_eq!(
            table.numeric_column("Salary").unwrap()[3],
            Some(40000.0)
        );
        assert!(table.column("Bonus").is_err());
    }

    #[test]
    fn test_to_records_keys_by_column_name() {
        let table = fixtures::salary_table();
        let records = table.to_records().unwrap();
        assert_eq!(records[2]["Department"], "IT");
        assert_eq!(records[2]["Salary"], 70000.0);
    }
}
