//! Descriptive summary of a table

use crate::error::Result;
use crate::pipeline::ReductionKind;
use crate::table::{Column, ColumnType, Row, Schema, Table, Value};

const STATISTICS: [(&str, ReductionKind); 6] = [
    ("mean", ReductionKind::Mean),
    ("stddev", ReductionKind::StdDev),
    ("min", ReductionKind::Min),
    ("median", ReductionKind::Median),
    ("max", ReductionKind::Max),
    ("sum", ReductionKind::Sum),
];

/// One summary row per column
///
/// Every column reports its type and non-null count; numeric columns also get
/// mean, stddev, min, median, max and sum over their non-null cells.
pub fn describe(table: &Table) -> Result<Table> {
    let mut columns = vec![
        Column::new("column", ColumnType::Text),
        Column::new("type", ColumnType::Text),
        Column::new("non_null", ColumnType::Integer),
    ];
    columns.extend(
        STATISTICS
            .iter()
            .map(|(name, _)| Column::new(*name, ColumnType::Real)),
    );

    let rows = table
        .schema()
        .columns()
        .iter()
        .map(|column| {
            let cells = table.column(&column.name)?;
            let non_null = cells.iter().filter(|v| !v.is_null()).count();

            let mut values = vec![
                Value::Text(column.name.clone()),
                Value::Text(column.ty.to_string()),
                Value::Integer(non_null as i64),
            ];
            if column.ty.is_numeric() {
                let numbers: Vec<f64> = cells.iter().filter_map(|v| v.as_f64()).collect();
                values.extend(
                    STATISTICS
                        .iter()
                        .map(|(_, kind)| kind.reduce(&numbers, numbers.len())),
                );
            } else {
                values.extend(STATISTICS.iter().map(|_| Value::Null));
            }
            Ok(Row::new(values))
        })
        .collect::<Result<Vec<_>>>()?;

    Table::new(Schema::new(columns)?, rows)
}
