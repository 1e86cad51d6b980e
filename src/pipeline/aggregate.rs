//! Grouped aggregation
//!
//! Rows are partitioned by the tuple of group-by values, keeping the order in
//! which each distinct key first appears. Reductions skip null cells, except
//! `count`, which counts every row of the group. The result is an ordinary
//! [`Table`] with the key columns followed by one column per reduction.

use super::sorter::{compare_values, NullPosition, SortOrder};
use crate::error::{ErrorCode, PipelineError, Result};
use crate::table::{Column, ColumnType, Row, Schema, Table, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

/// Reduction applied to one source column within each group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionKind {
    Count,
    Sum,
    Mean,
    #[serde(rename = "stddev", alias = "sd")]
    StdDev,
    #[serde(alias = "var")]
    Variance,
    Min,
    Max,
    Median,
}

impl ReductionKind {
    /// Reduce the non-null values of a group
    ///
    /// `rows` is the group size, used only by `Count`. Sample statistics use
    /// n - 1 and are null for fewer than two values.
    pub fn reduce(self, values: &[f64], rows: usize) -> Value {
        match self {
            ReductionKind::Count => Value::Integer(rows as i64),
            ReductionKind::Sum => Value::Real(values.iter().sum()),
            ReductionKind::Mean => mean(values).into(),
            ReductionKind::Variance => variance(values).into(),
            ReductionKind::StdDev => variance(values).map(f64::sqrt).into(),
            ReductionKind::Min => values.iter().copied().reduce(f64::min).into(),
            ReductionKind::Max => values.iter().copied().reduce(f64::max).into(),
            ReductionKind::Median => median(values).into(),
        }
    }

    fn output_type(self) -> ColumnType {
        match self {
            ReductionKind::Count => ColumnType::Integer,
            _ => ColumnType::Real,
        }
    }
}

impl fmt::Display for ReductionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReductionKind::Count => "count",
            ReductionKind::Sum => "sum",
            ReductionKind::Mean => "mean",
            ReductionKind::StdDev => "stddev",
            ReductionKind::Variance => "variance",
            ReductionKind::Min => "min",
            ReductionKind::Max => "max",
            ReductionKind::Median => "median",
        };
        f.write_str(name)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// One output column of an aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reduction {
    /// Name of the result column
    pub name: String,
    /// Column reduced; optional for `count`
    #[serde(default, rename = "column")]
    pub source: Option<String>,
    pub kind: ReductionKind,
}

impl Reduction {
    pub fn new(name: impl Into<String>, source: impl Into<String>, kind: ReductionKind) -> Self {
        Self {
            name: name.into(),
            source: Some(source.into()),
            kind,
        }
    }

    pub fn count(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            kind: ReductionKind::Count,
        }
    }
}

/// Reorder groups by one output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortByResult {
    /// A reduction or share column name
    pub by: String,
    #[serde(default)]
    pub order: SortOrder,
}

/// A grouped aggregation over one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Name of the result, used for reports and export file names
    pub name: String,
    pub group_by: Vec<String>,
    #[serde(default)]
    pub reductions: Vec<Reduction>,
    /// Optional stable reorder by a result column
    #[serde(default)]
    pub sort: Option<SortByResult>,
    /// Column name for the within-outer-group percentage of each group's count
    #[serde(default)]
    pub share: Option<String>,
    /// Order groups by key values instead of first occurrence
    #[serde(default)]
    pub order_keys: bool,
    /// Keep only the first n groups after sorting
    #[serde(default)]
    pub top: Option<usize>,
}

impl Aggregation {
    pub fn new<I, S>(name: impl Into<String>, group_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            group_by: group_by.into_iter().map(Into::into).collect(),
            reductions: Vec::new(),
            sort: None,
            share: None,
            order_keys: false,
            top: None,
        }
    }

    pub fn reduce(mut self, reduction: Reduction) -> Self {
        self.reductions.push(reduction);
        self
    }

    pub fn sort_by(mut self, by: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(SortByResult {
            by: by.into(),
            order,
        });
        self
    }

    pub fn with_share(mut self, name: impl Into<String>) -> Self {
        self.share = Some(name.into());
        self
    }

    pub fn order_keys(mut self) -> Self {
        self.order_keys = true;
        self
    }

    pub fn top(mut self, n: usize) -> Self {
        self.top = Some(n);
        self
    }

    /// Structural checks that need no data
    pub fn validate(&self) -> Result<()> {
        if self.group_by.is_empty() {
            return Err(PipelineError::invalid_rule(
                ErrorCode::AGGREGATE_EMPTY_GROUP_BY,
                format!("aggregation '{}' has an empty group-by list", self.name),
            ));
        }
        if self.share.is_some() && self.group_by.len() < 2 {
            return Err(PipelineError::invalid_rule(
                ErrorCode::AGGREGATE_SHARE_NEEDS_TWO_LEVELS,
                format!(
                    "aggregation '{}' requests a within-group share but groups by a single column",
                    self.name
                ),
            ));
        }
        if let Some(sort) = &self.sort {
            let known = self
                .reductions
                .iter()
                .map(|r| r.name.as_str())
                .chain(self.share.as_deref())
                .chain(self.group_by.iter().map(String::as_str))
                .any(|name| name == sort.by);
            if !known {
                return Err(PipelineError::invalid_rule(
                    ErrorCode::AGGREGATE_UNKNOWN_SORT_KEY,
                    format!(
                        "aggregation '{}' sorts by '{}', which is not one of its columns",
                        self.name, sort.by
                    ),
                ));
            }
        }
        Ok(())
    }

    fn context(&self) -> String {
        format!("aggregation '{}'", self.name)
    }
}

/// Rows sharing one group-by key, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: Vec<Value>,
    pub rows: Vec<usize>,
}

/// Partition row indices by key, in first-occurrence order of keys
pub fn partition(table: &Table, group_by: &[String]) -> Result<Vec<Group>> {
    let key_idx = group_by
        .iter()
        .map(|name| table.schema().require(name))
        .collect::<Result<Vec<_>>>()?;

    let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for (r, row) in table.rows().iter().enumerate() {
        let key: Vec<Value> = key_idx.iter().map(|&i| row.values()[i].clone()).collect();
        match index.get(&key) {
            Some(&g) => groups[g].rows.push(r),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group { key, rows: vec![r] });
            }
        }
    }
    Ok(groups)
}

/// Run one aggregation, producing a new table
pub fn aggregate(table: &Table, spec: &Aggregation) -> Result<Table> {
    spec.validate()?;

    let schema = table.schema();
    let context = spec.context();
    for name in &spec.group_by {
        schema.require_for(name, ErrorCode::AGGREGATE_MISSING_COLUMN, &context)?;
    }

    let mut sources: Vec<Option<usize>> = Vec::with_capacity(spec.reductions.len());
    for reduction in &spec.reductions {
        let source = match &reduction.source {
            Some(name) => {
                let i = schema.require_for(name, ErrorCode::AGGREGATE_MISSING_COLUMN, &context)?;
                let ty = &schema.columns()[i].ty;
                if reduction.kind != ReductionKind::Count && !ty.is_numeric() {
                    return Err(PipelineError::invalid_rule(
                        ErrorCode::AGGREGATE_NON_NUMERIC,
                        format!(
                            "{} of '{}' in {} needs a numeric column, found {}",
                            reduction.kind, name, context, ty
                        ),
                    ));
                }
                Some(i)
            }
            None if reduction.kind == ReductionKind::Count => None,
            None => {
                return Err(PipelineError::invalid_rule(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("{} '{}' in {} has no source column", reduction.kind, reduction.name, context),
                ))
            }
        };
        sources.push(source);
    }

    let groups = partition(table, &spec.group_by)?;
    debug!(
        "Aggregation '{}': {} rows into {} groups",
        spec.name,
        table.len(),
        groups.len()
    );

    let mut columns: Vec<Column> = spec
        .group_by
        .iter()
        .filter_map(|name| schema.column(name).cloned())
        .collect();
    columns.extend(
        spec.reductions
            .iter()
            .map(|r| Column::new(&r.name, r.kind.output_type())),
    );
    if let Some(share) = &spec.share {
        columns.push(Column::new(share, ColumnType::Real));
    }
    let out_schema = Schema::new(columns)?;

    let mut records: Vec<Vec<Value>> = groups
        .iter()
        .map(|group| {
            let mut values = group.key.clone();
            for (reduction, source) in spec.reductions.iter().zip(&sources) {
                let cells: Vec<f64> = match source {
                    Some(i) => group
                        .rows
                        .iter()
                        .filter_map(|&r| table.rows()[r].values()[*i].as_f64())
                        .collect(),
                    None => Vec::new(),
                };
                values.push(reduction.kind.reduce(&cells, group.rows.len()));
            }
            values
        })
        .collect();

    if spec.share.is_some() {
        append_share(&groups, &mut records);
    }

    if spec.order_keys {
        let key_types: Vec<&ColumnType> = out_schema.columns()[..spec.group_by.len()]
            .iter()
            .map(|c| &c.ty)
            .collect();
        records.sort_by(|a, b| {
            key_types
                .iter()
                .enumerate()
                .map(|(i, ty)| {
                    compare_values(ty, &a[i], &b[i], SortOrder::Ascending, NullPosition::Last)
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    if let Some(sort) = &spec.sort {
        let i = out_schema.require(&sort.by)?;
        let ty = out_schema.columns()[i].ty.clone();
        trace!("Sorting '{}' by {} {:?}", spec.name, sort.by, sort.order);
        records.sort_by(|a, b| compare_values(&ty, &a[i], &b[i], sort.order, NullPosition::Last));
    }

    if let Some(n) = spec.top {
        records.truncate(n);
    }

    Table::new(out_schema, records.into_iter().map(Row::new).collect())
}

/// Percentage of each group's count within its outer group
///
/// The outer key is every group-by value but the last.
fn append_share(groups: &[Group], records: &mut [Vec<Value>]) {
    let outer = |group: &Group| group.key[..group.key.len() - 1].to_vec();

    let mut totals: HashMap<Vec<Value>, usize> = HashMap::new();
    for group in groups {
        *totals.entry(outer(group)).or_default() += group.rows.len();
    }

    for (group, record) in groups.iter().zip(records.iter_mut()) {
        let total = totals.get(&outer(group)).copied().unwrap_or(0);
        let share = if total == 0 {
            Value::Null
        } else {
            Value::Real(group.rows.len() as f64 / total as f64 * 100.0)
        };
        record.push(share);
    }
}

/// Run every aggregation against the same table
pub fn aggregate_all(table: &Table, specs: &[Aggregation]) -> Result<Vec<(String, Table)>> {
    specs
        .iter()
        .map(|spec| aggregate(table, spec).map(|t| (spec.name.clone(), t)))
        .collect()
}
