//! Row filter expressions
//!
//! A small predicate language for `RowFilter` rules:
//! comparisons (`Salary > 0`, `Department == 'IT'`, `Join_Date >= '2020-01-01'`),
//! logical operators (`&&`/`AND`, `||`/`OR`, `!`/`NOT`) with parentheses,
//! membership (`Gender in ['F', 'M']`) and the functions `is_null(col)`,
//! `is_not_null(col)` and `matches(col, 'regex')`.
//!
//! A comparison against a null cell is false unless the literal is `null`.

use crate::error::{ErrorCode, PipelineError, Result};
use crate::table::{ColumnType, RowRef, Schema, Value, DEFAULT_DATE_FORMAT};
use chrono::NaiveDate;
use regex::Regex;
use std::cmp::Ordering;

/// A literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// Filter expression AST
#[derive(Debug, Clone)]
pub enum FilterExpression {
    /// Comparison expression
    Comparison {
        field: String,
        op: ComparisonOp,
        value: Literal,
    },
    /// Logical expression
    Logical {
        op: LogicalOp,
        operands: Vec<FilterExpression>,
    },
    /// Null test
    IsNull { field: String, negated: bool },
    /// Regex match against the cell's text
    Matches { field: String, pattern: Regex },
    /// Membership test
    In { field: String, values: Vec<Literal> },
}

impl FilterExpression {
    /// Parse a filter expression string
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(invalid("empty filter expression"));
        }

        // Try parsing in order of precedence
        Self::try_strip_outer_parens(expr)
            .or_else(|| Self::try_parse_or_operator(expr))
            .or_else(|| Self::try_parse_and_operator(expr))
            .or_else(|| Self::try_parse_not_operator(expr))
            .or_else(|| Self::try_parse_in_operator(expr))
            .or_else(|| Self::try_parse_function(expr))
            .or_else(|| Self::try_parse_comparison(expr))
            .unwrap_or_else(|| Err(invalid(format!("Invalid filter expression: {}", expr))))
    }

    /// Column names this expression reads
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FilterExpression::Comparison { field, .. }
            | FilterExpression::IsNull { field, .. }
            | FilterExpression::Matches { field, .. }
            | FilterExpression::In { field, .. } => {
                if !out.contains(&field.as_str()) {
                    out.push(field);
                }
            }
            FilterExpression::Logical { operands, .. } => {
                for operand in operands {
                    operand.collect_columns(out);
                }
            }
        }
    }

    /// Check that every referenced column exists in `schema`
    pub fn check_columns(&self, schema: &Schema) -> Result<()> {
        for column in self.columns() {
            schema.require(column)?;
        }
        Ok(())
    }

    /// Evaluate the expression against one row
    pub fn evaluate(&self, row: &RowRef<'_>) -> bool {
        match self {
            FilterExpression::Comparison { field, op, value } => {
                match (row.get(field), row.column_type(field)) {
                    (Some(cell), Some(ty)) => compare(cell, ty, *op, value),
                    _ => false,
                }
            }
            FilterExpression::Logical { op, operands } => match op {
                LogicalOp::And => operands.iter().all(|expr| expr.evaluate(row)),
                LogicalOp::Or => operands.iter().any(|expr| expr.evaluate(row)),
                LogicalOp::Not => !operands.first().is_some_and(|expr| expr.evaluate(row)),
            },
            FilterExpression::IsNull { field, negated } => {
                let is_null = row.get(field).is_none_or(Value::is_null);
                is_null != *negated
            }
            FilterExpression::Matches { field, pattern } => row
                .get(field)
                .filter(|cell| !cell.is_null())
                .is_some_and(|cell| pattern.is_match(&cell.to_string())),
            FilterExpression::In { field, values } => {
                match (row.get(field), row.column_type(field)) {
                    (Some(cell), Some(ty)) => values
                        .iter()
                        .any(|v| compare(cell, ty, ComparisonOp::Equal, v)),
                    _ => false,
                }
            }
        }
    }

    /// Check if outer parentheses wrap the entire expression and strip them
    fn try_strip_outer_parens(expr: &str) -> Option<Result<Self>> {
        if !Self::has_outer_parens(expr) || !Self::outer_parens_wrap_entire_expr(expr) {
            return None;
        }
        Some(Self::parse(&expr[1..expr.len() - 1]))
    }

    fn has_outer_parens(expr: &str) -> bool {
        expr.starts_with('(') && expr.ends_with(')')
    }

    fn outer_parens_wrap_entire_expr(expr: &str) -> bool {
        let mut depth = 0i32;
        let last = expr.len() - 1;

        for (i, ch) in expr.char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 && i < last {
                        return false;
                    }
                }
                _ => {}
            }
        }

        depth == 0
    }

    fn try_parse_not_operator(expr: &str) -> Option<Result<Self>> {
        let inner = if let Some(stripped) = expr.strip_prefix('!') {
            stripped
        } else if expr.len() > 4 && expr.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("NOT ")) {
            &expr[4..]
        } else {
            return None;
        };

        Some(Self::parse(inner).map(|inner| FilterExpression::Logical {
            op: LogicalOp::Not,
            operands: vec![inner],
        }))
    }

    /// Try to parse an OR logical operator (supports both || and OR)
    fn try_parse_or_operator(expr: &str) -> Option<Result<Self>> {
        Self::find_symbol_operator(expr, "||")
            .map(|pos| Self::parse_binary_logical(expr, pos, 2, LogicalOp::Or))
            .or_else(|| {
                Self::find_word_operator(expr, "OR")
                    .map(|pos| Self::parse_binary_logical(expr, pos, 2, LogicalOp::Or))
            })
    }

    /// Try to parse an AND logical operator (supports both && and AND)
    fn try_parse_and_operator(expr: &str) -> Option<Result<Self>> {
        Self::find_symbol_operator(expr, "&&")
            .map(|pos| Self::parse_binary_logical(expr, pos, 2, LogicalOp::And))
            .or_else(|| {
                Self::find_word_operator(expr, "AND")
                    .map(|pos| Self::parse_binary_logical(expr, pos, 3, LogicalOp::And))
            })
    }

    /// Find an operator outside parentheses and quotes
    fn find_symbol_operator(expr: &str, op: &str) -> Option<usize> {
        Self::top_level_positions(expr).find(|&i| expr[i..].starts_with(op))
    }

    /// Find a word operator (OR, AND) surrounded by whitespace, outside parentheses and quotes
    fn find_word_operator(expr: &str, op: &str) -> Option<usize> {
        let bytes = expr.as_bytes();
        Self::top_level_positions(expr).find(|&i| {
            let end = i + op.len();
            end < bytes.len()
                && i > 0
                && bytes[i - 1].is_ascii_whitespace()
                && bytes[end].is_ascii_whitespace()
                && expr.get(i..end).is_some_and(|word| word.eq_ignore_ascii_case(op))
        })
    }

    /// Byte offsets that sit outside any parentheses or quoted string
    fn top_level_positions(expr: &str) -> impl Iterator<Item = usize> + '_ {
        let mut depth = 0i32;
        let mut quote: Option<char> = None;
        expr.char_indices().filter_map(move |(i, ch)| {
            match (quote, ch) {
                (Some(q), c) if c == q => {
                    quote = None;
                    return None;
                }
                (Some(_), _) => return None,
                (None, '\'' | '"') => {
                    quote = Some(ch);
                    return None;
                }
                (None, '(') => depth += 1,
                (None, ')') => depth -= 1,
                _ => {}
            }
            (depth == 0).then_some(i)
        })
    }

    /// Split on `sep` wherever it sits outside parentheses and quotes
    fn split_top_level(expr: &str, sep: char) -> Vec<&str> {
        let mut parts = Vec::new();
        let mut start = 0;
        for i in Self::top_level_positions(expr).filter(|&i| expr[i..].starts_with(sep)) {
            parts.push(&expr[start..i]);
            start = i + sep.len_utf8();
        }
        parts.push(&expr[start..]);
        parts
    }

    fn parse_binary_logical(expr: &str, pos: usize, op_len: usize, op: LogicalOp) -> Result<Self> {
        let left = Self::parse(&expr[..pos])?;
        let right = Self::parse(&expr[pos + op_len..])?;

        Ok(FilterExpression::Logical {
            op,
            operands: vec![left, right],
        })
    }

    /// Try to parse an 'in' operator expression
    fn try_parse_in_operator(expr: &str) -> Option<Result<Self>> {
        Self::find_word_operator(expr, "in").map(|pos| {
            let field = expr[..pos].trim().to_string();
            let values = Self::parse_array_values(expr[pos + 2..].trim())?;
            Ok(FilterExpression::In { field, values })
        })
    }

    /// Parse an array of values from a string like "['value1', 'value2']"
    fn parse_array_values(values_str: &str) -> Result<Vec<Literal>> {
        let inner = values_str
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| invalid("Invalid 'in' expression format: expected array"))?;

        if inner.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(Self::split_top_level(inner, ',')
            .into_iter()
            .map(Self::parse_literal)
            .collect())
    }

    /// Try to parse a function call expression
    fn try_parse_function(expr: &str) -> Option<Result<Self>> {
        let open = expr.find('(')?;
        if !expr.ends_with(')') {
            return None;
        }
        let name = expr[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return None;
        }
        let args: Vec<&str> = Self::split_top_level(&expr[open + 1..expr.len() - 1], ',')
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        Some(Self::build_function(name, &args))
    }

    fn build_function(name: &str, args: &[&str]) -> Result<Self> {
        match (name, args) {
            ("is_null", [field]) => Ok(FilterExpression::IsNull {
                field: field.to_string(),
                negated: false,
            }),
            ("is_not_null", [field]) => Ok(FilterExpression::IsNull {
                field: field.to_string(),
                negated: true,
            }),
            ("matches", [field, pattern]) => {
                let pattern = match Self::parse_literal(pattern) {
                    Literal::Text(p) => p,
                    other => return Err(invalid(format!("matches() needs a string pattern, got {:?}", other))),
                };
                let pattern = Regex::new(&pattern).map_err(|e| {
                    invalid(format!("Invalid regex '{}'", pattern)).with_source(e)
                })?;
                Ok(FilterExpression::Matches {
                    field: field.to_string(),
                    pattern,
                })
            }
            _ => Err(invalid(format!(
                "Unknown function {}() with {} argument(s)",
                name,
                args.len()
            ))),
        }
    }

    /// Try to parse a comparison expression
    fn try_parse_comparison(expr: &str) -> Option<Result<Self>> {
        let (op_str, pos) = ["==", "!=", ">=", "<=", ">", "<", "="]
            .iter()
            .find_map(|&op| Self::find_symbol_operator(expr, op).map(|pos| (op, pos)))?;

        let field = expr[..pos].trim().to_string();
        if field.is_empty() {
            return Some(Err(invalid(format!("Missing column in '{}'", expr))));
        }
        let rhs = expr[pos + op_str.len()..].trim();
        if rhs.is_empty() {
            return Some(Err(invalid(format!("Missing value in '{}'", expr))));
        }
        let value = Self::parse_literal(rhs);
        let op = match op_str {
            "==" | "=" => ComparisonOp::Equal,
            "!=" => ComparisonOp::NotEqual,
            ">" => ComparisonOp::Greater,
            "<" => ComparisonOp::Less,
            ">=" => ComparisonOp::GreaterEqual,
            _ => ComparisonOp::LessEqual,
        };

        Some(Ok(FilterExpression::Comparison { field, op, value }))
    }

    /// Parse a literal: quoted string, boolean, null, number, or bare word
    fn parse_literal(s: &str) -> Literal {
        let s = s.trim();
        if Self::is_quoted(s) {
            return Literal::Text(s[1..s.len() - 1].to_string());
        }
        match s {
            "true" => Literal::Bool(true),
            "false" => Literal::Bool(false),
            "null" | "NA" => Literal::Null,
            _ => s
                .parse::<f64>()
                .map(Literal::Number)
                .unwrap_or_else(|_| Literal::Text(s.to_string())),
        }
    }

    fn is_quoted(s: &str) -> bool {
        s.len() >= 2
            && ((s.starts_with('"') && s.ends_with('"'))
                || (s.starts_with('\'') && s.ends_with('\'')))
    }
}

fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::invalid_rule(ErrorCode::CLEAN_INVALID_FILTER, message)
}

/// Compare a cell with a literal
fn compare(cell: &Value, ty: &ColumnType, op: ComparisonOp, literal: &Literal) -> bool {
    if let Literal::Null = literal {
        return match op {
            ComparisonOp::Equal => cell.is_null(),
            ComparisonOp::NotEqual => !cell.is_null(),
            _ => false,
        };
    }
    if cell.is_null() {
        return false;
    }

    let ordering = match (cell, literal) {
        (Value::Integer(_) | Value::Real(_), Literal::Number(n)) => {
            cell.as_f64().and_then(|v| v.partial_cmp(n))
        }
        (Value::Date(d), Literal::Text(s)) => NaiveDate::parse_from_str(s, DEFAULT_DATE_FORMAT)
            .ok()
            .map(|other| d.cmp(&other)),
        (Value::Category(label), Literal::Text(s)) => {
            if matches!(op, ComparisonOp::Equal | ComparisonOp::NotEqual) {
                Some(label.as_str().cmp(s.as_str()))
            } else {
                ty.rank(label)
                    .zip(ty.rank(s))
                    .map(|(a, b)| a.cmp(&b))
            }
        }
        (Value::Text(a), Literal::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Text(a) | Value::Category(a), Literal::Bool(b)) => {
            Some(a.to_ascii_lowercase().as_str().cmp(if *b { "true" } else { "false" }))
        }
        (Value::Text(a) | Value::Category(a), Literal::Number(n)) => {
            a.parse::<f64>().ok().and_then(|v| v.partial_cmp(n))
        }
        _ => None,
    };

    match ordering {
        Some(ord) => match op {
            ComparisonOp::Equal => ord == Ordering::Equal,
            ComparisonOp::NotEqual => ord != Ordering::Equal,
            ComparisonOp::Greater => ord == Ordering::Greater,
            ComparisonOp::Less => ord == Ordering::Less,
            ComparisonOp::GreaterEqual => ord != Ordering::Less,
            ComparisonOp::LessEqual => ord != Ordering::Greater,
        },
        // Incomparable values only satisfy inequality
        None => op == ComparisonOp::NotEqual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("Salary", ColumnType::Real),
            Column::new("Department", ColumnType::Text),
            Column::new("Performance_Score", ColumnType::ordered(["Low", "Medium", "High"])),
            Column::new("Join_Date", ColumnType::Date),
        ])
        .unwrap()
    }

    fn row(salary: Option<f64>, dept: &str, score: &str, joined: (i32, u32, u32)) -> Vec<Value> {
        vec![
            salary.into(),
            Value::Text(dept.into()),
            Value::Category(score.into()),
            Value::Date(NaiveDate::from_ymd_opt(joined.0, joined.1, joined.2).unwrap()),
        ]
    }

    fn eval(expr: &str, values: &[Value]) -> bool {
        let schema = schema();
        FilterExpression::parse(expr)
            .unwrap()
            .evaluate(&RowRef::new(&schema, values))
    }

    #[test]
    fn test_numeric_comparisons() {
        let r = row(Some(-461.43), "HR", "Low", (2020, 1, 1));
        assert!(!eval("Salary > 0", &r));
        assert!(eval("Salary < 0", &r));
        assert!(eval("Salary != 0", &r));

        let r = row(Some(0.0), "HR", "Low", (2020, 1, 1));
        assert!(!eval("Salary > 0", &r));
        assert!(eval("Salary >= 0", &r));
    }

    #[test]
    fn test_null_cells_fail_comparisons() {
        let r = row(None, "HR", "Low", (2020, 1, 1));
        assert!(!eval("Salary > 0", &r));
        assert!(!eval("Salary <= 0", &r));
        assert!(eval("Salary == null", &r));
        assert!(eval("is_null(Salary)", &r));
        assert!(!eval("is_not_null(Salary)", &r));
    }

    #[test]
    fn test_ordered_categorical_uses_rank() {
        let r = row(Some(1.0), "IT", "Medium", (2020, 1, 1));
        assert!(eval("Performance_Score >= 'Medium'", &r));
        assert!(eval("Performance_Score < 'High'", &r));
        assert!(!eval("Performance_Score > 'Medium'", &r));
        assert!(eval("Performance_Score == 'Medium'", &r));
    }

    #[test]
    fn test_dates_logical_and_membership() {
        let r = row(Some(50000.0), "IT", "High", (2019, 6, 1));
        assert!(eval("Join_Date < '2020-01-01'", &r));
        assert!(eval("Department == 'IT' && Salary > 40000", &r));
        assert!(eval("Department == 'Sales' OR Salary > 40000", &r));
        assert!(eval("NOT (Department == 'Sales')", &r));
        assert!(eval("!(Department in ['HR', 'Sales'])", &r));
        assert!(eval("Department in ['IT', 'Sales']", &r));
        assert!(eval("matches(Department, '^I')", &r));
    }

    #[test]
    fn test_operators_inside_quotes_are_literal() {
        let schema = Schema::new(vec![Column::new("Name", ColumnType::Text)]).unwrap();
        let values = vec![Value::Text("R&&D".into())];
        let expr = FilterExpression::parse("Name == 'R&&D'").unwrap();
        assert!(expr.evaluate(&RowRef::new(&schema, &values)));
    }

    #[test]
    fn test_non_ascii_column_names() {
        let schema = Schema::new(vec![Column::new("名前", ColumnType::Text)]).unwrap();
        let values = vec![Value::Text("x".into())];
        let row = RowRef::new(&schema, &values);

        let expr = FilterExpression::parse("名前 == 'x'").unwrap();
        assert_eq!(expr.columns(), vec!["名前"]);
        assert!(expr.evaluate(&row));
        assert!(!FilterExpression::parse("NOT 名前 == 'x'").unwrap().evaluate(&row));
        assert!(FilterExpression::parse("名前 in ['x', 'y']").unwrap().evaluate(&row));
        assert!(FilterExpression::parse("ñ").is_err());
    }

    #[test]
    fn test_commas_inside_quoted_values() {
        let schema = Schema::new(vec![Column::new("Department", ColumnType::Text)]).unwrap();
        let values = vec![Value::Text("R, D".into())];
        let row = RowRef::new(&schema, &values);

        let expr = FilterExpression::parse("Department in ['R, D', 'IT']").unwrap();
        match &expr {
            FilterExpression::In { values, .. } => assert_eq!(
                values,
                &vec![Literal::Text("R, D".into()), Literal::Text("IT".into())]
            ),
            other => panic!("expected membership test, got {:?}", other),
        }
        assert!(expr.evaluate(&row));
        assert!(FilterExpression::parse("matches(Department, '^R, ?D$')").unwrap().evaluate(&row));
    }

    #[test]
    fn test_columns_and_check() {
        let expr = FilterExpression::parse("Salary > 0 && (Department == 'IT' || Bonus > 1)").unwrap();
        assert_eq!(expr.columns(), vec!["Salary", "Department", "Bonus"]);
        let err = expr.check_columns(&schema()).unwrap_err();
        assert_eq!(err.kind(), "UnknownColumnError");
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(FilterExpression::parse("").is_err());
        assert!(FilterExpression::parse("Salary").is_err());
        assert!(FilterExpression::parse("Salary >").is_err());
        assert!(FilterExpression::parse("frobnicate(Salary)").is_err());
        assert!(FilterExpression::parse("matches(Name, '[')").is_err());
        assert!(FilterExpression::parse("Gender in 'F'").is_err());
    }
}
