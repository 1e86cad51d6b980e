//! Property tests for the pipeline stages
//!
//! Verifies stage laws over generated tables:
//! - Filtering keeps an order-preserving subset of rows
//! - Coercion is idempotent
//! - Partitioning and shares account for every row

use chrono::NaiveDate;
use proptest::prelude::*;
use tabclean::pipeline::{
    aggregate, clean, partition, Aggregation, CleanRule, CoerceTarget, Pipeline, Reduction,
    ReductionKind, SortOrder, Sorter,
};
use tabclean::table::{Column, ColumnType, Row, Schema, Table, Value};

const DEPARTMENTS: [&str; 3] = ["HR", "IT", "Sales"];
const LEVELS: [&str; 3] = ["Low", "Medium", "High"];

fn employees(rows: &[(usize, f64, usize)]) -> Table {
    let schema = Schema::new(vec![
        Column::new("ID", ColumnType::Integer),
        Column::new("Department", ColumnType::Text),
        Column::new("Salary", ColumnType::Real),
        Column::new("Performance_Score", ColumnType::Text),
    ])
    .unwrap();
    let rows = rows
        .iter()
        .enumerate()
        .map(|(i, &(dept, salary, level))| {
            Row::new(vec![
                Value::Integer(i as i64),
                Value::Text(DEPARTMENTS[dept].to_string()),
                Value::Real(salary),
                Value::Text(LEVELS[level].to_string()),
            ])
        })
        .collect();
    Table::new(schema, rows).unwrap()
}

fn employee_rows() -> impl Strategy<Value = Vec<(usize, f64, usize)>> {
    prop::collection::vec((0..3usize, -1000.0..100_000.0f64, 0..3usize), 0..40)
}

fn ids(table: &Table) -> Vec<i64> {
    table
        .column("ID")
        .unwrap()
        .into_iter()
        .map(|v| match v {
            Value::Integer(i) => *i,
            other => panic!("unexpected id {:?}", other),
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_filter_keeps_ordered_subset(rows in employee_rows(), threshold in -1000.0..100_000.0f64) {
        let table = employees(&rows);
        let rule = CleanRule::filter(&format!("Salary > {}", threshold)).unwrap();
        let filtered = clean(&table, &[rule]).unwrap();

        let expected: Vec<i64> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.1 > threshold)
            .map(|(i, _)| i as i64)
            .collect();
        prop_assert_eq!(ids(&filtered), expected);
        prop_assert_eq!(filtered.schema(), table.schema());
    }

    #[test]
    fn prop_coercion_is_idempotent(rows in employee_rows()) {
        let table = employees(&rows);
        let rules = [
            CleanRule::coerce("Department", CoerceTarget::categorical()),
            CleanRule::coerce("Performance_Score", CoerceTarget::ordered(LEVELS)),
            CleanRule::coerce("ID", CoerceTarget::Real),
        ];
        let once = clean(&table, &rules).unwrap();
        let twice = clean(&once, &rules).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_date_text_round_trips(days in 0i64..40_000) {
        let date = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap() + chrono::Duration::days(days);
        let text = date.format("%Y-%m-%d").to_string();

        let schema = Schema::new(vec![Column::new("Join_Date", ColumnType::Text)]).unwrap();
        let table = Table::new(schema, vec![Row::new(vec![Value::Text(text.clone())])]).unwrap();
        let coerced = clean(&table, &[CleanRule::coerce("Join_Date", CoerceTarget::date())]).unwrap();

        let cell = coerced.value(0, "Join_Date").unwrap();
        prop_assert_eq!(cell.as_date(), Some(date));
        prop_assert_eq!(cell.to_field(), text);
    }

    #[test]
    fn prop_ordered_sort_follows_rank(rows in employee_rows()) {
        let table = employees(&rows);
        let ordered = clean(
            &table,
            &[CleanRule::coerce("Performance_Score", CoerceTarget::ordered(LEVELS))],
        )
        .unwrap();
        let sorted = ordered
            .sort_by(&Sorter::by("Performance_Score", SortOrder::Ascending))
            .unwrap();

        let ty = ColumnType::ordered(LEVELS);
        let ranks: Vec<usize> = sorted
            .column("Performance_Score")
            .unwrap()
            .into_iter()
            .map(|v| ty.rank(&v.to_string()).unwrap())
            .collect();
        prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]));

        // Stable: ids within one level stay ascending
        for level in LEVELS {
            let level_ids: Vec<i64> = sorted
                .iter()
                .filter(|row| row.get("Performance_Score").map(Value::to_string).as_deref() == Some(level))
                .filter_map(|row| match row.get("ID") {
                    Some(Value::Integer(i)) => Some(*i),
                    _ => None,
                })
                .collect();
            prop_assert!(level_ids.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn prop_partition_covers_every_row(rows in employee_rows()) {
        let table = employees(&rows);
        let groups = partition(&table, &["Department".to_string()]).unwrap();

        let mut covered: Vec<usize> = groups.iter().flat_map(|g| g.rows.clone()).collect();
        covered.sort_unstable();
        prop_assert_eq!(covered, (0..table.len()).collect::<Vec<_>>());

        for (i, a) in groups.iter().enumerate() {
            prop_assert!(groups[i + 1..].iter().all(|b| b.key != a.key));
        }
    }

    #[test]
    fn prop_shares_sum_to_hundred(rows in employee_rows()) {
        let table = employees(&rows);
        let spec = Aggregation::new("mix", ["Department", "Performance_Score"])
            .reduce(Reduction::count("n"))
            .with_share("percentage");
        let result = aggregate(&table, &spec).unwrap();

        for dept in DEPARTMENTS {
            let total: f64 = result
                .iter()
                .filter(|row| row.get("Department").map(Value::to_string).as_deref() == Some(dept))
                .filter_map(|row| row.get("percentage").and_then(Value::as_f64))
                .sum();
            let present = rows.iter().any(|r| DEPARTMENTS[r.0] == dept);
            if present {
                prop_assert!((total - 100.0).abs() < 1e-9, "{} sums to {}", dept, total);
            } else {
                prop_assert_eq!(total, 0.0);
            }
        }
    }
}

#[test]
fn test_mean_salary_by_department() {
    let table = employees(&[(1, 50000.0, 0), (1, 70000.0, 1), (2, 40000.0, 2), (0, -461.43, 0)]);
    let pipeline = Pipeline::new()
        .with_clean_rule(CleanRule::filter("Salary > 0").unwrap())
        .with_aggregation(
            Aggregation::new("by_department", ["Department"])
                .reduce(Reduction::new("mean_salary", "Salary", ReductionKind::Mean))
                .reduce(Reduction::count("n"))
                .sort_by("mean_salary", SortOrder::Descending),
        );
    let output = pipeline
        .run(table, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        .unwrap();

    assert_eq!(output.cleaned.len(), 3);
    let result = output.aggregate("by_department").unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result.value(0, "Department"), Some(&Value::Text("IT".into())));
    assert_eq!(result.value(0, "mean_salary"), Some(&Value::Real(60000.0)));
    assert_eq!(result.value(0, "n"), Some(&Value::Integer(2)));
    assert_eq!(result.value(1, "Department"), Some(&Value::Text("Sales".into())));
}

#[test]
fn test_tenure_against_reference_date() {
    use tabclean::pipeline::DeriveRule;

    let schema = Schema::new(vec![Column::new("Join_Date", ColumnType::Text)]).unwrap();
    let table = Table::new(
        schema,
        vec![
            Row::new(vec![Value::Text("2020-01-01".into())]),
            Row::new(vec![Value::Null]),
        ],
    )
    .unwrap();
    let pipeline = Pipeline::new()
        .with_clean_rule(CleanRule::coerce("Join_Date", CoerceTarget::date()))
        .with_derivation(DeriveRule::Tenure {
            column: "Years_at_Company".into(),
            from: "Join_Date".into(),
        });
    let output = pipeline
        .run(table, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        .unwrap();

    let years = output.derived.value(0, "Years_at_Company").and_then(Value::as_f64).unwrap();
    assert!((years - 4.0).abs() < 0.01, "{}", years);
    assert_eq!(output.derived.value(1, "Years_at_Company"), Some(&Value::Null));
}
