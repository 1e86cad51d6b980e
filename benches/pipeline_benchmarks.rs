//! Performance benchmarks for the pipeline stages
//!
//! Measures row filtering, grouped aggregation and a full clean, derive and
//! aggregate run over synthetic employee tables of increasing size.

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use tabclean::pipeline::{
    aggregate, clean, Aggregation, CleanRule, CoerceTarget, DeriveRule, Pipeline, Reduction,
    ReductionKind, SortOrder,
};
use tabclean::table::{Column, ColumnType, Row, Schema, Table, Value};

fn synthetic_employees(size: usize) -> Table {
    let schema = Schema::new(vec![
        Column::new("ID", ColumnType::Integer),
        Column::new("Department", ColumnType::Text),
        Column::new("Gender", ColumnType::Text),
        Column::new("Salary", ColumnType::Real),
        Column::new("Join_Date", ColumnType::Text),
        Column::new("Experience_Years", ColumnType::Integer),
    ])
    .unwrap();
    let rows = (0..size)
        .map(|i| {
            Row::new(vec![
                Value::Integer(i as i64),
                Value::Text(["HR", "IT", "Sales", "Finance"][i % 4].to_string()),
                Value::Text(["F", "M"][i % 2].to_string()),
                Value::Real(if i % 17 == 0 { -100.0 } else { 30000.0 + (i % 500) as f64 * 97.0 }),
                Value::Text(format!("20{:02}-{:02}-15", 5 + i % 18, 1 + i % 12)),
                Value::Integer((i % 30) as i64),
            ])
        })
        .collect();
    Table::new(schema, rows).unwrap()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    for size in &[1000, 10000, 50000] {
        let table = synthetic_employees(*size);

        group.bench_with_input(BenchmarkId::new("numeric", size), &table, |b, table| {
            let rule = CleanRule::filter("Salary > 0").unwrap();
            b.iter(|| clean(black_box(table), std::slice::from_ref(&rule)).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("compound", size), &table, |b, table| {
            let rule = CleanRule::filter("Salary > 40000 && Department == 'IT'").unwrap();
            b.iter(|| clean(black_box(table), std::slice::from_ref(&rule)).unwrap());
        });
    }

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let spec = Aggregation::new("by_department", ["Department"])
        .reduce(Reduction::new("mean_salary", "Salary", ReductionKind::Mean))
        .reduce(Reduction::new("sd_salary", "Salary", ReductionKind::StdDev))
        .reduce(Reduction::count("n"))
        .sort_by("mean_salary", SortOrder::Descending);
    let share = Aggregation::new("mix", ["Department", "Gender"])
        .reduce(Reduction::count("n"))
        .with_share("percentage")
        .order_keys();

    for size in &[1000, 10000, 50000] {
        let table = synthetic_employees(*size);

        group.bench_with_input(BenchmarkId::new("mean_sd_count", size), &table, |b, table| {
            b.iter(|| aggregate(black_box(table), &spec).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("share", size), &table, |b, table| {
            b.iter(|| aggregate(black_box(table), &share).unwrap());
        });
    }

    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let table = synthetic_employees(10000);
    let reference = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let pipeline = Pipeline::new()
        .with_clean_rule(CleanRule::filter("Salary > 0").unwrap())
        .with_clean_rule(CleanRule::coerce("Join_Date", CoerceTarget::date()))
        .with_clean_rule(CleanRule::coerce("Department", CoerceTarget::categorical()))
        .with_derivation(DeriveRule::Tenure {
            column: "Years_at_Company".into(),
            from: "Join_Date".into(),
        })
        .with_derivation(DeriveRule::Bucket {
            column: "Experience_Level".into(),
            from: "Experience_Years".into(),
            threshold: 10.0,
            above: "Senior".into(),
            below: "Junior".into(),
        })
        .with_aggregation(
            Aggregation::new("tenure_by_level", ["Experience_Level"])
                .reduce(Reduction::new("mean_tenure", "Years_at_Company", ReductionKind::Mean))
                .order_keys(),
        );

    c.bench_function("full_run_10000", |b| {
        b.iter(|| pipeline.run(black_box(table.clone()), reference).unwrap());
    });
}

criterion_group!(benches, bench_filter, bench_aggregate, bench_full_run);

criterion_main!(benches);
