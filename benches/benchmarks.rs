//! Benchmarks for jla pipeline performance tracking.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use indexmap::IndexMap;

use jla::error::Result;
use jla::expr::FilterExpr;
use jla::group::aggregate::AggSpec;
use jla::ops::select::EvalPolicy;
use jla::ops::{collect, from_vec, Relation};
use jla::path::Path;
use jla::pipeline::{Operator, Pipeline};
use jla::value::{Record, Value};

const ROW_COUNT: i64 = 20_000;

fn make_records(n: i64) -> Vec<Record> {
    (0..n)
        .map(|i| {
            let mut r: Record = IndexMap::new();
            r.insert("id".to_string(), Value::Int(i));
            r.insert("region".to_string(), Value::String(if i % 2 == 0 { "N".to_string() } else { "S".to_string() }));
            r.insert("amount".to_string(), Value::Int(i % 100));
            r
        })
        .collect()
}

fn run(pipeline: Pipeline, input: Relation) -> Result<usize> {
    Ok(collect(pipeline.run(input)?)?.len())
}

fn select_filter(c: &mut Criterion) {
    let records = make_records(ROW_COUNT);
    let expr = FilterExpr::compile("amount > 50").unwrap();
    c.bench_function("select_filter", |b| {
        b.iter(|| {
            let pipeline = Pipeline::new().then(Operator::select_filter(&expr, EvalPolicy::Strict));
            let input = from_vec(black_box(records.clone()));
            run(pipeline, input).unwrap();
        });
    });
}

fn distinct(c: &mut Criterion) {
    let records = make_records(ROW_COUNT);
    c.bench_function("distinct", |b| {
        b.iter(|| {
            let pipeline = Pipeline::new().then(Operator::Distinct);
            let input = from_vec(black_box(records.clone()));
            run(pipeline, input).unwrap();
        });
    });
}

fn sort_by_amount(c: &mut Criterion) {
    let records = make_records(ROW_COUNT);
    c.bench_function("sort_by_amount", |b| {
        b.iter(|| {
            let pipeline = Pipeline::new().then(Operator::Sort { keys: vec![Path::parse("amount")], desc: false });
            let input = from_vec(black_box(records.clone()));
            run(pipeline, input).unwrap();
        });
    });
}

fn group_by_and_aggregate(c: &mut Criterion) {
    let records = make_records(ROW_COUNT);
    c.bench_function("group_by_and_aggregate", |b| {
        b.iter(|| {
            let specs = vec![
                AggSpec {
                    output_name: "total".to_string(),
                    agg_fn: "sum".to_string(),
                    path: Some(Path::parse("amount")),
                },
                AggSpec { output_name: "count".to_string(), agg_fn: "count".to_string(), path: None },
            ];
            let pipeline = Pipeline::new()
                .then(Operator::GroupBy { keys: vec![Path::parse("region")] })
                .then(Operator::Aggregate { specs });
            let input = from_vec(black_box(records.clone()));
            run(pipeline, input).unwrap();
        });
    });
}

fn join_on_id(c: &mut Criterion) {
    let left = make_records(ROW_COUNT);
    let right = make_records(ROW_COUNT);
    c.bench_function("join_on_id", |b| {
        b.iter(|| {
            let rhs = from_vec(black_box(right.clone()));
            let pipeline = Pipeline::new().then(Operator::Join {
                rhs,
                on: vec![(Path::parse("id"), Path::parse("id"))],
                mode: jla::ops::join::JoinMode::Inner,
            });
            let input = from_vec(black_box(left.clone()));
            run(pipeline, input).unwrap();
        });
    });
}

criterion_group!(benches, select_filter, distinct, sort_by_amount, group_by_and_aggregate, join_on_id);
criterion_main!(benches);
