//! End-to-end pipeline scenarios exercising the operator core, the
//! grouping engine, and the expression sub-languages together.

use indexmap::IndexMap;

use jla::error::Result;
use jla::expr::FilterExpr;
use jla::group::aggregate::AggSpec;
use jla::ops::join::JoinMode;
use jla::ops::select::EvalPolicy;
use jla::ops::{collect, from_vec};
use jla::path::Path;
use jla::pipeline::{Operator, Pipeline};
use jla::value::{Record, Value};

fn record(pairs: Vec<(&str, Value)>) -> Record {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<IndexMap<_, _>>()
}

#[test]
fn filter_then_project() {
    let input = from_vec(vec![
        record(vec![("a", Value::Int(1)), ("b", Value::String("x".to_string()))]),
        record(vec![("a", Value::Int(2)), ("b", Value::String("y".to_string()))]),
        record(vec![("a", Value::Int(3)), ("b", Value::String("z".to_string()))]),
    ]);
    let filter = FilterExpr::compile("a > 1").unwrap();
    let pipeline = Pipeline::new()
        .then(Operator::select_filter(&filter, EvalPolicy::Strict))
        .then(Operator::Project {
            fields: jla::expr::parse_fields("b").unwrap(),
            absent: jla::ops::project::AbsentPolicy::Omit,
            shape: jla::ops::project::OutputShape::Flat,
        });
    let out = collect(pipeline.run(input).unwrap()).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["b"], Value::String("y".to_string()));
    assert_eq!(out[1]["b"], Value::String("z".to_string()));
}

fn user_record(id: i64, name: &str) -> Record {
    let mut inner = IndexMap::new();
    inner.insert("id".to_string(), Value::Int(id));
    record(vec![("u", Value::Object(inner)), ("name", Value::String(name.to_string()))])
}

fn order_record(cid: i64, x: i64) -> Record {
    record(vec![("cid", Value::Int(cid)), ("x", Value::Int(x))])
}

#[test]
fn equi_join_on_nested_path() {
    let left = from_vec(vec![user_record(1, "A"), user_record(2, "B")]);
    let right = from_vec(vec![order_record(1, 10), order_record(1, 20), order_record(3, 30)]);

    let pipeline = Pipeline::new().then(Operator::Join {
        rhs: right,
        on: vec![(Path::parse("u.id"), Path::parse("cid"))],
        mode: JoinMode::Inner,
    });
    let out = collect(pipeline.run(left).unwrap()).unwrap();
    assert_eq!(out.len(), 2);
    for row in &out {
        assert_eq!(row["name"], Value::String("A".to_string()));
    }
}

fn sale(region: &str, product: &str, amount: i64) -> Record {
    record(vec![
        ("region", Value::String(region.to_string())),
        ("product", Value::String(product.to_string())),
        ("amount", Value::Int(amount)),
    ])
}

#[test]
fn chained_group_by_then_aggregate() {
    let input = from_vec(vec![
        sale("N", "W", 10),
        sale("N", "W", 5),
        sale("N", "G", 7),
        sale("S", "W", 3),
    ]);
    let pipeline = Pipeline::new()
        .then(Operator::GroupBy { keys: vec![Path::parse("region")] })
        .then(Operator::GroupBy { keys: vec![Path::parse("product")] })
        .then(Operator::Aggregate {
            specs: vec![
                AggSpec { output_name: "total".to_string(), agg_fn: "sum".to_string(), path: Some(Path::parse("amount")) },
                AggSpec { output_name: "count".to_string(), agg_fn: "count".to_string(), path: None },
            ],
        });
    let out = collect(pipeline.run(input).unwrap()).unwrap();
    assert_eq!(out.len(), 3);

    let n_w = out.iter().find(|r| r["region"] == Value::String("N".to_string()) && r["product"] == Value::String("W".to_string())).unwrap();
    assert_eq!(n_w["total"], Value::Int(15));
    assert_eq!(n_w["count"], Value::Int(2));
}

#[test]
fn windowed_sort_is_per_window_not_global() {
    let values = [4, 2, 6, 1, 3, 5];
    let records: Vec<Record> = values.iter().map(|v| record(vec![("v", Value::Int(*v))])).collect();

    let mut out = Vec::new();
    for chunk in records.chunks(2) {
        let input = from_vec(chunk.to_vec());
        let pipeline = Pipeline::new().then(Operator::Sort { keys: vec![Path::parse("v")], desc: false });
        out.extend(collect(pipeline.run(input).unwrap()).unwrap());
    }

    let got: Vec<i64> = out
        .iter()
        .map(|r| match r["v"] {
            Value::Int(n) => n,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(got, vec![2, 4, 1, 6, 3, 5]);
}

#[test]
fn distinct_preserves_first_seen_order() {
    let input = from_vec(vec![
        record(vec![("k", Value::String("a".to_string()))]),
        record(vec![("k", Value::String("b".to_string()))]),
        record(vec![("k", Value::String("a".to_string()))]),
    ]);
    let pipeline = Pipeline::new().then(Operator::Distinct);
    let out = collect(pipeline.run(input).unwrap()).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["k"], Value::String("a".to_string()));
    assert_eq!(out[1]["k"], Value::String("b".to_string()));
}

#[test]
fn strict_mode_aborts_on_division_by_zero_lenient_drops_it() {
    let make_input = || from_vec(vec![record(vec![("x", Value::Int(2))]), record(vec![("x", Value::Int(0))]), record(vec![("x", Value::Int(5))])]);
    let expr = FilterExpr::compile("10 / x > 0").unwrap();

    let strict = Pipeline::new().then(Operator::select_filter(&expr, EvalPolicy::Strict));
    let strict_result: Result<Vec<Record>> = collect(strict.run(make_input()).unwrap());
    assert!(strict_result.is_err());

    let lenient = Pipeline::new().then(Operator::select_filter(&expr, EvalPolicy::Lenient));
    let lenient_result = collect(lenient.run(make_input()).unwrap()).unwrap();
    assert_eq!(lenient_result.len(), 2);
}
