//! `aggregate(spec)`: consumes group-annotated records
//! and emits one record per innermost group. New aggregators register
//! explicitly rather than through implicit discovery: a small
//! `Aggregator` trait plus a
//! `HashMap<String, Box<dyn Fn() -> Box<dyn Aggregator>>>` factory
//! table, with a fixed set of built-ins registered by default.

use std::collections::HashMap;

use super::{assert_consistent_group_metadata, group_field_sequence};
use crate::error::Result;
use crate::path::{get_path_in_record, Path};
use crate::value::{Record, Value};

/// One running aggregation over a single group's values at a path.
pub trait Aggregator {
    fn collect(&mut self, value: Option<&Value>);
    fn finalize(self: Box<Self>) -> Value;
}

/// One entry of an `aggregate(spec)` call: `output_name = agg_fn(path)`.
/// `path` is `None` for the zero-arg `count` aggregator.
pub struct AggSpec {
    pub output_name: String,
    pub agg_fn: String,
    pub path: Option<Path>,
}

type Factory = Box<dyn Fn() -> Box<dyn Aggregator>>;

/// Registration table of aggregator factories, keyed by function name.
pub struct AggregateRegistry {
    factories: HashMap<String, Factory>,
}

impl AggregateRegistry {
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self { factories: HashMap::new() };
        registry.register("count", || Box::new(Count::default()));
        registry.register("sum", || Box::new(Sum::default()));
        registry.register("avg", || Box::new(Avg::default()));
        registry.register("min", || Box::new(MinMax::new(true)));
        registry.register("max", || Box::new(MinMax::new(false)));
        registry.register("list", || Box::new(ListAgg::default()));
        registry.register("first", || Box::new(FirstLast::new(true)));
        registry.register("last", || Box::new(FirstLast::new(false)));
        registry.register("unique", || Box::new(UniqueAgg::default()));
        registry.register("median", || Box::new(Median::default()));
        registry.register("mode", || Box::new(Mode::default()));
        registry.register("std", || Box::new(Std::default()));
        registry.register("concat", || Box::new(Concat::default()));
        registry
    }

    pub fn register(&mut self, name: &str, factory: impl Fn() -> Box<dyn Aggregator> + 'static) {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    #[must_use]
    pub fn build(&self, name: &str) -> Option<Box<dyn Aggregator>> {
        self.factories.get(name).map(|f| f())
    }
}

/// Run `aggregate(spec)` over a materialized slice of group-annotated
/// records.
///
/// # Errors
/// Returns `Error::Pipeline` if the records carry inconsistent
/// `_groups` metadata, or `Error::Usage` for an unknown aggregator name.
pub fn aggregate(records: Vec<Record>, specs: &[AggSpec], registry: &AggregateRegistry) -> Result<Vec<Record>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let group_fields = assert_consistent_group_metadata(&records)?;
    let no_grouping = group_fields.is_empty();

    let mut bucket_order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<Record>> = HashMap::new();
    let mut key_fields: HashMap<String, Vec<(String, Value)>> = HashMap::new();

    if no_grouping {
        bucket_order.push(String::new());
        buckets.insert(String::new(), records);
        key_fields.insert(String::new(), Vec::new());
    } else {
        for record in records {
            let innermost = innermost_bucket_key(&record);
            if !buckets.contains_key(&innermost) {
                bucket_order.push(innermost.clone());
                key_fields.insert(innermost.clone(), innermost_key_values(&record));
            }
            buckets.entry(innermost).or_default().push(record);
        }
    }

    let mut out = Vec::new();
    for bucket in bucket_order {
        let members = buckets.remove(&bucket).unwrap_or_default();
        let mut result = Record::new();
        for (field, value) in key_fields.remove(&bucket).unwrap_or_default() {
            result.insert(field, value);
        }
        for spec in specs {
            let mut aggregator = registry.build(&spec.agg_fn).ok_or_else(|| {
                crate::error::Error::Usage(format!("unknown aggregator {:?}", spec.agg_fn))
            })?;
            for member in &members {
                let value = spec
                    .path
                    .as_ref()
                    .and_then(|p| get_path_in_record(member, p).value());
                aggregator.collect(value);
            }
            result.insert(spec.output_name.clone(), aggregator.finalize());
        }
        out.push(result);
    }
    Ok(out)
}

fn innermost_bucket_key(record: &Record) -> String {
    match record.get("_groups") {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_object)
            .map(|o| format!("{:?}", o.get("value")))
            .collect::<Vec<_>>()
            .join("\u{1}"),
        _ => String::new(),
    }
}

fn innermost_key_values(record: &Record) -> Vec<(String, Value)> {
    match record.get("_groups") {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_object)
            .map(|o| {
                let field = o.get("field").and_then(Value::as_str).unwrap_or_default().to_string();
                let value = o.get("value").cloned().unwrap_or(Value::Null);
                (field, value)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Verify (at call sites that only need the field sequence, not the
/// values) that grouping metadata is present at all.
#[must_use]
pub fn has_group_metadata(record: &Record) -> bool {
    !group_field_sequence(record).is_empty()
}

#[derive(Default)]
struct Count(usize);
impl Aggregator for Count {
    fn collect(&mut self, _value: Option<&Value>) {
        self.0 += 1;
    }
    fn finalize(self: Box<Self>) -> Value {
        Value::Int(self.0 as i64)
    }
}

#[derive(Default)]
struct Sum(f64, bool);
impl Aggregator for Sum {
    fn collect(&mut self, value: Option<&Value>) {
        if let Some(f) = value.and_then(Value::as_f64) {
            self.0 += f;
            self.1 = true;
        }
    }
    fn finalize(self: Box<Self>) -> Value {
        if self.1 {
            Value::Float(self.0)
        } else {
            Value::Null
        }
    }
}

#[derive(Default)]
struct Avg(f64, usize);
impl Aggregator for Avg {
    fn collect(&mut self, value: Option<&Value>) {
        if let Some(f) = value.and_then(Value::as_f64) {
            self.0 += f;
            self.1 += 1;
        }
    }
    fn finalize(self: Box<Self>) -> Value {
        if self.1 == 0 {
            Value::Null
        } else {
            Value::Float(self.0 / self.1 as f64)
        }
    }
}

struct MinMax {
    want_min: bool,
    best: Option<Value>,
}
impl MinMax {
    const fn new(want_min: bool) -> Self {
        Self { want_min, best: None }
    }
}
impl Aggregator for MinMax {
    fn collect(&mut self, value: Option<&Value>) {
        let Some(value) = value else { return };
        if !matches!(value, Value::Int(_) | Value::Float(_)) {
            return;
        }
        self.best = Some(match self.best.take() {
            None => value.clone(),
            Some(current) => {
                let better = if self.want_min {
                    value.value_cmp(&current) == std::cmp::Ordering::Less
                } else {
                    value.value_cmp(&current) == std::cmp::Ordering::Greater
                };
                if better {
                    value.clone()
                } else {
                    current
                }
            }
        });
    }
    fn finalize(self: Box<Self>) -> Value {
        self.best.unwrap_or(Value::Null)
    }
}

#[derive(Default)]
struct ListAgg(Vec<Value>);
impl Aggregator for ListAgg {
    fn collect(&mut self, value: Option<&Value>) {
        self.0.push(value.cloned().unwrap_or(Value::Null));
    }
    fn finalize(self: Box<Self>) -> Value {
        Value::Array(self.0)
    }
}

struct FirstLast {
    want_first: bool,
    current: Option<Value>,
}
impl FirstLast {
    const fn new(want_first: bool) -> Self {
        Self { want_first, current: None }
    }
}
impl Aggregator for FirstLast {
    fn collect(&mut self, value: Option<&Value>) {
        if self.want_first && self.current.is_some() {
            return;
        }
        self.current = Some(value.cloned().unwrap_or(Value::Null));
    }
    fn finalize(self: Box<Self>) -> Value {
        self.current.unwrap_or(Value::Null)
    }
}

#[derive(Default)]
struct UniqueAgg(Vec<Value>);
impl Aggregator for UniqueAgg {
    fn collect(&mut self, value: Option<&Value>) {
        let Some(value) = value else { return };
        if !self.0.iter().any(|existing| existing.value_eq(value)) {
            self.0.push(value.clone());
        }
    }
    fn finalize(self: Box<Self>) -> Value {
        Value::Array(self.0)
    }
}

#[derive(Default)]
struct Median(Vec<f64>);
impl Aggregator for Median {
    fn collect(&mut self, value: Option<&Value>) {
        if let Some(f) = value.and_then(Value::as_f64) {
            self.0.push(f);
        }
    }
    fn finalize(mut self: Box<Self>) -> Value {
        if self.0.is_empty() {
            return Value::Null;
        }
        self.0.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = self.0.len() / 2;
        let value = if self.0.len() % 2 == 0 {
            (self.0[mid - 1] + self.0[mid]) / 2.0
        } else {
            self.0[mid]
        };
        Value::Float(value)
    }
}

#[derive(Default)]
struct Mode(Vec<Value>);
impl Aggregator for Mode {
    fn collect(&mut self, value: Option<&Value>) {
        if let Some(value) = value {
            self.0.push(value.clone());
        }
    }
    fn finalize(self: Box<Self>) -> Value {
        let mut counts: Vec<(Value, usize)> = Vec::new();
        for value in self.0 {
            if let Some(entry) = counts.iter_mut().find(|(v, _)| v.value_eq(&value)) {
                entry.1 += 1;
            } else {
                counts.push((value, 1));
            }
        }
        counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .map_or(Value::Null, |(value, _)| value)
    }
}

#[derive(Default)]
struct Std(Vec<f64>);
impl Aggregator for Std {
    fn collect(&mut self, value: Option<&Value>) {
        if let Some(f) = value.and_then(Value::as_f64) {
            self.0.push(f);
        }
    }
    fn finalize(self: Box<Self>) -> Value {
        let n = self.0.len();
        if n == 0 {
            return Value::Null;
        }
        let mean = self.0.iter().sum::<f64>() / n as f64;
        let variance = self.0.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        Value::Float(variance.sqrt())
    }
}

#[derive(Default)]
struct Concat(String);
impl Aggregator for Concat {
    fn collect(&mut self, value: Option<&Value>) {
        if let Some(value) = value {
            self.0.push_str(&value.to_string());
        }
    }
    fn finalize(self: Box<Self>) -> Value {
        Value::String(self.0)
    }
}
