//! Line-delimited JSON writer.

use std::io::Write;

use crate::value::{Record, Value};

/// Member-order policy for serialized objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyOrder {
    #[default]
    Insertion,
    Sorted,
}

pub struct Writer<W: Write> {
    out: W,
    key_order: KeyOrder,
}

impl<W: Write> Writer<W> {
    #[must_use]
    pub const fn new(out: W, key_order: KeyOrder) -> Self {
        Self { out, key_order }
    }

    /// Serialize one record as a JSONL line.
    ///
    /// # Errors
    /// Propagates I/O and serialization failures.
    pub fn write_record(&mut self, record: &Record) -> crate::error::Result<()> {
        let json = self.to_json(record);
        serde_json::to_writer(&mut self.out, &json)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> crate::error::Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn to_json(&self, record: &Record) -> serde_json::Value {
        let value = Value::Object(record.clone());
        let json: serde_json::Value = value.into();
        match self.key_order {
            KeyOrder::Insertion => json,
            KeyOrder::Sorted => sort_keys(json),
        }
    }
}

fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, serde_json::Value> = std::collections::BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k, sort_keys(v));
            }
            serde_json::Value::Object(sorted.into_iter().collect())
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Write a relation as a single JSON array document.
///
/// # Errors
/// Propagates I/O and serialization failures.
pub fn write_json_array<W: Write>(out: &mut W, records: &[Record], key_order: KeyOrder) -> crate::error::Result<()> {
    let items: Vec<serde_json::Value> = records
        .iter()
        .map(|r| {
            let json: serde_json::Value = Value::Object(r.clone()).into();
            if key_order == KeyOrder::Sorted {
                sort_keys(json)
            } else {
                json
            }
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &serde_json::Value::Array(items))?;
    out.write_all(b"\n")?;
    Ok(())
}
