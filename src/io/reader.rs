//! Lazy line-oriented JSONL reader.
//!
//! Opens a path or stdin and yields records lazily, holding at most one
//! parsed record and one source line in flight — the Reader itself is the
//! base of every streaming pipeline's O(1)-memory guarantee.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::value::{Record, Value};

/// A malformed-JSONL-line error: carries path, 1-based line number, and
/// reason.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{path}:{line}: {reason}")]
pub struct ParseError {
    pub path: String,
    pub line: usize,
    pub reason: String,
}

/// Whether malformed lines abort the read (default) or are skipped and
/// counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    Strict,
    Lenient,
}

/// Lazily reads records from a JSONL source, one line at a time.
pub struct Reader {
    lines: std::io::Lines<Box<dyn BufRead>>,
    path_label: String,
    line_no: usize,
    mode: LineMode,
    pub skipped: usize,
}

impl Reader {
    /// Open a path, or stdin if `path` is `None` or `-`.
    pub fn open(path: Option<&Path>, mode: LineMode) -> crate::error::Result<Self> {
        let (reader, label): (Box<dyn BufRead>, String) = match path {
            None => (Box::new(BufReader::new(std::io::stdin())), "<stdin>".to_string()),
            Some(p) if p == Path::new("-") => {
                (Box::new(BufReader::new(std::io::stdin())), "<stdin>".to_string())
            }
            Some(p) => {
                let file = std::fs::File::open(p)?;
                (Box::new(BufReader::new(file)), p.display().to_string())
            }
        };
        Ok(Self {
            lines: reader.lines(),
            path_label: label,
            line_no: 0,
            mode,
            skipped: 0,
        })
    }

    /// Construct a reader directly over an in-memory source (used by tests
    /// and by pipelines chained from another dataset's spill file).
    #[must_use]
    pub fn from_reader(reader: Box<dyn BufRead>, label: impl Into<String>, mode: LineMode) -> Self {
        Self { lines: reader.lines(), path_label: label.into(), line_no: 0, mode, skipped: 0 }
    }
}

impl Iterator for Reader {
    type Item = crate::error::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(l) => l,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line, &self.path_label, self.line_no) {
                Ok(record) => return Some(Ok(record)),
                Err(e) => match self.mode {
                    LineMode::Strict => return Some(Err(e.into())),
                    LineMode::Lenient => {
                        self.skipped += 1;
                        continue;
                    }
                },
            }
        }
    }
}

fn parse_line(line: &str, path_label: &str, line_no: usize) -> Result<Record, ParseError> {
    let json: serde_json::Value = serde_json::from_str(line).map_err(|e| ParseError {
        path: path_label.to_string(),
        line: line_no,
        reason: e.to_string(),
    })?;
    match json {
        serde_json::Value::Object(_) => {
            let value: Value = json.into();
            match value {
                Value::Object(map) => Ok(map),
                _ => unreachable!("matched Object above"),
            }
        }
        _ => Err(ParseError {
            path: path_label.to_string(),
            line: line_no,
            reason: "top-level JSON value must be an object".to_string(),
        }),
    }
}

/// Read a JSON array document as a relation: each array element must be an object.
pub fn read_json_array(path: Option<&Path>) -> crate::error::Result<Vec<Record>> {
    let text = if path.is_none() || path == Some(Path::new("-")) {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path.expect("checked above"))?
    };
    let label = if path.is_none() || path == Some(Path::new("-")) {
        "<stdin>".to_string()
    } else {
        path.expect("checked above").display().to_string()
    };
    let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| ParseError {
        path: label.clone(),
        line: 0,
        reason: e.to_string(),
    })?;
    let serde_json::Value::Array(items) = json else {
        return Err(ParseError { path: label, line: 0, reason: "top-level JSON value must be an array".to_string() }.into());
    };
    items
        .into_iter()
        .map(|item| match Value::from(item) {
            Value::Object(map) => Ok(map),
            _ => Err(ParseError { path: label.clone(), line: 0, reason: "array elements must be objects".to_string() }.into()),
        })
        .collect()
}

/// Resolve a CLI-facing optional path argument into an owned buffer,
/// treating `-` the same as `None`.
#[must_use]
pub fn normalize_input_path(arg: Option<&str>) -> Option<PathBuf> {
    match arg {
        None | Some("-") => None,
        Some(s) => Some(PathBuf::from(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_over(text: &str, mode: LineMode) -> Reader {
        Reader::from_reader(Box::new(Cursor::new(text.to_string())), "<test>", mode)
    }

    #[test]
    fn skips_blank_lines() {
        let r = reader_over("{\"a\":1}\n\n{\"a\":2}\n", LineMode::Strict);
        let records: Vec<_> = r.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn strict_mode_aborts_on_bad_line() {
        let r = reader_over("{\"a\":1}\nnot json\n", LineMode::Strict);
        let results: Vec<_> = r.collect();
        assert!(results[1].is_err());
    }

    #[test]
    fn lenient_mode_skips_and_counts() {
        let mut r = reader_over("{\"a\":1}\nnot json\n{\"a\":2}\n", LineMode::Lenient);
        let records: Vec<_> = (&mut r).collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(r.skipped, 1);
    }

    #[test]
    fn rejects_non_object_top_level() {
        let r = reader_over("[1,2,3]\n", LineMode::Strict);
        let results: Vec<_> = r.collect();
        assert!(results[0].is_err());
    }
}
