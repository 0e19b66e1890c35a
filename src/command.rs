//! Shared command-line parsing helpers for operator arguments, used by
//! both the one-shot CLI (`main.rs`) and the REPL's pipeline-command
//! parser (`repl.rs`) so the two surfaces agree on syntax.

use crate::error::{Error, Result};
use crate::group::aggregate::AggSpec;
use crate::ops::join::JoinMode;
use crate::path::Path;

#[must_use]
pub fn parse_path_list(s: &str) -> Vec<Path> {
    s.split(',').map(str::trim).filter(|p| !p.is_empty()).map(Path::parse).collect()
}

/// Parse comma-separated `from=to` pairs.
pub fn parse_rename_map(s: &str) -> Result<Vec<(Path, String)>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(from, to)| (Path::parse(from.trim()), to.trim().to_string()))
                .ok_or_else(|| Error::Usage(format!("malformed rename pair {pair:?}, expected from=to")))
        })
        .collect()
}

/// Parse comma-separated `l_path=r_path` pairs.
pub fn parse_join_pairs(s: &str) -> Result<Vec<(Path, Path)>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(l, r)| (Path::parse(l.trim()), Path::parse(r.trim())))
                .ok_or_else(|| Error::Usage(format!("malformed join pair {pair:?}, expected l_path=r_path")))
        })
        .collect()
}

pub fn parse_join_mode(s: &str) -> Result<JoinMode> {
    match s {
        "inner" => Ok(JoinMode::Inner),
        "left" => Ok(JoinMode::Left),
        "right" => Ok(JoinMode::Right),
        "outer" => Ok(JoinMode::Outer),
        other => Err(Error::Usage(format!("unknown join mode {other:?}, expected inner/left/right/outer"))),
    }
}

/// Parse one aggregation spec: `name=fn(path)` or `name=fn` (path-less,
/// for `count`).
pub fn parse_agg_spec(s: &str) -> Result<AggSpec> {
    let (name, rhs) = s
        .split_once('=')
        .ok_or_else(|| Error::Usage(format!("malformed aggregation spec {s:?}, expected name=fn(path)")))?;
    let rhs = rhs.trim();
    let (agg_fn, path) = rhs.strip_suffix(')').map_or_else(
        || (rhs.to_string(), None),
        |inner| {
            inner
                .split_once('(')
                .map_or_else(|| (rhs.to_string(), None), |(f, p)| (f.to_string(), Some(Path::parse(p.trim()))))
        },
    );
    Ok(AggSpec { output_name: name.trim().to_string(), agg_fn, path })
}

/// Split a line into whitespace-separated tokens, honoring single- and
/// double-quoted segments so expressions like `select 'a > 1'` keep
/// their spaces intact.
#[must_use]
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();
    let mut in_token = false;

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_whitespace() {
        assert_eq!(tokenize("select a b"), vec!["select", "a", "b"]);
    }

    #[test]
    fn tokenize_preserves_quoted_spaces() {
        assert_eq!(tokenize("select 'a > 1'"), vec!["select", "a > 1"]);
    }

    #[test]
    fn agg_spec_without_path_parses() {
        let spec = parse_agg_spec("cnt=count").unwrap();
        assert_eq!(spec.agg_fn, "count");
        assert!(spec.path.is_none());
    }

    #[test]
    fn agg_spec_with_path_parses() {
        let spec = parse_agg_spec("total=sum(amount)").unwrap();
        assert_eq!(spec.agg_fn, "sum");
        assert_eq!(spec.path.unwrap().as_dotted(), "amount");
    }

    #[test]
    fn rename_map_rejects_malformed_pair() {
        assert!(parse_rename_map("a-b").is_err());
    }
}
