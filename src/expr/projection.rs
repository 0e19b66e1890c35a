//! Projection expressions for `project`: either a bare path
//! (output key = the path as-is) or `name=expr` (output key = `name`,
//! value = `expr` evaluated over the record).

use super::ast::Expr;
use super::parser::parse;
use super::ExpressionError;
use crate::path::Path;

/// One output field of a `project` operator.
pub struct ProjectionField {
    pub output_key: String,
    pub expr: Expr,
}

/// Parse a comma-separated projection field list, e.g. `"a,b,total=a+b"`.
/// Duplicate-output-name rejection is a structural (pipeline) concern, not
/// a syntax concern, and is enforced by `ops::project::Project::new`.
pub fn parse_fields(spec: &str) -> Result<Vec<ProjectionField>, ExpressionError> {
    let mut fields = Vec::new();
    for part in split_top_level(spec) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        fields.push(parse_field(part)?);
    }
    Ok(fields)
}

fn parse_field(part: &str) -> Result<ProjectionField, ExpressionError> {
    if let Some(eq) = find_top_level_eq(part) {
        let name = part[..eq].trim().to_string();
        let expr_src = part[eq + 1..].trim();
        let expr = parse(expr_src).map_err(|e| ExpressionError(e.to_string()))?;
        Ok(ProjectionField { output_key: name, expr })
    } else {
        let path = Path::parse(part.trim());
        Ok(ProjectionField { output_key: path.as_dotted(), expr: Expr::Path(path) })
    }
}

/// Find a top-level `=` that isn't part of `==`/`!=`/`<=`/`>=`.
fn find_top_level_eq(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => depth -= 1,
            b'=' if depth == 0 => {
                let prev_is_cmp = i > 0 && matches!(bytes[i - 1], b'=' | b'!' | b'<' | b'>');
                let next_is_eq = bytes.get(i + 1) == Some(&b'=');
                if !prev_is_cmp && !next_is_eq {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut start = 0;
    let mut parts = Vec::new();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => depth -= 1,
            b',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
