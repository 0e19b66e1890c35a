//! Output formatting for pipeline results: a row/column table view and
//! a TSV view, built on top of `Record`'s own `Display` for scalars.

use crate::value::{Record, Value};

/// The ordered set of top-level columns to show for a batch of records:
/// the union of all keys across `records`, in first-seen order, so a
/// batch of heterogeneous records still produces one stable header.
#[must_use]
pub fn columns_for(records: &[Record]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut columns = Vec::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key.clone()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Render one record's values for `columns`, missing fields as empty
/// strings (distinct from a present `null`, which renders as `"null"`).
#[must_use]
pub fn row_for(record: &Record, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|c| record.get(c).map_or_else(String::new, Value::to_string))
        .collect()
}

/// Format results as a table with Unicode box-drawing characters:
/// ```text
/// ┌──────────┬───────┐
/// │ column1  │ col2  │
/// ├──────────┼───────┤
/// │ value1   │ val2  │
/// └──────────┴───────┘
/// (N rows)
/// ```
#[must_use]
pub fn format_table(columns: &[String], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return format!("{}\n(0 rows)", columns.join(" | "));
    }

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let max_data = rows
                .iter()
                .map(|r| r.get(i).map_or(0, String::len))
                .max()
                .unwrap_or(0);
            name.len().max(max_data)
        })
        .collect();

    let mut lines = Vec::new();

    let top = format!("┌{}┐", widths.iter().map(|w| "─".repeat(w + 2)).collect::<Vec<_>>().join("┬"));
    lines.push(top);

    let header = columns
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{:width$}", name, width = widths[i]))
        .collect::<Vec<_>>()
        .join(" │ ");
    lines.push(format!("│ {header} │"));

    let sep = format!("├{}┤", widths.iter().map(|w| "─".repeat(w + 2)).collect::<Vec<_>>().join("┼"));
    lines.push(sep);

    for row in rows {
        let row_str = row
            .iter()
            .enumerate()
            .map(|(i, val)| format!("{:width$}", val, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" │ ");
        lines.push(format!("│ {row_str} │"));
    }

    let bottom = format!("└{}┘", widths.iter().map(|w| "─".repeat(w + 2)).collect::<Vec<_>>().join("┴"));
    lines.push(bottom);

    let row_word = if rows.len() == 1 { "row" } else { "rows" };
    lines.push(format!("({} {row_word})", rows.len()));

    lines.join("\n")
}

/// Format results as tab-separated values.
#[must_use]
pub fn format_tsv(columns: &[String], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(columns.join("\t"));
    for row in rows {
        lines.push(row.join("\t"));
    }
    lines.join("\n")
}

/// Render a batch of records as a table in one call, inferring columns
/// from the batch itself.
#[must_use]
pub fn render_table(records: &[Record]) -> String {
    let columns = columns_for(records);
    let rows: Vec<Vec<String>> = records.iter().map(|r| row_for(r, &columns)).collect();
    format_table(&columns, &rows)
}

/// Render a batch of records as TSV in one call, inferring columns from
/// the batch itself.
#[must_use]
pub fn render_tsv(records: &[Record]) -> String {
    let columns = columns_for(records);
    let rows: Vec<Vec<String>> = records.iter().map(|r| row_for(r, &columns)).collect();
    format_tsv(&columns, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn record(pairs: Vec<(&str, Value)>) -> Record {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<IndexMap<_, _>>()
    }

    #[test]
    fn test_format_tsv() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec!["1".to_string(), "2".to_string()], vec!["3".to_string(), "4".to_string()]];
        assert_eq!(format_tsv(&columns, &rows), "a\tb\n1\t2\n3\t4");
    }

    #[test]
    fn test_format_table_empty() {
        let columns = vec!["col1".to_string(), "col2".to_string()];
        let rows: Vec<Vec<String>> = vec![];
        assert_eq!(format_table(&columns, &rows), "col1 | col2\n(0 rows)");
    }

    #[test]
    fn test_format_table_with_data() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec!["1".to_string(), "2".to_string()]];
        let result = format_table(&columns, &rows);
        assert!(result.contains('┌'));
        assert!(result.contains("(1 row)"));
    }

    #[test]
    fn columns_union_heterogeneous_records_in_first_seen_order() {
        let records =
            vec![record(vec![("a", Value::Int(1))]), record(vec![("b", Value::Int(2)), ("a", Value::Int(3))])];
        assert_eq!(columns_for(&records), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn missing_field_renders_as_empty_not_null() {
        let records = vec![record(vec![("a", Value::Int(1))]), record(vec![("b", Value::Null)])];
        let columns = columns_for(&records);
        let rows: Vec<Vec<String>> = records.iter().map(|r| row_for(r, &columns)).collect();
        assert_eq!(rows[1][0], "");
        assert_eq!(rows[1][1], "null");
    }
}
