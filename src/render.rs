//! Plain-text rendering of query results.

use serde_json::Value;

use crate::genie::message::QueryResult;

/// Render a query result as a fixed-width text table.
pub fn format_table(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return String::new();
    }

    let mut widths: Vec<usize> = result.columns.iter().map(String::len).collect();
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, value)| {
                    let text = cell_text(value);
                    if i < widths.len() && text.len() > widths[i] {
                        widths[i] = text.len();
                    }
                    text
                })
                .collect()
        })
        .collect();

    let mut out = String::new();
    let header: Vec<&str> = result.columns.iter().map(String::as_str).collect();
    push_row(&mut out, &header, &widths);

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');

    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        push_row(&mut out, &cells, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[&str], widths: &[usize]) {
    let mut parts = Vec::with_capacity(widths.len());
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).copied().unwrap_or("");
        parts.push(format!("{cell:<w$}", w = *width));
    }
    out.push_str(parts.join(" | ").trim_end());
    out.push('\n');
}

/// Strings render unquoted and nulls render empty; everything else uses its
/// JSON form.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn result(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn renders_single_row_table() {
        let table = format_table(&result(
            &["date", "volume"],
            vec![vec![json!("2024-01-01"), json!(100)]],
        ));
        assert_eq!(
            table,
            "date       | volume\n\
             -----------+-------\n\
             2024-01-01 | 100\n"
        );
    }

    #[test]
    fn widens_columns_to_fit_cells() {
        let table = format_table(&result(
            &["id"],
            vec![vec![json!("a-rather-long-value")], vec![json!("x")]],
        ));
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "id");
        assert_eq!(lines[1], "-------------------");
        assert_eq!(lines[2], "a-rather-long-value");
        assert_eq!(lines[3], "x");
    }

    #[test]
    fn nulls_render_empty() {
        let table = format_table(&result(
            &["a", "b"],
            vec![vec![json!(null), json!("v")]],
        ));
        assert!(table.lines().nth(2).unwrap().starts_with("  |"));
    }

    #[test]
    fn empty_result_is_header_and_rule_only() {
        let table = format_table(&result(&["a"], vec![]));
        assert_eq!(table, "a\n-\n");
    }

    #[test]
    fn no_columns_renders_nothing() {
        assert_eq!(format_table(&result(&[], vec![])), "");
    }
}
