//! Purpose: Shared row/result JSON serializers for CLI output.
//! Exports: `row_json`, `rows_json`, and `fetched_json`.
//! Role: Keep the stdout envelope shape consistent across commands.
//! Invariants: Rows render as objects keyed by column name, in column order.

use serde_json::{Map, Value, json};
use sqlscope::api::{Fetched, Row, Rows};

pub(crate) fn row_json(row: &Row) -> Value {
    let mut map = Map::new();
    for (column, value) in row.iter() {
        map.insert(column.to_string(), json!(value));
    }
    Value::Object(map)
}

pub(crate) fn rows_json(rows: &Rows) -> Value {
    Value::Array(rows.iter().map(|row| row_json(&row)).collect())
}

pub(crate) fn fetched_json(query: &str, fetched: &Fetched) -> Value {
    json!({
        "query": query,
        "source": fetched.source.as_str(),
        "rows": rows_json(&fetched.rows),
    })
}

#[cfg(test)]
mod tests {
    use super::{fetched_json, row_json};
    use sqlscope::api::{FetchSource, Fetched, Row, Rows, Value};
    use std::sync::Arc;

    #[test]
    fn row_renders_as_object() {
        let row = Row {
            columns: vec!["id".to_string(), "name".to_string()],
            values: vec![Value::Integer(1), Value::Null],
        };
        let value = row_json(&row);
        assert_eq!(value["id"], 1);
        assert!(value["name"].is_null());
    }

    #[test]
    fn fetched_envelope_has_source() {
        let fetched = Fetched {
            rows: Arc::new(Rows {
                columns: vec!["id".to_string()],
                rows: vec![vec![Value::Integer(7)]],
            }),
            source: FetchSource::Cache,
        };
        let value = fetched_json("SELECT id FROM users", &fetched);
        assert_eq!(value["source"], "cache");
        assert_eq!(value["query"], "SELECT id FROM users");
        assert_eq!(value["rows"][0]["id"], 7);
    }
}
