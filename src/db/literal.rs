//! SQL literal formatting for generated bulk-load statements.
//!
//! Normal service queries go through sea-orm's parameterized query builder;
//! this module only backs the bulk inventory upload path, where whole
//! spreadsheet rows are turned into INSERT statements. Values are rendered as
//! typed literals with internal quotes doubled. Non-finite floats render as
//! NULL rather than leaking `NaN` into a statement.

use serde_json::Value;

/// A typed value renderable as a SQL literal fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Rendered as a single-quoted JSON document.
    Json(Value),
    /// Rendered as a Postgres `ARRAY[...]` literal.
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Converts a `serde_json::Value` into its literal counterpart.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else {
                    SqlValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(items) => {
                SqlValue::Array(items.iter().map(SqlValue::from_json).collect())
            }
            Value::Object(_) => SqlValue::Json(value.clone()),
        }
    }

    /// Renders the value as a SQL literal fragment.
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(true) => "TRUE".to_string(),
            SqlValue::Bool(false) => "FALSE".to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Float(f) => {
                if f.is_finite() {
                    f.to_string()
                } else {
                    // NaN/inf would otherwise become a bare non-NULL token.
                    "NULL".to_string()
                }
            }
            SqlValue::Text(s) => quote(s),
            SqlValue::Json(v) => quote(&v.to_string()),
            SqlValue::Array(items) => {
                let rendered: Vec<String> = items.iter().map(SqlValue::to_literal).collect();
                format!("ARRAY[{}]", rendered.join(", "))
            }
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Builds a single INSERT statement for one row of column/value pairs.
///
/// Column names are double-quoted to survive reserved words.
pub fn insert_statement(table: &str, columns: &[&str], row: &[SqlValue]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| format!("\"{}\"", c)).collect();
    let vals: Vec<String> = row.iter().map(SqlValue::to_literal).collect();
    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table,
        cols.join(", "),
        vals.join(", ")
    )
}

/// Builds INSERT statements for a batch of JSON object rows sharing a column
/// layout. Rows missing a column render NULL for it.
pub fn insert_statements_from_rows(
    table: &str,
    columns: &[&str],
    rows: &[Value],
) -> Vec<String> {
    rows.iter()
        .map(|row| {
            let values: Vec<SqlValue> = columns
                .iter()
                .map(|col| {
                    row.get(*col)
                        .map(SqlValue::from_json)
                        .unwrap_or(SqlValue::Null)
                })
                .collect();
            insert_statement(table, columns, &values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_and_bool_literals() {
        assert_eq!(SqlValue::Null.to_literal(), "NULL");
        assert_eq!(SqlValue::Bool(true).to_literal(), "TRUE");
        assert_eq!(SqlValue::Bool(false).to_literal(), "FALSE");
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(SqlValue::Int(42).to_literal(), "42");
        assert_eq!(SqlValue::Float(3.5).to_literal(), "3.5");
    }

    #[test]
    fn test_nan_and_infinity_become_null() {
        assert_eq!(SqlValue::Float(f64::NAN).to_literal(), "NULL");
        assert_eq!(SqlValue::Float(f64::INFINITY).to_literal(), "NULL");
        assert_eq!(SqlValue::Float(f64::NEG_INFINITY).to_literal(), "NULL");
    }

    #[test]
    fn test_string_quote_doubling() {
        assert_eq!(
            SqlValue::Text("bride's choice".into()).to_literal(),
            "'bride''s choice'"
        );
    }

    #[test]
    fn test_json_object_literal() {
        let v = SqlValue::from_json(&json!({"zakya_item_id": "Z-101"}));
        assert_eq!(v.to_literal(), r#"'{"zakya_item_id":"Z-101"}'"#);
    }

    #[test]
    fn test_array_literal_with_escaping() {
        let v = SqlValue::from_json(&json!(["SN-1", "SN'2"]));
        assert_eq!(v.to_literal(), "ARRAY['SN-1', 'SN''2']");
    }

    #[test]
    fn test_insert_statement() {
        let stmt = insert_statement(
            "billing_system_product_locations",
            &["sku", "quantity", "zakya_metadata"],
            &[
                SqlValue::Text("KP-001".into()),
                SqlValue::Int(3),
                SqlValue::Null,
            ],
        );
        assert_eq!(
            stmt,
            "INSERT INTO \"billing_system_product_locations\" (\"sku\", \"quantity\", \"zakya_metadata\") VALUES ('KP-001', 3, NULL)"
        );
    }

    #[test]
    fn test_rows_with_missing_columns_get_null() {
        let stmts = insert_statements_from_rows(
            "t",
            &["a", "b"],
            &[json!({"a": 1}), json!({"a": 2, "b": "x"})],
        );
        assert_eq!(stmts[0], "INSERT INTO \"t\" (\"a\", \"b\") VALUES (1, NULL)");
        assert_eq!(stmts[1], "INSERT INTO \"t\" (\"a\", \"b\") VALUES (2, 'x')");
    }
}
