//! Response text formatting.
//!
//! Every successful tool response is a header line followed by the payload
//! as pretty-printed JSON. Key order follows the row's column order, so the
//! same result always renders the same text.

use crate::error::{DbError, DbResult};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Render `header`, a newline, then `payload` as pretty JSON.
pub fn render<T: Serialize + ?Sized>(header: &str, payload: &T) -> DbResult<String> {
    let body = serde_json::to_string_pretty(payload)
        .map_err(|e| DbError::internal(format!("Failed to serialize result: {}", e)))?;
    Ok(format!("{}\n{}", header, body))
}

pub fn databases_header(endpoint: &str) -> String {
    format!("Databases available on {}:", endpoint)
}

pub fn tables_header(database: &str) -> String {
    format!("Tables in database '{}':", database)
}

pub fn table_structure_header(table: &str, database: &str) -> String {
    format!("Structure of table '{}' in database '{}':", table, database)
}

/// The query header spans several lines; the JSON follows `Result:`.
pub fn query_header(database: &str, query: &str) -> String {
    format!("Query executed on '{}':\nQuery: {}\n\nResult:", database, query)
}

pub fn connection_alive_header(endpoint: &str) -> String {
    format!("Connection to {} is alive:", endpoint)
}

pub fn cache_status_header(count: usize) -> String {
    format!("Cached connections: {}", count)
}

pub fn server_info_header(name: &str, version: &str) -> String {
    format!("Server {} {}:", name, version)
}

pub fn inserted_header(count: usize, table: &str, database: &str) -> String {
    let noun = if count == 1 { "record" } else { "records" };
    format!("Inserted {} {} into '{}' in database '{}':", count, noun, table, database)
}

pub fn records_header(table: &str, database: &str, count: usize) -> String {
    format!("Records from '{}' in database '{}' ({} rows):", table, database, count)
}

/// `id` is rendered as JSON, so string ids keep their quotes.
pub fn record_by_id_header(table: &str, id_column: &str, id: &JsonValue, found: bool) -> String {
    if found {
        format!("Record from '{}' where {} = {}:", table, id_column, id)
    } else {
        format!("No record in '{}' where {} = {}:", table, id_column, id)
    }
}

pub fn count_header(table: &str, database: &str) -> String {
    format!("Record count for '{}' in database '{}':", table, database)
}

pub fn updated_header(table: &str, database: &str) -> String {
    format!("Updated records in '{}' in database '{}':", table, database)
}

pub fn deleted_header(table: &str, database: &str) -> String {
    format!("Deleted records from '{}' in database '{}':", table, database)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_header_then_pretty_json() {
        let text = render(&tables_header("shop"), &json!([{"Tables_in_shop": "orders"}])).unwrap();
        assert_eq!(
            text,
            "Tables in database 'shop':\n[\n  {\n    \"Tables_in_shop\": \"orders\"\n  }\n]"
        );
    }

    #[test]
    fn test_query_header_layout() {
        let text = render(&query_header("shop", "SELECT 1"), &json!([{"1": 1}])).unwrap();
        assert!(text.starts_with("Query executed on 'shop':\nQuery: SELECT 1\n\nResult:\n["));
    }

    #[test]
    fn test_render_is_deterministic() {
        let payload = json!([{"b": 2, "a": 1}]);
        assert_eq!(
            render("h", &payload).unwrap(),
            render("h", &payload).unwrap()
        );
    }

    #[test]
    fn test_headers() {
        assert_eq!(
            databases_header("127.0.0.1:3306"),
            "Databases available on 127.0.0.1:3306:"
        );
        assert_eq!(
            table_structure_header("users", "shop"),
            "Structure of table 'users' in database 'shop':"
        );
        assert_eq!(cache_status_header(2), "Cached connections: 2");
        assert_eq!(
            inserted_header(1, "users", "shop"),
            "Inserted 1 record into 'users' in database 'shop':"
        );
        assert_eq!(
            inserted_header(3, "users", "shop"),
            "Inserted 3 records into 'users' in database 'shop':"
        );
    }

    #[test]
    fn test_record_by_id_header_keeps_json_quoting() {
        assert_eq!(
            record_by_id_header("products", "sku", &json!("PROD-1"), true),
            "Record from 'products' where sku = \"PROD-1\":"
        );
        assert_eq!(
            record_by_id_header("users", "id", &json!(42), false),
            "No record in 'users' where id = 42:"
        );
    }
}
