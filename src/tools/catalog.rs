//! Tool catalog: names, descriptions and input schemas advertised to clients.

use crate::tools::request::{
    BULK_INSERT, BulkInsertInput, CONNECTION_CACHE_STATUS, COUNT_RECORDS, CacheStatusInput,
    CountRecordsInput, DELETE_RECORD, DELETE_RECORDS, DESCRIBE_TABLE, DeleteRecordInput,
    DeleteRecordsInput, DescribeTableInput, EXECUTE_QUERY, ExecuteQueryInput, GET_RECORD_BY_ID,
    GET_SERVER_INFO, GetRecordByIdInput, INSERT_RECORD, InsertRecordInput, ListDatabasesInput,
    ListTablesInput, SELECT_RECORDS, SHOW_DATABASES, SHOW_TABLES, SelectRecordsInput,
    ServerInfoInput, TEST_CONNECTION, TestConnectionInput, UPDATE_RECORD, UPDATE_RECORDS,
    UpdateRecordInput, UpdateRecordsInput,
};
use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use std::sync::Arc;

/// Every tool the gateway serves, in a stable order.
pub fn tools() -> Vec<Tool> {
    vec![
        Tool::new(
            SHOW_DATABASES,
            "List all databases available on the MySQL server.\nConnection fields (host, port, user, password) are optional and fall back to the server defaults.",
            input_schema::<ListDatabasesInput>(),
        ),
        Tool::new(
            SHOW_TABLES,
            "List all tables in a specific database.",
            input_schema::<ListTablesInput>(),
        ),
        Tool::new(
            DESCRIBE_TABLE,
            "Show the structure of a table: columns, types, nullability, keys, defaults and extra attributes.",
            input_schema::<DescribeTableInput>(),
        ),
        Tool::new(
            EXECUTE_QUERY,
            "Execute a SQL statement in a specific database and return its rows, or the affected row count and insert id for writes.\nThe statement runs exactly as given, with autocommit.",
            input_schema::<ExecuteQueryInput>(),
        ),
        Tool::new(
            TEST_CONNECTION,
            "Check that a MySQL server is reachable with the given credentials.\nReturns the server version, the authenticated user and the selected database.",
            input_schema::<TestConnectionInput>(),
        ),
        Tool::new(
            CONNECTION_CACHE_STATUS,
            "List the connections the gateway currently keeps open, as host:port:user:database keys.\nKeys a call is connecting or using right now are listed under busy.",
            input_schema::<CacheStatusInput>(),
        ),
        Tool::new(
            GET_SERVER_INFO,
            "Show the gateway's name, version, default connection fields (never the password), timeouts, cached connection count and tools.",
            input_schema::<ServerInfoInput>(),
        ),
        Tool::new(
            INSERT_RECORD,
            "Insert one record into a table. `data` maps column names to values; values are sent as bound parameters.\nReturns the affected row count and the insert id.",
            input_schema::<InsertRecordInput>(),
        ),
        Tool::new(
            BULK_INSERT,
            "Insert several records into a table in one statement, so either all of them are inserted or none are.\nEvery record must have the same columns.",
            input_schema::<BulkInsertInput>(),
        ),
        Tool::new(
            SELECT_RECORDS,
            "Read records from a table, optionally choosing columns, filtering with `where` (column = value, joined with AND), ordering and limiting.",
            input_schema::<SelectRecordsInput>(),
        ),
        Tool::new(
            GET_RECORD_BY_ID,
            "Fetch one record by its id. The id column defaults to `id`.",
            input_schema::<GetRecordByIdInput>(),
        ),
        Tool::new(
            COUNT_RECORDS,
            "Count the records in a table, optionally filtered with `where`.",
            input_schema::<CountRecordsInput>(),
        ),
        Tool::new(
            UPDATE_RECORD,
            "Update one record by its id with the column values in `data`.",
            input_schema::<UpdateRecordInput>(),
        ),
        Tool::new(
            UPDATE_RECORDS,
            "Update every record matching `where` with the column values in `data`. A non-empty `where` is required.",
            input_schema::<UpdateRecordsInput>(),
        ),
        Tool::new(
            DELETE_RECORD,
            "Delete one record by its id.",
            input_schema::<DeleteRecordInput>(),
        ),
        Tool::new(
            DELETE_RECORDS,
            "Delete every record matching `where`. A non-empty `where` and `confirm: true` are required.",
            input_schema::<DeleteRecordsInput>(),
        ),
    ]
}

/// JSON schema object for a tool's input type.
fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(T);
    let object = match serde_json::to_value(schema) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => empty_object_schema(),
    };
    Arc::new(object)
}

fn empty_object_schema() -> JsonObject {
    let mut map = JsonObject::new();
    map.insert("type".to_string(), serde_json::Value::from("object"));
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(name: &str) -> Tool {
        tools()
            .into_iter()
            .find(|t| t.name == name)
            .unwrap_or_else(|| panic!("tool {} missing", name))
    }

    fn required(tool: &Tool) -> Vec<String> {
        tool.input_schema
            .get("required")
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn properties(tool: &Tool) -> Vec<String> {
        tool.input_schema
            .get("properties")
            .and_then(|v| v.as_object())
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_catalog_lists_all_tools() {
        let names: Vec<String> = tools().iter().map(|t| t.name.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "show_databases",
                "show_tables",
                "describe_table",
                "execute_query",
                "test_connection",
                "connection_cache_status",
                "get_server_info",
                "insert_record",
                "bulk_insert",
                "select_records",
                "get_record_by_id",
                "count_records",
                "update_record",
                "update_records",
                "delete_record",
                "delete_records",
            ]
        );
    }

    #[test]
    fn test_schemas_are_objects() {
        for tool in tools() {
            assert_eq!(
                tool.input_schema.get("type").and_then(|v| v.as_str()),
                Some("object"),
                "{}",
                tool.name
            );
        }
    }

    #[test]
    fn test_required_fields() {
        assert!(required(&find(SHOW_DATABASES)).is_empty());
        assert_eq!(required(&find(SHOW_TABLES)), vec!["database"]);

        let mut describe = required(&find(DESCRIBE_TABLE));
        describe.sort();
        assert_eq!(describe, vec!["database", "table_name"]);

        let mut execute = required(&find(EXECUTE_QUERY));
        execute.sort();
        assert_eq!(execute, vec!["database", "query"]);
    }

    #[test]
    fn test_record_tool_required_fields() {
        let sorted = |name| {
            let mut fields = required(&find(name));
            fields.sort();
            fields
        };

        assert_eq!(sorted(SELECT_RECORDS), vec!["database", "table_name"]);
        assert_eq!(
            sorted(GET_RECORD_BY_ID),
            vec!["database", "id_value", "table_name"]
        );
        assert_eq!(
            sorted(UPDATE_RECORDS),
            vec!["data", "database", "table_name", "where"]
        );
        assert_eq!(sorted(DELETE_RECORDS), vec!["database", "table_name", "where"]);
    }

    #[test]
    fn test_select_records_advertises_where() {
        let props = properties(&find(SELECT_RECORDS));
        for field in ["columns", "where", "limit", "order_by", "host"] {
            assert!(props.iter().any(|p| p == field), "missing {}", field);
        }
    }

    #[test]
    fn test_connection_fields_are_advertised() {
        let props = properties(&find(EXECUTE_QUERY));
        for field in ["host", "port", "user", "password", "database", "query"] {
            assert!(props.iter().any(|p| p == field), "missing {}", field);
        }
    }
}
