//! Integration tests against a real MySQL server.
//!
//! Set TEST_MYSQL_HOST (and optionally TEST_MYSQL_PORT, TEST_MYSQL_USER,
//! TEST_MYSQL_PASSWORD) to run them. The user needs CREATE/DROP privileges.

use mysql_gateway_mcp::db::{ConnectionCache, MySqlClient};
use mysql_gateway_mcp::models::{ConnectionDefaults, ToolResponse};
use mysql_gateway_mcp::tools::Dispatcher;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

const TEST_DATABASE: &str = "mcp_gateway_test";

fn live_dispatcher() -> Option<Dispatcher<MySqlClient>> {
    let host = match std::env::var("TEST_MYSQL_HOST") {
        Ok(host) => host,
        Err(_) => {
            eprintln!("Skipping test: TEST_MYSQL_HOST not set");
            return None;
        }
    };

    let defaults = ConnectionDefaults {
        host,
        port: std::env::var("TEST_MYSQL_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3306),
        user: std::env::var("TEST_MYSQL_USER").unwrap_or_else(|_| "root".to_string()),
        password: std::env::var("TEST_MYSQL_PASSWORD").unwrap_or_default(),
    };

    Some(Dispatcher::new(
        Arc::new(ConnectionCache::new(MySqlClient::new())),
        defaults,
    ))
}

fn args(value: JsonValue) -> Option<serde_json::Map<String, JsonValue>> {
    value.as_object().cloned()
}

async fn run(d: &Dispatcher<MySqlClient>, database: &str, query: &str) -> ToolResponse {
    let response = d
        .dispatch(
            "execute_query",
            args(json!({"database": database, "query": query})),
        )
        .await;
    assert!(!response.is_error, "{} failed: {}", query, response.text);
    response
}

/// The JSON payload after the header lines.
fn payload(response: &ToolResponse) -> JsonValue {
    let start = response
        .text
        .find(['[', '{'])
        .unwrap_or_else(|| panic!("no JSON in {}", response.text));
    serde_json::from_str(&response.text[start..]).unwrap()
}

#[tokio::test]
async fn test_mysql_select_one() {
    let Some(d) = live_dispatcher() else { return };

    let response = run(&d, "information_schema", "SELECT 1").await;
    assert_eq!(payload(&response), json!([{"1": 1}]));

    d.cache().shutdown().await;
}

#[tokio::test]
async fn test_mysql_show_databases_and_test_connection() {
    let Some(d) = live_dispatcher() else { return };

    let response = d.dispatch("show_databases", None).await;
    assert!(!response.is_error, "{}", response.text);
    assert!(response.text.contains("information_schema"));

    let response = d.dispatch("test_connection", None).await;
    assert!(!response.is_error, "{}", response.text);
    let identity = payload(&response);
    assert!(identity.get("version").and_then(|v| v.as_str()).is_some());
    assert_eq!(identity.get("database"), Some(&JsonValue::Null));

    // Both calls share the no-database connection.
    assert_eq!(d.cache().len().await, 1);
    let report = d.cache().shutdown().await;
    assert_eq!(report.closed, 1);
}

#[tokio::test]
async fn test_mysql_table_lifecycle_with_unusual_name() {
    let Some(d) = live_dispatcher() else { return };

    run(
        &d,
        "information_schema",
        &format!("CREATE DATABASE IF NOT EXISTS `{}`", TEST_DATABASE),
    )
    .await;
    run(&d, TEST_DATABASE, "DROP TABLE IF EXISTS `odd``name`").await;
    run(
        &d,
        TEST_DATABASE,
        "CREATE TABLE `odd``name` (
            id INT AUTO_INCREMENT PRIMARY KEY,
            label VARCHAR(100) NOT NULL,
            price DECIMAL(10,2),
            created DATETIME
        ) DEFAULT CHARSET=utf8mb4",
    )
    .await;

    let tables = d
        .dispatch("show_tables", args(json!({"database": TEST_DATABASE})))
        .await;
    assert!(!tables.is_error, "{}", tables.text);
    assert!(tables.text.contains("odd`name"));

    let described = d
        .dispatch(
            "describe_table",
            args(json!({"database": TEST_DATABASE, "table_name": "odd`name"})),
        )
        .await;
    assert!(!described.is_error, "{}", described.text);
    let columns = payload(&described);
    let fields: Vec<&str> = columns
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c.get("Field").and_then(|f| f.as_str()))
        .collect();
    assert_eq!(fields, vec!["id", "label", "price", "created"]);

    let inserted = run(
        &d,
        TEST_DATABASE,
        "INSERT INTO `odd``name` (label, price, created) VALUES ('茶', 12.50, '2024-05-01 10:00:00')",
    )
    .await;
    assert_eq!(
        payload(&inserted),
        json!({"affectedRows": 1, "insertId": 1})
    );

    let selected = run(
        &d,
        TEST_DATABASE,
        "SELECT label, price, created FROM `odd``name`",
    )
    .await;
    assert_eq!(
        payload(&selected),
        json!([{"label": "茶", "price": "12.50", "created": "2024-05-01 10:00:00"}])
    );

    run(&d, TEST_DATABASE, "DROP TABLE `odd``name`").await;
    d.cache().shutdown().await;
}

#[tokio::test]
async fn test_mysql_syntax_error_keeps_connection() {
    let Some(d) = live_dispatcher() else { return };

    let failed = d
        .dispatch(
            "execute_query",
            args(json!({"database": "information_schema", "query": "SELEC 1"})),
        )
        .await;
    assert!(failed.is_error);
    assert!(failed.text.contains("kind=database"));

    run(&d, "information_schema", "SELECT 1").await;
    assert_eq!(d.cache().len().await, 1);

    d.cache().shutdown().await;
}

#[tokio::test]
async fn test_mysql_wrong_password_is_connection_error() {
    let Some(d) = live_dispatcher() else { return };

    let response = d
        .dispatch(
            "show_databases",
            args(json!({"user": "mcp_gateway_nobody", "password": "wrong"})),
        )
        .await;
    assert!(response.is_error);
    assert!(response.text.starts_with("Error: Connection failed:"));
    assert!(d.cache().is_empty().await);
}

#[tokio::test]
async fn test_mysql_statements_without_rows_render_the_write_header() {
    let Some(d) = live_dispatcher() else { return };

    run(
        &d,
        "information_schema",
        &format!("CREATE DATABASE IF NOT EXISTS `{}`", TEST_DATABASE),
    )
    .await;
    run(&d, TEST_DATABASE, "DROP TABLE IF EXISTS ddl_output").await;

    let created = run(&d, TEST_DATABASE, "CREATE TABLE ddl_output (id INT PRIMARY KEY)").await;
    assert_eq!(payload(&created), json!({"affectedRows": 0, "insertId": 0}));

    let untouched = run(&d, TEST_DATABASE, "UPDATE ddl_output SET id = 2 WHERE id = 1").await;
    assert_eq!(
        payload(&untouched),
        json!({"affectedRows": 0, "insertId": 0})
    );

    let empty = run(&d, TEST_DATABASE, "SELECT id FROM ddl_output").await;
    assert_eq!(payload(&empty), json!([]));

    let dropped = run(&d, TEST_DATABASE, "DROP TABLE ddl_output").await;
    assert_eq!(payload(&dropped), json!({"affectedRows": 0, "insertId": 0}));
    d.cache().shutdown().await;
}

#[tokio::test]
async fn test_mysql_record_tools_bind_values() {
    let Some(d) = live_dispatcher() else { return };

    run(
        &d,
        "information_schema",
        &format!("CREATE DATABASE IF NOT EXISTS `{}`", TEST_DATABASE),
    )
    .await;
    run(&d, TEST_DATABASE, "DROP TABLE IF EXISTS record_tools").await;
    run(
        &d,
        TEST_DATABASE,
        "CREATE TABLE record_tools (
            id INT AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            active TINYINT NOT NULL,
            meta JSON NULL
        )",
    )
    .await;

    let call = |tool: &'static str, extra: JsonValue| {
        let mut arguments = json!({"database": TEST_DATABASE, "table_name": "record_tools"});
        if let (Some(target), Some(fields)) = (arguments.as_object_mut(), extra.as_object()) {
            target.extend(fields.clone());
        }
        d.dispatch(tool, args(arguments))
    };

    let inserted = call(
        "insert_record",
        json!({"data": {"name": "O'Brien", "active": true, "meta": {"tier": "gold"}}}),
    )
    .await;
    assert!(!inserted.is_error, "{}", inserted.text);
    assert_eq!(
        payload(&inserted),
        json!({"affectedRows": 1, "insertId": 1})
    );

    let bulk = call(
        "bulk_insert",
        json!({"records": [
            {"name": "Ana", "active": 0},
            {"name": "Luis", "active": 1}
        ]}),
    )
    .await;
    assert!(!bulk.is_error, "{}", bulk.text);

    let counted = call("count_records", json!({"where": {"active": 1}})).await;
    assert_eq!(payload(&counted), json!({"total": 2}));

    let found = call("get_record_by_id", json!({"id_value": 1})).await;
    assert!(!found.is_error, "{}", found.text);
    assert_eq!(payload(&found)["name"], json!("O'Brien"));

    let updated = call(
        "update_records",
        json!({"data": {"active": 0}, "where": {"active": 1}}),
    )
    .await;
    assert_eq!(payload(&updated)["affectedRows"], json!(2));

    let selected = call(
        "select_records",
        json!({"columns": ["name"], "where": {"meta": null}, "order_by": "name DESC", "limit": 5}),
    )
    .await;
    assert_eq!(
        payload(&selected),
        json!([{"name": "Luis"}, {"name": "Ana"}])
    );

    let deleted = call(
        "delete_records",
        json!({"where": {"active": 0}, "confirm": true}),
    )
    .await;
    assert_eq!(payload(&deleted)["affectedRows"], json!(3));

    run(&d, TEST_DATABASE, "DROP TABLE record_tools").await;
    d.cache().shutdown().await;
}
