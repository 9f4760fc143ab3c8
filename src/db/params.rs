//! Parameter binding for prepared MySQL statements.
//!
//! Tool arguments carry record values as JSON. Each value is bound with the
//! closest MySQL type; arrays and objects go over as JSON documents.

use serde_json::Value as JsonValue;
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::types::Json;

/// Bind one JSON value to a MySQL query.
pub(crate) fn bind_json_param<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    param: &'q JsonValue,
) -> Query<'q, MySql, MySqlArguments> {
    match param {
        JsonValue::Null => query.bind(None::<String>),
        JsonValue::Bool(v) => query.bind(*v),
        JsonValue::Number(n) => {
            if let Some(v) = n.as_i64() {
                query.bind(v)
            } else if let Some(v) = n.as_u64() {
                query.bind(v)
            } else {
                match n.as_f64() {
                    Some(v) => query.bind(v),
                    None => query.bind(n.to_string()),
                }
            }
        }
        JsonValue::String(v) => query.bind(v.as_str()),
        JsonValue::Array(_) | JsonValue::Object(_) => query.bind(Json(param)),
    }
}
