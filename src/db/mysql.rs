//! MySQL implementation of the database client capability.
//!
//! Each handle wraps exactly one `MySqlConnection`. Handles are shared by
//! cloning; statements on the same handle run one at a time behind an async
//! mutex, and waiting for that mutex is bounded by the acquire timeout.

use crate::db::client::{ConnectTimeouts, DatabaseClient};
use crate::db::params::bind_json_param;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{BoundStatement, ConnectionSettings, StatementKind, StatementOutput};
use futures_util::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection, Either};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;
use tracing::debug;

/// Shared reference to one physical MySQL connection.
///
/// The inner slot is emptied once the connection has been closed.
#[derive(Debug, Clone)]
pub struct MySqlHandle {
    id: u64,
    conn: Arc<Mutex<Option<MySqlConnection>>>,
    acquire_timeout: Duration,
    statement_timeout: Duration,
}

impl MySqlHandle {
    async fn lock(&self) -> DbResult<MutexGuard<'_, Option<MySqlConnection>>> {
        timeout(self.acquire_timeout, self.conn.lock())
            .await
            .map_err(|_| DbError::timeout("connection acquire", secs(self.acquire_timeout)))
    }

    /// Bound `statement` by the statement timeout.
    async fn within_statement_timeout<T>(
        &self,
        statement: impl Future<Output = DbResult<T>>,
    ) -> DbResult<T> {
        match timeout(self.statement_timeout, statement).await {
            Ok(result) => result,
            Err(_) => Err(DbError::timeout(
                "statement execution",
                secs(self.statement_timeout),
            )),
        }
    }
}

/// Database client backed by sqlx's MySQL driver.
#[derive(Debug, Default)]
pub struct MySqlClient {
    next_id: AtomicU64,
}

impl MySqlClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn connect_options(settings: &ConnectionSettings) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .charset("utf8mb4");

        match settings.database.as_deref() {
            Some(database) => options.database(database),
            None => options,
        }
    }
}

impl DatabaseClient for MySqlClient {
    type Handle = MySqlHandle;

    async fn connect(
        &self,
        settings: &ConnectionSettings,
        timeouts: &ConnectTimeouts,
    ) -> DbResult<MySqlHandle> {
        let options = Self::connect_options(settings);

        let conn = match timeout(timeouts.connect, options.connect()).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                return Err(DbError::connection(
                    format!("Failed to connect to {}: {}", settings.endpoint(), e),
                    connection_suggestion(&e),
                ));
            }
            Err(_) => {
                return Err(DbError::connection(
                    format!(
                        "Timed out after {}s connecting to {}",
                        secs(timeouts.connect),
                        settings.endpoint()
                    ),
                    "Check that the MySQL server is running and reachable from this host",
                ));
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(handle = id, endpoint = %settings.endpoint(), "Opened MySQL connection");

        Ok(MySqlHandle {
            id,
            conn: Arc::new(Mutex::new(Some(conn))),
            acquire_timeout: timeouts.acquire,
            statement_timeout: timeouts.statement,
        })
    }

    async fn probe(&self, handle: &MySqlHandle) -> DbResult<()> {
        // Held by a running statement: the connection is in use, not dead.
        let Ok(mut guard) = handle.conn.try_lock() else {
            debug!(handle = handle.id, "Connection busy, skipping ping");
            return Ok(());
        };
        let conn = guard.as_mut().ok_or_else(closed_error)?;

        match timeout(handle.statement_timeout, conn.ping()).await {
            Ok(result) => result.map_err(DbError::from),
            Err(_) => Err(DbError::timeout("ping", secs(handle.statement_timeout))),
        }
    }

    async fn execute(&self, handle: &MySqlHandle, statement: &str) -> DbResult<StatementOutput> {
        let mut guard = handle.lock().await?;
        let conn = guard.as_mut().ok_or_else(closed_error)?;

        debug!(handle = handle.id, sql = %statement, "Executing statement");
        handle
            .within_statement_timeout(run_statement(conn, statement))
            .await
    }

    async fn execute_bound(
        &self,
        handle: &MySqlHandle,
        statement: &BoundStatement,
    ) -> DbResult<StatementOutput> {
        let mut guard = handle.lock().await?;
        let conn = guard.as_mut().ok_or_else(closed_error)?;

        debug!(
            handle = handle.id,
            sql = %statement.sql,
            params = statement.params.len(),
            "Executing bound statement"
        );
        handle
            .within_statement_timeout(run_bound(conn, statement))
            .await
    }

    async fn close(&self, handle: MySqlHandle) -> DbResult<()> {
        let conn = handle.lock().await?.take();
        match conn {
            Some(conn) => conn.close().await.map_err(DbError::from),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "mysql"
    }
}

/// Run raw SQL (text protocol) and collect either its rows or its write summary.
///
/// Raw SQL avoids prepared-statement restrictions on statements such as
/// `SHOW`, `DESCRIBE` and `CREATE PROCEDURE`. A statement that yields no rows
/// is reported as a write, even with zero affected rows, unless it is a
/// result-set statement such as a `SELECT` that matched nothing.
async fn run_statement(conn: &mut MySqlConnection, sql: &str) -> DbResult<StatementOutput> {
    let mut stream = sqlx::raw_sql(sql).fetch_many(conn);
    let mut rows = Vec::new();
    let mut affected_rows = 0;
    let mut insert_id = 0;

    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(result) => {
                affected_rows += result.rows_affected();
                if result.last_insert_id() != 0 {
                    insert_id = result.last_insert_id();
                }
            }
            Either::Right(row) => rows.push(row.to_json_map()),
        }
    }

    if rows.is_empty() && !returns_result_set(sql) {
        return Ok(StatementOutput::Affected {
            affected_rows,
            insert_id,
        });
    }
    Ok(StatementOutput::Rows(rows))
}

/// Run a prepared statement with its values bound in order.
async fn run_bound(
    conn: &mut MySqlConnection,
    statement: &BoundStatement,
) -> DbResult<StatementOutput> {
    let query = statement
        .params
        .iter()
        .fold(sqlx::query(&statement.sql), bind_json_param);

    match statement.kind {
        StatementKind::Query => {
            let rows = query.fetch_all(&mut *conn).await?;
            Ok(StatementOutput::Rows(
                rows.iter().map(|row| row.to_json_map()).collect(),
            ))
        }
        StatementKind::Write => {
            let result = query.execute(&mut *conn).await?;
            Ok(StatementOutput::Affected {
                affected_rows: result.rows_affected(),
                insert_id: result.last_insert_id(),
            })
        }
    }
}

/// Statement keywords whose output is a result set, even an empty one.
const RESULT_SET_KEYWORDS: &[&str] = &[
    "SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH", "VALUES", "TABLE", "HELP", "CALL",
    "CHECK", "CHECKSUM", "ANALYZE", "OPTIMIZE", "REPAIR",
];

/// Whether the leading keyword of `sql` names a result-set statement.
///
/// Only consulted when a statement produced no rows, to tell an empty result
/// set from a write. Leading comments and whitespace are skipped, and a
/// parenthesized query counts as a `SELECT`.
fn returns_result_set(sql: &str) -> bool {
    let sql = skip_leading_comments(sql);
    if sql.starts_with('(') {
        return true;
    }
    let keyword: String = sql.chars().take_while(char::is_ascii_alphabetic).collect();
    RESULT_SET_KEYWORDS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(&keyword))
}

fn skip_leading_comments(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("/*") {
            sql = match rest.find("*/") {
                Some(end) => &rest[end + 2..],
                None => "",
            };
        } else if sql.starts_with("--") || sql.starts_with('#') {
            sql = match sql.find('\n') {
                Some(end) => &sql[end + 1..],
                None => "",
            };
        } else {
            return sql;
        }
    }
}

fn closed_error() -> DbError {
    DbError::connection(
        "Connection has already been closed",
        "Retry the call to open a fresh connection",
    )
}

fn secs(duration: Duration) -> u32 {
    duration.as_secs() as u32
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the MySQL server is running and accessible".to_string();
    }

    if error_str.contains("access denied") || error_str.contains("password") {
        return "Verify the user and password arguments".to_string();
    }

    if error_str.contains("unknown database") {
        return "Check that the database name exists (call show_databases)".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    "Verify the host, port, user and password arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionDefaults, ConnectionParams};

    #[test]
    fn test_client_name() {
        assert_eq!(MySqlClient::new().name(), "mysql");
    }

    #[test]
    fn test_connect_options_carry_database() {
        let settings = ConnectionParams::default()
            .resolve(&ConnectionDefaults::default(), Some("shop"));
        let options = MySqlClient::connect_options(&settings);
        assert_eq!(options.get_host(), "127.0.0.1");
        assert_eq!(options.get_port(), 3306);
        assert_eq!(options.get_username(), "root");
        assert_eq!(options.get_database(), Some("shop"));
    }

    #[test]
    fn test_connection_suggestion_for_access_denied() {
        let err = sqlx::Error::Protocol("Access denied for user 'root'@'localhost'".to_string());
        assert_eq!(
            connection_suggestion(&err),
            "Verify the user and password arguments"
        );
    }

    fn detached_handle() -> MySqlHandle {
        MySqlHandle {
            id: 1,
            conn: Arc::new(Mutex::new(None)),
            acquire_timeout: Duration::from_millis(50),
            statement_timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_busy_handle_counts_as_alive() {
        let handle = detached_handle();
        let _running = handle.conn.lock().await;

        let started = std::time::Instant::now();
        MySqlClient::new().probe(&handle).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_idle_closed_handle_fails_its_check() {
        let err = MySqlClient::new()
            .probe(&detached_handle())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_busy_handle_still_bounds_execution_wait() {
        let handle = detached_handle();
        let _running = handle.conn.lock().await;

        let err = MySqlClient::new()
            .execute(&handle, "SELECT 1")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Timeout { .. }));
    }

    #[test]
    fn test_result_set_statements() {
        for sql in [
            "SELECT * FROM orders WHERE 1 = 0",
            "  select 1",
            "SHOW TABLES",
            "DESC orders",
            "describe orders",
            "EXPLAIN SELECT 1",
            "WITH t AS (SELECT 1) SELECT * FROM t",
            "(SELECT 1) UNION (SELECT 2)",
            "/* report */ SELECT 1",
            "-- note\nSELECT 1",
            "# note\nSHOW DATABASES",
        ] {
            assert!(returns_result_set(sql), "{}", sql);
        }
    }

    #[test]
    fn test_write_statements() {
        for sql in [
            "CREATE TABLE t (id INT)",
            "DROP TABLE t",
            "UPDATE orders SET status = 'x' WHERE 1 = 0",
            "DELETE FROM orders WHERE 1 = 0",
            "INSERT IGNORE INTO t VALUES (1)",
            "SET @a = 1",
            "DESCRIPTOR",
            "",
            "/* unterminated",
        ] {
            assert!(!returns_result_set(sql), "{}", sql);
        }
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_port_fails_with_connection_error() {
        let settings = ConnectionParams {
            port: Some(1),
            ..Default::default()
        }
        .resolve(&ConnectionDefaults::default(), None);
        let timeouts = ConnectTimeouts {
            connect: Duration::from_secs(2),
            ..ConnectTimeouts::default()
        };

        let err = MySqlClient::new()
            .connect(&settings, &timeouts)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
    }
}
