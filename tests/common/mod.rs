//! Shared fixtures for the integration tests: an in-memory database client.

#![allow(dead_code)]

use mysql_gateway_mcp::db::{ConnectTimeouts, DatabaseClient};
use mysql_gateway_mcp::error::{DbError, DbResult};
use mysql_gateway_mcp::models::{
    BoundStatement, ConnectionDefaults, ConnectionParams, ConnectionSettings, Row, StatementKind,
    StatementOutput,
};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// A fake connection: a serial number plus the settings it was opened with.
#[derive(Debug, Clone)]
pub struct FakeHandle {
    pub id: usize,
    pub settings: ConnectionSettings,
}

/// In-memory client counting every call, with switchable failures.
#[derive(Debug, Default)]
pub struct FakeClient {
    pub connect_attempts: AtomicUsize,
    pub connects: AtomicUsize,
    pub probes: AtomicUsize,
    pub closes: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_probe: AtomicBool,
    pub fail_execute: AtomicBool,
    pub connect_delay_ms: AtomicU64,
    failing_closes: Mutex<HashSet<usize>>,
    outputs: Mutex<HashMap<String, StatementOutput>>,
    executed: Mutex<Vec<(usize, String)>>,
    bound: Mutex<Vec<BoundStatement>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `statement` with `output` instead of the default.
    ///
    /// By default verbatim and query statements return no rows, and bound
    /// writes report zero affected rows.
    pub fn with_output(self, statement: &str, output: StatementOutput) -> Self {
        self.outputs
            .lock()
            .unwrap()
            .insert(statement.to_string(), output);
        self
    }

    pub fn set(&self, flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    /// Make closing the handle with this id fail.
    pub fn fail_close_of(&self, id: usize) {
        self.failing_closes.lock().unwrap().insert(id);
    }

    pub fn count(&self, counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Statements run so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, sql)| sql.clone())
            .collect()
    }

    /// Prepared statements run so far, with their bound values.
    pub fn bound(&self) -> Vec<BoundStatement> {
        self.bound.lock().unwrap().clone()
    }

    /// Handle ids statements ran on, in order.
    pub fn executed_on(&self) -> Vec<usize> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }
}

impl FakeClient {
    fn run(
        &self,
        handle: &FakeHandle,
        sql: &str,
        kind: StatementKind,
    ) -> DbResult<StatementOutput> {
        self.executed
            .lock()
            .unwrap()
            .push((handle.id, sql.to_string()));

        if self.fail_execute.load(Ordering::SeqCst) {
            return Err(DbError::database(
                "You have an error in your SQL syntax",
                Some("42000".to_string()),
                "Check the SQL syntax and referenced objects",
            ));
        }

        if let Some(output) = self.outputs.lock().unwrap().get(sql).cloned() {
            return Ok(output);
        }
        Ok(match kind {
            StatementKind::Query => StatementOutput::Rows(Vec::new()),
            StatementKind::Write => StatementOutput::Affected {
                affected_rows: 0,
                insert_id: 0,
            },
        })
    }
}

impl DatabaseClient for FakeClient {
    type Handle = FakeHandle;

    async fn connect(
        &self,
        settings: &ConnectionSettings,
        _timeouts: &ConnectTimeouts,
    ) -> DbResult<FakeHandle> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);

        let delay = self.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(DbError::connection(
                format!(
                    "Access denied for user '{}'@'{}'",
                    settings.user, settings.host
                ),
                "Verify the user and password arguments",
            ));
        }

        let id = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FakeHandle {
            id,
            settings: settings.clone(),
        })
    }

    async fn probe(&self, _handle: &FakeHandle) -> DbResult<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(DbError::connection(
                "Lost connection to MySQL server during query",
                "Reconnect",
            ));
        }
        Ok(())
    }

    async fn execute(&self, handle: &FakeHandle, statement: &str) -> DbResult<StatementOutput> {
        self.run(handle, statement, StatementKind::Query)
    }

    async fn execute_bound(
        &self,
        handle: &FakeHandle,
        statement: &BoundStatement,
    ) -> DbResult<StatementOutput> {
        self.bound.lock().unwrap().push(statement.clone());
        self.run(handle, &statement.sql, statement.kind)
    }

    async fn close(&self, handle: FakeHandle) -> DbResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.failing_closes.lock().unwrap().contains(&handle.id) {
            return Err(DbError::connection("Broken pipe", "Nothing to do"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Settings resolved against the built-in defaults.
pub fn settings(database: Option<&str>) -> ConnectionSettings {
    ConnectionParams::default().resolve(&ConnectionDefaults::default(), database)
}

pub fn settings_for_user(user: &str, database: Option<&str>) -> ConnectionSettings {
    ConnectionParams {
        user: Some(user.to_string()),
        ..Default::default()
    }
    .resolve(&ConnectionDefaults::default(), database)
}

/// Build a result set from a JSON array of objects.
pub fn rows(value: JsonValue) -> StatementOutput {
    let rows: Vec<Row> = match value {
        JsonValue::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                JsonValue::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    StatementOutput::Rows(rows)
}

/// Tool arguments from a JSON object literal.
pub fn args(value: JsonValue) -> Option<serde_json::Map<String, JsonValue>> {
    match value {
        JsonValue::Object(map) => Some(map),
        _ => None,
    }
}
