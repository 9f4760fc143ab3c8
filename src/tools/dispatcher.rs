//! Operation dispatcher.
//!
//! Decodes a tool invocation, resolves its connection parameters against the
//! process defaults, acquires a handle from the cache and runs the matching
//! statement. Every outcome, including decode failures, leaves here as a
//! [`ToolResponse`]; nothing is raised to the transport.

use crate::db::{ConnectionCache, DatabaseClient};
use crate::error::DbResult;
use crate::models::{
    BoundStatement, ConnectionDefaults, ConnectionParams, ConnectionSettings, StatementOutput,
    ToolResponse,
};
use crate::tools::request::{
    BulkInsertInput, CountRecordsInput, DeleteRecordInput, DeleteRecordsInput, DescribeTableInput,
    ExecuteQueryInput, GetRecordByIdInput, InsertRecordInput, ListDatabasesInput,
    ListTablesInput, SelectRecordsInput, TestConnectionInput, ToolRequest, UpdateRecordInput,
    UpdateRecordsInput,
};
use crate::tools::{catalog, format, records};
use serde_json::{Map, Value as JsonValue, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const SHOW_DATABASES_SQL: &str = "SHOW DATABASES";
const SHOW_TABLES_SQL: &str = "SHOW TABLES";
const SERVER_IDENTITY_SQL: &str =
    "SELECT VERSION() AS version, CURRENT_USER() AS user, DATABASE() AS `database`";

/// Routes tool calls to database operations.
pub struct Dispatcher<C: DatabaseClient> {
    cache: Arc<ConnectionCache<C>>,
    defaults: ConnectionDefaults,
}

impl<C: DatabaseClient> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            defaults: self.defaults.clone(),
        }
    }
}

impl<C: DatabaseClient> Dispatcher<C> {
    pub fn new(cache: Arc<ConnectionCache<C>>, defaults: ConnectionDefaults) -> Self {
        Self { cache, defaults }
    }

    pub fn cache(&self) -> &Arc<ConnectionCache<C>> {
        &self.cache
    }

    /// Run one tool invocation and wrap the outcome in the response envelope.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<Map<String, JsonValue>>,
    ) -> ToolResponse {
        let start = Instant::now();

        let result = match ToolRequest::decode(name, arguments) {
            Ok(request) => {
                debug!(tool = request.tool_name(), "Dispatching tool call");
                self.run(request).await
            }
            Err(e) => Err(e),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(text) => {
                info!(tool = name, elapsed_ms, "Tool call succeeded");
                ToolResponse::success(text)
            }
            Err(e) => {
                warn!(tool = name, elapsed_ms, kind = e.kind(), error = %e, "Tool call failed");
                ToolResponse::from_error(&e)
            }
        }
    }

    async fn run(&self, request: ToolRequest) -> DbResult<String> {
        match request {
            ToolRequest::ListDatabases(input) => self.list_databases(input).await,
            ToolRequest::ListTables(input) => self.list_tables(input).await,
            ToolRequest::DescribeTable(input) => self.describe_table(input).await,
            ToolRequest::ExecuteQuery(input) => self.execute_query(input).await,
            ToolRequest::TestConnection(input) => self.test_connection(input).await,
            ToolRequest::CacheStatus => self.cache_status().await,
            ToolRequest::ServerInfo => self.server_info().await,
            ToolRequest::InsertRecord(input) => self.insert_record(input).await,
            ToolRequest::BulkInsert(input) => self.bulk_insert(input).await,
            ToolRequest::SelectRecords(input) => self.select_records(input).await,
            ToolRequest::GetRecordById(input) => self.get_record_by_id(input).await,
            ToolRequest::CountRecords(input) => self.count_records(input).await,
            ToolRequest::UpdateRecord(input) => self.update_record(input).await,
            ToolRequest::UpdateRecords(input) => self.update_records(input).await,
            ToolRequest::DeleteRecord(input) => self.delete_record(input).await,
            ToolRequest::DeleteRecords(input) => self.delete_records(input).await,
        }
    }

    pub async fn list_databases(&self, input: ListDatabasesInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, None);
        let output = self.execute(&settings, SHOW_DATABASES_SQL).await?;
        format::render(&format::databases_header(&settings.endpoint()), &output)
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let output = self.execute(&settings, SHOW_TABLES_SQL).await?;
        format::render(&format::tables_header(&input.database), &output)
    }

    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let statement = format!("DESCRIBE {}", quote_identifier(&input.table_name));
        let output = self.execute(&settings, &statement).await?;
        format::render(
            &format::table_structure_header(&input.table_name, &input.database),
            &output,
        )
    }

    /// Runs the caller's statement verbatim. Callers are trusted.
    pub async fn execute_query(&self, input: ExecuteQueryInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let output = self.execute(&settings, &input.query).await?;
        format::render(
            &format::query_header(&input.database, &input.query),
            &output,
        )
    }

    pub async fn test_connection(&self, input: TestConnectionInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, input.database.as_deref());
        let output = self.execute(&settings, SERVER_IDENTITY_SQL).await?;

        // A single row is expected; render it as an object rather than a list.
        match output.rows() {
            [row] => format::render(&format::connection_alive_header(&settings.endpoint()), row),
            _ => format::render(
                &format::connection_alive_header(&settings.endpoint()),
                &output,
            ),
        }
    }

    /// Report cached connections without waiting on calls that are using one.
    pub async fn cache_status(&self) -> DbResult<String> {
        let snapshot = self.cache.snapshot().await;
        let idle: Vec<String> = snapshot.idle.iter().map(ToString::to_string).collect();
        let busy: Vec<String> = snapshot.busy.iter().map(ToString::to_string).collect();
        format::render(
            &format::cache_status_header(idle.len()),
            &json!({ "idle": idle, "busy": busy }),
        )
    }

    /// Gateway identity, defaults and limits. The default password is never shown.
    pub async fn server_info(&self) -> DbResult<String> {
        let timeouts = self.cache.timeouts();
        let tools: Vec<String> = catalog::tools()
            .iter()
            .map(|tool| tool.name.to_string())
            .collect();
        let info = json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "client": self.cache.client().name(),
            "defaults": {
                "host": self.defaults.host,
                "port": self.defaults.port,
                "user": self.defaults.user,
            },
            "timeoutSecs": {
                "connect": timeouts.connect.as_secs(),
                "acquire": timeouts.acquire.as_secs(),
                "statement": timeouts.statement.as_secs(),
            },
            "cachedConnections": self.cache.len().await,
            "tools": tools,
        });
        format::render(
            &format::server_info_header(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            &info,
        )
    }

    pub async fn insert_record(&self, input: InsertRecordInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let statement = records::insert(&input.table_name, &input.data)?;
        let output = self.execute_bound(&settings, &statement).await?;
        format::render(
            &format::inserted_header(1, &input.table_name, &input.database),
            &output,
        )
    }

    /// Inserts every record in one multi-row statement, so either all rows land or none do.
    pub async fn bulk_insert(&self, input: BulkInsertInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let statement = records::bulk_insert(&input.table_name, &input.records)?;
        let output = self.execute_bound(&settings, &statement).await?;
        format::render(
            &format::inserted_header(input.records.len(), &input.table_name, &input.database),
            &output,
        )
    }

    pub async fn select_records(&self, input: SelectRecordsInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let statement = records::select(
            &input.table_name,
            records::SelectOptions {
                columns: input.columns.as_deref(),
                filters: input.filters.as_ref(),
                order_by: input.order_by.as_deref(),
                limit: input.limit,
            },
        )?;
        let output = self.execute_bound(&settings, &statement).await?;
        format::render(
            &format::records_header(&input.table_name, &input.database, output.rows().len()),
            &output,
        )
    }

    pub async fn get_record_by_id(&self, input: GetRecordByIdInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let statement =
            records::select_by_id(&input.table_name, &input.id_column, &input.id_value);
        let output = self.execute_bound(&settings, &statement).await?;

        let header = |found| {
            format::record_by_id_header(&input.table_name, &input.id_column, &input.id_value, found)
        };
        match output.rows().first() {
            Some(row) => format::render(&header(true), row),
            None => format::render(&header(false), &JsonValue::Null),
        }
    }

    pub async fn count_records(&self, input: CountRecordsInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let statement = records::count(&input.table_name, input.filters.as_ref());
        let output = self.execute_bound(&settings, &statement).await?;
        let header = format::count_header(&input.table_name, &input.database);
        match output.rows() {
            [row] => format::render(&header, row),
            _ => format::render(&header, &output),
        }
    }

    pub async fn update_record(&self, input: UpdateRecordInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let filters = records::id_filter(&input.id_column, &input.id_value);
        let statement = records::update(&input.table_name, &input.data, &filters)?;
        let output = self.execute_bound(&settings, &statement).await?;
        format::render(
            &format::updated_header(&input.table_name, &input.database),
            &output,
        )
    }

    pub async fn update_records(&self, input: UpdateRecordsInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let statement = records::update(&input.table_name, &input.data, &input.filters)?;
        let output = self.execute_bound(&settings, &statement).await?;
        format::render(
            &format::updated_header(&input.table_name, &input.database),
            &output,
        )
    }

    pub async fn delete_record(&self, input: DeleteRecordInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let filters = records::id_filter(&input.id_column, &input.id_value);
        let statement = records::delete(&input.table_name, &filters)?;
        let output = self.execute_bound(&settings, &statement).await?;
        format::render(
            &format::deleted_header(&input.table_name, &input.database),
            &output,
        )
    }

    /// Only reached with `confirm: true`; decoding rejects anything else.
    pub async fn delete_records(&self, input: DeleteRecordsInput) -> DbResult<String> {
        let settings = self.resolve(&input.connection, Some(&input.database));
        let statement = records::delete(&input.table_name, &input.filters)?;
        let output = self.execute_bound(&settings, &statement).await?;
        format::render(
            &format::deleted_header(&input.table_name, &input.database),
            &output,
        )
    }

    fn resolve(&self, params: &ConnectionParams, database: Option<&str>) -> ConnectionSettings {
        params.resolve(&self.defaults, database)
    }

    /// Acquire a handle and run one statement on it.
    ///
    /// Execution errors leave the cached connection in place; the next
    /// acquire's probe decides whether it is still usable.
    async fn execute(
        &self,
        settings: &ConnectionSettings,
        statement: &str,
    ) -> DbResult<StatementOutput> {
        let handle = self.cache.acquire(settings).await?;
        let output = self.cache.client().execute(&handle, statement).await?;
        debug!(key = %settings.key(), rows = output.row_count(), "Statement finished");
        Ok(output)
    }

    /// Like [`Self::execute`], for a prepared statement with bound values.
    async fn execute_bound(
        &self,
        settings: &ConnectionSettings,
        statement: &BoundStatement,
    ) -> DbResult<StatementOutput> {
        let handle = self.cache.acquire(settings).await?;
        let output = self
            .cache
            .client()
            .execute_bound(&handle, statement)
            .await?;
        debug!(key = %settings.key(), rows = output.row_count(), "Statement finished");
        Ok(output)
    }
}

/// Quote a MySQL identifier with backticks, doubling embedded backticks.
///
/// This keeps unusual table names well formed; it is not an injection guard.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_plain() {
        assert_eq!(quote_identifier("users"), "`users`");
    }

    #[test]
    fn test_quote_identifier_doubles_backticks() {
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(quote_identifier("`"), "````");
    }

    #[test]
    fn test_quote_identifier_keeps_spaces_and_dashes() {
        assert_eq!(quote_identifier("order items-2024"), "`order items-2024`");
    }
}
