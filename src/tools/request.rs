//! Typed tool requests.
//!
//! Tool arguments arrive as an untyped JSON object. They are decoded here,
//! once, into one request variant per tool so that handlers never look up
//! fields by name. Missing or mistyped fields become `InvalidInput`.

use crate::error::{DbError, DbResult};
use crate::models::ConnectionParams;
use crate::tools::records::Record;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

pub const SHOW_DATABASES: &str = "show_databases";
pub const SHOW_TABLES: &str = "show_tables";
pub const DESCRIBE_TABLE: &str = "describe_table";
pub const EXECUTE_QUERY: &str = "execute_query";
pub const TEST_CONNECTION: &str = "test_connection";
pub const CONNECTION_CACHE_STATUS: &str = "connection_cache_status";
pub const GET_SERVER_INFO: &str = "get_server_info";
pub const INSERT_RECORD: &str = "insert_record";
pub const BULK_INSERT: &str = "bulk_insert";
pub const SELECT_RECORDS: &str = "select_records";
pub const GET_RECORD_BY_ID: &str = "get_record_by_id";
pub const COUNT_RECORDS: &str = "count_records";
pub const UPDATE_RECORD: &str = "update_record";
pub const UPDATE_RECORDS: &str = "update_records";
pub const DELETE_RECORD: &str = "delete_record";
pub const DELETE_RECORDS: &str = "delete_records";

/// Input for the show_databases tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListDatabasesInput {
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the show_tables tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Database whose tables to list
    pub database: String,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Database containing the table
    pub database: String,
    /// Table to describe
    pub table_name: String,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the execute_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteQueryInput {
    /// Database to run the statement against
    pub database: String,
    /// SQL statement, run exactly as given
    pub query: String,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the test_connection tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct TestConnectionInput {
    /// Database to select (optional)
    #[serde(default)]
    pub database: Option<String>,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the connection_cache_status tool. Takes no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CacheStatusInput {}

/// Input for the get_server_info tool. Takes no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ServerInfoInput {}

fn default_id_column() -> String {
    "id".to_string()
}

/// Input for the insert_record tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct InsertRecordInput {
    /// Database containing the table
    pub database: String,
    /// Table to insert into
    pub table_name: String,
    /// Column → value pairs of the new record
    pub data: Record,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the bulk_insert tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BulkInsertInput {
    /// Database containing the table
    pub database: String,
    /// Table to insert into
    pub table_name: String,
    /// Records to insert, all with the same columns
    pub records: Vec<Record>,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the select_records tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SelectRecordsInput {
    /// Database containing the table
    pub database: String,
    /// Table to read
    pub table_name: String,
    /// Columns to return (default: all)
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    /// Column → value equality filters, joined with AND
    #[serde(default, rename = "where")]
    pub filters: Option<Record>,
    /// Maximum number of rows (0 or absent: no limit)
    #[serde(default)]
    pub limit: Option<u64>,
    /// Ordering such as "name ASC, created_at DESC"
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the get_record_by_id tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetRecordByIdInput {
    /// Database containing the table
    pub database: String,
    /// Table to read
    pub table_name: String,
    /// Id of the record
    pub id_value: JsonValue,
    /// Column holding the id (default: "id")
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the count_records tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CountRecordsInput {
    /// Database containing the table
    pub database: String,
    /// Table to count
    pub table_name: String,
    /// Column → value equality filters, joined with AND
    #[serde(default, rename = "where")]
    pub filters: Option<Record>,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the update_record tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateRecordInput {
    /// Database containing the table
    pub database: String,
    /// Table to update
    pub table_name: String,
    /// Id of the record
    pub id_value: JsonValue,
    /// Column holding the id (default: "id")
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Column → new value pairs
    pub data: Record,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the update_records tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateRecordsInput {
    /// Database containing the table
    pub database: String,
    /// Table to update
    pub table_name: String,
    /// Column → new value pairs
    pub data: Record,
    /// Column → value equality filters, joined with AND (required)
    #[serde(rename = "where")]
    pub filters: Record,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the delete_record tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteRecordInput {
    /// Database containing the table
    pub database: String,
    /// Table to delete from
    pub table_name: String,
    /// Id of the record
    pub id_value: JsonValue,
    /// Column holding the id (default: "id")
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Input for the delete_records tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteRecordsInput {
    /// Database containing the table
    pub database: String,
    /// Table to delete from
    pub table_name: String,
    /// Column → value equality filters, joined with AND (required)
    #[serde(rename = "where")]
    pub filters: Record,
    /// Must be true for anything to be deleted
    #[serde(default)]
    pub confirm: bool,
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// One decoded tool invocation.
#[derive(Debug, Clone)]
pub enum ToolRequest {
    ListDatabases(ListDatabasesInput),
    ListTables(ListTablesInput),
    DescribeTable(DescribeTableInput),
    ExecuteQuery(ExecuteQueryInput),
    TestConnection(TestConnectionInput),
    CacheStatus,
    ServerInfo,
    InsertRecord(InsertRecordInput),
    BulkInsert(BulkInsertInput),
    SelectRecords(SelectRecordsInput),
    GetRecordById(GetRecordByIdInput),
    CountRecords(CountRecordsInput),
    UpdateRecord(UpdateRecordInput),
    UpdateRecords(UpdateRecordsInput),
    DeleteRecord(DeleteRecordInput),
    DeleteRecords(DeleteRecordsInput),
}

impl ToolRequest {
    /// Decode a tool name and its argument object.
    ///
    /// Absent arguments are treated as an empty object.
    pub fn decode(name: &str, arguments: Option<Map<String, JsonValue>>) -> DbResult<Self> {
        let args = JsonValue::Object(arguments.unwrap_or_default());

        let request = match name {
            SHOW_DATABASES => Self::ListDatabases(parse(name, args)?),
            SHOW_TABLES => {
                let input: ListTablesInput = parse(name, args)?;
                require_non_empty(name, "database", &input.database)?;
                Self::ListTables(input)
            }
            DESCRIBE_TABLE => {
                let input: DescribeTableInput = parse(name, args)?;
                require_non_empty(name, "database", &input.database)?;
                require_non_empty(name, "table_name", &input.table_name)?;
                Self::DescribeTable(input)
            }
            EXECUTE_QUERY => {
                let input: ExecuteQueryInput = parse(name, args)?;
                require_non_empty(name, "database", &input.database)?;
                require_non_empty(name, "query", input.query.trim())?;
                Self::ExecuteQuery(input)
            }
            TEST_CONNECTION => Self::TestConnection(parse(name, args)?),
            CONNECTION_CACHE_STATUS => {
                let _: CacheStatusInput = parse(name, args)?;
                Self::CacheStatus
            }
            GET_SERVER_INFO => {
                let _: ServerInfoInput = parse(name, args)?;
                Self::ServerInfo
            }
            INSERT_RECORD => {
                let input: InsertRecordInput = parse(name, args)?;
                require_table(name, &input.database, &input.table_name)?;
                Self::InsertRecord(input)
            }
            BULK_INSERT => {
                let input: BulkInsertInput = parse(name, args)?;
                require_table(name, &input.database, &input.table_name)?;
                Self::BulkInsert(input)
            }
            SELECT_RECORDS => {
                let input: SelectRecordsInput = parse(name, args)?;
                require_table(name, &input.database, &input.table_name)?;
                Self::SelectRecords(input)
            }
            GET_RECORD_BY_ID => {
                let input: GetRecordByIdInput = parse(name, args)?;
                require_table(name, &input.database, &input.table_name)?;
                require_id(name, &input.id_column, &input.id_value)?;
                Self::GetRecordById(input)
            }
            COUNT_RECORDS => {
                let input: CountRecordsInput = parse(name, args)?;
                require_table(name, &input.database, &input.table_name)?;
                Self::CountRecords(input)
            }
            UPDATE_RECORD => {
                let input: UpdateRecordInput = parse(name, args)?;
                require_table(name, &input.database, &input.table_name)?;
                require_id(name, &input.id_column, &input.id_value)?;
                Self::UpdateRecord(input)
            }
            UPDATE_RECORDS => {
                let input: UpdateRecordsInput = parse(name, args)?;
                require_table(name, &input.database, &input.table_name)?;
                Self::UpdateRecords(input)
            }
            DELETE_RECORD => {
                let input: DeleteRecordInput = parse(name, args)?;
                require_table(name, &input.database, &input.table_name)?;
                require_id(name, &input.id_column, &input.id_value)?;
                Self::DeleteRecord(input)
            }
            DELETE_RECORDS => {
                let input: DeleteRecordsInput = parse(name, args)?;
                require_table(name, &input.database, &input.table_name)?;
                if !input.confirm {
                    return Err(DbError::invalid_input(format!(
                        "{} deletes every matching row; pass `confirm: true` to run it",
                        name
                    )));
                }
                Self::DeleteRecords(input)
            }
            other => return Err(DbError::unknown_tool(other)),
        };

        Ok(request)
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::ListDatabases(_) => SHOW_DATABASES,
            Self::ListTables(_) => SHOW_TABLES,
            Self::DescribeTable(_) => DESCRIBE_TABLE,
            Self::ExecuteQuery(_) => EXECUTE_QUERY,
            Self::TestConnection(_) => TEST_CONNECTION,
            Self::CacheStatus => CONNECTION_CACHE_STATUS,
            Self::ServerInfo => GET_SERVER_INFO,
            Self::InsertRecord(_) => INSERT_RECORD,
            Self::BulkInsert(_) => BULK_INSERT,
            Self::SelectRecords(_) => SELECT_RECORDS,
            Self::GetRecordById(_) => GET_RECORD_BY_ID,
            Self::CountRecords(_) => COUNT_RECORDS,
            Self::UpdateRecord(_) => UPDATE_RECORD,
            Self::UpdateRecords(_) => UPDATE_RECORDS,
            Self::DeleteRecord(_) => DELETE_RECORD,
            Self::DeleteRecords(_) => DELETE_RECORDS,
        }
    }
}

fn parse<T: DeserializeOwned>(tool: &str, args: JsonValue) -> DbResult<T> {
    serde_json::from_value(args)
        .map_err(|e| DbError::invalid_input(format!("Invalid arguments for {}: {}", tool, e)))
}

fn require_table(tool: &str, database: &str, table_name: &str) -> DbResult<()> {
    require_non_empty(tool, "database", database)?;
    require_non_empty(tool, "table_name", table_name)
}

fn require_id(tool: &str, id_column: &str, id_value: &JsonValue) -> DbResult<()> {
    require_non_empty(tool, "id_column", id_column)?;
    if id_value.is_null() {
        return Err(DbError::invalid_input(format!(
            "Invalid arguments for {}: `id_value` must not be null",
            tool
        )));
    }
    Ok(())
}

fn require_non_empty(tool: &str, field: &str, value: &str) -> DbResult<()> {
    if value.is_empty() {
        return Err(DbError::invalid_input(format!(
            "Invalid arguments for {}: `{}` must not be empty",
            tool, field
        )));
    }
    Ok(())
}
