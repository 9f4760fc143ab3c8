//! MCP tool implementations.
//!
//! This module contains the gateway's tool layer:
//! - `request`: Typed decoding of tool arguments
//! - `catalog`: Tool names, descriptions and input schemas
//! - `dispatcher`: Runs a decoded request against the connection cache
//! - `format`: Header plus pretty JSON response text
//! - `records`: Prepared statements for the record-level tools

pub mod catalog;
pub mod dispatcher;
pub mod format;
pub mod records;
pub mod request;

pub use dispatcher::{Dispatcher, quote_identifier};
pub use request::{
    BulkInsertInput, CacheStatusInput, CountRecordsInput, DeleteRecordInput, DeleteRecordsInput,
    DescribeTableInput, ExecuteQueryInput, GetRecordByIdInput, InsertRecordInput,
    ListDatabasesInput, ListTablesInput, SelectRecordsInput, ServerInfoInput, TestConnectionInput,
    ToolRequest, UpdateRecordInput, UpdateRecordsInput,
};
