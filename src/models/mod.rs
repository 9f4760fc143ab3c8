//! Data models for the MySQL gateway.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod response;

// Re-export commonly used types
pub use connection::{
    ConnectionDefaults, ConnectionKey, ConnectionParams, ConnectionSettings, NO_DATABASE_SENTINEL,
};
pub use query::{BoundStatement, Row, StatementKind, StatementOutput};
pub use response::ToolResponse;
