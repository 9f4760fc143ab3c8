//! MySQL Gateway MCP Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to list, describe and query any MySQL server they can reach. Connection
//! fields are supplied per call, with process-wide defaults, and connections
//! are cached per (host, port, user, database).

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::GatewayService;
