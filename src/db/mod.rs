//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - The client capability a target database implements
//! - The MySQL client built on sqlx, with JSON parameter binding
//! - The connection cache that owns connection lifecycles
//! - Type mappings from MySQL columns to JSON

pub mod cache;
pub mod client;
pub mod mysql;
mod params;
pub mod types;

pub use cache::{CacheSnapshot, ConnectionCache, ShutdownReport};
pub use client::{ConnectTimeouts, DatabaseClient};
pub use mysql::{MySqlClient, MySqlHandle};
