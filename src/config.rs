//! Configuration handling for the MySQL gateway.
//!
//! This module provides configuration management via CLI arguments and environment variables.
//! The `MYSQL_*` variables only seed defaults: every tool call may override host, port,
//! user and password per request.

use crate::db::ConnectTimeouts;
use crate::models::ConnectionDefaults;
use clap::Parser;
use std::time::Duration;

pub const DEFAULT_MYSQL_HOST: &str = "127.0.0.1";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_MYSQL_USER: &str = "root";

// Per-connection timeouts. Process-wide; tool callers cannot change them.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the MySQL gateway.
#[derive(Clone, Parser)]
#[command(
    name = "mysql-gateway-mcp",
    about = "MCP server that lets AI assistants inspect and query any reachable MySQL server",
    version,
    author
)]
pub struct Config {
    /// Default MySQL host used when a tool call omits `host`
    #[arg(long, default_value = DEFAULT_MYSQL_HOST, env = "MYSQL_HOST")]
    pub mysql_host: String,

    /// Default MySQL port used when a tool call omits `port`
    #[arg(long, default_value_t = DEFAULT_MYSQL_PORT, env = "MYSQL_PORT")]
    pub mysql_port: u16,

    /// Default MySQL user used when a tool call omits `user`
    #[arg(long, default_value = DEFAULT_MYSQL_USER, env = "MYSQL_USER")]
    pub mysql_user: String,

    /// Default MySQL password used when a tool call omits `password`
    #[arg(long, default_value = "", env = "MYSQL_PASSWORD", hide_env_values = true)]
    pub mysql_password: String,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Maximum seconds to wait for a cached connection that another call is using
    #[arg(
        long,
        default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS,
        env = "MCP_ACQUIRE_TIMEOUT"
    )]
    pub acquire_timeout: u64,

    /// Statement timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_STATEMENT_TIMEOUT_SECS,
        env = "MCP_STATEMENT_TIMEOUT"
    )]
    pub statement_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            mysql_host: DEFAULT_MYSQL_HOST.to_string(),
            mysql_port: DEFAULT_MYSQL_PORT,
            mysql_user: DEFAULT_MYSQL_USER.to_string(),
            mysql_password: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Defaults applied to every field a tool call leaves out.
    pub fn connection_defaults(&self) -> ConnectionDefaults {
        ConnectionDefaults {
            host: self.mysql_host.clone(),
            port: self.mysql_port,
            user: self.mysql_user.clone(),
            password: self.mysql_password.clone(),
        }
    }

    /// Timeouts applied to every physical connection the gateway opens.
    pub fn timeouts(&self) -> ConnectTimeouts {
        ConnectTimeouts {
            connect: Duration::from_secs(self.connect_timeout),
            acquire: Duration::from_secs(self.acquire_timeout),
            statement: Duration::from_secs(self.statement_timeout),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("mysql_host", &self.mysql_host)
            .field("mysql_port", &self.mysql_port)
            .field("mysql_user", &self.mysql_user)
            .field("mysql_password", &"****")
            .field("connect_timeout", &self.connect_timeout)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .field("log_level", &self.log_level)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
