//! Connection-related data models.
//!
//! This module defines the per-request connection parameters, the process-wide
//! defaults they fall back to, and the key used to cache one connection per
//! distinct (host, port, user, database) identity.

use schemars::JsonSchema;
use serde::Deserialize;
use std::fmt;

/// Rendered in place of the database name when none is selected.
pub const NO_DATABASE_SENTINEL: &str = "no-db";

/// Connection fields a tool call may supply. Omitted fields use the process defaults.
#[derive(Clone, Default, Deserialize, JsonSchema)]
pub struct ConnectionParams {
    /// MySQL server address (default: MYSQL_HOST or 127.0.0.1)
    #[serde(default)]
    pub host: Option<String>,
    /// MySQL server port (default: MYSQL_PORT or 3306)
    #[serde(default)]
    pub port: Option<u16>,
    /// MySQL user (default: MYSQL_USER or root)
    #[serde(default)]
    pub user: Option<String>,
    /// MySQL password (default: MYSQL_PASSWORD or empty)
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

impl ConnectionParams {
    /// Merge with the process defaults.
    ///
    /// Empty strings and port 0 count as omitted.
    pub fn resolve(
        &self,
        defaults: &ConnectionDefaults,
        database: Option<&str>,
    ) -> ConnectionSettings {
        ConnectionSettings {
            host: non_empty(&self.host).unwrap_or(&defaults.host).to_string(),
            port: self.port.filter(|p| *p != 0).unwrap_or(defaults.port),
            user: non_empty(&self.user).unwrap_or(&defaults.user).to_string(),
            password: non_empty(&self.password)
                .unwrap_or(&defaults.password)
                .to_string(),
            database: database.filter(|db| !db.is_empty()).map(String::from),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Process-wide fallback values, seeded from the `MYSQL_*` environment variables.
#[derive(Clone)]
pub struct ConnectionDefaults {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Sensitive - never log
    pub password: String,
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        Self {
            host: crate::config::DEFAULT_MYSQL_HOST.to_string(),
            port: crate::config::DEFAULT_MYSQL_PORT,
            user: crate::config::DEFAULT_MYSQL_USER.to_string(),
            password: String::new(),
        }
    }
}

impl fmt::Debug for ConnectionDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDefaults")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .finish()
    }
}

/// Fully resolved parameters for one physical connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Sensitive - never log
    pub password: String,
    pub database: Option<String>,
}

impl ConnectionSettings {
    /// Cache identity of these settings. The password is not part of it.
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::derive(&self.host, self.port, &self.user, self.database.as_deref())
    }

    /// `host:port` label used in response headers.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("database", &self.database)
            .finish()
    }
}

/// Identity of a cached connection.
///
/// Compared and hashed field by field, so "no database" and a database
/// literally named `no-db` are distinct keys even though both display as
/// `host:port:user:no-db`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    host: String,
    port: u16,
    user: String,
    database: Option<String>,
}

impl ConnectionKey {
    pub fn derive(host: &str, port: u16, user: &str, database: Option<&str>) -> Self {
        Self {
            host: host.to_string(),
            port,
            user: user.to_string(),
            database: database.map(String::from),
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.host,
            self.port,
            self.user,
            self.database.as_deref().unwrap_or(NO_DATABASE_SENTINEL)
        )
    }
}
