//! Database client capability.
//!
//! The connection cache and the dispatcher only talk to a database through
//! this trait, so a target database plugs in by implementing it.
//! `MySqlClient` is the production implementation.

use crate::error::DbResult;
use crate::models::{BoundStatement, ConnectionSettings, StatementOutput};
use std::future::Future;
use std::time::Duration;

/// Timeouts applied to each physical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectTimeouts {
    /// Establishing the TCP session and authenticating.
    pub connect: Duration,
    /// Waiting for a connection another call is currently using.
    pub acquire: Duration,
    /// Running one statement, including fetching its rows.
    pub statement: Duration,
}

impl Default for ConnectTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(crate::config::DEFAULT_CONNECT_TIMEOUT_SECS),
            acquire: Duration::from_secs(crate::config::DEFAULT_ACQUIRE_TIMEOUT_SECS),
            statement: Duration::from_secs(crate::config::DEFAULT_STATEMENT_TIMEOUT_SECS),
        }
    }
}

/// Operations the gateway needs from a database driver.
pub trait DatabaseClient: Send + Sync + 'static {
    /// Cheap-to-clone reference to one physical connection.
    type Handle: Clone + Send + Sync + 'static;

    /// Open a new physical connection.
    fn connect(
        &self,
        settings: &ConnectionSettings,
        timeouts: &ConnectTimeouts,
    ) -> impl Future<Output = DbResult<Self::Handle>> + Send;

    /// Round trip confirming the connection is still usable.
    ///
    /// A handle that is busy running another call's statement counts as
    /// alive; only a failed round trip marks it dead.
    fn probe(&self, handle: &Self::Handle) -> impl Future<Output = DbResult<()>> + Send;

    /// Run a statement verbatim.
    fn execute(
        &self,
        handle: &Self::Handle,
        statement: &str,
    ) -> impl Future<Output = DbResult<StatementOutput>> + Send;

    /// Run a prepared statement with its bound values.
    fn execute_bound(
        &self,
        handle: &Self::Handle,
        statement: &BoundStatement,
    ) -> impl Future<Output = DbResult<StatementOutput>> + Send;

    /// Gracefully close the connection. Best effort.
    fn close(&self, handle: Self::Handle) -> impl Future<Output = DbResult<()>> + Send;

    /// Name used in log lines.
    fn name(&self) -> &'static str;
}
