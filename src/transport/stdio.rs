//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.
//! Logs must never reach stdout here; see `main`'s subscriber setup.

use crate::db::{ConnectionCache, DatabaseClient, MySqlClient};
use crate::error::{DbError, DbResult};
use crate::mcp::GatewayService;
use crate::models::ConnectionDefaults;
use crate::transport::Transport;
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout, following the MCP protocol specification.
pub struct StdioTransport<C: DatabaseClient = MySqlClient> {
    cache: Arc<ConnectionCache<C>>,
    defaults: ConnectionDefaults,
}

impl<C: DatabaseClient> StdioTransport<C> {
    /// Create a new stdio transport around the shared connection cache.
    pub fn new(cache: Arc<ConnectionCache<C>>, defaults: ConnectionDefaults) -> Self {
        Self { cache, defaults }
    }

    /// Close every cached connection, logging the outcome.
    async fn close_connections(&self) {
        info!("Closing all database connections");
        let report = self.cache.shutdown().await;
        for key in &report.failed {
            warn!(key = %key, "Connection did not close cleanly");
        }
    }
}

impl<C: DatabaseClient> Transport for StdioTransport<C> {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = GatewayService::new(Arc::clone(&self.cache), self.defaults.clone());

        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        self.close_connections().await;
                        return Err(DbError::internal(format!(
                            "Stdio transport error: {}",
                            e
                        )));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            // Spawn a task to listen for second signal and force exit
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        self.close_connections().await;

        if shutdown_requested {
            // tokio::select! cannot interrupt the blocking stdin read
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
///
/// A handler that cannot be installed never fires.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
