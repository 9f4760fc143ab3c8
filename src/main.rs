//! MySQL Gateway MCP - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to inspect and query MySQL servers over stdio.

use mysql_gateway_mcp::config::Config;
use mysql_gateway_mcp::db::{ConnectionCache, MySqlClient};
use mysql_gateway_mcp::transport::{StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Everything goes to stderr: stdout carries the MCP protocol.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // MYSQL_* defaults may come from a .env file next to the binary's working dir
    dotenvy::dotenv().ok();

    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    let defaults = config.connection_defaults();
    info!(
        host = %defaults.host,
        port = defaults.port,
        user = %defaults.user,
        "Starting MySQL Gateway MCP v{}",
        env!("CARGO_PKG_VERSION")
    );

    let cache = Arc::new(ConnectionCache::with_timeouts(
        MySqlClient::new(),
        config.timeouts(),
    ));

    let transport = StdioTransport::new(cache, defaults);
    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
