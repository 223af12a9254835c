//! lazydb MCP bridge - main entry point.
//!
//! Launched as a child process by an MCP host. Reads JSON-RPC requests from
//! stdin, answers on stdout, logs to stderr. The connection set comes from
//! the descriptor store maintained by the lazydb terminal UI.

use clap::Parser;
use lazydb_mcp::config::{self, ApiKeys, Config};
use lazydb_mcp::db::Database;
use lazydb_mcp::mcp::{ProtocolEngine, ToolRegistry};
use lazydb_mcp::resolver::{ActiveResolver, ResolveConnection};
use lazydb_mcp::store::StoreSnapshot;
use lazydb_mcp::tools;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for logging.
///
/// Everything goes to stderr; stdout carries the protocol stream.
fn init_tracing(config: &Config) {
    let default_filter = if config.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
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

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_tracing(&config);

    let api_keys = ApiKeys::from_env();
    debug!(providers = ?api_keys.configured(), "AI provider keys detected");

    let Some(store_path) = config::default_store_path() else {
        eprintln!("Error: could not determine the configuration directory.");
        return ExitCode::FAILURE;
    };

    // Validate the store once up front; later reads happen per tool call.
    let snapshot = match StoreSnapshot::load(&store_path).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("Expected connection store at: {}", store_path.display());
            eprintln!("Create connections with the lazydb terminal UI first.");
            return ExitCode::FAILURE;
        }
    };
    if snapshot.connections.is_empty() {
        eprintln!("Error: no connections configured in {}", store_path.display());
        eprintln!("Create connections with the lazydb terminal UI first.");
        return ExitCode::FAILURE;
    }

    info!(
        connections = snapshot.connections.len(),
        store = %store_path.display(),
        "Starting lazydb MCP bridge v{}",
        config::SERVER_VERSION
    );

    let resolver = Arc::new(ActiveResolver::new(
        store_path,
        config.connection_override().map(String::from),
    ));
    let tool_resolver: Arc<dyn ResolveConnection> = resolver.clone();

    // Connect the active selection once so misconfiguration fails fast; every
    // tool call re-resolves afterwards.
    if let Err(e) = resolver.resolve().await {
        error!(error = %e, "Initial connection failed");
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let registry = Arc::new(ToolRegistry::new());
    tools::register_all(&registry, &tool_resolver);
    info!(tools = registry.count(), "Registered tool catalog");

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_token.cancel();
    });

    let mut engine = ProtocolEngine::new(registry);
    let reader = BufReader::new(tokio::io::stdin());
    let result = engine.run(token, reader, tokio::io::stdout()).await;

    // Close any driver handles the session opened.
    let capabilities: Vec<_> = {
        let broker = resolver.broker();
        broker
            .list()
            .iter()
            .filter_map(|name| broker.get(name))
            .collect()
    };
    for capability in capabilities {
        let _ = capability.disconnect().await;
    }
    info!("All connections closed");

    match result {
        Ok(()) => {
            info!("Bridge shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Bridge error");
            ExitCode::FAILURE
        }
    }
}
