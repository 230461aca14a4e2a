//! Retailer - GraphQL backend-for-frontend over RetailCRM.
//!
//! # Usage
//!
//! ```bash
//! # Configuration from the environment (or a .env file)
//! RETAIL_URL=https://shop.retailcrm.ru RETAIL_KEY=... retailer
//!
//! # Explicit flags
//! retailer --retail-url https://shop.retailcrm.ru --retail-key ... --max-concurrent-requests 5
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::{EnvFilter, fmt};

use retailer_core::metrics::init_metrics;
use retailer_core::services::{DEFAULT_MAX_CONCURRENT_REQUESTS, RetailGateway};
use retailer_crm::{HttpTransport, HttpTransportConfig};
use retailer_graphql::{ServerConfig, build_schema, serve_with_shutdown};

/// Retailer CLI - GraphQL gateway for a retail CRM.
#[derive(Parser, Debug)]
#[command(name = "retailer")]
#[command(about = "Retailer - GraphQL backend-for-frontend over RetailCRM")]
#[command(version)]
struct Cli {
    /// RetailCRM root URL (the API prefix is appended automatically).
    #[arg(long, env = "RETAIL_URL")]
    retail_url: String,

    /// RetailCRM API key.
    #[arg(long, env = "RETAIL_KEY", hide_env_values = true)]
    retail_key: String,

    /// Maximum number of simultaneous requests to the CRM.
    #[arg(long, env = "MAX_CONCURRENT_REQUESTS", default_value_t = DEFAULT_MAX_CONCURRENT_REQUESTS)]
    max_concurrent_requests: usize,

    /// Per-request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "10")]
    request_timeout_secs: u64,

    /// GraphQL server port.
    #[arg(long, env = "GRAPHQL_PORT", default_value = "4000")]
    graphql_port: u16,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Disable the GraphiQL playground.
    #[arg(long, env = "DISABLE_PLAYGROUND")]
    no_playground: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled =
        match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>() {
            Ok(metrics_addr) => {
                match PrometheusBuilder::new()
                    .with_http_listener(metrics_addr)
                    .install()
                {
                    Ok(()) => {
                        init_metrics();
                        true
                    }
                    Err(e) => {
                        warn!(
                            "⚠️  Failed to start metrics exporter: {}. Continuing without metrics.",
                            e
                        );
                        false
                    }
                }
            }
            Err(e) => {
                warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
                false
            }
        };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Retailer");
    debug!(retail_url = %redact_url(&cli.retail_url), "CRM endpoint");

    // ─────────────────────────────────────────────────────────────────────────
    // 🛒 CRM GATEWAY
    // ─────────────────────────────────────────────────────────────────────────
    let transport_config = HttpTransportConfig {
        base_url: cli.retail_url.clone(),
        api_key: cli.retail_key.clone(),
        timeout: Duration::from_secs(cli.request_timeout_secs),
    };
    debug!(config = ?transport_config, "HTTP transport config");

    let transport = HttpTransport::new(transport_config).context("Failed to build CRM client")?;
    let api_url = transport.api_url().to_string();

    let gateway = RetailGateway::new(Arc::new(transport), cli.max_concurrent_requests)
        .context("Invalid gateway configuration")?;

    info!(
        api = %redact_url(&api_url),
        max_concurrent = cli.max_concurrent_requests,
        timeout_secs = cli.request_timeout_secs,
        "🛒 CRM gateway ready"
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVER START
    // ─────────────────────────────────────────────────────────────────────────
    let schema = build_schema(Arc::new(gateway));
    let graphql_config = ServerConfig {
        host: "0.0.0.0".to_string(),
        port: cli.graphql_port,
        enable_playground: !cli.no_playground,
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let graphql_handle = tokio::spawn(
        async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = serve_with_shutdown(schema, graphql_config, shutdown).await {
                error!(error = %e, "❌ Server error");
            }
            debug!("Server stopped");
        }
        .instrument(info_span!("graphql")),
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ Retailer ready");
    info!("   ⚡ GraphQL:  http://localhost:{}/graphql", cli.graphql_port);
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    shutdown_signal().await;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(Duration::from_secs(10), graphql_handle).await {
        Ok(_) => debug!("GraphQL stopped"),
        Err(_) => warn!("⚠️  GraphQL shutdown timed out"),
    }

    info!("🛑 Shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Strip credentials and query parameters from a URL for logging.
fn redact_url(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.set_query(None);
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
