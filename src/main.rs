//! Deprecation Middleware - CLI Entry Point

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use deprecation_middleware::metrics::DeprecationMetrics;
use deprecation_middleware::{
    annotate_routes, DeprecationConfig, DeprecationHeaders, DeprecationLayerState,
    ServiceConfig, TracingSink,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "deprecation-middleware",
    about = "Serve deprecated routes with Deprecation, Sunset and Link headers",
    version
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "deprecation.yaml")]
    config: PathBuf,

    /// Address to listen on (overrides the configuration file)
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Print the headers produced for "date,docUrl,sunset" and exit
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    preview: Option<String>,

    /// Enable metrics server
    #[arg(long)]
    metrics: bool,

    /// Metrics server port (overrides the configured port)
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        let default_config = include_str!("../demos/default-config.yaml");
        println!("{}", default_config);
        return Ok(());
    }

    if let Some(preview) = &args.preview {
        let config = DeprecationConfig::from_args(preview)?;
        for (name, value) in DeprecationHeaders::build(&config, &TracingSink).to_vec() {
            println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
        }
        return Ok(());
    }

    // Load configuration
    let config = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        ServiceConfig::from_file(&args.config)?
    } else if args.validate {
        anyhow::bail!("Configuration file not found: {:?}", args.config);
    } else {
        info!("Using default configuration");
        ServiceConfig::default()
    };

    if args.validate {
        println!("Configuration is valid ({} routes)", config.routes.len());
        return Ok(());
    }

    let metrics = if config.metrics.enabled {
        Some(DeprecationMetrics::new(&config.metrics.prefix).context("Failed to create metrics")?)
    } else {
        None
    };

    match (metrics.clone(), config.metrics.server_port(args.metrics, args.metrics_port)) {
        (Some(metrics), Some(port)) => {
            tokio::spawn(async move {
                start_metrics_server(metrics, port).await;
            });
        }
        (None, _) if args.metrics || args.metrics_port.is_some() => {
            tracing::warn!("Metrics server requested but metrics are disabled in configuration")
        }
        _ => {}
    }

    let state = Arc::new(DeprecationLayerState::from_config(&config).with_metrics(metrics));

    let app = Router::new()
        .route("/health", get(health))
        .fallback(stub_handler)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            annotate_routes,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = match args.listen {
        Some(addr) => addr,
        None => config
            .listen
            .parse()
            .with_context(|| format!("Invalid listen address: {}", config.listen))?,
    };
    let listener = TcpListener::bind(addr).await?;
    info!(
        addr = %addr,
        routes = config.routes.len(),
        "Deprecation middleware listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "deprecation-middleware",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Answers configured routes with `200 ok` and everything else with `404`.
async fn stub_handler(
    State(state): State<Arc<DeprecationLayerState>>,
    request: Request,
) -> (StatusCode, &'static str) {
    let path = request.uri().path();
    match state.find_route(path, request.method().as_str()) {
        Some(_) => (StatusCode::OK, "ok"),
        None => (StatusCode::NOT_FOUND, "not found"),
    }
}

async fn start_metrics_server(metrics: DeprecationMetrics, port: u16) {
    let listener = match TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start metrics server");
            return;
        }
    };

    info!(port = port, "Metrics server started");

    let app = Router::new().route(
        "/metrics",
        get(move || {
            let metrics = metrics.clone();
            async move { metrics.encode() }
        }),
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Metrics server failed");
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
