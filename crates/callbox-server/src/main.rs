//! Callbox server binary: the voicemail bridge entry point.
//!
//! Starts an axum HTTP server with structured logging, spawns the outbound
//! queue publisher, and shuts down gracefully on SIGTERM/SIGINT.

use callbox_queue::AmqpPublisher;
use callbox_server::{app, config, AppState};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// How long shutdown waits for buffered recordings to reach the broker.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("CALLBOX_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("callbox.toml"));

    // Load configuration
    let (config, origin) = match config::load_config(selected_config_path).and_then(|loaded| {
        loaded.0.validate()?;
        Ok(loaded)
    }) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("callbox-server: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        origin = origin.as_str(),
        "resolved startup configuration path"
    );
    if origin == config::ConfigOrigin::Defaults {
        tracing::info!("config file not found, using defaults");
    }

    // Outbound queue
    let (publisher, receiver) =
        callbox_queue::channel(config.queue.capacity, config.queue.enqueue_timeout());
    let publisher_task = tokio::spawn(
        AmqpPublisher::new(config.queue.uri.clone(), config.queue.name.clone()).run(receiver),
    );

    // Build application
    let app = app(AppState::new(&config, publisher));
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(
        %addr,
        public_url = %config.webhook.public_url,
        start = %config.webhook.start_path,
        done = %config.webhook.done_path,
        "starting callbox server"
    );

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, "failed to bind listener: {}", e);
            std::process::exit(1);
        }
    };

    // Serve with graceful shutdown
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {}", e);
    }

    // The router owned the last publisher handle; wait for the buffer to drain.
    match tokio::time::timeout(DRAIN_TIMEOUT, publisher_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("publisher task join error: {}", e),
        Err(_) => tracing::warn!(
            timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "outbound queue not drained before shutdown, pending recordings dropped"
        ),
    }

    tracing::info!("callbox server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
