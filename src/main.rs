//! ProgressDB server binary: load configuration, assemble the process,
//! serve HTTP until shutdown is requested, then drain and close in the
//! order spec.md §5 prescribes.

use std::path::Path;
use std::time::Duration;

use progressdb_config::{Config, LogFormat};

const WORKER_DRAIN_DEADLINE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(Some(Path::new(progressdb_config::CONFIG_FILE_NAME)))?;
    init_tracing(config.log_format);

    tracing::info!(bind = %config.http_bind_addr, workers = config.worker_count, "starting progressdb");
    let assembled = progressdb::wiring::assemble(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.http_bind_addr).await?;
    axum::serve(listener, assembled.router.clone()).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("shutting down");
    progressdb::wiring::shutdown(assembled, WORKER_DRAIN_DEADLINE).await?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Json => subscriber.json().try_init(),
        LogFormat::Compact => subscriber.try_init(),
    };
    if let Err(e) = result {
        eprintln!("failed to install tracing subscriber: {e}");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
