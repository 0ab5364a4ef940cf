//! Train station reservation HTTP server.
//!
//! Configuration comes from the environment (and `.env` when present).

use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use train_station_web::{bootstrap, build_router, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&config.server.log_level)
                .unwrap_or_else(|_| EnvFilter::new(train_station_web::config::DEFAULT_LOG_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }
    info!(
        backend = ?config.database.backend,
        addr = %format!("{}:{}", config.server.host, config.server.port),
        "Starting train station server"
    );

    if config.metrics.enabled {
        let handle = bootstrap::install_metrics()?;
        bootstrap::spawn_metrics_server(config.metrics_addr()?, handle).await?;
    }

    let state = bootstrap::build_state(&config).await?;
    let app = build_router(state);

    let addr = config.server_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    let finished = tokio::select! {
        () = bootstrap::shutdown_signal() => None,
        result = &mut server => Some(result),
    };

    match finished {
        Some(result) => report(result),
        None => {
            info!("Shutdown requested, draining in-flight requests");
            let _ = stop_tx.send(());
            match tokio::time::timeout(config.server.shutdown_timeout, server).await {
                Ok(result) => report(result),
                Err(_) => warn!(
                    timeout = ?config.server.shutdown_timeout,
                    "Shutdown timed out, dropping open connections"
                ),
            }
        }
    }

    info!("Server stopped");
    Ok(())
}

fn report(result: Result<std::io::Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(error = %err, "HTTP server failed"),
        Err(err) => error!(error = %err, "HTTP server task panicked"),
    }
}
