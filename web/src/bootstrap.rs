//! Server bootstrap: storage selection, metrics exporter and shutdown.

use crate::config::{Config, StorageBackend};
use crate::state::AppState;
use anyhow::Context;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use train_station_core::{Catalog, Clock, SystemClock, TicketStore};
use train_station_postgres::{PostgresStore, StoreOptions};
use train_station_memory::InMemoryStore;

/// Latency buckets for every `*_duration_seconds` histogram.
const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Build the application state over the configured storage backend.
///
/// The `PostgreSQL` backend connects and applies migrations first.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (catalog, tickets): (Arc<dyn Catalog>, Arc<dyn TicketStore>) =
        match config.database.backend {
            StorageBackend::Postgres => {
                let options = StoreOptions {
                    max_connections: config.database.max_connections,
                    min_connections: config.database.min_connections,
                    connect_timeout: config.database.connect_timeout,
                    lock_timeout: config.database.lock_timeout,
                };
                let store = PostgresStore::connect(&config.database.url, options)
                    .await
                    .context("connecting to PostgreSQL")?;
                store.migrate().await.context("running migrations")?;
                shared(store)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on shutdown");
                shared(InMemoryStore::with_lock_timeout(
                    config.reservation.lock_timeout,
                ))
            }
        };

    Ok(AppState::new(catalog, tickets, clock, config.reservation))
}

fn shared<S>(store: S) -> (Arc<dyn Catalog>, Arc<dyn TicketStore>)
where
    S: Catalog + TicketStore + Clone + 'static,
{
    (Arc::new(store.clone()), Arc::new(store))
}

/// Install the Prometheus recorder and describe the reservation metrics.
///
/// # Errors
///
/// Returns an error if a global recorder is already installed.
pub fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .context("configuring histogram buckets")?
        .install_recorder()
        .context("installing metrics recorder")?;
    train_station_core::metrics::describe_metrics();
    Ok(handle)
}

/// Router exposing `GET /metrics` in the Prometheus text format.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

/// Serve the metrics router on its own listener until shutdown.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn spawn_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding metrics listener on {addr}"))?;
    tracing::info!(%addr, "Metrics available at http://{addr}/metrics");

    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, metrics_router(handle))
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            tracing::error!(error = %err, "Metrics server failed");
        }
    }))
}

/// Wait for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_needs_no_database() {
        let config = Config::from_lookup(|key| match key {
            "STORAGE_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .unwrap();

        let state = build_state(&config).await.unwrap();
        assert!(state.queries.list_stations().await.unwrap().is_empty());
        assert_eq!(state.settings.journey_page_size, 5);
    }
}
