//! `PostgreSQL` storage for the train station reservation engine.
//!
//! [`PostgresStore`] implements both [`Catalog`](train_station_core::Catalog)
//! and [`TicketStore`](train_station_core::TicketStore) on one connection pool.
//!
//! # Occupancy
//!
//! Committed seats are rows of `tickets` with `cancelled_at IS NULL`. A
//! partial unique index on `(journey_id, carriage, seat)` over those rows makes
//! a double sale impossible regardless of how many servers share the database.
//! An order's tickets are inserted in one transaction, in `(journey, carriage,
//! seat)` order, so overlapping orders wait on each other in a consistent order.
//! Every write transaction sets `lock_timeout`; an expired wait is reported as
//! `Busy`.
//!
//! # Example
//!
//! ```ignore
//! use train_station_postgres::{PostgresStore, StoreOptions};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresStore::connect("postgres://localhost/trains", StoreOptions::default()).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod error;
mod tickets;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use thiserror::Error;

/// Connection and locking settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreOptions {
    /// Pool upper bound
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// Bound on acquiring a pooled connection
    pub connect_timeout: Duration,
    /// `lock_timeout` applied to every write transaction
    pub lock_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            lock_timeout: Duration::from_millis(2000),
        }
    }
}

/// Failure to set up the store.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The database could not be reached.
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// A migration failed.
    #[error("Migration failed: {0}")]
    Migrate(#[source] sqlx::migrate::MigrateError),
}

/// `PostgreSQL` catalog and ticket store.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStore {
    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Connect`] if the database is unreachable.
    pub async fn connect(database_url: &str, options: StoreOptions) -> Result<Self, SetupError> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(options.min_connections)
            .acquire_timeout(options.connect_timeout)
            .connect(database_url)
            .await
            .map_err(SetupError::Connect)?;

        tracing::info!(
            max_connections = options.max_connections,
            lock_timeout = ?options.lock_timeout,
            "Connected to PostgreSQL"
        );
        Ok(Self::from_pool(pool).with_lock_timeout(options.lock_timeout))
    }

    /// Wrap an existing pool with the default lock timeout.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: StoreOptions::default().lock_timeout,
        }
    }

    /// Override the `lock_timeout` of write transactions.
    #[must_use]
    pub const fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Migrate`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), SetupError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(SetupError::Migrate)?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a write transaction with the configured `lock_timeout`.
    async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        // SET takes no bind parameters
        let statement = format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis().max(1)
        );
        sqlx::query(&statement).execute(&mut *tx).await?;
        Ok(tx)
    }
}
