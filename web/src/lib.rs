//! HTTP surface for the train station reservation engine.
//!
//! The handlers are thin: each one extracts the caller and the request,
//! calls [`ReservationEngine`](train_station_core::ReservationEngine),
//! [`QueryService`](train_station_core::QueryService) or the
//! [`Catalog`](train_station_core::Catalog), and maps the result.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives with `X-User-Id` (and optionally `X-User-Role`)
//! 2. **Extract** the caller, path, query and JSON body
//! 3. **Call** the engine, query service or catalog
//! 4. **Map** the domain error, if any, through [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use train_station_web::{bootstrap, build_router, Config};
//!
//! let config = Config::from_env()?;
//! let state = bootstrap::build_state(&config).await?;
//! let app = build_router(state);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use config::Config;
pub use error::AppError;
pub use extractors::{AdminUser, AuthenticatedUser, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
