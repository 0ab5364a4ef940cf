//! Error types for web handlers.
//!
//! [`AppError`] maps catalog and reservation errors onto HTTP statuses and a
//! `{"code", "message"}` JSON body.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use train_station_core::{CatalogError, ReservationError};

/// Seconds a client should wait before retrying a `Busy` failure.
pub const RETRY_AFTER_SECS: u64 = 1;

/// Application error type for web handlers.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Set for retryable failures
    retry_after: Option<u64>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, code: &'static str, message: String) -> Self {
        Self {
            status,
            message,
            code,
            retry_after: None,
            source: None,
        }
    }

    /// Attach the underlying failure for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message.into())
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message.into())
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{resource} with id {id} not found"),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message.into())
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, code, message.into())
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message.into(),
        )
    }

    /// Create a 503 Service Unavailable error carrying `Retry-After`.
    #[must_use]
    pub fn busy(message: impl Into<String>) -> Self {
        let mut err = Self::new(StatusCode::SERVICE_UNAVAILABLE, "BUSY", message.into());
        err.retry_after = Some(RETRY_AFTER_SECS);
        err
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::warn!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        }

        let retry_after = self.retry_after;
        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        let message = err.to_string();
        match err {
            ReservationError::InvalidSeat { .. } => Self::validation("INVALID_SEAT", message),
            ReservationError::DuplicateRequest { .. } => {
                Self::validation("DUPLICATE_REQUEST", message)
            }
            ReservationError::Validation(_) => Self::validation("VALIDATION_ERROR", message),
            ReservationError::SeatTaken { .. } => Self::conflict("SEAT_TAKEN", message),
            ReservationError::NotFound { entity, id } => Self::not_found(entity, id),
            ReservationError::Forbidden(_) => Self::forbidden(message),
            ReservationError::Busy(_) => Self::busy(message),
            ReservationError::Storage(_) => {
                Self::internal("An internal error occurred").with_source(anyhow::anyhow!(message))
            }
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::NotFound { entity, id } => Self::not_found(entity, id),
            CatalogError::Validation(_) => Self::validation("VALIDATION_ERROR", message),
            CatalogError::JourneyHasTickets(_) => Self::conflict("JOURNEY_HAS_TICKETS", message),
            CatalogError::Busy(_) => Self::busy(message),
            CatalogError::Storage(_) => {
                Self::internal("An internal error occurred").with_source(anyhow::anyhow!(message))
            }
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use train_station_core::{JourneyId, OrderId, SeatCoordinate, SeatLayout};

    #[test]
    fn test_error_display() {
        let err = AppError::unauthorized("missing X-User-Id");
        assert_eq!(err.to_string(), "[UNAUTHORIZED] missing X-User-Id");
    }

    #[test]
    fn test_reservation_error_statuses() {
        let journey = JourneyId::new();
        let seat = SeatCoordinate::new(1, 1);
        let cases = [
            (
                ReservationError::InvalidSeat {
                    journey,
                    seat,
                    layout: SeatLayout::new(1, 1),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ReservationError::DuplicateRequest { journey, seat },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ReservationError::SeatTaken { journey, seat }, StatusCode::CONFLICT),
            (
                ReservationError::not_found("journey", journey),
                StatusCode::NOT_FOUND,
            ),
            (
                ReservationError::Forbidden(OrderId::new()),
                StatusCode::FORBIDDEN,
            ),
            (
                ReservationError::Busy("timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ReservationError::Storage("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_busy_sets_retry_after() {
        let response = AppError::from(CatalogError::Busy("timeout".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[RETRY_AFTER], "1");
    }

    #[test]
    fn test_journey_has_tickets_is_conflict() {
        let err = AppError::from(CatalogError::JourneyHasTickets(JourneyId::new()));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "JOURNEY_HAS_TICKETS");
    }

    #[test]
    fn test_storage_message_is_not_exposed() {
        let err = AppError::from(CatalogError::Storage("password=hunter2".into()));
        assert_eq!(err.to_string(), "[INTERNAL_SERVER_ERROR] An internal error occurred");
    }
}
