//! Error taxonomy for the catalog and the reservation engine.
//!
//! Catalog errors surface when entities are created or resolved. Reservation
//! errors are returned synchronously from order submission and cancellation.
//! [`ReservationError::Busy`] is the only kind a caller may retry unchanged.

use crate::types::{JourneyId, OrderId, SeatCoordinate, SeatLayout};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by [`Catalog`](crate::catalog::Catalog) implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The referenced entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Entity kind (`"journey"`, `"train"`, ...)
        entity: &'static str,
        /// Requested identifier
        id: Uuid,
    },

    /// The entity violates a catalog rule (equal route endpoints, zero capacity, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The journey has tickets, so its train or existence cannot change.
    #[error("Journey {0} has tickets and cannot be modified")]
    JourneyHasTickets(JourneyId),

    /// A lock could not be acquired within the configured bound.
    #[error("Catalog busy: {0}")]
    Busy(String),

    /// Underlying storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    /// Shorthand for [`CatalogError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Errors raised while submitting, cancelling or reading orders.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// The coordinate lies outside the journey's train layout.
    #[error("Invalid seat on journey {journey}: {seat} is outside {layout}")]
    InvalidSeat {
        /// Journey requested
        journey: JourneyId,
        /// Offending coordinate
        seat: SeatCoordinate,
        /// Layout of the journey's train
        layout: SeatLayout,
    },

    /// The coordinate is held by a committed ticket at commit time.
    #[error("Seat taken on journey {journey}: {seat}")]
    SeatTaken {
        /// Journey requested
        journey: JourneyId,
        /// Coordinate already sold
        seat: SeatCoordinate,
    },

    /// The same coordinate appears twice in one submission.
    #[error("Duplicate request for journey {journey}: {seat}")]
    DuplicateRequest {
        /// Journey requested
        journey: JourneyId,
        /// Repeated coordinate
        seat: SeatCoordinate,
    },

    /// Unknown journey or order.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Requested identifier
        id: Uuid,
    },

    /// The requester may not act on this order.
    #[error("Not allowed to access order {0}")]
    Forbidden(OrderId),

    /// Lock or transaction contention; safe to retry.
    #[error("Reservation busy, retry later: {0}")]
    Busy(String),

    /// Malformed request (empty order, already cancelled order, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Underlying storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ReservationError {
    /// Shorthand for [`ReservationError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether retrying the identical request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// Stable, low-cardinality label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSeat { .. } => "invalid_seat",
            Self::SeatTaken { .. } => "seat_taken",
            Self::DuplicateRequest { .. } => "duplicate_request",
            Self::NotFound { .. } => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Busy(_) => "busy",
            Self::Validation(_) => "validation",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<CatalogError> for ReservationError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { entity, id } => Self::NotFound { entity, id },
            CatalogError::Validation(msg) => Self::Validation(msg),
            CatalogError::JourneyHasTickets(journey) => {
                Self::Validation(format!("journey {journey} has tickets"))
            }
            CatalogError::Busy(msg) => Self::Busy(msg),
            CatalogError::Storage(msg) => Self::Storage(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_busy_is_retryable() {
        assert!(ReservationError::Busy("lock timeout".into()).is_retryable());
        assert!(
            !ReservationError::SeatTaken {
                journey: JourneyId::new(),
                seat: SeatCoordinate::new(1, 1),
            }
            .is_retryable()
        );
        assert!(!ReservationError::Validation("empty".into()).is_retryable());
    }

    #[test]
    fn catalog_errors_convert_without_losing_kind() {
        let id = JourneyId::new();
        let err: ReservationError = CatalogError::not_found("journey", *id.as_uuid()).into();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(err.to_string(), format!("journey with id {id} not found"));

        let busy: ReservationError = CatalogError::Busy("timeout".into()).into();
        assert!(busy.is_retryable());
    }

    #[test]
    fn invalid_seat_message_names_layout() {
        let err = ReservationError::InvalidSeat {
            journey: JourneyId::new(),
            seat: SeatCoordinate::new(3, 1),
            layout: SeatLayout::new(2, 10),
        };
        assert!(err.to_string().contains("carriage 3 seat 1 is outside 2 carriages x 10 seats"));
    }
}
