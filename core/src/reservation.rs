//! Reservation engine: validates seat requests and commits them as orders.
//!
//! # Submission pipeline
//!
//! 1. Reject an empty request
//! 2. Reject a coordinate requested twice ([`ReservationError::DuplicateRequest`])
//! 3. Resolve every journey and its train ([`ReservationError::NotFound`])
//! 4. Check every coordinate against its train layout ([`ReservationError::InvalidSeat`])
//! 5. Hand the order to the [`TicketStore`] for the atomic, serialised commit
//!    ([`ReservationError::SeatTaken`], [`ReservationError::Busy`])
//!
//! Steps 1-4 never touch occupancy, so a rejected request leaves the seat map
//! unchanged. Races are decided in step 5 only: of two concurrent requests for
//! the same coordinate exactly one commits. Nothing is retried implicitly.

use crate::environment::Clock;
use crate::error::ReservationError;
use crate::metrics;
use crate::seat_map::SeatMap;
use crate::store::{PendingOrder, PendingTicket, TicketStore};
use crate::types::{
    JourneyId, Order, OrderId, Page, PageRequest, Requester, SeatLayout, SeatRequest, TicketId,
    TrainId, UserId,
};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// Result type for reservation operations.
pub type Result<T> = std::result::Result<T, ReservationError>;

/// Order submission and cancellation.
#[derive(Clone)]
pub struct ReservationEngine {
    seat_map: SeatMap,
    tickets: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
}

impl ReservationEngine {
    /// Creates an engine over a seat map and the ticket store backing it.
    #[must_use]
    pub fn new(seat_map: SeatMap, tickets: Arc<dyn TicketStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            seat_map,
            tickets,
            clock,
        }
    }

    /// The seat map the engine validates against.
    #[must_use]
    pub const fn seat_map(&self) -> &SeatMap {
        &self.seat_map
    }

    /// Validate and atomically commit one order with a ticket per request.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::Validation`]: empty request
    /// - [`ReservationError::DuplicateRequest`]: a coordinate appears twice
    /// - [`ReservationError::NotFound`]: unknown journey
    /// - [`ReservationError::InvalidSeat`]: coordinate outside the layout
    /// - [`ReservationError::SeatTaken`]: coordinate committed by another order
    /// - [`ReservationError::Busy`]: lock wait expired, safe to retry
    #[tracing::instrument(skip(self, requests), fields(tickets = requests.len()))]
    pub async fn submit_order(&self, user: UserId, requests: Vec<SeatRequest>) -> Result<Order> {
        let result = self.try_submit(user, &requests).await;
        match &result {
            Ok(order) => {
                tracing::info!(order_id = %order.id, tickets = order.tickets.len(), "Order committed");
            }
            Err(err @ ReservationError::Busy(_)) => {
                tracing::warn!(error = %err, "Order commit contended");
                metrics::record_order_rejected(err.kind());
            }
            Err(err) => {
                tracing::debug!(error = %err, "Order rejected");
                metrics::record_order_rejected(err.kind());
            }
        }
        result
    }

    async fn try_submit(&self, user: UserId, requests: &[SeatRequest]) -> Result<Order> {
        if requests.is_empty() {
            return Err(ReservationError::Validation(
                "an order needs at least one ticket".to_string(),
            ));
        }
        reject_duplicates(requests)?;

        let mut journeys: SmallVec<[JourneyId; 4]> = SmallVec::new();
        for request in requests {
            if !journeys.contains(&request.journey) {
                journeys.push(request.journey);
            }
        }
        journeys.sort_unstable();

        let mut layouts: HashMap<JourneyId, SeatLayout> = HashMap::with_capacity(journeys.len());
        let mut journey_trains: Vec<(JourneyId, TrainId)> = Vec::with_capacity(journeys.len());
        for journey in &journeys {
            let resolved = self.seat_map.resolve(*journey).await?;
            layouts.insert(*journey, resolved.layout());
            journey_trains.push((*journey, resolved.train.id));
        }

        let mut tickets = Vec::with_capacity(requests.len());
        for request in requests {
            let seat = request.coordinate();
            let layout = layouts
                .get(&request.journey)
                .copied()
                .ok_or_else(|| ReservationError::not_found("journey", request.journey))?;
            if !layout.contains(seat) {
                return Err(ReservationError::InvalidSeat {
                    journey: request.journey,
                    seat,
                    layout,
                });
            }
            tickets.push(PendingTicket {
                id: TicketId::new(),
                journey: request.journey,
                seat,
            });
        }

        let pending = PendingOrder {
            id: OrderId::new(),
            user,
            created_at: self.clock.now(),
            tickets,
            journey_trains,
        };

        let started = Instant::now();
        let order = self.tickets.commit_order(pending).await?;
        metrics::record_order_committed(order.tickets.len(), started.elapsed().as_secs_f64());
        Ok(order)
    }

    /// Cancel an order, releasing every seat it holds in one step.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::NotFound`]: unknown order
    /// - [`ReservationError::Forbidden`]: requester is neither owner nor admin
    /// - [`ReservationError::Validation`]: order already cancelled
    /// - [`ReservationError::Busy`]: lock wait expired, safe to retry
    #[tracing::instrument(skip(self, requester), fields(user = %requester.user))]
    pub async fn cancel_order(&self, order: OrderId, requester: &Requester) -> Result<Order> {
        let existing = self.get_order(order, requester).await?;
        if existing.is_cancelled() {
            return Err(already_cancelled());
        }

        let cancelled = self.tickets.cancel_order(order, self.clock.now()).await?;
        metrics::record_order_cancelled();
        tracing::info!(order_id = %order, tickets = cancelled.tickets.len(), "Order cancelled");
        Ok(cancelled)
    }

    /// Fetch an order visible to the requester.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotFound`] for an unknown order and
    /// [`ReservationError::Forbidden`] when the requester may not see it.
    pub async fn get_order(&self, order: OrderId, requester: &Requester) -> Result<Order> {
        let found = self.tickets.get_order(order).await?;
        if !requester.may_access(found.user) {
            return Err(ReservationError::Forbidden(order));
        }
        Ok(found)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the listing fails.
    pub async fn list_orders(&self, user: UserId, page: PageRequest) -> Result<Page<Order>> {
        self.tickets.list_orders(user, page).await
    }
}

impl std::fmt::Debug for ReservationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationEngine")
            .field("seat_map", &self.seat_map)
            .finish_non_exhaustive()
    }
}

/// Error for cancelling an order twice.
#[must_use]
pub fn already_cancelled() -> ReservationError {
    ReservationError::Validation("order already cancelled".to_string())
}

fn reject_duplicates(requests: &[SeatRequest]) -> Result<()> {
    let mut seen = HashSet::with_capacity(requests.len());
    for request in requests {
        if !seen.insert((request.journey, request.coordinate())) {
            return Err(ReservationError::DuplicateRequest {
                journey: request.journey,
                seat: request.coordinate(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeatCoordinate;

    #[test]
    fn duplicates_within_one_journey_are_rejected() {
        let journey = JourneyId::new();
        let requests = [
            SeatRequest::new(journey, 1, 1),
            SeatRequest::new(journey, 1, 2),
            SeatRequest::new(journey, 1, 1),
        ];
        assert_eq!(
            reject_duplicates(&requests),
            Err(ReservationError::DuplicateRequest {
                journey,
                seat: SeatCoordinate::new(1, 1),
            })
        );
    }

    #[test]
    fn same_coordinate_on_different_journeys_is_not_a_duplicate() {
        let requests = [
            SeatRequest::new(JourneyId::new(), 1, 1),
            SeatRequest::new(JourneyId::new(), 1, 1),
        ];
        assert!(reject_duplicates(&requests).is_ok());
    }
}
