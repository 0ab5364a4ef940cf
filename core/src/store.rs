//! Ticket storage: the authoritative record of committed seats.
//!
//! A [`TicketStore`] owns the occupancy invariant. At most one committed
//! ticket may exist per `(journey, carriage, seat)`, and an order's tickets
//! become visible all together or not at all. The reservation engine does the
//! request-level validation; the store does the final, serialised check and
//! the insert.
//!
//! # Locking
//!
//! Implementations serialise commits per journey. An order touching several
//! journeys acquires their locks in ascending [`JourneyId`] order, so two
//! overlapping multi-journey orders cannot deadlock. Lock waits are bounded;
//! an expired wait surfaces as [`ReservationError::Busy`].

use crate::error::ReservationError;
use crate::types::{
    JourneyId, Order, OrderId, PageRequest, Page, SeatCoordinate, TicketId, TrainId, UserId,
};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::collections::{BTreeSet, HashMap};

/// Result type for ticket storage operations.
pub type Result<T> = std::result::Result<T, ReservationError>;

/// One ticket of an order about to be committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTicket {
    /// Pre-assigned ticket id
    pub id: TicketId,
    /// Journey the seat belongs to
    pub journey: JourneyId,
    /// Requested seat, already checked against the layout
    pub seat: SeatCoordinate,
}

/// A fully validated order, ready for the atomic commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingOrder {
    /// Pre-assigned order id
    pub id: OrderId,
    /// Owning user
    pub user: UserId,
    /// Commit timestamp
    pub created_at: DateTime<Utc>,
    /// Tickets in request order
    pub tickets: Vec<PendingTicket>,
    /// Train each journey had when the seats were validated, ascending by journey.
    ///
    /// The store rejects the commit with [`ReservationError::Busy`] if any
    /// journey was reassigned in the meantime.
    pub journey_trains: Vec<(JourneyId, TrainId)>,
}

impl PendingOrder {
    /// Journeys touched by the order, ascending and distinct. This is the
    /// lock acquisition order.
    #[must_use]
    pub fn lock_order(&self) -> Vec<JourneyId> {
        self.tickets
            .iter()
            .map(|t| t.journey)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Storage for orders and tickets.
pub trait TicketStore: Send + Sync {
    /// Atomically commit every ticket of the order, or none.
    ///
    /// Fails with [`ReservationError::SeatTaken`] for the first requested seat
    /// (in request order) that already holds a committed ticket.
    fn commit_order(&self, order: PendingOrder) -> BoxFuture<'_, Result<Order>>;

    /// Cancel an order, releasing all of its seats at once.
    ///
    /// Fails with [`ReservationError::Validation`] if the order was already
    /// cancelled. Ownership is checked by the caller.
    fn cancel_order(&self, order: OrderId, at: DateTime<Utc>) -> BoxFuture<'_, Result<Order>>;

    /// Fetch an order with its tickets.
    fn get_order(&self, order: OrderId) -> BoxFuture<'_, Result<Order>>;

    /// A user's orders, newest first.
    fn list_orders(&self, user: UserId, page: PageRequest) -> BoxFuture<'_, Result<Page<Order>>>;

    /// Whether a committed ticket holds the coordinate.
    fn is_taken(&self, journey: JourneyId, seat: SeatCoordinate) -> BoxFuture<'_, Result<bool>>;

    /// Every committed coordinate of a journey, ascending.
    fn taken_seats(&self, journey: JourneyId) -> BoxFuture<'_, Result<Vec<SeatCoordinate>>>;

    /// Committed ticket counts for each requested journey. Journeys with no
    /// committed tickets map to zero.
    fn committed_counts(
        &self,
        journeys: Vec<JourneyId>,
    ) -> BoxFuture<'_, Result<HashMap<JourneyId, u64>>>;
}
