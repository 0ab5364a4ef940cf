//! Seat map: the seat universe of a journey and which of its seats are taken.
//!
//! The universe comes from the catalog (the journey's train layout); occupancy
//! comes from the [`TicketStore`]. Reads are read-committed: a seat shows as
//! taken once the committing order is visible, and free again as soon as the
//! cancellation commits.

use crate::catalog::Catalog;
use crate::error::ReservationError;
use crate::store::TicketStore;
use crate::types::{Journey, JourneyId, SeatCoordinate, SeatLayout, Train};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Result type for seat map reads.
pub type Result<T> = std::result::Result<T, ReservationError>;

/// A journey together with the train that fixes its seat universe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedJourney {
    /// The journey
    pub journey: Journey,
    /// Its train
    pub train: Train,
}

impl ResolvedJourney {
    /// Seat layout of the journey.
    #[must_use]
    pub const fn layout(&self) -> SeatLayout {
        self.train.layout()
    }
}

/// Per-journey seat universe and occupancy.
#[derive(Clone)]
pub struct SeatMap {
    catalog: Arc<dyn Catalog>,
    tickets: Arc<dyn TicketStore>,
}

impl SeatMap {
    /// Creates a seat map over the given catalog and ticket store.
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>, tickets: Arc<dyn TicketStore>) -> Self {
        Self { catalog, tickets }
    }

    /// Resolve a journey and its train.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotFound`] for an unknown journey.
    pub async fn resolve(&self, journey: JourneyId) -> Result<ResolvedJourney> {
        let journey = self.catalog.get_journey(journey).await?;
        let train = self.catalog.get_train(journey.train).await?;
        Ok(ResolvedJourney { journey, train })
    }

    /// Whether the coordinate lies inside the journey's train layout.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotFound`] for an unknown journey.
    pub async fn valid_coordinate(&self, journey: JourneyId, seat: SeatCoordinate) -> Result<bool> {
        Ok(self.resolve(journey).await?.layout().contains(seat))
    }

    /// Whether a committed ticket holds the coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotFound`] for an unknown journey, or a
    /// storage error.
    pub async fn is_taken(&self, journey: JourneyId, seat: SeatCoordinate) -> Result<bool> {
        self.catalog.get_journey(journey).await?;
        self.tickets.is_taken(journey, seat).await
    }

    /// Seat universe size minus committed tickets.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotFound`] for an unknown journey, or a
    /// storage error.
    pub async fn available_count(&self, journey: JourneyId) -> Result<u64> {
        let resolved = self.resolve(journey).await?;
        self.available_in(&resolved).await
    }

    /// Free seats of an already resolved journey, counted against its layout.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the ticket store fails.
    pub async fn available_in(&self, resolved: &ResolvedJourney) -> Result<u64> {
        let journey = resolved.journey.id;
        let committed = self
            .tickets
            .committed_counts(vec![journey])
            .await?
            .get(&journey)
            .copied()
            .unwrap_or(0);
        Ok(resolved.layout().capacity().saturating_sub(committed))
    }

    /// Committed coordinates of the journey, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotFound`] for an unknown journey, or a
    /// storage error.
    pub async fn taken_seats(&self, journey: JourneyId) -> Result<Vec<SeatCoordinate>> {
        self.catalog.get_journey(journey).await?;
        self.tickets.taken_seats(journey).await
    }

    /// Free coordinates of the journey, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotFound`] for an unknown journey, or a
    /// storage error.
    pub async fn available_seats(&self, journey: JourneyId) -> Result<Vec<SeatCoordinate>> {
        let resolved = self.resolve(journey).await?;
        let taken: BTreeSet<SeatCoordinate> =
            self.tickets.taken_seats(journey).await?.into_iter().collect();
        Ok(resolved
            .layout()
            .coordinates()
            .filter(|seat| !taken.contains(seat))
            .collect())
    }
}

impl std::fmt::Debug for SeatMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatMap").finish_non_exhaustive()
    }
}
