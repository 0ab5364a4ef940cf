//! Application state shared across all HTTP handlers.

use crate::config::ReservationConfig;
use std::sync::Arc;
use train_station_core::{
    Catalog, Clock, PageRequest, QueryService, ReservationEngine, SeatMap, TicketStore,
};

/// Engine, queries and catalog over one storage backend.
#[derive(Clone)]
pub struct AppState {
    /// Order submission and cancellation
    pub engine: ReservationEngine,
    /// Availability, search and listings
    pub queries: QueryService,
    /// Catalog writes
    pub catalog: Arc<dyn Catalog>,
    /// Page sizes and lock bounds
    pub settings: ReservationConfig,
}

impl AppState {
    /// Wire the engine and query service over the given stores.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        tickets: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        settings: ReservationConfig,
    ) -> Self {
        let seat_map = SeatMap::new(Arc::clone(&catalog), Arc::clone(&tickets));
        Self {
            engine: ReservationEngine::new(seat_map, Arc::clone(&tickets), clock),
            queries: QueryService::new(Arc::clone(&catalog), tickets),
            catalog,
            settings,
        }
    }

    /// Page request for order listings, defaulting missing values.
    #[must_use]
    pub fn order_page(&self, page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        PageRequest::new(
            page.unwrap_or(1),
            page_size.unwrap_or(self.settings.order_page_size),
        )
    }

    /// Page request for journey searches, defaulting missing values.
    #[must_use]
    pub fn journey_page(&self, page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        PageRequest::new(
            page.unwrap_or(1),
            page_size.unwrap_or(self.settings.journey_page_size),
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
