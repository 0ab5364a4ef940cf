//! # Train Station Core
//!
//! Ticket reservation and inventory consistency for scheduled train journeys.
//!
//! Given a journey with a fixed train (fixed carriage/seat layout) the engine
//! guarantees that no seat is sold twice, that an order's tickets commit all
//! together or not at all, and that availability reads reflect committed state.
//!
//! ## Components
//!
//! - [`catalog`]: stations, routes, trains, crew and journeys (the `Catalog` trait)
//! - [`seat_map`]: a journey's seat universe and its occupancy
//! - [`reservation`]: order submission and cancellation
//! - [`query`]: availability, journey search and listings
//! - [`store`]: the `TicketStore` trait that owns committed tickets
//!
//! Storage is injected: `train-station-postgres` provides the production
//! implementation, `train-station-testing` an in-memory one.
//!
//! ## Example
//!
//! ```ignore
//! use train_station_core::*;
//!
//! let engine = ReservationEngine::new(seat_map, tickets, Arc::new(SystemClock));
//! let order = engine
//!     .submit_order(user, vec![SeatRequest::new(journey, 1, 1), SeatRequest::new(journey, 1, 2)])
//!     .await?;
//! assert_eq!(order.tickets.len(), 2);
//! ```

pub mod catalog;
pub mod error;
pub mod metrics;
pub mod query;
pub mod reservation;
pub mod seat_map;
pub mod store;
pub mod types;

pub use catalog::{
    Catalog, JourneyFilter, JourneyView, NewCrewMember, NewJourney, NewRoute, NewStation,
    NewTrain, NewTrainType, RouteFilter, RouteView, TrainFilter, TrainView,
};
pub use error::{CatalogError, ReservationError};
pub use query::{
    Availability, JourneyDetail, JourneySummary, OrderDetail, QueryService, TicketDetail,
    TripSummary,
};
pub use reservation::ReservationEngine;
pub use seat_map::SeatMap;
pub use store::{PendingOrder, PendingTicket, TicketStore};
pub use types::*;

pub use environment::{Clock, SystemClock};

/// Environment module - injected dependencies
///
/// Time is abstracted so order timestamps are deterministic in tests.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
