//! Read-only queries: availability, journey search and catalog listings.
//!
//! Every result is a snapshot resolved at read time. Nothing here mutates
//! state or takes the commit locks.

use crate::catalog::{Catalog, JourneyFilter, JourneyView, RouteFilter, RouteView, TrainFilter, TrainView};
use crate::error::ReservationError;
use crate::seat_map::SeatMap;
use crate::store::TicketStore;
use crate::types::{
    CrewMember, JourneyId, Order, OrderId, Page, PageRequest, SeatCoordinate, Station, Ticket,
    TrainType, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Result type for queries.
pub type Result<T> = std::result::Result<T, ReservationError>;

/// Seat counts for one journey.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Journey queried
    pub journey: JourneyId,
    /// Size of the seat universe
    pub total: u64,
    /// Seats without a committed ticket
    pub available: u64,
}

/// One row of a journey search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneySummary {
    /// Journey identifier
    pub id: JourneyId,
    /// `"<source> - <destination>"`
    pub route: String,
    /// Train name
    pub train: String,
    /// Departure time
    pub departure_time: DateTime<Utc>,
    /// Arrival time
    pub arrival_time: DateTime<Utc>,
    /// Crew full names in assignment order
    pub crew: Vec<String>,
    /// Size of the seat universe
    pub total_seats: u64,
    /// Seats without a committed ticket
    pub tickets_available: u64,
}

impl JourneySummary {
    fn new(view: &JourneyView, committed: u64) -> Self {
        let total_seats = view.layout().capacity();
        Self {
            id: view.journey.id,
            route: view.route.name(),
            train: view.train.train.name.clone(),
            departure_time: view.journey.departure_time,
            arrival_time: view.journey.arrival_time,
            crew: view.crew.iter().map(CrewMember::full_name).collect(),
            total_seats,
            tickets_available: total_seats.saturating_sub(committed),
        }
    }
}

/// Full view of one journey.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JourneyDetail {
    /// Journey with everything it references
    #[serde(flatten)]
    pub view: JourneyView,
    /// Human readable duration
    pub travel_time: String,
    /// Committed coordinates, ascending
    pub taken_seats: Vec<SeatCoordinate>,
    /// Seats without a committed ticket
    pub tickets_available: u64,
}

/// Format the time between departure and arrival.
///
/// Whole days are shown only for more than one day, and hours only for more
/// than one hour; the remaining units are always shown once a larger one is.
#[must_use]
pub fn travel_time(departure: DateTime<Utc>, arrival: DateTime<Utc>) -> String {
    let seconds = (arrival - departure).num_seconds().max(0);
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if days > 1 {
        format!("{days} days, {hours} hours, {minutes} minutes")
    } else if hours > 1 {
        format!("{hours} hours, {minutes} minutes")
    } else {
        format!("{minutes} minutes")
    }
}

/// Route, train and times of the journey a ticket rides on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSummary {
    /// `"<source> - <destination>"`
    pub route: String,
    /// Train name
    pub train: String,
    /// Departure time
    pub departure_time: DateTime<Utc>,
    /// Arrival time
    pub arrival_time: DateTime<Utc>,
}

impl From<&JourneyView> for TripSummary {
    fn from(view: &JourneyView) -> Self {
        Self {
            route: view.route.name(),
            train: view.train.train.name.clone(),
            departure_time: view.journey.departure_time,
            arrival_time: view.journey.arrival_time,
        }
    }
}

/// A ticket together with its trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetail {
    /// The ticket
    #[serde(flatten)]
    pub ticket: Ticket,
    /// Journey the ticket rides on
    pub trip: TripSummary,
}

/// An order whose tickets carry their trips.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    /// Order identifier
    pub id: OrderId,
    /// Owning user
    pub user: UserId,
    /// Commit time
    pub created_at: DateTime<Utc>,
    /// Cancellation time, if cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Tickets in request order
    pub tickets: Vec<TicketDetail>,
}

impl OrderDetail {
    fn new(order: Order, trips: &HashMap<JourneyId, TripSummary>) -> Result<Self> {
        let tickets = order
            .tickets
            .into_iter()
            .map(|ticket| -> Result<TicketDetail> {
                let trip = trips
                    .get(&ticket.journey)
                    .cloned()
                    .ok_or_else(|| ReservationError::not_found("journey", ticket.journey))?;
                Ok(TicketDetail { ticket, trip })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: order.id,
            user: order.user,
            created_at: order.created_at,
            cancelled_at: order.cancelled_at,
            tickets,
        })
    }
}

/// Availability, search and listing queries.
#[derive(Clone)]
pub struct QueryService {
    catalog: Arc<dyn Catalog>,
    tickets: Arc<dyn TicketStore>,
    seat_map: SeatMap,
}

impl QueryService {
    /// Creates a query service.
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>, tickets: Arc<dyn TicketStore>) -> Self {
        let seat_map = SeatMap::new(Arc::clone(&catalog), Arc::clone(&tickets));
        Self {
            catalog,
            tickets,
            seat_map,
        }
    }

    /// Total and available seats of a journey.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotFound`] for an unknown journey.
    #[tracing::instrument(skip(self))]
    pub async fn availability(&self, journey: JourneyId) -> Result<Availability> {
        let resolved = self.seat_map.resolve(journey).await?;
        let available = self.seat_map.available_in(&resolved).await?;
        Ok(Availability {
            journey,
            total: resolved.layout().capacity(),
            available,
        })
    }

    /// Journeys matching the filter, latest departure first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the catalog or ticket store fails.
    #[tracing::instrument(skip(self, filter))]
    pub async fn search_journeys(
        &self,
        filter: JourneyFilter,
        page: PageRequest,
    ) -> Result<Page<JourneySummary>> {
        let page = self.catalog.list_journeys(filter, page).await?;
        let ids = page.items.iter().map(|view| view.journey.id).collect();
        let counts = self.tickets.committed_counts(ids).await?;
        Ok(page.map(|view| {
            let committed = counts.get(&view.journey.id).copied().unwrap_or(0);
            JourneySummary::new(&view, committed)
        }))
    }

    /// A journey with route, train, crew, travel time and taken seats.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotFound`] for an unknown journey.
    #[tracing::instrument(skip(self))]
    pub async fn journey_detail(&self, journey: JourneyId) -> Result<JourneyDetail> {
        let view = self.catalog.journey_view(journey).await?;
        let taken_seats = self.tickets.taken_seats(journey).await?;
        let tickets_available = view
            .layout()
            .capacity()
            .saturating_sub(taken_seats.len() as u64);
        Ok(JourneyDetail {
            travel_time: travel_time(view.journey.departure_time, view.journey.arrival_time),
            view,
            taken_seats,
            tickets_available,
        })
    }

    /// An order with the route, train and times of every ticket's journey.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the catalog fails.
    pub async fn order_detail(&self, order: Order) -> Result<OrderDetail> {
        let trips = self.trips(order.journeys()).await?;
        OrderDetail::new(order, &trips)
    }

    /// [`order_detail`](Self::order_detail) for a page of orders, resolving
    /// each journey once.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the catalog fails.
    pub async fn order_details(&self, orders: Page<Order>) -> Result<Page<OrderDetail>> {
        let mut journeys: Vec<JourneyId> = orders.items.iter().flat_map(Order::journeys).collect();
        journeys.sort_unstable();
        journeys.dedup();
        let trips = self.trips(journeys).await?;

        let Page {
            items,
            page,
            page_size,
            total,
        } = orders;
        let items = items
            .into_iter()
            .map(|order| OrderDetail::new(order, &trips))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            page,
            page_size,
            total,
        })
    }

    async fn trips(&self, journeys: Vec<JourneyId>) -> Result<HashMap<JourneyId, TripSummary>> {
        let mut trips = HashMap::with_capacity(journeys.len());
        for journey in journeys {
            let view = self.catalog.journey_view(journey).await?;
            trips.insert(journey, TripSummary::from(&view));
        }
        Ok(trips)
    }

    /// Routes matching the filter.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the catalog fails.
    pub async fn search_routes(&self, filter: RouteFilter) -> Result<Vec<RouteView>> {
        Ok(self.catalog.list_routes(filter).await?)
    }

    /// Trains matching the filter, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the catalog fails.
    pub async fn search_trains(&self, filter: TrainFilter) -> Result<Vec<TrainView>> {
        Ok(self.catalog.list_trains(filter).await?)
    }

    /// All stations ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the catalog fails.
    pub async fn list_stations(&self) -> Result<Vec<Station>> {
        Ok(self.catalog.list_stations().await?)
    }

    /// All train types ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the catalog fails.
    pub async fn list_train_types(&self) -> Result<Vec<TrainType>> {
        Ok(self.catalog.list_train_types().await?)
    }

    /// All crew members ordered by last then first name.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the catalog fails.
    pub async fn list_crew(&self) -> Result<Vec<CrewMember>> {
        Ok(self.catalog.list_crew().await?)
    }
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService").finish_non_exhaustive()
    }
}
