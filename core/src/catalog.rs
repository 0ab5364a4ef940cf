//! Inventory catalog: stations, routes, trains, crew and journeys.
//!
//! The catalog is administered externally; the reservation engine only reads
//! from it. All entity rules (distinct route endpoints, positive capacities,
//! arrival after departure) are enforced here, at creation time, so the engine
//! can trust every entity it resolves.
//!
//! # Implementations
//!
//! - `PostgresStore` (in `train-station-postgres`): production storage
//! - `InMemoryStore` (in `train-station-testing`): tests and local development
//!
//! # Dyn Compatibility
//!
//! Methods return [`BoxFuture`] so the engine can hold an `Arc<dyn Catalog>`
//! chosen at startup.

use crate::error::CatalogError;
use crate::types::{
    CrewId, CrewMember, Journey, JourneyId, Page, PageRequest, Route, RouteId, SeatLayout,
    Station, StationId, Train, TrainId, TrainType, TrainTypeId,
};
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

// ============================================================================
// Creation inputs
// ============================================================================

/// Input for a new station.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewStation {
    /// Display name
    pub name: String,
    /// Latitude in degrees, `-90..=90`
    pub latitude: f64,
    /// Longitude in degrees, `-180..=180`
    pub longitude: f64,
}

impl NewStation {
    /// Check field-level rules.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for an empty name or out-of-range coordinates.
    pub fn validate(&self) -> Result<()> {
        require_name("station name", &self.name)?;
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CatalogError::Validation(format!(
                "latitude {} is outside -90..=90",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CatalogError::Validation(format!(
                "longitude {} is outside -180..=180",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Input for a new route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoute {
    /// Departure station
    pub source: StationId,
    /// Arrival station
    pub destination: StationId,
    /// Distance in kilometres
    pub distance: u32,
}

impl NewRoute {
    /// Check field-level rules. Station existence is checked by the store.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] when source equals destination or distance is zero.
    pub fn validate(&self) -> Result<()> {
        if self.source == self.destination {
            return Err(CatalogError::Validation(
                "source and destination stations cannot be the same".to_string(),
            ));
        }
        if self.distance == 0 {
            return Err(CatalogError::Validation(
                "route distance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Input for a new train type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrainType {
    /// Unique name
    pub name: String,
}

impl NewTrainType {
    /// Check field-level rules.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for an empty name.
    pub fn validate(&self) -> Result<()> {
        require_name("train type name", &self.name)
    }
}

/// Input for a new train.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrain {
    /// Unique name
    pub name: String,
    /// Classification
    pub train_type: TrainTypeId,
    /// Number of carriages, ≥ 1
    pub carriages: u32,
    /// Seats per carriage, ≥ 1
    pub seats_per_carriage: u32,
}

impl NewTrain {
    /// Check field-level rules. Train type existence is checked by the store.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for an empty name or a zero dimension.
    pub fn validate(&self) -> Result<()> {
        require_name("train name", &self.name)?;
        validate_layout(SeatLayout::new(self.carriages, self.seats_per_carriage))
    }
}

/// Input for a new crew member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCrewMember {
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
}

impl NewCrewMember {
    /// Check field-level rules.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for an empty name part.
    pub fn validate(&self) -> Result<()> {
        require_name("first name", &self.first_name)?;
        require_name("last name", &self.last_name)
    }
}

/// Input for a new journey.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJourney {
    /// Route travelled
    pub route: RouteId,
    /// Train used
    pub train: TrainId,
    /// Departure time
    pub departure_time: DateTime<Utc>,
    /// Arrival time
    pub arrival_time: DateTime<Utc>,
    /// Assigned crew (at least one)
    pub crew: Vec<CrewId>,
}

impl NewJourney {
    /// Check field-level rules. Referenced entities are checked by the store.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] when arrival is not after departure
    /// or the crew list is empty or repeats a member.
    pub fn validate(&self) -> Result<()> {
        if self.arrival_time <= self.departure_time {
            return Err(CatalogError::Validation(
                "arrival time must be after departure time".to_string(),
            ));
        }
        if self.crew.is_empty() {
            return Err(CatalogError::Validation(
                "a journey needs at least one crew member".to_string(),
            ));
        }
        let mut crew = self.crew.clone();
        crew.sort_unstable();
        crew.dedup();
        if crew.len() != self.crew.len() {
            return Err(CatalogError::Validation(
                "crew members must not repeat".to_string(),
            ));
        }
        Ok(())
    }
}

fn require_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Reject layouts with an empty dimension.
///
/// # Errors
///
/// Returns [`CatalogError::Validation`] when either dimension is zero.
pub fn validate_layout(layout: SeatLayout) -> Result<()> {
    if layout.carriages == 0 {
        return Err(CatalogError::Validation(
            "a train needs at least one carriage".to_string(),
        ));
    }
    if layout.seats_per_carriage == 0 {
        return Err(CatalogError::Validation(
            "a carriage needs at least one seat".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Resolved views
// ============================================================================

/// A route with both stations resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteView {
    /// The route
    pub route: Route,
    /// Departure station
    pub source: Station,
    /// Arrival station
    pub destination: Station,
}

impl RouteView {
    /// `"<source> - <destination>"`
    #[must_use]
    pub fn name(&self) -> String {
        format!("{} - {}", self.source.name, self.destination.name)
    }
}

/// A train with its type resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainView {
    /// The train
    pub train: Train,
    /// Its classification
    pub train_type: TrainType,
}

/// Immutable snapshot of a journey and everything it references, resolved
/// once at read time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JourneyView {
    /// The journey
    pub journey: Journey,
    /// Route with stations
    pub route: RouteView,
    /// Train with type
    pub train: TrainView,
    /// Crew in assignment order
    pub crew: Vec<CrewMember>,
}

impl JourneyView {
    /// Seat layout of the journey's train.
    #[must_use]
    pub const fn layout(&self) -> SeatLayout {
        self.train.train.layout()
    }
}

/// Listing order for journeys: latest departure first, then by id.
#[must_use]
pub fn journey_order(a: &JourneyView, b: &JourneyView) -> Ordering {
    b.journey
        .departure_time
        .cmp(&a.journey.departure_time)
        .then_with(|| a.journey.id.cmp(&b.journey.id))
}

// ============================================================================
// Filters
// ============================================================================

/// Route search filter. Empty lists match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFilter {
    /// Accept routes departing from any of these stations
    pub sources: Vec<StationId>,
    /// Accept routes arriving at any of these stations
    pub destinations: Vec<StationId>,
}

impl RouteFilter {
    /// Whether the route passes the filter.
    #[must_use]
    pub fn matches(&self, route: &Route) -> bool {
        (self.sources.is_empty() || self.sources.contains(&route.source))
            && (self.destinations.is_empty() || self.destinations.contains(&route.destination))
    }
}

/// Train search filter. Empty/absent fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainFilter {
    /// Case-insensitive substring of the train name
    pub name: Option<String>,
    /// Accept trains of any of these types
    pub train_types: Vec<TrainTypeId>,
}

impl TrainFilter {
    /// Whether the train passes the filter.
    #[must_use]
    pub fn matches(&self, train: &Train) -> bool {
        let name_ok = self
            .name
            .as_deref()
            .is_none_or(|needle| contains_ignore_case(&train.name, needle));
        name_ok && (self.train_types.is_empty() || self.train_types.contains(&train.train_type))
    }
}

/// Journey search filter. Empty/absent fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyFilter {
    /// Departure at or after this instant
    pub departure_from: Option<DateTime<Utc>>,
    /// Departure at or before this instant
    pub departure_until: Option<DateTime<Utc>>,
    /// Departure on this calendar date (UTC)
    pub departure_date: Option<NaiveDate>,
    /// Exactly this route
    pub route: Option<RouteId>,
    /// Route departs from any of these stations
    pub sources: Vec<StationId>,
    /// Route arrives at any of these stations
    pub destinations: Vec<StationId>,
    /// Case-insensitive substring of the train name
    pub train_name: Option<String>,
    /// Train is of any of these types
    pub train_types: Vec<TrainTypeId>,
}

impl JourneyFilter {
    /// Whether the resolved journey passes the filter.
    #[must_use]
    pub fn matches(&self, view: &JourneyView) -> bool {
        let departure = view.journey.departure_time;
        if self.departure_from.is_some_and(|from| departure < from) {
            return false;
        }
        if self.departure_until.is_some_and(|until| departure > until) {
            return false;
        }
        if self
            .departure_date
            .is_some_and(|date| departure.date_naive() != date)
        {
            return false;
        }
        if self.route.is_some_and(|route| route != view.journey.route) {
            return false;
        }
        let route_ok = RouteFilter {
            sources: self.sources.clone(),
            destinations: self.destinations.clone(),
        }
        .matches(&view.route.route);
        let train_ok = TrainFilter {
            name: self.train_name.clone(),
            train_types: self.train_types.clone(),
        }
        .matches(&view.train.train);
        route_ok && train_ok
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ============================================================================
// Catalog trait
// ============================================================================

/// Storage for catalog entities.
///
/// Read accessors return validated entities or [`CatalogError::NotFound`].
/// Creation methods run the `validate()` rules of their input and check that
/// every referenced entity exists.
pub trait Catalog: Send + Sync {
    /// Resolve a station.
    fn get_station(&self, id: StationId) -> BoxFuture<'_, Result<Station>>;

    /// Resolve a route.
    fn get_route(&self, id: RouteId) -> BoxFuture<'_, Result<Route>>;

    /// Resolve a train type.
    fn get_train_type(&self, id: TrainTypeId) -> BoxFuture<'_, Result<TrainType>>;

    /// Resolve a train.
    fn get_train(&self, id: TrainId) -> BoxFuture<'_, Result<Train>>;

    /// Resolve a crew member.
    fn get_crew_member(&self, id: CrewId) -> BoxFuture<'_, Result<CrewMember>>;

    /// Resolve a journey.
    fn get_journey(&self, id: JourneyId) -> BoxFuture<'_, Result<Journey>>;

    /// Resolve a journey together with its route, stations, train, type and crew.
    fn journey_view(&self, id: JourneyId) -> BoxFuture<'_, Result<JourneyView>>;

    /// Create a station. `(name, latitude, longitude)` must be unique.
    fn create_station(&self, station: NewStation) -> BoxFuture<'_, Result<Station>>;

    /// Create a route between two existing, distinct stations.
    fn create_route(&self, route: NewRoute) -> BoxFuture<'_, Result<Route>>;

    /// Create a train type with a unique name.
    fn create_train_type(&self, train_type: NewTrainType) -> BoxFuture<'_, Result<TrainType>>;

    /// Create a train with a unique name and a non-empty layout.
    fn create_train(&self, train: NewTrain) -> BoxFuture<'_, Result<Train>>;

    /// Create a crew member.
    fn create_crew_member(&self, member: NewCrewMember) -> BoxFuture<'_, Result<CrewMember>>;

    /// Schedule a journey.
    fn create_journey(&self, journey: NewJourney) -> BoxFuture<'_, Result<Journey>>;

    /// Move a journey to another train.
    ///
    /// Fails with [`CatalogError::JourneyHasTickets`] once any committed ticket
    /// exists, since the new layout could exclude sold coordinates.
    fn reassign_train(&self, journey: JourneyId, train: TrainId)
    -> BoxFuture<'_, Result<Journey>>;

    /// Delete a journey that has never had tickets.
    fn delete_journey(&self, journey: JourneyId) -> BoxFuture<'_, Result<()>>;

    /// All stations ordered by name.
    fn list_stations(&self) -> BoxFuture<'_, Result<Vec<Station>>>;

    /// All train types ordered by name.
    fn list_train_types(&self) -> BoxFuture<'_, Result<Vec<TrainType>>>;

    /// All crew members ordered by last then first name.
    fn list_crew(&self) -> BoxFuture<'_, Result<Vec<CrewMember>>>;

    /// Routes passing the filter, with stations resolved.
    fn list_routes(&self, filter: RouteFilter) -> BoxFuture<'_, Result<Vec<RouteView>>>;

    /// Trains passing the filter ordered by name, with types resolved.
    fn list_trains(&self, filter: TrainFilter) -> BoxFuture<'_, Result<Vec<TrainView>>>;

    /// One page of the journeys passing the filter in [`journey_order`],
    /// with the total match count.
    fn list_journeys(
        &self,
        filter: JourneyFilter,
        page: PageRequest,
    ) -> BoxFuture<'_, Result<Page<JourneyView>>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn station(name: &str) -> Station {
        Station {
            id: StationId::new(),
            name: name.to_string(),
            latitude: 50.0,
            longitude: 30.0,
        }
    }

    fn view(train_name: &str, departure: DateTime<Utc>) -> JourneyView {
        let source = station("Kyiv");
        let destination = station("Lviv");
        let train_type = TrainType {
            id: TrainTypeId::new(),
            name: "Intercity".to_string(),
        };
        let train = Train {
            id: TrainId::new(),
            name: train_name.to_string(),
            train_type: train_type.id,
            carriages: 2,
            seats_per_carriage: 10,
        };
        let route = Route {
            id: RouteId::new(),
            source: source.id,
            destination: destination.id,
            distance: 540,
        };
        JourneyView {
            journey: Journey {
                id: JourneyId::new(),
                route: route.id,
                train: train.id,
                departure_time: departure,
                arrival_time: departure + chrono::Duration::hours(7),
                crew: vec![],
            },
            route: RouteView {
                route,
                source,
                destination,
            },
            train: TrainView { train, train_type },
            crew: vec![],
        }
    }

    #[test]
    fn route_endpoints_must_differ() {
        let station = StationId::new();
        let route = NewRoute {
            source: station,
            destination: station,
            distance: 10,
        };
        assert!(matches!(route.validate(), Err(CatalogError::Validation(_))));
    }

    #[test]
    fn train_layout_must_be_positive() {
        let mut train = NewTrain {
            name: "Hyundai".to_string(),
            train_type: TrainTypeId::new(),
            carriages: 0,
            seats_per_carriage: 10,
        };
        assert!(train.validate().is_err());
        train.carriages = 2;
        train.seats_per_carriage = 0;
        assert!(train.validate().is_err());
        train.seats_per_carriage = 10;
        assert!(train.validate().is_ok());
    }

    #[test]
    fn journey_arrival_must_follow_departure() {
        let departure = Utc.with_ymd_and_hms(2024, 8, 22, 10, 0, 0).unwrap();
        let mut journey = NewJourney {
            route: RouteId::new(),
            train: TrainId::new(),
            departure_time: departure,
            arrival_time: departure,
            crew: vec![CrewId::new()],
        };
        assert!(journey.validate().is_err());
        journey.arrival_time = departure + chrono::Duration::minutes(1);
        assert!(journey.validate().is_ok());
        journey.crew.clear();
        assert!(journey.validate().is_err());
    }

    #[test]
    fn station_coordinates_are_range_checked() {
        let station = NewStation {
            name: "Odesa".to_string(),
            latitude: 91.0,
            longitude: 30.0,
        };
        assert!(station.validate().is_err());
        let blank = NewStation {
            name: "   ".to_string(),
            latitude: 46.0,
            longitude: 30.0,
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn journey_filter_by_date_and_train_name() {
        let departure = Utc.with_ymd_and_hms(2024, 8, 22, 10, 0, 0).unwrap();
        let journey = view("Slobozhanshchyna", departure);

        let on_day = JourneyFilter {
            departure_date: NaiveDate::from_ymd_opt(2024, 8, 22),
            ..JourneyFilter::default()
        };
        assert!(on_day.matches(&journey));

        let other_day = JourneyFilter {
            departure_date: NaiveDate::from_ymd_opt(2024, 8, 28),
            ..JourneyFilter::default()
        };
        assert!(!other_day.matches(&journey));

        let by_name = JourneyFilter {
            train_name: Some("SLOBO".to_string()),
            ..JourneyFilter::default()
        };
        assert!(by_name.matches(&journey));
    }

    #[test]
    fn journey_filter_by_window_and_stations() {
        let departure = Utc.with_ymd_and_hms(2024, 8, 22, 10, 0, 0).unwrap();
        let journey = view("Hyundai", departure);

        let window = JourneyFilter {
            departure_from: Some(departure),
            departure_until: Some(departure + chrono::Duration::hours(1)),
            ..JourneyFilter::default()
        };
        assert!(window.matches(&journey));

        let too_late = JourneyFilter {
            departure_from: Some(departure + chrono::Duration::seconds(1)),
            ..JourneyFilter::default()
        };
        assert!(!too_late.matches(&journey));

        let from_source = JourneyFilter {
            sources: vec![journey.route.source.id],
            destinations: vec![journey.route.destination.id],
            ..JourneyFilter::default()
        };
        assert!(from_source.matches(&journey));

        let elsewhere = JourneyFilter {
            sources: vec![StationId::new()],
            ..JourneyFilter::default()
        };
        assert!(!elsewhere.matches(&journey));
    }

    #[test]
    fn journeys_order_latest_departure_first() {
        let early = view("A", Utc.with_ymd_and_hms(2024, 8, 22, 10, 0, 0).unwrap());
        let late = view("B", Utc.with_ymd_and_hms(2024, 8, 23, 10, 0, 0).unwrap());
        let mut journeys = vec![early.clone(), late.clone()];
        journeys.sort_by(journey_order);
        assert_eq!(journeys[0].journey.id, late.journey.id);
        assert_eq!(journeys[1].journey.id, early.journey.id);
    }
}
