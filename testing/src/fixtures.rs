//! Test world: an in-memory store wired to an engine and a query service,
//! plus builders for catalog entities.

use train_station_memory::InMemoryStore;
use crate::mocks::{FixedClock, test_clock};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use train_station_core::environment::Clock;
use train_station_core::{
    Catalog, CatalogError, CrewMember, Journey, JourneyId, NewCrewMember, NewJourney, NewRoute,
    NewStation, NewTrain, NewTrainType, QueryService, ReservationEngine, Route, SeatMap,
    SeatRequest, Station, TicketStore, Train, TrainType,
};

/// Everything one scheduled journey needs, freshly created.
#[derive(Clone, Debug)]
pub struct JourneyFixture {
    /// Departure station
    pub source: Station,
    /// Arrival station
    pub destination: Station,
    /// Route between them
    pub route: Route,
    /// Train type
    pub train_type: TrainType,
    /// Train
    pub train: Train,
    /// Single crew member
    pub crew: CrewMember,
    /// The journey
    pub journey: Journey,
}

impl JourneyFixture {
    /// Journey identifier
    #[must_use]
    pub const fn id(&self) -> JourneyId {
        self.journey.id
    }
}

/// In-memory store with an engine and query service over it.
#[derive(Clone, Debug)]
pub struct TestWorld {
    /// Shared backing store
    pub store: InMemoryStore,
    /// Reservation engine
    pub engine: ReservationEngine,
    /// Query service
    pub queries: QueryService,
    /// Clock the engine stamps orders with
    pub clock: FixedClock,
    sequence: Arc<AtomicUsize>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// A world over a fresh [`InMemoryStore`] and [`test_clock`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(InMemoryStore::new())
    }

    /// A world over the given store.
    #[must_use]
    pub fn with_store(store: InMemoryStore) -> Self {
        let clock = test_clock();
        let catalog: Arc<dyn Catalog> = Arc::new(store.clone());
        let tickets: Arc<dyn TicketStore> = Arc::new(store.clone());
        let seat_map = SeatMap::new(Arc::clone(&catalog), Arc::clone(&tickets));
        let engine = ReservationEngine::new(seat_map, Arc::clone(&tickets), Arc::new(clock.clone()));
        let queries = QueryService::new(catalog, tickets);
        Self {
            store,
            engine,
            queries,
            clock,
            sequence: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn next(&self) -> usize {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Create a journey on a new `carriages x seats_per_carriage` train,
    /// departing one day after the world clock.
    ///
    /// # Errors
    ///
    /// Propagates catalog validation errors (e.g. a zero dimension).
    pub async fn journey(
        &self,
        carriages: u32,
        seats_per_carriage: u32,
    ) -> Result<JourneyFixture, CatalogError> {
        let departure = self.clock.now() + Duration::days(1);
        self.journey_departing(carriages, seats_per_carriage, departure)
            .await
    }

    /// Create a journey on a new train departing at `departure`, arriving
    /// seven hours later.
    ///
    /// # Errors
    ///
    /// Propagates catalog validation errors.
    pub async fn journey_departing(
        &self,
        carriages: u32,
        seats_per_carriage: u32,
        departure: DateTime<Utc>,
    ) -> Result<JourneyFixture, CatalogError> {
        let n = self.next();
        let source = self.station(&format!("Source {n}")).await?;
        let destination = self.station(&format!("Destination {n}")).await?;
        let route = self
            .store
            .create_route(NewRoute {
                source: source.id,
                destination: destination.id,
                distance: 100,
            })
            .await?;
        let train_type = self
            .store
            .create_train_type(NewTrainType {
                name: format!("Type {n}"),
            })
            .await?;
        let train = self
            .train(&format!("Train {n}"), &train_type, carriages, seats_per_carriage)
            .await?;
        let crew = self
            .store
            .create_crew_member(NewCrewMember {
                first_name: "Crew".to_string(),
                last_name: format!("Member {n}"),
            })
            .await?;
        let journey = self
            .store
            .create_journey(NewJourney {
                route: route.id,
                train: train.id,
                departure_time: departure,
                arrival_time: departure + Duration::hours(7),
                crew: vec![crew.id],
            })
            .await?;
        Ok(JourneyFixture {
            source,
            destination,
            route,
            train_type,
            train,
            crew,
            journey,
        })
    }

    /// Create a station at fixed coordinates.
    ///
    /// # Errors
    ///
    /// Propagates catalog validation errors.
    pub async fn station(&self, name: &str) -> Result<Station, CatalogError> {
        self.store
            .create_station(NewStation {
                name: name.to_string(),
                latitude: 50.45,
                longitude: 30.52,
            })
            .await
    }

    /// Create a train of the given type.
    ///
    /// # Errors
    ///
    /// Propagates catalog validation errors.
    pub async fn train(
        &self,
        name: &str,
        train_type: &TrainType,
        carriages: u32,
        seats_per_carriage: u32,
    ) -> Result<Train, CatalogError> {
        self.store
            .create_train(NewTrain {
                name: name.to_string(),
                train_type: train_type.id,
                carriages,
                seats_per_carriage,
            })
            .await
    }
}

/// Seat requests for `(carriage, seat)` pairs on one journey.
#[must_use]
pub fn seats(journey: JourneyId, coordinates: &[(u32, u32)]) -> Vec<SeatRequest> {
    coordinates
        .iter()
        .map(|(carriage, seat)| SeatRequest::new(journey, *carriage, *seat))
        .collect()
}
