//! In-memory storage for the train station reservation engine.
//!
//! [`InMemoryStore`] implements both [`Catalog`] and [`TicketStore`] over
//! shared maps, reproducing the Postgres semantics for tests and local runs:
//!
//! - every journey has its own async mutex, held across the
//!   check-then-insert of a commit, so one coordinate is committed at most once
//! - multi-journey orders lock their journeys in ascending id order
//! - lock waits are bounded by a timeout and surface as `Busy`
//! - train reassignment and journey deletion take the same journey lock
//! - readers never take journey locks: every commit and cancellation publishes
//!   the journeys' committed seats while still holding their locks, and reads
//!   go to that published copy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use futures::future::{BoxFuture, FutureExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use train_station_core::catalog::{
    Catalog, JourneyFilter, JourneyView, NewCrewMember, NewJourney, NewRoute, NewStation,
    NewTrain, NewTrainType, RouteFilter, RouteView, TrainFilter, TrainView, journey_order,
};
use train_station_core::store::{PendingOrder, TicketStore};
use train_station_core::{
    CatalogError, CrewId, CrewMember, Journey, JourneyId, Order, OrderId, Page, PageRequest,
    ReservationError, Route, RouteId, SeatCoordinate, Station, StationId, Ticket, TicketId,
    TicketStatus, Train, TrainId, TrainType, TrainTypeId, UserId,
};

/// Default bound on journey lock waits.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Default)]
struct CatalogTables {
    stations: HashMap<StationId, Station>,
    routes: HashMap<RouteId, Route>,
    train_types: HashMap<TrainTypeId, TrainType>,
    trains: HashMap<TrainId, Train>,
    crew: HashMap<CrewId, CrewMember>,
    journeys: HashMap<JourneyId, Journey>,
}

impl CatalogTables {
    fn station(&self, id: StationId) -> Result<&Station, CatalogError> {
        self.stations
            .get(&id)
            .ok_or_else(|| CatalogError::not_found("station", id))
    }

    fn route(&self, id: RouteId) -> Result<&Route, CatalogError> {
        self.routes
            .get(&id)
            .ok_or_else(|| CatalogError::not_found("route", id))
    }

    fn train_type(&self, id: TrainTypeId) -> Result<&TrainType, CatalogError> {
        self.train_types
            .get(&id)
            .ok_or_else(|| CatalogError::not_found("train type", id))
    }

    fn train(&self, id: TrainId) -> Result<&Train, CatalogError> {
        self.trains
            .get(&id)
            .ok_or_else(|| CatalogError::not_found("train", id))
    }

    fn crew_member(&self, id: CrewId) -> Result<&CrewMember, CatalogError> {
        self.crew
            .get(&id)
            .ok_or_else(|| CatalogError::not_found("crew member", id))
    }

    fn journey(&self, id: JourneyId) -> Result<&Journey, CatalogError> {
        self.journeys
            .get(&id)
            .ok_or_else(|| CatalogError::not_found("journey", id))
    }

    fn route_view(&self, route: &Route) -> Result<RouteView, CatalogError> {
        Ok(RouteView {
            route: route.clone(),
            source: self.station(route.source)?.clone(),
            destination: self.station(route.destination)?.clone(),
        })
    }

    fn train_view(&self, train: &Train) -> Result<TrainView, CatalogError> {
        Ok(TrainView {
            train: train.clone(),
            train_type: self.train_type(train.train_type)?.clone(),
        })
    }

    fn journey_view(&self, journey: &Journey) -> Result<JourneyView, CatalogError> {
        let crew = journey
            .crew
            .iter()
            .map(|id| self.crew_member(*id).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(JourneyView {
            journey: journey.clone(),
            route: self.route_view(self.route(journey.route)?)?,
            train: self.train_view(self.train(journey.train)?)?,
            crew,
        })
    }
}

/// Seats of one journey.
#[derive(Debug, Default)]
struct Occupancy {
    committed: BTreeMap<SeatCoordinate, TicketId>,
    /// Tickets ever issued, cancelled ones included.
    issued: usize,
}

/// Failure to reach shared state.
#[derive(Debug)]
enum StateError {
    Poisoned(&'static str),
    Timeout(JourneyId),
}

impl From<StateError> for CatalogError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Poisoned(what) => Self::Storage(format!("{what} lock poisoned")),
            StateError::Timeout(journey) => {
                Self::Busy(format!("timed out waiting for journey {journey}"))
            }
        }
    }
}

impl From<StateError> for ReservationError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Poisoned(what) => Self::Storage(format!("{what} lock poisoned")),
            StateError::Timeout(journey) => {
                Self::Busy(format!("timed out waiting for journey {journey}"))
            }
        }
    }
}

/// Committed seats of one journey as last published by a writer.
type SeatSnapshot = Arc<BTreeSet<SeatCoordinate>>;

#[derive(Debug)]
struct Inner {
    catalog: RwLock<CatalogTables>,
    occupancy: Mutex<HashMap<JourneyId, Arc<AsyncMutex<Occupancy>>>>,
    published: RwLock<HashMap<JourneyId, SeatSnapshot>>,
    orders: RwLock<HashMap<OrderId, Order>>,
    lock_timeout: Duration,
}

/// In-memory [`Catalog`] and [`TicketStore`].
///
/// Clones share state, so one instance can back the catalog, the seat map and
/// the engine at once.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use train_station_core::{Catalog, TicketStore};
/// use train_station_memory::InMemoryStore;
///
/// let store = InMemoryStore::new();
/// let catalog: Arc<dyn Catalog> = Arc::new(store.clone());
/// let tickets: Arc<dyn TicketStore> = Arc::new(store);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

/// A journey lock held outside of any store operation.
///
/// Commits, cancellations and catalog changes touching the journey wait until
/// it is dropped, or time out.
#[derive(Debug)]
pub struct JourneyLock {
    _guard: OwnedMutexGuard<Occupancy>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store with [`DEFAULT_LOCK_TIMEOUT`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create an empty store with a custom lock wait bound.
    #[must_use]
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                catalog: RwLock::new(CatalogTables::default()),
                occupancy: Mutex::new(HashMap::new()),
                published: RwLock::new(HashMap::new()),
                orders: RwLock::new(HashMap::new()),
                lock_timeout,
            }),
        }
    }

    /// Hold a journey's lock until the returned value is dropped.
    ///
    /// Lets tests exercise lock timeouts deterministically.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Busy`] if the lock is not acquired in time.
    pub async fn lock_journey(&self, journey: JourneyId) -> Result<JourneyLock, ReservationError> {
        let guard = self.acquire(journey).await?;
        Ok(JourneyLock { _guard: guard })
    }

    fn catalog(&self) -> Result<RwLockReadGuard<'_, CatalogTables>, StateError> {
        self.inner
            .catalog
            .read()
            .map_err(|_| StateError::Poisoned("catalog"))
    }

    fn catalog_mut(&self) -> Result<RwLockWriteGuard<'_, CatalogTables>, StateError> {
        self.inner
            .catalog
            .write()
            .map_err(|_| StateError::Poisoned("catalog"))
    }

    fn orders(&self) -> Result<RwLockReadGuard<'_, HashMap<OrderId, Order>>, StateError> {
        self.inner
            .orders
            .read()
            .map_err(|_| StateError::Poisoned("orders"))
    }

    fn orders_mut(&self) -> Result<RwLockWriteGuard<'_, HashMap<OrderId, Order>>, StateError> {
        self.inner
            .orders
            .write()
            .map_err(|_| StateError::Poisoned("orders"))
    }

    fn slot(&self, journey: JourneyId) -> Result<Arc<AsyncMutex<Occupancy>>, StateError> {
        let mut slots = self
            .inner
            .occupancy
            .lock()
            .map_err(|_| StateError::Poisoned("occupancy"))?;
        Ok(Arc::clone(slots.entry(journey).or_default()))
    }

    async fn acquire(&self, journey: JourneyId) -> Result<OwnedMutexGuard<Occupancy>, StateError> {
        let slot = self.slot(journey)?;
        tokio::time::timeout(self.inner.lock_timeout, slot.lock_owned())
            .await
            .map_err(|_| StateError::Timeout(journey))
    }

    /// Lock journeys in ascending id order. `journeys` must be sorted.
    async fn acquire_all(
        &self,
        journeys: &[JourneyId],
    ) -> Result<Vec<OwnedMutexGuard<Occupancy>>, StateError> {
        let mut guards = Vec::with_capacity(journeys.len());
        for journey in journeys {
            guards.push(self.acquire(*journey).await?);
        }
        Ok(guards)
    }

    async fn commit(&self, pending: PendingOrder) -> Result<Order, ReservationError> {
        let journeys = pending.lock_order();
        let mut guards = self.acquire_all(&journeys).await.inspect_err(|err| {
            tracing::warn!(order_id = %pending.id, ?err, "Journey lock not acquired");
        })?;

        {
            let catalog = self.catalog()?;
            for (journey, train) in &pending.journey_trains {
                let current = catalog.journey(*journey)?;
                if current.train != *train {
                    return Err(ReservationError::Busy(format!(
                        "journey {journey} changed train during commit"
                    )));
                }
            }
        }

        let slot_of = |journey: JourneyId| {
            journeys
                .binary_search(&journey)
                .map_err(|_| ReservationError::Storage(format!("journey {journey} not locked")))
        };

        for ticket in &pending.tickets {
            let occupancy = &guards[slot_of(ticket.journey)?];
            if occupancy.committed.contains_key(&ticket.seat) {
                return Err(ReservationError::SeatTaken {
                    journey: ticket.journey,
                    seat: ticket.seat,
                });
            }
        }

        let mut orders = self.orders_mut()?;
        for ticket in &pending.tickets {
            let occupancy = &mut guards[slot_of(ticket.journey)?];
            occupancy.committed.insert(ticket.seat, ticket.id);
            occupancy.issued += 1;
        }

        let order = Order {
            id: pending.id,
            user: pending.user,
            created_at: pending.created_at,
            cancelled_at: None,
            tickets: pending
                .tickets
                .iter()
                .map(|ticket| Ticket {
                    id: ticket.id,
                    journey: ticket.journey,
                    seat: ticket.seat,
                    order: pending.id,
                    status: TicketStatus::Committed,
                })
                .collect(),
        };
        orders.insert(order.id, order.clone());
        self.publish(&journeys, &guards)?;
        Ok(order)
    }

    async fn cancel(
        &self,
        order_id: OrderId,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Order, ReservationError> {
        let journeys = {
            let orders = self.orders()?;
            orders
                .get(&order_id)
                .ok_or_else(|| ReservationError::not_found("order", order_id))?
                .journeys()
        };

        let mut guards = self.acquire_all(&journeys).await?;

        let mut orders = self.orders_mut()?;
        let order = orders
            .get_mut(&order_id)
            .ok_or_else(|| ReservationError::not_found("order", order_id))?;
        if order.is_cancelled() {
            return Err(train_station_core::reservation::already_cancelled());
        }

        for ticket in &mut order.tickets {
            if let Ok(index) = journeys.binary_search(&ticket.journey) {
                let occupancy = &mut guards[index];
                if occupancy.committed.get(&ticket.seat) == Some(&ticket.id) {
                    occupancy.committed.remove(&ticket.seat);
                }
            }
            ticket.status = TicketStatus::Cancelled;
        }
        order.cancelled_at = Some(at);
        let cancelled = order.clone();
        drop(orders);
        self.publish(&journeys, &guards)?;
        Ok(cancelled)
    }

    /// Replace the published seats of `journeys` in one step, so a reader
    /// sees either none or all of a multi-journey change.
    fn publish(
        &self,
        journeys: &[JourneyId],
        guards: &[OwnedMutexGuard<Occupancy>],
    ) -> Result<(), StateError> {
        let mut published = self
            .inner
            .published
            .write()
            .map_err(|_| StateError::Poisoned("published seats"))?;
        for (journey, occupancy) in journeys.iter().zip(guards) {
            let seats: BTreeSet<SeatCoordinate> = occupancy.committed.keys().copied().collect();
            published.insert(*journey, Arc::new(seats));
        }
        Ok(())
    }

    /// Committed seats of a journey without waiting on its lock.
    fn committed_seats(&self, journey: JourneyId) -> Result<SeatSnapshot, StateError> {
        Ok(self
            .inner
            .published
            .read()
            .map_err(|_| StateError::Poisoned("published seats"))?
            .get(&journey)
            .cloned()
            .unwrap_or_default())
    }
}

impl Catalog for InMemoryStore {
    fn get_station(&self, id: StationId) -> BoxFuture<'_, Result<Station, CatalogError>> {
        async move { Ok(self.catalog()?.station(id)?.clone()) }.boxed()
    }

    fn get_route(&self, id: RouteId) -> BoxFuture<'_, Result<Route, CatalogError>> {
        async move { Ok(self.catalog()?.route(id)?.clone()) }.boxed()
    }

    fn get_train_type(&self, id: TrainTypeId) -> BoxFuture<'_, Result<TrainType, CatalogError>> {
        async move { Ok(self.catalog()?.train_type(id)?.clone()) }.boxed()
    }

    fn get_train(&self, id: TrainId) -> BoxFuture<'_, Result<Train, CatalogError>> {
        async move { Ok(self.catalog()?.train(id)?.clone()) }.boxed()
    }

    fn get_crew_member(&self, id: CrewId) -> BoxFuture<'_, Result<CrewMember, CatalogError>> {
        async move { Ok(self.catalog()?.crew_member(id)?.clone()) }.boxed()
    }

    fn get_journey(&self, id: JourneyId) -> BoxFuture<'_, Result<Journey, CatalogError>> {
        async move { Ok(self.catalog()?.journey(id)?.clone()) }.boxed()
    }

    fn journey_view(&self, id: JourneyId) -> BoxFuture<'_, Result<JourneyView, CatalogError>> {
        async move {
            let catalog = self.catalog()?;
            catalog.journey_view(catalog.journey(id)?)
        }
        .boxed()
    }

    fn create_station(&self, station: NewStation) -> BoxFuture<'_, Result<Station, CatalogError>> {
        async move {
            station.validate()?;
            let mut catalog = self.catalog_mut()?;
            let duplicate = catalog.stations.values().any(|existing| {
                existing.name == station.name
                    && existing.latitude.total_cmp(&station.latitude).is_eq()
                    && existing.longitude.total_cmp(&station.longitude).is_eq()
            });
            if duplicate {
                return Err(CatalogError::Validation(format!(
                    "station {} already exists at these coordinates",
                    station.name
                )));
            }
            let created = Station {
                id: StationId::new(),
                name: station.name,
                latitude: station.latitude,
                longitude: station.longitude,
            };
            catalog.stations.insert(created.id, created.clone());
            Ok(created)
        }
        .boxed()
    }

    fn create_route(&self, route: NewRoute) -> BoxFuture<'_, Result<Route, CatalogError>> {
        async move {
            route.validate()?;
            let mut catalog = self.catalog_mut()?;
            catalog.station(route.source)?;
            catalog.station(route.destination)?;
            let created = Route {
                id: RouteId::new(),
                source: route.source,
                destination: route.destination,
                distance: route.distance,
            };
            catalog.routes.insert(created.id, created.clone());
            Ok(created)
        }
        .boxed()
    }

    fn create_train_type(
        &self,
        train_type: NewTrainType,
    ) -> BoxFuture<'_, Result<TrainType, CatalogError>> {
        async move {
            train_type.validate()?;
            let mut catalog = self.catalog_mut()?;
            if catalog
                .train_types
                .values()
                .any(|existing| existing.name == train_type.name)
            {
                return Err(CatalogError::Validation(format!(
                    "train type {} already exists",
                    train_type.name
                )));
            }
            let created = TrainType {
                id: TrainTypeId::new(),
                name: train_type.name,
            };
            catalog.train_types.insert(created.id, created.clone());
            Ok(created)
        }
        .boxed()
    }

    fn create_train(&self, train: NewTrain) -> BoxFuture<'_, Result<Train, CatalogError>> {
        async move {
            train.validate()?;
            let mut catalog = self.catalog_mut()?;
            catalog.train_type(train.train_type)?;
            if catalog
                .trains
                .values()
                .any(|existing| existing.name == train.name)
            {
                return Err(CatalogError::Validation(format!(
                    "train {} already exists",
                    train.name
                )));
            }
            let created = Train {
                id: TrainId::new(),
                name: train.name,
                train_type: train.train_type,
                carriages: train.carriages,
                seats_per_carriage: train.seats_per_carriage,
            };
            catalog.trains.insert(created.id, created.clone());
            Ok(created)
        }
        .boxed()
    }

    fn create_crew_member(
        &self,
        member: NewCrewMember,
    ) -> BoxFuture<'_, Result<CrewMember, CatalogError>> {
        async move {
            member.validate()?;
            let created = CrewMember {
                id: CrewId::new(),
                first_name: member.first_name,
                last_name: member.last_name,
            };
            self.catalog_mut()?.crew.insert(created.id, created.clone());
            Ok(created)
        }
        .boxed()
    }

    fn create_journey(&self, journey: NewJourney) -> BoxFuture<'_, Result<Journey, CatalogError>> {
        async move {
            journey.validate()?;
            let mut catalog = self.catalog_mut()?;
            catalog.route(journey.route)?;
            catalog.train(journey.train)?;
            for member in &journey.crew {
                catalog.crew_member(*member)?;
            }
            let created = Journey {
                id: JourneyId::new(),
                route: journey.route,
                train: journey.train,
                departure_time: journey.departure_time,
                arrival_time: journey.arrival_time,
                crew: journey.crew,
            };
            catalog.journeys.insert(created.id, created.clone());
            Ok(created)
        }
        .boxed()
    }

    fn reassign_train(
        &self,
        journey: JourneyId,
        train: TrainId,
    ) -> BoxFuture<'_, Result<Journey, CatalogError>> {
        async move {
            {
                let catalog = self.catalog()?;
                catalog.journey(journey)?;
                catalog.train(train)?;
            }
            let occupancy = self.acquire(journey).await?;
            if !occupancy.committed.is_empty() {
                return Err(CatalogError::JourneyHasTickets(journey));
            }
            let mut catalog = self.catalog_mut()?;
            catalog.train(train)?;
            let entry = catalog
                .journeys
                .get_mut(&journey)
                .ok_or_else(|| CatalogError::not_found("journey", journey))?;
            entry.train = train;
            tracing::info!(journey_id = %journey, train_id = %train, "Journey reassigned");
            Ok(entry.clone())
        }
        .boxed()
    }

    fn delete_journey(&self, journey: JourneyId) -> BoxFuture<'_, Result<(), CatalogError>> {
        async move {
            self.catalog()?.journey(journey)?;
            let occupancy = self.acquire(journey).await?;
            if occupancy.issued > 0 {
                return Err(CatalogError::JourneyHasTickets(journey));
            }
            self.catalog_mut()?
                .journeys
                .remove(&journey)
                .ok_or_else(|| CatalogError::not_found("journey", journey))?;
            drop(occupancy);
            self.inner
                .occupancy
                .lock()
                .map_err(|_| StateError::Poisoned("occupancy"))?
                .remove(&journey);
            self.inner
                .published
                .write()
                .map_err(|_| StateError::Poisoned("published seats"))?
                .remove(&journey);
            tracing::info!(journey_id = %journey, "Journey deleted");
            Ok(())
        }
        .boxed()
    }

    fn list_stations(&self) -> BoxFuture<'_, Result<Vec<Station>, CatalogError>> {
        async move {
            let mut stations: Vec<Station> = self.catalog()?.stations.values().cloned().collect();
            stations.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
            Ok(stations)
        }
        .boxed()
    }

    fn list_train_types(&self) -> BoxFuture<'_, Result<Vec<TrainType>, CatalogError>> {
        async move {
            let mut types: Vec<TrainType> =
                self.catalog()?.train_types.values().cloned().collect();
            types.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(types)
        }
        .boxed()
    }

    fn list_crew(&self) -> BoxFuture<'_, Result<Vec<CrewMember>, CatalogError>> {
        async move {
            let mut crew: Vec<CrewMember> = self.catalog()?.crew.values().cloned().collect();
            crew.sort_by(|a, b| {
                a.last_name
                    .cmp(&b.last_name)
                    .then_with(|| a.first_name.cmp(&b.first_name))
                    .then_with(|| a.id.cmp(&b.id))
            });
            Ok(crew)
        }
        .boxed()
    }

    fn list_routes(
        &self,
        filter: RouteFilter,
    ) -> BoxFuture<'_, Result<Vec<RouteView>, CatalogError>> {
        async move {
            let catalog = self.catalog()?;
            let mut routes = catalog
                .routes
                .values()
                .filter(|route| filter.matches(route))
                .map(|route| catalog.route_view(route))
                .collect::<Result<Vec<_>, _>>()?;
            routes.sort_by(|a, b| {
                a.source
                    .name
                    .cmp(&b.source.name)
                    .then_with(|| a.destination.name.cmp(&b.destination.name))
                    .then_with(|| a.route.id.cmp(&b.route.id))
            });
            Ok(routes)
        }
        .boxed()
    }

    fn list_trains(
        &self,
        filter: TrainFilter,
    ) -> BoxFuture<'_, Result<Vec<TrainView>, CatalogError>> {
        async move {
            let catalog = self.catalog()?;
            let mut trains = catalog
                .trains
                .values()
                .filter(|train| filter.matches(train))
                .map(|train| catalog.train_view(train))
                .collect::<Result<Vec<_>, _>>()?;
            trains.sort_by(|a, b| a.train.name.cmp(&b.train.name));
            Ok(trains)
        }
        .boxed()
    }

    fn list_journeys(
        &self,
        filter: JourneyFilter,
        page: PageRequest,
    ) -> BoxFuture<'_, Result<Page<JourneyView>, CatalogError>> {
        async move {
            let catalog = self.catalog()?;
            let mut journeys = catalog
                .journeys
                .values()
                .map(|journey| catalog.journey_view(journey))
                .collect::<Result<Vec<_>, _>>()?;
            journeys.retain(|view| filter.matches(view));
            journeys.sort_by(journey_order);
            Ok(page.slice(journeys))
        }
        .boxed()
    }
}

impl TicketStore for InMemoryStore {
    fn commit_order(&self, order: PendingOrder) -> BoxFuture<'_, Result<Order, ReservationError>> {
        self.commit(order).boxed()
    }

    fn cancel_order(
        &self,
        order: OrderId,
        at: chrono::DateTime<chrono::Utc>,
    ) -> BoxFuture<'_, Result<Order, ReservationError>> {
        self.cancel(order, at).boxed()
    }

    fn get_order(&self, order: OrderId) -> BoxFuture<'_, Result<Order, ReservationError>> {
        async move {
            self.orders()?
                .get(&order)
                .cloned()
                .ok_or_else(|| ReservationError::not_found("order", order))
        }
        .boxed()
    }

    fn list_orders(
        &self,
        user: UserId,
        page: PageRequest,
    ) -> BoxFuture<'_, Result<Page<Order>, ReservationError>> {
        async move {
            let mut orders: Vec<Order> = self
                .orders()?
                .values()
                .filter(|order| order.user == user)
                .cloned()
                .collect();
            orders.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
            Ok(page.slice(orders))
        }
        .boxed()
    }

    fn is_taken(
        &self,
        journey: JourneyId,
        seat: SeatCoordinate,
    ) -> BoxFuture<'_, Result<bool, ReservationError>> {
        async move { Ok(self.committed_seats(journey)?.contains(&seat)) }
        .boxed()
    }

    fn taken_seats(
        &self,
        journey: JourneyId,
    ) -> BoxFuture<'_, Result<Vec<SeatCoordinate>, ReservationError>> {
        async move { Ok(self.committed_seats(journey)?.iter().copied().collect()) }
        .boxed()
    }

    fn committed_counts(
        &self,
        journeys: Vec<JourneyId>,
    ) -> BoxFuture<'_, Result<HashMap<JourneyId, u64>, ReservationError>> {
        async move {
            let mut counts = HashMap::with_capacity(journeys.len());
            for journey in journeys {
                let committed = self.committed_seats(journey)?.len() as u64;
                counts.insert(journey, committed);
            }
            Ok(counts)
        }
        .boxed()
    }
}
