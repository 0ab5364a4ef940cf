//! Availability, journey search and listing queries.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use train_station_core::{
    Catalog, CatalogError, CrewId, CrewMember, Journey, JourneyFilter, JourneyId, JourneyView,
    NewCrewMember, NewJourney, NewRoute, NewStation, NewTrain, NewTrainType, Page, PageRequest,
    QueryService, ReservationError, Route, RouteFilter, RouteId, RouteView, SeatCoordinate,
    Station, StationId, TicketStore, Train, TrainFilter, TrainId, TrainType, TrainTypeId,
    TrainView, UserId,
};
use train_station_testing::{InMemoryStore, TestWorld, seats};

#[tokio::test]
async fn availability_reflects_committed_and_cancelled_orders() {
    let world = TestWorld::new();
    let fixture = world.journey(2, 10).await.unwrap();
    let user = UserId::new();

    let before = world.queries.availability(fixture.id()).await.unwrap();
    assert_eq!((before.total, before.available), (20, 20));

    let order = world
        .engine
        .submit_order(user, seats(fixture.id(), &[(1, 1), (2, 2), (2, 3)]))
        .await
        .unwrap();
    let during = world.queries.availability(fixture.id()).await.unwrap();
    assert_eq!((during.total, during.available), (20, 17));

    world
        .engine
        .cancel_order(order.id, &train_station_core::Requester::customer(user))
        .await
        .unwrap();
    let after = world.queries.availability(fixture.id()).await.unwrap();
    assert_eq!(after.available, 20);
}

#[tokio::test]
async fn availability_of_unknown_journey_is_not_found() {
    let world = TestWorld::new();
    let missing = JourneyId::new();
    assert_eq!(
        world.queries.availability(missing).await,
        Err(ReservationError::not_found("journey", missing))
    );
}

#[tokio::test]
async fn journeys_are_listed_latest_departure_first_with_counts() {
    let world = TestWorld::new();
    let base = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
    let early = world.journey_departing(1, 10, base).await.unwrap();
    let late = world
        .journey_departing(1, 10, base + Duration::days(2))
        .await
        .unwrap();

    world
        .engine
        .submit_order(UserId::new(), seats(early.id(), &[(1, 1), (1, 2)]))
        .await
        .unwrap();

    let page = world
        .queries
        .search_journeys(JourneyFilter::default(), PageRequest::first(5))
        .await
        .unwrap();
    let ids: Vec<_> = page.items.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![late.id(), early.id()]);

    let summary = &page.items[1];
    assert_eq!(summary.total_seats, 10);
    assert_eq!(summary.tickets_available, 8);
    assert_eq!(summary.train, early.train.name);
    assert_eq!(
        summary.route,
        format!("{} - {}", early.source.name, early.destination.name)
    );
    assert_eq!(summary.crew, vec![early.crew.full_name()]);
}

#[tokio::test]
async fn journeys_filter_by_date_route_stations_and_train() {
    let world = TestWorld::new();
    let base = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
    let monday = world.journey_departing(1, 10, base).await.unwrap();
    let wednesday = world
        .journey_departing(1, 10, base + Duration::days(2))
        .await
        .unwrap();

    let search = |filter: JourneyFilter| {
        let queries = world.queries.clone();
        async move {
            queries
                .search_journeys(filter, PageRequest::first(10))
                .await
                .unwrap()
                .items
                .into_iter()
                .map(|s| s.id)
                .collect::<Vec<_>>()
        }
    };

    let by_date = search(JourneyFilter {
        departure_date: NaiveDate::from_ymd_opt(2025, 3, 12),
        ..JourneyFilter::default()
    })
    .await;
    assert_eq!(by_date, vec![wednesday.id()]);

    let by_route = search(JourneyFilter {
        route: Some(monday.route.id),
        ..JourneyFilter::default()
    })
    .await;
    assert_eq!(by_route, vec![monday.id()]);

    let by_source = search(JourneyFilter {
        sources: vec![monday.source.id, wednesday.source.id],
        ..JourneyFilter::default()
    })
    .await;
    assert_eq!(by_source.len(), 2);

    let by_destination = search(JourneyFilter {
        destinations: vec![wednesday.destination.id],
        ..JourneyFilter::default()
    })
    .await;
    assert_eq!(by_destination, vec![wednesday.id()]);

    let by_train_name = search(JourneyFilter {
        train_name: Some(monday.train.name.to_uppercase()),
        ..JourneyFilter::default()
    })
    .await;
    assert_eq!(by_train_name, vec![monday.id()]);

    let by_train_type = search(JourneyFilter {
        train_types: vec![wednesday.train_type.id],
        ..JourneyFilter::default()
    })
    .await;
    assert_eq!(by_train_type, vec![wednesday.id()]);

    let by_window = search(JourneyFilter {
        departure_from: Some(base),
        departure_until: Some(base + Duration::hours(1)),
        ..JourneyFilter::default()
    })
    .await;
    assert_eq!(by_window, vec![monday.id()]);
}

#[tokio::test]
async fn journey_search_is_paginated() {
    let world = TestWorld::new();
    let base = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
    for day in 0..7 {
        world
            .journey_departing(1, 4, base + Duration::days(day))
            .await
            .unwrap();
    }

    let first = world
        .queries
        .search_journeys(JourneyFilter::default(), PageRequest::first(5))
        .await
        .unwrap();
    assert_eq!(first.total, 7);
    assert_eq!(first.items.len(), 5);
    assert!(first.has_next());
    assert_eq!(
        first.items[0].departure_time,
        base + Duration::days(6)
    );

    let second = world
        .queries
        .search_journeys(JourneyFilter::default(), PageRequest::new(2, 5))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 2);
    assert_eq!(second.items[1].departure_time, base);
}

#[tokio::test]
async fn journey_detail_includes_travel_time_and_taken_seats() {
    let world = TestWorld::new();
    let fixture = world.journey(2, 4).await.unwrap();

    world
        .engine
        .submit_order(UserId::new(), seats(fixture.id(), &[(2, 4), (1, 3)]))
        .await
        .unwrap();

    let detail = world.queries.journey_detail(fixture.id()).await.unwrap();
    assert_eq!(detail.view.journey.id, fixture.id());
    assert_eq!(detail.view.route.source, fixture.source);
    assert_eq!(detail.view.train.train_type, fixture.train_type);
    assert_eq!(detail.view.crew, vec![fixture.crew.clone()]);
    assert_eq!(detail.travel_time, "7 hours, 0 minutes");
    assert_eq!(
        detail.taken_seats,
        vec![SeatCoordinate::new(1, 3), SeatCoordinate::new(2, 4)]
    );
    assert_eq!(detail.tickets_available, 6);
}

#[tokio::test]
async fn routes_and_trains_are_searchable() {
    let world = TestWorld::new();
    let a = world.journey(1, 4).await.unwrap();
    let b = world.journey(1, 4).await.unwrap();
    world
        .store
        .create_route(NewRoute {
            source: b.destination.id,
            destination: a.source.id,
            distance: 250,
        })
        .await
        .unwrap();

    let from_a = world
        .queries
        .search_routes(RouteFilter {
            sources: vec![a.source.id],
            ..RouteFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(from_a.len(), 1);
    assert_eq!(from_a[0].route.id, a.route.id);

    let into_a = world
        .queries
        .search_routes(RouteFilter {
            destinations: vec![a.source.id],
            ..RouteFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(into_a.len(), 1);
    assert_eq!(into_a[0].source.id, b.destination.id);

    let all_trains = world
        .queries
        .search_trains(TrainFilter::default())
        .await
        .unwrap();
    let names: Vec<_> = all_trains.iter().map(|t| t.train.name.clone()).collect();
    assert_eq!(names, vec![a.train.name.clone(), b.train.name.clone()]);

    let of_type = world
        .queries
        .search_trains(TrainFilter {
            train_types: vec![b.train_type.id],
            ..TrainFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(of_type.len(), 1);
    assert_eq!(of_type[0].train.id, b.train.id);
}

#[tokio::test]
async fn stations_are_listed_by_name() {
    let world = TestWorld::new();
    for name in ["Lviv", "Kharkiv", "Odesa"] {
        world.station(name).await.unwrap();
    }
    let names: Vec<_> = world
        .queries
        .list_stations()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["Kharkiv", "Lviv", "Odesa"]);
}

/// Catalog that counts journey lookups and delegates everything else.
struct CountingCatalog {
    inner: InMemoryStore,
    journey_lookups: AtomicUsize,
}

type CatalogResult<T> = Result<T, CatalogError>;

impl Catalog for CountingCatalog {
    fn get_station(&self, id: StationId) -> BoxFuture<'_, CatalogResult<Station>> {
        self.inner.get_station(id)
    }

    fn get_route(&self, id: RouteId) -> BoxFuture<'_, CatalogResult<Route>> {
        self.inner.get_route(id)
    }

    fn get_train_type(&self, id: TrainTypeId) -> BoxFuture<'_, CatalogResult<TrainType>> {
        self.inner.get_train_type(id)
    }

    fn get_train(&self, id: TrainId) -> BoxFuture<'_, CatalogResult<Train>> {
        self.inner.get_train(id)
    }

    fn get_crew_member(&self, id: CrewId) -> BoxFuture<'_, CatalogResult<CrewMember>> {
        self.inner.get_crew_member(id)
    }

    fn get_journey(&self, id: JourneyId) -> BoxFuture<'_, CatalogResult<Journey>> {
        self.journey_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_journey(id)
    }

    fn journey_view(&self, id: JourneyId) -> BoxFuture<'_, CatalogResult<JourneyView>> {
        self.journey_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.journey_view(id)
    }

    fn create_station(&self, station: NewStation) -> BoxFuture<'_, CatalogResult<Station>> {
        self.inner.create_station(station)
    }

    fn create_route(&self, route: NewRoute) -> BoxFuture<'_, CatalogResult<Route>> {
        self.inner.create_route(route)
    }

    fn create_train_type(
        &self,
        train_type: NewTrainType,
    ) -> BoxFuture<'_, CatalogResult<TrainType>> {
        self.inner.create_train_type(train_type)
    }

    fn create_train(&self, train: NewTrain) -> BoxFuture<'_, CatalogResult<Train>> {
        self.inner.create_train(train)
    }

    fn create_crew_member(
        &self,
        member: NewCrewMember,
    ) -> BoxFuture<'_, CatalogResult<CrewMember>> {
        self.inner.create_crew_member(member)
    }

    fn create_journey(&self, journey: NewJourney) -> BoxFuture<'_, CatalogResult<Journey>> {
        self.inner.create_journey(journey)
    }

    fn reassign_train(
        &self,
        journey: JourneyId,
        train: TrainId,
    ) -> BoxFuture<'_, CatalogResult<Journey>> {
        self.inner.reassign_train(journey, train)
    }

    fn delete_journey(&self, journey: JourneyId) -> BoxFuture<'_, CatalogResult<()>> {
        self.inner.delete_journey(journey)
    }

    fn list_stations(&self) -> BoxFuture<'_, CatalogResult<Vec<Station>>> {
        self.inner.list_stations()
    }

    fn list_train_types(&self) -> BoxFuture<'_, CatalogResult<Vec<TrainType>>> {
        self.inner.list_train_types()
    }

    fn list_crew(&self) -> BoxFuture<'_, CatalogResult<Vec<CrewMember>>> {
        self.inner.list_crew()
    }

    fn list_routes(&self, filter: RouteFilter) -> BoxFuture<'_, CatalogResult<Vec<RouteView>>> {
        self.inner.list_routes(filter)
    }

    fn list_trains(&self, filter: TrainFilter) -> BoxFuture<'_, CatalogResult<Vec<TrainView>>> {
        self.inner.list_trains(filter)
    }

    fn list_journeys(
        &self,
        filter: JourneyFilter,
        page: PageRequest,
    ) -> BoxFuture<'_, CatalogResult<Page<JourneyView>>> {
        self.inner.list_journeys(filter, page)
    }
}

#[tokio::test]
async fn availability_resolves_the_journey_once() {
    let world = TestWorld::new();
    let fixture = world.journey(3, 4).await.unwrap();
    world
        .engine
        .submit_order(UserId::new(), seats(fixture.id(), &[(3, 4)]))
        .await
        .unwrap();

    let catalog = Arc::new(CountingCatalog {
        inner: world.store.clone(),
        journey_lookups: AtomicUsize::new(0),
    });
    let tickets: Arc<dyn TicketStore> = Arc::new(world.store.clone());
    let queries = QueryService::new(Arc::clone(&catalog) as Arc<dyn Catalog>, tickets);

    let availability = queries.availability(fixture.id()).await.unwrap();
    assert_eq!((availability.total, availability.available), (12, 11));
    assert_eq!(catalog.journey_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn order_details_carry_each_tickets_trip() {
    let world = TestWorld::new();
    let first = world.journey(1, 4).await.unwrap();
    let second = world.journey(1, 4).await.unwrap();
    let user = UserId::new();

    let mut requests = seats(second.id(), &[(1, 2)]);
    requests.extend(seats(first.id(), &[(1, 1)]));
    world.engine.submit_order(user, requests).await.unwrap();
    world
        .engine
        .submit_order(user, seats(first.id(), &[(1, 3)]))
        .await
        .unwrap();

    let orders = world
        .engine
        .list_orders(user, PageRequest::first(10))
        .await
        .unwrap();
    let details = world.queries.order_details(orders).await.unwrap();
    assert_eq!(details.total, 2);

    let mixed = details
        .items
        .iter()
        .find(|order| order.tickets.len() == 2)
        .unwrap();
    assert_eq!(mixed.tickets[0].ticket.journey, second.id());
    assert_eq!(mixed.tickets[0].trip.train, second.train.name);
    assert_eq!(
        mixed.tickets[1].trip.route,
        format!("{} - {}", first.source.name, first.destination.name)
    );
    assert_eq!(
        mixed.tickets[1].trip.departure_time,
        first.journey.departure_time
    );
}
