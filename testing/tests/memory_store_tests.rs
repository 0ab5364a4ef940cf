//! In-memory store behaviour: catalog rules, journey locks and listings.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use std::time::Duration;
use train_station_core::{
    Catalog, CatalogError, NewCrewMember, NewJourney, NewRoute, NewStation, NewTrain,
    NewTrainType, PageRequest, ReservationError, Requester, SeatCoordinate, TicketStore, UserId,
};
use train_station_testing::{InMemoryStore, TestWorld, seats};

#[tokio::test]
async fn duplicate_station_coordinates_are_rejected() {
    let store = InMemoryStore::new();
    let station = NewStation {
        name: "Kyiv".to_string(),
        latitude: 50.45,
        longitude: 30.52,
    };
    store.create_station(station.clone()).await.unwrap();

    let err = store.create_station(station.clone()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));

    let elsewhere = NewStation {
        latitude: 49.84,
        ..station
    };
    assert!(store.create_station(elsewhere).await.is_ok());
}

#[tokio::test]
async fn train_and_type_names_are_unique() {
    let store = InMemoryStore::new();
    let train_type = store
        .create_train_type(NewTrainType {
            name: "Intercity".to_string(),
        })
        .await
        .unwrap();
    assert!(
        store
            .create_train_type(NewTrainType {
                name: "Intercity".to_string(),
            })
            .await
            .is_err()
    );

    let train = NewTrain {
        name: "Hyundai".to_string(),
        train_type: train_type.id,
        carriages: 2,
        seats_per_carriage: 10,
    };
    store.create_train(train.clone()).await.unwrap();
    assert!(matches!(
        store.create_train(train).await,
        Err(CatalogError::Validation(_))
    ));
}

#[tokio::test]
async fn references_must_exist() {
    let world = TestWorld::new();
    let fixture = world.journey(2, 10).await.unwrap();

    let missing_station = world
        .store
        .create_route(NewRoute {
            source: fixture.source.id,
            destination: train_station_core::StationId::new(),
            distance: 10,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        missing_station,
        CatalogError::NotFound {
            entity: "station",
            ..
        }
    ));

    let missing_crew = world
        .store
        .create_journey(NewJourney {
            route: fixture.route.id,
            train: fixture.train.id,
            departure_time: fixture.journey.departure_time,
            arrival_time: fixture.journey.arrival_time,
            crew: vec![train_station_core::CrewId::new()],
        })
        .await
        .unwrap_err();
    assert!(matches!(
        missing_crew,
        CatalogError::NotFound {
            entity: "crew member",
            ..
        }
    ));
}

#[tokio::test]
async fn reassignment_is_blocked_by_committed_tickets() {
    let world = TestWorld::new();
    let fixture = world.journey(2, 10).await.unwrap();
    let bigger = world
        .train("Bigger", &fixture.train_type, 4, 20)
        .await
        .unwrap();
    let user = UserId::new();

    let order = world
        .engine
        .submit_order(user, seats(fixture.id(), &[(1, 1)]))
        .await
        .unwrap();

    let err = world
        .store
        .reassign_train(fixture.id(), bigger.id)
        .await
        .unwrap_err();
    assert_eq!(err, CatalogError::JourneyHasTickets(fixture.id()));

    world
        .engine
        .cancel_order(order.id, &Requester::customer(user))
        .await
        .unwrap();

    let journey = world
        .store
        .reassign_train(fixture.id(), bigger.id)
        .await
        .unwrap();
    assert_eq!(journey.train, bigger.id);

    let availability = world.queries.availability(fixture.id()).await.unwrap();
    assert_eq!(availability.total, 80);
    assert_eq!(availability.available, 80);
}

#[tokio::test]
async fn deletion_is_blocked_once_tickets_were_issued() {
    let world = TestWorld::new();
    let untouched = world.journey(1, 4).await.unwrap();
    let sold = world.journey(1, 4).await.unwrap();
    let user = UserId::new();

    world.store.delete_journey(untouched.id()).await.unwrap();
    assert!(matches!(
        world.store.get_journey(untouched.id()).await,
        Err(CatalogError::NotFound { .. })
    ));

    let order = world
        .engine
        .submit_order(user, seats(sold.id(), &[(1, 2)]))
        .await
        .unwrap();
    world
        .engine
        .cancel_order(order.id, &Requester::customer(user))
        .await
        .unwrap();

    assert_eq!(
        world.store.delete_journey(sold.id()).await,
        Err(CatalogError::JourneyHasTickets(sold.id()))
    );
}

#[tokio::test]
async fn held_journey_lock_times_out_into_busy() {
    let world = TestWorld::with_store(InMemoryStore::with_lock_timeout(Duration::from_millis(50)));
    let fixture = world.journey(2, 10).await.unwrap();
    let user = UserId::new();

    let lock = world.store.lock_journey(fixture.id()).await.unwrap();
    let err = world
        .engine
        .submit_order(user, seats(fixture.id(), &[(1, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::Busy(_)));
    assert!(err.is_retryable());
    let taken = tokio::time::timeout(
        Duration::from_millis(500),
        world.store.taken_seats(fixture.id()),
    )
    .await
    .expect("taken_seats must not wait for the journey lock")
    .unwrap();
    assert!(taken.is_empty());

    drop(lock);
    let order = world
        .engine
        .submit_order(user, seats(fixture.id(), &[(1, 1)]))
        .await
        .unwrap();
    assert_eq!(order.tickets.len(), 1);
}

#[tokio::test]
async fn reads_do_not_wait_for_a_held_journey_lock() {
    let world = TestWorld::with_store(InMemoryStore::with_lock_timeout(Duration::from_millis(50)));
    let fixture = world.journey(2, 10).await.unwrap();
    world
        .engine
        .submit_order(UserId::new(), seats(fixture.id(), &[(1, 1), (2, 3)]))
        .await
        .unwrap();

    let _lock = world.store.lock_journey(fixture.id()).await.unwrap();
    let reads = async {
        let taken = world
            .engine
            .seat_map()
            .is_taken(fixture.id(), SeatCoordinate::new(1, 1))
            .await
            .unwrap();
        let held = world.store.taken_seats(fixture.id()).await.unwrap();
        let availability = world.queries.availability(fixture.id()).await.unwrap();
        (taken, held, availability.available)
    };
    let (taken, held, available) = tokio::time::timeout(Duration::from_secs(1), reads)
        .await
        .expect("reads must not block on the journey lock");

    assert!(taken);
    assert_eq!(
        held,
        vec![SeatCoordinate::new(1, 1), SeatCoordinate::new(2, 3)]
    );
    assert_eq!(available, 18);
}

#[tokio::test]
async fn independent_journeys_do_not_contend() {
    let world = TestWorld::with_store(InMemoryStore::with_lock_timeout(Duration::from_millis(50)));
    let locked = world.journey(2, 10).await.unwrap();
    let free = world.journey(2, 10).await.unwrap();

    let _lock = world.store.lock_journey(locked.id()).await.unwrap();
    let order = world
        .engine
        .submit_order(UserId::new(), seats(free.id(), &[(2, 10)]))
        .await
        .unwrap();
    assert_eq!(order.tickets[0].seat, SeatCoordinate::new(2, 10));
}

#[tokio::test]
async fn orders_are_listed_per_user_and_paginated() {
    let world = TestWorld::new();
    let fixture = world.journey(2, 10).await.unwrap();
    let user = UserId::new();
    let other = UserId::new();

    for seat in 1..=7 {
        world
            .engine
            .submit_order(user, seats(fixture.id(), &[(1, seat)]))
            .await
            .unwrap();
    }
    world
        .engine
        .submit_order(other, seats(fixture.id(), &[(2, 1)]))
        .await
        .unwrap();

    let first = world
        .store
        .list_orders(user, PageRequest::new(1, 5))
        .await
        .unwrap();
    assert_eq!(first.total, 7);
    assert_eq!(first.items.len(), 5);
    assert!(first.has_next());
    assert!(first.items.iter().all(|order| order.user == user));

    let second = world
        .store
        .list_orders(user, PageRequest::new(2, 5))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 2);
    assert!(!second.has_next());
}

#[tokio::test]
async fn crew_members_are_listed_by_last_name() {
    let store = InMemoryStore::new();
    for (first, last) in [("Olena", "Shevchenko"), ("Andriy", "Bondar"), ("Iryna", "Bondar")] {
        store
            .create_crew_member(NewCrewMember {
                first_name: first.to_string(),
                last_name: last.to_string(),
            })
            .await
            .unwrap();
    }

    let names: Vec<String> = store
        .list_crew()
        .await
        .unwrap()
        .iter()
        .map(train_station_core::CrewMember::full_name)
        .collect();
    assert_eq!(
        names,
        vec!["Andriy Bondar", "Iryna Bondar", "Olena Shevchenko"]
    );
}
