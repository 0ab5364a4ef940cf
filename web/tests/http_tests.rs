//! HTTP status mapping and routing over the in-memory backend.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use train_station_core::UserId;
use train_station_testing::{JourneyFixture, TestWorld, init_test_tracing};
use train_station_web::{
    AppState, build_router,
    config::ReservationConfig,
    extractors::{USER_ID_HEADER, USER_ROLE_HEADER},
};

struct Api {
    world: TestWorld,
    app: Router,
}

#[derive(Clone, Copy)]
enum Caller {
    Anonymous,
    Customer(UserId),
    Admin(UserId),
}

impl Api {
    fn new() -> Self {
        init_test_tracing();
        let world = TestWorld::new();
        let state = AppState::new(
            Arc::new(world.store.clone()),
            Arc::new(world.store.clone()),
            Arc::new(world.clock.clone()),
            ReservationConfig::default(),
        );
        Self {
            app: build_router(state),
            world,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: Caller,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        match caller {
            Caller::Anonymous => {}
            Caller::Customer(user) => {
                request = request.header(USER_ID_HEADER, user.to_string());
            }
            Caller::Admin(user) => {
                request = request
                    .header(USER_ID_HEADER, user.to_string())
                    .header(USER_ROLE_HEADER, "admin");
            }
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn order(&self, caller: Caller, tickets: Value) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/orders",
            caller,
            Some(json!({ "tickets": tickets })),
        )
        .await
    }

    async fn available(&self, fixture: &JourneyFixture) -> u64 {
        let (status, body) = self
            .send(
                Method::GET,
                &format!("/api/journeys/{}/availability", fixture.id()),
                Caller::Anonymous,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["available"].as_u64().unwrap()
    }
}

fn seat(fixture: &JourneyFixture, carriage: u32, seat: u32) -> Value {
    json!({ "journey": fixture.id().to_string(), "carriage": carriage, "seat": seat })
}

#[tokio::test]
async fn test_health_endpoints() {
    let api = Api::new();

    let (status, body) = api.send(Method::GET, "/health", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = api.send(Method::GET, "/ready", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_order_lifecycle_over_http() {
    let api = Api::new();
    let fixture = api.world.journey(2, 10).await.unwrap();
    let alice = Caller::Customer(UserId::new());

    let (status, order) = api
        .order(alice, json!([seat(&fixture, 1, 1), seat(&fixture, 1, 2)]))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["tickets"].as_array().unwrap().len(), 2);
    assert_eq!(order["tickets"][0]["status"], "committed");
    assert_eq!(order["tickets"][0]["journey"], fixture.id().to_string());
    assert_eq!(
        order["tickets"][0]["trip"]["route"],
        format!("{} - {}", fixture.source.name, fixture.destination.name)
    );
    assert_eq!(order["tickets"][1]["trip"]["train"], fixture.train.name);
    assert_eq!(api.available(&fixture).await, 18);

    let (status, listed) = api.send(Method::GET, "/api/orders", alice, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["tickets"][0]["trip"], order["tickets"][0]["trip"]);

    let (status, error) = api.order(alice, json!([seat(&fixture, 1, 1)])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "SEAT_TAKEN");

    let order_id = order["id"].as_str().unwrap();
    let (status, cancelled) = api
        .send(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            alice,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cancelled["cancelled_at"].is_string());
    assert_eq!(api.available(&fixture).await, 20);

    let (status, error) = api
        .send(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            alice,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_invalid_and_duplicate_seats_are_unprocessable() {
    let api = Api::new();
    let fixture = api.world.journey(2, 10).await.unwrap();
    let caller = Caller::Customer(UserId::new());

    let (status, error) = api.order(caller, json!([seat(&fixture, 3, 1)])).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "INVALID_SEAT");

    let (status, error) = api
        .order(caller, json!([seat(&fixture, 1, 5), seat(&fixture, 1, 5)]))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "DUPLICATE_REQUEST");

    assert_eq!(api.available(&fixture).await, 20);
}

#[tokio::test]
async fn test_missing_or_invalid_identity_is_unauthorized() {
    let api = Api::new();
    let fixture = api.world.journey(1, 4).await.unwrap();

    let (status, error) = api
        .order(Caller::Anonymous, json!([seat(&fixture, 1, 1)]))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/api/orders")
        .header(USER_ID_HEADER, "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = api.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_orders_are_private_to_their_owner() {
    let api = Api::new();
    let fixture = api.world.journey(1, 4).await.unwrap();
    let owner_id = UserId::new();
    let owner = Caller::Customer(owner_id);
    let stranger = Caller::Customer(UserId::new());

    let (_, order) = api.order(owner, json!([seat(&fixture, 1, 1)])).await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let (status, error) = api.send(Method::GET, &uri, stranger, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["code"], "FORBIDDEN");

    let (status, _) = api
        .send(Method::POST, &format!("{uri}/cancel"), stranger, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = api
        .send(Method::GET, &uri, Caller::Admin(UserId::new()), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, page) = api.send(Method::GET, "/api/orders", owner, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["user"], owner_id.to_string());

    let (_, page) = api.send(Method::GET, "/api/orders", stranger, None).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let api = Api::new();
    let caller = Caller::Customer(UserId::new());
    let missing = uuid::Uuid::new_v4();

    for uri in [
        format!("/api/orders/{missing}"),
        format!("/api/journeys/{missing}"),
        format!("/api/journeys/{missing}/availability"),
        format!("/api/stations/{missing}"),
        format!("/api/routes/{missing}"),
        format!("/api/trains/{missing}"),
    ] {
        let (status, error) = api.send(Method::GET, &uri, caller, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(error["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn test_catalog_writes_require_admin() {
    let api = Api::new();
    let station = json!({ "name": "Kyiv", "latitude": 50.45, "longitude": 30.52 });

    let (status, _) = api
        .send(
            Method::POST,
            "/api/stations",
            Caller::Customer(UserId::new()),
            Some(station.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = api
        .send(
            Method::POST,
            "/api/stations",
            Caller::Admin(UserId::new()),
            Some(station.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Kyiv");

    let (status, error) = api
        .send(
            Method::POST,
            "/api/stations",
            Caller::Admin(UserId::new()),
            Some(station),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "VALIDATION_ERROR");

    let (status, stations) = api
        .send(Method::GET, "/api/stations", Caller::Anonymous, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stations.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_schedule_administration() {
    let api = Api::new();
    let admin = Caller::Admin(UserId::new());
    let fixture = api.world.journey(1, 4).await.unwrap();
    let spare = api
        .world
        .train("Spare", &fixture.train_type, 1, 4)
        .await
        .unwrap();
    let uri = format!("/api/journeys/{}", fixture.id());

    let (status, journey) = api
        .send(
            Method::PUT,
            &format!("{uri}/train"),
            admin,
            Some(json!({ "train": spare.id.to_string() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(journey["train"], spare.id.to_string());

    let (status, _) = api
        .order(Caller::Customer(UserId::new()), json!([seat(&fixture, 1, 1)]))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, error) = api
        .send(
            Method::PUT,
            &format!("{uri}/train"),
            admin,
            Some(json!({ "train": fixture.train.id.to_string() })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "JOURNEY_HAS_TICKETS");

    let (status, _) = api.send(Method::DELETE, &uri, admin, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let empty = api.world.journey(1, 4).await.unwrap();
    let (status, body) = api
        .send(
            Method::DELETE,
            &format!("/api/journeys/{}", empty.id()),
            admin,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
}

#[tokio::test]
async fn test_journey_search_filters_and_detail() {
    let api = Api::new();
    let first = api.world.journey(2, 10).await.unwrap();
    let second = api.world.journey(1, 4).await.unwrap();

    let (status, page) = api
        .send(Method::GET, "/api/journeys", Caller::Anonymous, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["page_size"], 5);

    let (status, page) = api
        .send(
            Method::GET,
            &format!("/api/journeys?source={}", second.source.id),
            Caller::Anonymous,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], second.id().to_string());
    assert_eq!(page["items"][0]["tickets_available"], 4);

    let (status, error) = api
        .send(
            Method::GET,
            "/api/journeys?train_type=nope",
            Caller::Anonymous,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "VALIDATION_ERROR");

    let (status, detail) = api
        .send(
            Method::GET,
            &format!("/api/journeys/{}", first.id()),
            Caller::Anonymous,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["travel_time"], "7 hours, 0 minutes");
}

#[tokio::test]
async fn test_responses_carry_correlation_id() {
    let api = Api::new();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = api.app.clone().oneshot(request).await.unwrap();
    assert!(
        response
            .headers()
            .contains_key(train_station_web::CORRELATION_ID_HEADER)
    );
}
