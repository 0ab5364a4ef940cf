//! Router configuration.
//!
//! Health checks live at the root, everything else under `/api`.

use crate::handlers::{self, catalog, journeys, orders};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

/// Build the complete router over the given state.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Orders
        .route("/orders", post(orders::submit_order).get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        // Journeys
        .route(
            "/journeys",
            get(journeys::list_journeys).post(journeys::create_journey),
        )
        .route(
            "/journeys/:id",
            get(journeys::get_journey).delete(journeys::delete_journey),
        )
        .route(
            "/journeys/:id/availability",
            get(journeys::journey_availability),
        )
        .route("/journeys/:id/train", put(journeys::reassign_train))
        // Catalog
        .route(
            "/stations",
            get(catalog::list_stations).post(catalog::create_station),
        )
        .route("/stations/:id", get(catalog::get_station))
        .route(
            "/routes",
            get(catalog::list_routes).post(catalog::create_route),
        )
        .route("/routes/:id", get(catalog::get_route))
        .route(
            "/train_types",
            get(catalog::list_train_types).post(catalog::create_train_type),
        )
        .route(
            "/trains",
            get(catalog::list_trains).post(catalog::create_train),
        )
        .route("/trains/:id", get(catalog::get_train))
        .route(
            "/crews",
            get(catalog::list_crew).post(catalog::create_crew_member),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .nest("/api", api_routes)
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
