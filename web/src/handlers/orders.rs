//! Order endpoints.
//!
//! - `POST /api/orders` - Submit seats on one or more journeys
//! - `GET /api/orders` - The caller's orders, newest first
//! - `GET /api/orders/:id` - One order (owner or admin)
//! - `POST /api/orders/:id/cancel` - Cancel and release all seats
//!
//! Order responses embed the route, train and times of every ticket's journey.

use super::PageParams;
use crate::error::AppError;
use crate::extractors::AuthenticatedUser;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use train_station_core::{OrderDetail, OrderId, Page, SeatRequest};

/// Body of `POST /api/orders`.
///
/// ```json
/// { "tickets": [ { "journey": "…", "carriage": 1, "seat": 4 } ] }
/// ```
#[derive(Debug, Deserialize)]
pub struct SubmitOrderRequest {
    /// Requested seats, in order
    pub tickets: Vec<SeatRequest>,
}

/// Submit an order. All seats commit together or none do.
pub async fn submit_order(
    caller: AuthenticatedUser,
    State(state): State<AppState>,
    Json(request): Json<SubmitOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetail>), AppError> {
    let order = state
        .engine
        .submit_order(caller.user(), request.tickets)
        .await?;
    Ok((StatusCode::CREATED, Json(state.queries.order_detail(order).await?)))
}

/// List the caller's orders.
pub async fn list_orders(
    caller: AuthenticatedUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<OrderDetail>>, AppError> {
    let page = state.order_page(params.page, params.page_size);
    let orders = state.engine.list_orders(caller.user(), page).await?;
    Ok(Json(state.queries.order_details(orders).await?))
}

/// Fetch one order.
pub async fn get_order(
    AuthenticatedUser(requester): AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>, AppError> {
    let order = state.engine.get_order(id, &requester).await?;
    Ok(Json(state.queries.order_detail(order).await?))
}

/// Cancel an order.
pub async fn cancel_order(
    AuthenticatedUser(requester): AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>, AppError> {
    let order = state.engine.cancel_order(id, &requester).await?;
    tracing::info!(order_id = %id, admin = requester.is_admin, "Order cancelled via API");
    Ok(Json(state.queries.order_detail(order).await?))
}
