//! Catalog endpoints: stations, routes, train types, trains and crew.
//!
//! Reads are open to any caller; writes require the admin role.

use super::parse_ids;
use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use train_station_core::{
    CrewMember, NewCrewMember, NewRoute, NewStation, NewTrain, NewTrainType, Route, RouteFilter,
    RouteId, RouteView, Station, StationId, Train, TrainFilter, TrainId, TrainType, TrainView,
};

type Created<T> = (StatusCode, Json<T>);

// ============================================================================
// Stations
// ============================================================================

/// All stations.
pub async fn list_stations(State(state): State<AppState>) -> Result<Json<Vec<Station>>, AppError> {
    Ok(Json(state.queries.list_stations().await?))
}

/// Create a station. Name and coordinates must be unique together.
pub async fn create_station(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Json(station): Json<NewStation>,
) -> Result<Created<Station>, AppError> {
    let station = state.catalog.create_station(station).await?;
    tracing::info!(station_id = %station.id, name = %station.name, "Station created");
    Ok((StatusCode::CREATED, Json(station)))
}

/// One station.
pub async fn get_station(
    State(state): State<AppState>,
    Path(id): Path<StationId>,
) -> Result<Json<Station>, AppError> {
    Ok(Json(state.catalog.get_station(id).await?))
}

// ============================================================================
// Routes
// ============================================================================

/// Query parameters of `GET /api/routes`, comma separated station ids.
#[derive(Debug, Default, Deserialize)]
pub struct RouteParams {
    /// Source station ids
    pub source: Option<String>,
    /// Destination station ids
    pub destination: Option<String>,
}

/// Routes with their endpoint stations.
pub async fn list_routes(
    State(state): State<AppState>,
    Query(params): Query<RouteParams>,
) -> Result<Json<Vec<RouteView>>, AppError> {
    let filter = RouteFilter {
        sources: parse_ids("source", params.source.as_deref())?,
        destinations: parse_ids("destination", params.destination.as_deref())?,
    };
    Ok(Json(state.queries.search_routes(filter).await?))
}

/// Create a route between two existing stations.
pub async fn create_route(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Json(route): Json<NewRoute>,
) -> Result<Created<Route>, AppError> {
    let route = state.catalog.create_route(route).await?;
    tracing::info!(route_id = %route.id, "Route created");
    Ok((StatusCode::CREATED, Json(route)))
}

/// One route.
pub async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<RouteId>,
) -> Result<Json<Route>, AppError> {
    Ok(Json(state.catalog.get_route(id).await?))
}

// ============================================================================
// Train types
// ============================================================================

/// All train types.
pub async fn list_train_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<TrainType>>, AppError> {
    Ok(Json(state.queries.list_train_types().await?))
}

/// Create a train type.
pub async fn create_train_type(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Json(train_type): Json<NewTrainType>,
) -> Result<Created<TrainType>, AppError> {
    let train_type = state.catalog.create_train_type(train_type).await?;
    Ok((StatusCode::CREATED, Json(train_type)))
}

// ============================================================================
// Trains
// ============================================================================

/// Query parameters of `GET /api/trains`.
#[derive(Debug, Default, Deserialize)]
pub struct TrainParams {
    /// Case-insensitive name substring
    pub name: Option<String>,
    /// Comma separated train type ids
    pub train_type: Option<String>,
}

/// Trains with their type.
pub async fn list_trains(
    State(state): State<AppState>,
    Query(params): Query<TrainParams>,
) -> Result<Json<Vec<TrainView>>, AppError> {
    let filter = TrainFilter {
        name: params
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        train_types: parse_ids("train_type", params.train_type.as_deref())?,
    };
    Ok(Json(state.queries.search_trains(filter).await?))
}

/// Create a train with a fixed carriage layout.
pub async fn create_train(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Json(train): Json<NewTrain>,
) -> Result<Created<Train>, AppError> {
    let train = state.catalog.create_train(train).await?;
    tracing::info!(train_id = %train.id, name = %train.name, "Train created");
    Ok((StatusCode::CREATED, Json(train)))
}

/// One train.
pub async fn get_train(
    State(state): State<AppState>,
    Path(id): Path<TrainId>,
) -> Result<Json<Train>, AppError> {
    Ok(Json(state.catalog.get_train(id).await?))
}

// ============================================================================
// Crew
// ============================================================================

/// All crew members.
pub async fn list_crew(State(state): State<AppState>) -> Result<Json<Vec<CrewMember>>, AppError> {
    Ok(Json(state.queries.list_crew().await?))
}

/// Create a crew member.
pub async fn create_crew_member(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Json(member): Json<NewCrewMember>,
) -> Result<Created<CrewMember>, AppError> {
    let member = state.catalog.create_crew_member(member).await?;
    Ok((StatusCode::CREATED, Json(member)))
}
