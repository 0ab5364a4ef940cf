//! Journey endpoints: search, detail, availability and schedule changes.

use super::parse_ids;
use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use train_station_core::{
    Availability, Journey, JourneyDetail, JourneyFilter, JourneyId, JourneySummary, NewJourney,
    Page, RouteId, TrainId,
};

/// Query parameters of `GET /api/journeys`.
///
/// `source`, `destination` and `train_type` take comma separated ids.
#[derive(Debug, Default, Deserialize)]
pub struct JourneyParams {
    /// Earliest departure, inclusive (RFC 3339)
    pub departure_from: Option<DateTime<Utc>>,
    /// Latest departure, inclusive (RFC 3339)
    pub departure_until: Option<DateTime<Utc>>,
    /// Departure calendar date in UTC (`YYYY-MM-DD`)
    pub departure_date: Option<NaiveDate>,
    /// Route id
    pub route: Option<RouteId>,
    /// Source station ids
    pub source: Option<String>,
    /// Destination station ids
    pub destination: Option<String>,
    /// Case-insensitive train name substring
    pub train_name: Option<String>,
    /// Train type ids
    pub train_type: Option<String>,
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page
    pub page_size: Option<u32>,
}

impl JourneyParams {
    fn filter(&self) -> Result<JourneyFilter, AppError> {
        Ok(JourneyFilter {
            departure_from: self.departure_from,
            departure_until: self.departure_until,
            departure_date: self.departure_date,
            route: self.route,
            sources: parse_ids("source", self.source.as_deref())?,
            destinations: parse_ids("destination", self.destination.as_deref())?,
            train_name: self
                .train_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            train_types: parse_ids("train_type", self.train_type.as_deref())?,
        })
    }
}

/// Body of `PUT /api/journeys/:id/train`.
#[derive(Debug, Deserialize)]
pub struct ReassignTrainRequest {
    /// Replacement train
    pub train: TrainId,
}

/// Search journeys, latest departure first.
pub async fn list_journeys(
    State(state): State<AppState>,
    Query(params): Query<JourneyParams>,
) -> Result<Json<Page<JourneySummary>>, AppError> {
    let filter = params.filter()?;
    let page = state.journey_page(params.page, params.page_size);
    Ok(Json(state.queries.search_journeys(filter, page).await?))
}

/// Schedule a journey. Admin only.
pub async fn create_journey(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(journey): Json<NewJourney>,
) -> Result<(StatusCode, Json<Journey>), AppError> {
    let journey = state.catalog.create_journey(journey).await?;
    tracing::info!(journey_id = %journey.id, admin = %admin.user, "Journey created");
    Ok((StatusCode::CREATED, Json(journey)))
}

/// Journey with route, train, crew, travel time and taken seats.
pub async fn get_journey(
    State(state): State<AppState>,
    Path(id): Path<JourneyId>,
) -> Result<Json<JourneyDetail>, AppError> {
    Ok(Json(state.queries.journey_detail(id).await?))
}

/// Total and available seats.
pub async fn journey_availability(
    State(state): State<AppState>,
    Path(id): Path<JourneyId>,
) -> Result<Json<Availability>, AppError> {
    Ok(Json(state.queries.availability(id).await?))
}

/// Move a journey to another train. Admin only; refused once tickets exist.
pub async fn reassign_train(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<JourneyId>,
    Json(request): Json<ReassignTrainRequest>,
) -> Result<Json<Journey>, AppError> {
    let journey = state.catalog.reassign_train(id, request.train).await?;
    tracing::info!(journey_id = %id, train_id = %request.train, admin = %admin.user, "Train reassigned");
    Ok(Json(journey))
}

/// Delete a journey that never had tickets. Admin only.
pub async fn delete_journey(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<JourneyId>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_journey(id).await?;
    tracing::info!(journey_id = %id, admin = %admin.user, "Journey deleted");
    Ok(StatusCode::NO_CONTENT)
}
