//! [`Catalog`] over `PostgreSQL`.

use crate::PostgresStore;
use crate::error::{catalog_error, column_u32, is_foreign_key_violation, to_column};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::collections::HashMap;
use train_station_core::catalog::{
    Catalog, JourneyFilter, JourneyView, NewCrewMember, NewJourney, NewRoute, NewStation,
    NewTrain, NewTrainType, RouteFilter, RouteView, TrainFilter, TrainView,
};
use train_station_core::{
    CatalogError, CrewId, CrewMember, Journey, JourneyId, Page, PageRequest, Route, RouteId,
    Station, StationId, Train, TrainId, TrainType, TrainTypeId,
};
use uuid::Uuid;

type Result<T> = std::result::Result<T, CatalogError>;

macro_rules! route_view_columns {
    () => {
        "r.id AS route_id, r.distance, \
         r.source_id, s.name AS source_name, s.latitude AS source_latitude, s.longitude AS source_longitude, \
         r.destination_id, d.name AS destination_name, d.latitude AS destination_latitude, d.longitude AS destination_longitude"
    };
}

macro_rules! route_view_joins {
    () => {
        " JOIN stations s ON s.id = r.source_id JOIN stations d ON d.id = r.destination_id"
    };
}

macro_rules! train_view_columns {
    () => {
        "t.id AS train_id, t.name AS train_name, t.train_type_id, tt.name AS train_type_name, \
         t.carriages, t.seats_per_carriage"
    };
}

macro_rules! journey_view_joins {
    () => {
        concat!(
            " FROM journeys j JOIN routes r ON r.id = j.route_id",
            route_view_joins!(),
            " JOIN trains t ON t.id = j.train_id JOIN train_types tt ON tt.id = t.train_type_id"
        )
    };
}

const ROUTE_VIEW_SQL: &str = concat!(
    "SELECT ",
    route_view_columns!(),
    " FROM routes r",
    route_view_joins!()
);

const TRAIN_VIEW_SQL: &str = concat!(
    "SELECT ",
    train_view_columns!(),
    " FROM trains t JOIN train_types tt ON tt.id = t.train_type_id"
);

const JOURNEY_VIEW_SQL: &str = concat!(
    "SELECT j.id AS journey_id, j.departure_time, j.arrival_time, ",
    route_view_columns!(),
    ", ",
    train_view_columns!(),
    journey_view_joins!()
);

const JOURNEY_COUNT_SQL: &str = concat!("SELECT COUNT(*)", journey_view_joins!());

// ============================================================================
// Rows
// ============================================================================

#[derive(FromRow)]
struct StationRow {
    id: Uuid,
    name: String,
    latitude: f64,
    longitude: f64,
}

impl From<StationRow> for Station {
    fn from(row: StationRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

#[derive(FromRow)]
struct RouteRow {
    id: Uuid,
    source_id: Uuid,
    destination_id: Uuid,
    distance: i32,
}

impl TryFrom<RouteRow> for Route {
    type Error = CatalogError;

    fn try_from(row: RouteRow) -> Result<Self> {
        Ok(Self {
            id: row.id.into(),
            source: row.source_id.into(),
            destination: row.destination_id.into(),
            distance: column_u32("distance", row.distance).map_err(CatalogError::Storage)?,
        })
    }
}

#[derive(FromRow)]
struct TrainTypeRow {
    id: Uuid,
    name: String,
}

impl From<TrainTypeRow> for TrainType {
    fn from(row: TrainTypeRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
        }
    }
}

#[derive(FromRow)]
struct TrainRow {
    id: Uuid,
    name: String,
    train_type_id: Uuid,
    carriages: i32,
    seats_per_carriage: i32,
}

impl TryFrom<TrainRow> for Train {
    type Error = CatalogError;

    fn try_from(row: TrainRow) -> Result<Self> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            train_type: row.train_type_id.into(),
            carriages: column_u32("carriages", row.carriages).map_err(CatalogError::Storage)?,
            seats_per_carriage: column_u32("seats_per_carriage", row.seats_per_carriage)
                .map_err(CatalogError::Storage)?,
        })
    }
}

#[derive(FromRow)]
struct CrewRow {
    id: Uuid,
    first_name: String,
    last_name: String,
}

impl From<CrewRow> for CrewMember {
    fn from(row: CrewRow) -> Self {
        Self {
            id: row.id.into(),
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

#[derive(FromRow)]
struct JourneyCrewRow {
    journey_id: Uuid,
    #[sqlx(flatten)]
    member: CrewRow,
}

#[derive(FromRow)]
struct JourneyRow {
    id: Uuid,
    route_id: Uuid,
    train_id: Uuid,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
}

#[derive(FromRow)]
struct RouteViewRow {
    route_id: Uuid,
    distance: i32,
    source_id: Uuid,
    source_name: String,
    source_latitude: f64,
    source_longitude: f64,
    destination_id: Uuid,
    destination_name: String,
    destination_latitude: f64,
    destination_longitude: f64,
}

impl TryFrom<RouteViewRow> for RouteView {
    type Error = CatalogError;

    fn try_from(row: RouteViewRow) -> Result<Self> {
        Ok(Self {
            route: Route {
                id: row.route_id.into(),
                source: row.source_id.into(),
                destination: row.destination_id.into(),
                distance: column_u32("distance", row.distance).map_err(CatalogError::Storage)?,
            },
            source: Station {
                id: row.source_id.into(),
                name: row.source_name,
                latitude: row.source_latitude,
                longitude: row.source_longitude,
            },
            destination: Station {
                id: row.destination_id.into(),
                name: row.destination_name,
                latitude: row.destination_latitude,
                longitude: row.destination_longitude,
            },
        })
    }
}

#[derive(FromRow)]
struct TrainViewRow {
    train_id: Uuid,
    train_name: String,
    train_type_id: Uuid,
    train_type_name: String,
    carriages: i32,
    seats_per_carriage: i32,
}

impl TryFrom<TrainViewRow> for TrainView {
    type Error = CatalogError;

    fn try_from(row: TrainViewRow) -> Result<Self> {
        Ok(Self {
            train: Train::try_from(TrainRow {
                id: row.train_id,
                name: row.train_name,
                train_type_id: row.train_type_id,
                carriages: row.carriages,
                seats_per_carriage: row.seats_per_carriage,
            })?,
            train_type: TrainType {
                id: row.train_type_id.into(),
                name: row.train_type_name,
            },
        })
    }
}

#[derive(FromRow)]
struct JourneyViewRow {
    journey_id: Uuid,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    #[sqlx(flatten)]
    route: RouteViewRow,
    #[sqlx(flatten)]
    train: TrainViewRow,
}

impl JourneyViewRow {
    fn into_view(self, crew: Vec<CrewMember>) -> Result<JourneyView> {
        let route = RouteView::try_from(self.route)?;
        let train = TrainView::try_from(self.train)?;
        Ok(JourneyView {
            journey: Journey {
                id: self.journey_id.into(),
                route: route.route.id,
                train: train.train.id,
                departure_time: self.departure_time,
                arrival_time: self.arrival_time,
                crew: crew.iter().map(|member| member.id).collect(),
            },
            route,
            train,
            crew,
        })
    }
}

/// `ILIKE` pattern matching `needle` anywhere, with wildcards escaped.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn uuids<T: Copy + Into<Uuid>>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

// ============================================================================
// Queries
// ============================================================================

impl PostgresStore {
    async fn ensure_exists(&self, table: &'static str, entity: &'static str, id: Uuid) -> Result<()> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)");
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(|e| catalog_error("Failed to look up reference", e))?;
        if exists {
            Ok(())
        } else {
            Err(CatalogError::NotFound { entity, id })
        }
    }

    async fn load_station(&self, id: StationId) -> Result<Station> {
        sqlx::query_as::<_, StationRow>(
            "SELECT id, name, latitude, longitude FROM stations WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| catalog_error("Failed to get station", e))?
        .map(Station::from)
        .ok_or_else(|| CatalogError::not_found("station", id))
    }

    async fn load_route(&self, id: RouteId) -> Result<Route> {
        sqlx::query_as::<_, RouteRow>(
            "SELECT id, source_id, destination_id, distance FROM routes WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| catalog_error("Failed to get route", e))?
        .ok_or_else(|| CatalogError::not_found("route", id))?
        .try_into()
    }

    async fn load_train_type(&self, id: TrainTypeId) -> Result<TrainType> {
        sqlx::query_as::<_, TrainTypeRow>("SELECT id, name FROM train_types WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| catalog_error("Failed to get train type", e))?
            .map(TrainType::from)
            .ok_or_else(|| CatalogError::not_found("train type", id))
    }

    async fn load_train(&self, id: TrainId) -> Result<Train> {
        sqlx::query_as::<_, TrainRow>(
            "SELECT id, name, train_type_id, carriages, seats_per_carriage FROM trains WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| catalog_error("Failed to get train", e))?
        .ok_or_else(|| CatalogError::not_found("train", id))?
        .try_into()
    }

    async fn load_crew_member(&self, id: CrewId) -> Result<CrewMember> {
        sqlx::query_as::<_, CrewRow>(
            "SELECT id, first_name, last_name FROM crew_members WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| catalog_error("Failed to get crew member", e))?
        .map(CrewMember::from)
        .ok_or_else(|| CatalogError::not_found("crew member", id))
    }

    async fn load_journey(&self, id: JourneyId) -> Result<Journey> {
        let row = sqlx::query_as::<_, JourneyRow>(
            "SELECT id, route_id, train_id, departure_time, arrival_time FROM journeys WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| catalog_error("Failed to get journey", e))?
        .ok_or_else(|| CatalogError::not_found("journey", id))?;

        let crew: Vec<Uuid> = sqlx::query_scalar(
            "SELECT crew_id FROM journey_crew WHERE journey_id = $1 ORDER BY position",
        )
        .bind(row.id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| catalog_error("Failed to get journey crew", e))?;

        Ok(Journey {
            id: row.id.into(),
            route: row.route_id.into(),
            train: row.train_id.into(),
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            crew: crew.into_iter().map(CrewId::from).collect(),
        })
    }

    async fn load_crews(&self, journeys: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<CrewMember>>> {
        let rows = sqlx::query_as::<_, JourneyCrewRow>(
            "SELECT jc.journey_id, c.id, c.first_name, c.last_name
             FROM journey_crew jc
             JOIN crew_members c ON c.id = jc.crew_id
             WHERE jc.journey_id = ANY($1)
             ORDER BY jc.journey_id, jc.position",
        )
        .bind(journeys)
        .fetch_all(self.pool())
        .await
        .map_err(|e| catalog_error("Failed to get journey crews", e))?;

        let mut crews: HashMap<Uuid, Vec<CrewMember>> = HashMap::new();
        for row in rows {
            crews
                .entry(row.journey_id)
                .or_default()
                .push(row.member.into());
        }
        Ok(crews)
    }

    async fn views(&self, rows: Vec<JourneyViewRow>) -> Result<Vec<JourneyView>> {
        let ids = rows.iter().map(|row| row.journey_id).collect();
        let mut crews = self.load_crews(ids).await?;
        rows.into_iter()
            .map(|row| {
                let crew = crews.remove(&row.journey_id).unwrap_or_default();
                row.into_view(crew)
            })
            .collect()
    }

    async fn load_journey_view(&self, id: JourneyId) -> Result<JourneyView> {
        let mut query = QueryBuilder::<Postgres>::new(JOURNEY_VIEW_SQL);
        query.push(" WHERE j.id = ").push_bind(*id.as_uuid());
        let row: JourneyViewRow = query
            .build_query_as()
            .fetch_optional(self.pool())
            .await
            .map_err(|e| catalog_error("Failed to get journey", e))?
            .ok_or_else(|| CatalogError::not_found("journey", id))?;
        self.views(vec![row])
            .await?
            .pop()
            .ok_or_else(|| CatalogError::not_found("journey", id))
    }

    async fn insert_station(&self, station: NewStation) -> Result<Station> {
        station.validate()?;
        let created = Station {
            id: StationId::new(),
            name: station.name,
            latitude: station.latitude,
            longitude: station.longitude,
        };
        sqlx::query("INSERT INTO stations (id, name, latitude, longitude) VALUES ($1, $2, $3, $4)")
            .bind(created.id.as_uuid())
            .bind(&created.name)
            .bind(created.latitude)
            .bind(created.longitude)
            .execute(self.pool())
            .await
            .map_err(|e| catalog_error(&format!("Station {}", created.name), e))?;
        Ok(created)
    }

    async fn insert_route(&self, route: NewRoute) -> Result<Route> {
        route.validate()?;
        self.ensure_exists("stations", "station", route.source.into())
            .await?;
        self.ensure_exists("stations", "station", route.destination.into())
            .await?;
        let distance = to_column("distance", route.distance).map_err(CatalogError::Validation)?;
        let created = Route {
            id: RouteId::new(),
            source: route.source,
            destination: route.destination,
            distance: route.distance,
        };
        sqlx::query(
            "INSERT INTO routes (id, source_id, destination_id, distance) VALUES ($1, $2, $3, $4)",
        )
        .bind(created.id.as_uuid())
        .bind(created.source.as_uuid())
        .bind(created.destination.as_uuid())
        .bind(distance)
        .execute(self.pool())
        .await
        .map_err(|e| catalog_error("Failed to create route", e))?;
        Ok(created)
    }

    async fn insert_train_type(&self, train_type: NewTrainType) -> Result<TrainType> {
        train_type.validate()?;
        let created = TrainType {
            id: TrainTypeId::new(),
            name: train_type.name,
        };
        sqlx::query("INSERT INTO train_types (id, name) VALUES ($1, $2)")
            .bind(created.id.as_uuid())
            .bind(&created.name)
            .execute(self.pool())
            .await
            .map_err(|e| catalog_error(&format!("Train type {}", created.name), e))?;
        Ok(created)
    }

    async fn insert_train(&self, train: NewTrain) -> Result<Train> {
        train.validate()?;
        self.ensure_exists("train_types", "train type", train.train_type.into())
            .await?;
        let carriages = to_column("carriages", train.carriages).map_err(CatalogError::Validation)?;
        let seats = to_column("seats_per_carriage", train.seats_per_carriage)
            .map_err(CatalogError::Validation)?;
        let created = Train {
            id: TrainId::new(),
            name: train.name,
            train_type: train.train_type,
            carriages: train.carriages,
            seats_per_carriage: train.seats_per_carriage,
        };
        sqlx::query(
            "INSERT INTO trains (id, name, train_type_id, carriages, seats_per_carriage)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(created.id.as_uuid())
        .bind(&created.name)
        .bind(created.train_type.as_uuid())
        .bind(carriages)
        .bind(seats)
        .execute(self.pool())
        .await
        .map_err(|e| catalog_error(&format!("Train {}", created.name), e))?;
        Ok(created)
    }

    async fn insert_crew_member(&self, member: NewCrewMember) -> Result<CrewMember> {
        member.validate()?;
        let created = CrewMember {
            id: CrewId::new(),
            first_name: member.first_name,
            last_name: member.last_name,
        };
        sqlx::query("INSERT INTO crew_members (id, first_name, last_name) VALUES ($1, $2, $3)")
            .bind(created.id.as_uuid())
            .bind(&created.first_name)
            .bind(&created.last_name)
            .execute(self.pool())
            .await
            .map_err(|e| catalog_error("Failed to create crew member", e))?;
        Ok(created)
    }

    async fn insert_journey(&self, journey: NewJourney) -> Result<Journey> {
        journey.validate()?;
        self.ensure_exists("routes", "route", journey.route.into())
            .await?;
        self.ensure_exists("trains", "train", journey.train.into())
            .await?;
        for member in &journey.crew {
            self.ensure_exists("crew_members", "crew member", (*member).into())
                .await?;
        }

        let created = Journey {
            id: JourneyId::new(),
            route: journey.route,
            train: journey.train,
            departure_time: journey.departure_time,
            arrival_time: journey.arrival_time,
            crew: journey.crew,
        };
        let positions = (0..created.crew.len())
            .map(|position| i32::try_from(position).map_err(|e| e.to_string()))
            .collect::<std::result::Result<Vec<i32>, _>>()
            .map_err(CatalogError::Validation)?;

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| catalog_error("Failed to start transaction", e))?;
        sqlx::query(
            "INSERT INTO journeys (id, route_id, train_id, departure_time, arrival_time)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(created.id.as_uuid())
        .bind(created.route.as_uuid())
        .bind(created.train.as_uuid())
        .bind(created.departure_time)
        .bind(created.arrival_time)
        .execute(&mut *tx)
        .await
        .map_err(|e| catalog_error("Failed to create journey", e))?;
        sqlx::query(
            "INSERT INTO journey_crew (journey_id, crew_id, position)
             SELECT $1, crew_id, position FROM UNNEST($2::uuid[], $3::int4[]) AS c(crew_id, position)",
        )
        .bind(created.id.as_uuid())
        .bind(uuids(&created.crew))
        .bind(positions)
        .execute(&mut *tx)
        .await
        .map_err(|e| catalog_error("Failed to assign journey crew", e))?;
        tx.commit()
            .await
            .map_err(|e| catalog_error("Failed to commit journey", e))?;

        tracing::info!(journey_id = %created.id, train_id = %created.train, "Journey scheduled");
        Ok(created)
    }

    async fn update_journey_train(&self, journey: JourneyId, train: TrainId) -> Result<Journey> {
        self.ensure_exists("trains", "train", train.into()).await?;

        let mut tx = self
            .begin()
            .await
            .map_err(|e| catalog_error("Failed to start transaction", e))?;
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM journeys WHERE id = $1 FOR UPDATE")
                .bind(journey.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| catalog_error("Failed to lock journey", e))?;
        if locked.is_none() {
            return Err(CatalogError::not_found("journey", journey));
        }

        let has_tickets: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tickets WHERE journey_id = $1 AND cancelled_at IS NULL)",
        )
        .bind(journey.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| catalog_error("Failed to check journey tickets", e))?;
        if has_tickets {
            return Err(CatalogError::JourneyHasTickets(journey));
        }

        sqlx::query("UPDATE journeys SET train_id = $2 WHERE id = $1")
            .bind(journey.as_uuid())
            .bind(train.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| catalog_error("Failed to reassign train", e))?;
        tx.commit()
            .await
            .map_err(|e| catalog_error("Failed to commit reassignment", e))?;

        tracing::info!(journey_id = %journey, train_id = %train, "Journey reassigned");
        self.load_journey(journey).await
    }

    async fn remove_journey(&self, journey: JourneyId) -> Result<()> {
        let mut tx = self
            .begin()
            .await
            .map_err(|e| catalog_error("Failed to start transaction", e))?;
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM journeys WHERE id = $1 FOR UPDATE")
                .bind(journey.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| catalog_error("Failed to lock journey", e))?;
        if locked.is_none() {
            return Err(CatalogError::not_found("journey", journey));
        }

        let has_tickets: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tickets WHERE journey_id = $1)")
                .bind(journey.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| catalog_error("Failed to check journey tickets", e))?;
        if has_tickets {
            return Err(CatalogError::JourneyHasTickets(journey));
        }

        sqlx::query("DELETE FROM journeys WHERE id = $1")
            .bind(journey.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    CatalogError::JourneyHasTickets(journey)
                } else {
                    catalog_error("Failed to delete journey", e)
                }
            })?;
        tx.commit()
            .await
            .map_err(|e| catalog_error("Failed to commit deletion", e))?;

        tracing::info!(journey_id = %journey, "Journey deleted");
        Ok(())
    }

    async fn select_stations(&self) -> Result<Vec<Station>> {
        let rows = sqlx::query_as::<_, StationRow>(
            "SELECT id, name, latitude, longitude FROM stations ORDER BY name, id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| catalog_error("Failed to list stations", e))?;
        Ok(rows.into_iter().map(Station::from).collect())
    }

    async fn select_train_types(&self) -> Result<Vec<TrainType>> {
        let rows = sqlx::query_as::<_, TrainTypeRow>("SELECT id, name FROM train_types ORDER BY name")
            .fetch_all(self.pool())
            .await
            .map_err(|e| catalog_error("Failed to list train types", e))?;
        Ok(rows.into_iter().map(TrainType::from).collect())
    }

    async fn select_crew(&self) -> Result<Vec<CrewMember>> {
        let rows = sqlx::query_as::<_, CrewRow>(
            "SELECT id, first_name, last_name FROM crew_members ORDER BY last_name, first_name, id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| catalog_error("Failed to list crew", e))?;
        Ok(rows.into_iter().map(CrewMember::from).collect())
    }

    async fn select_routes(&self, filter: RouteFilter) -> Result<Vec<RouteView>> {
        let mut query = QueryBuilder::<Postgres>::new(ROUTE_VIEW_SQL);
        query.push(" WHERE TRUE");
        if !filter.sources.is_empty() {
            query
                .push(" AND r.source_id = ANY(")
                .push_bind(uuids(&filter.sources))
                .push(")");
        }
        if !filter.destinations.is_empty() {
            query
                .push(" AND r.destination_id = ANY(")
                .push_bind(uuids(&filter.destinations))
                .push(")");
        }
        query.push(" ORDER BY s.name, d.name, r.id");

        let rows: Vec<RouteViewRow> = query
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(|e| catalog_error("Failed to list routes", e))?;
        rows.into_iter().map(RouteView::try_from).collect()
    }

    async fn select_trains(&self, filter: TrainFilter) -> Result<Vec<TrainView>> {
        let mut query = QueryBuilder::<Postgres>::new(TRAIN_VIEW_SQL);
        query.push(" WHERE TRUE");
        if let Some(name) = &filter.name {
            query.push(" AND t.name ILIKE ").push_bind(contains_pattern(name));
        }
        if !filter.train_types.is_empty() {
            query
                .push(" AND t.train_type_id = ANY(")
                .push_bind(uuids(&filter.train_types))
                .push(")");
        }
        query.push(" ORDER BY t.name");

        let rows: Vec<TrainViewRow> = query
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(|e| catalog_error("Failed to list trains", e))?;
        rows.into_iter().map(TrainView::try_from).collect()
    }

    async fn select_journeys(
        &self,
        filter: JourneyFilter,
        page: PageRequest,
    ) -> Result<Page<JourneyView>> {
        let mut count = QueryBuilder::<Postgres>::new(JOURNEY_COUNT_SQL);
        push_journey_filter(&mut count, &filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(|e| catalog_error("Failed to count journeys", e))?;

        let mut query = QueryBuilder::<Postgres>::new(JOURNEY_VIEW_SQL);
        push_journey_filter(&mut query, &filter);
        query
            .push(" ORDER BY j.departure_time DESC, j.id LIMIT ")
            .push_bind(i64::from(page.page_size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows: Vec<JourneyViewRow> = query
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(|e| catalog_error("Failed to list journeys", e))?;

        Ok(Page {
            items: self.views(rows).await?,
            page: page.page,
            page_size: page.page_size,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }
}

/// Append the `WHERE` clause shared by the journey count and page queries.
fn push_journey_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &JourneyFilter) {
    query.push(" WHERE TRUE");
    if let Some(from) = filter.departure_from {
        query.push(" AND j.departure_time >= ").push_bind(from);
    }
    if let Some(until) = filter.departure_until {
        query.push(" AND j.departure_time <= ").push_bind(until);
    }
    if let Some(date) = filter.departure_date {
        query
            .push(" AND (j.departure_time AT TIME ZONE 'UTC')::date = ")
            .push_bind(date);
    }
    if let Some(route) = filter.route {
        query.push(" AND j.route_id = ").push_bind(*route.as_uuid());
    }
    if !filter.sources.is_empty() {
        query
            .push(" AND r.source_id = ANY(")
            .push_bind(uuids(&filter.sources))
            .push(")");
    }
    if !filter.destinations.is_empty() {
        query
            .push(" AND r.destination_id = ANY(")
            .push_bind(uuids(&filter.destinations))
            .push(")");
    }
    if let Some(name) = &filter.train_name {
        query.push(" AND t.name ILIKE ").push_bind(contains_pattern(name));
    }
    if !filter.train_types.is_empty() {
        query
            .push(" AND t.train_type_id = ANY(")
            .push_bind(uuids(&filter.train_types))
            .push(")");
    }
}

impl Catalog for PostgresStore {
    fn get_station(&self, id: StationId) -> BoxFuture<'_, Result<Station>> {
        self.load_station(id).boxed()
    }

    fn get_route(&self, id: RouteId) -> BoxFuture<'_, Result<Route>> {
        self.load_route(id).boxed()
    }

    fn get_train_type(&self, id: TrainTypeId) -> BoxFuture<'_, Result<TrainType>> {
        self.load_train_type(id).boxed()
    }

    fn get_train(&self, id: TrainId) -> BoxFuture<'_, Result<Train>> {
        self.load_train(id).boxed()
    }

    fn get_crew_member(&self, id: CrewId) -> BoxFuture<'_, Result<CrewMember>> {
        self.load_crew_member(id).boxed()
    }

    fn get_journey(&self, id: JourneyId) -> BoxFuture<'_, Result<Journey>> {
        self.load_journey(id).boxed()
    }

    fn journey_view(&self, id: JourneyId) -> BoxFuture<'_, Result<JourneyView>> {
        self.load_journey_view(id).boxed()
    }

    fn create_station(&self, station: NewStation) -> BoxFuture<'_, Result<Station>> {
        self.insert_station(station).boxed()
    }

    fn create_route(&self, route: NewRoute) -> BoxFuture<'_, Result<Route>> {
        self.insert_route(route).boxed()
    }

    fn create_train_type(&self, train_type: NewTrainType) -> BoxFuture<'_, Result<TrainType>> {
        self.insert_train_type(train_type).boxed()
    }

    fn create_train(&self, train: NewTrain) -> BoxFuture<'_, Result<Train>> {
        self.insert_train(train).boxed()
    }

    fn create_crew_member(&self, member: NewCrewMember) -> BoxFuture<'_, Result<CrewMember>> {
        self.insert_crew_member(member).boxed()
    }

    fn create_journey(&self, journey: NewJourney) -> BoxFuture<'_, Result<Journey>> {
        self.insert_journey(journey).boxed()
    }

    fn reassign_train(
        &self,
        journey: JourneyId,
        train: TrainId,
    ) -> BoxFuture<'_, Result<Journey>> {
        self.update_journey_train(journey, train).boxed()
    }

    fn delete_journey(&self, journey: JourneyId) -> BoxFuture<'_, Result<()>> {
        self.remove_journey(journey).boxed()
    }

    fn list_stations(&self) -> BoxFuture<'_, Result<Vec<Station>>> {
        self.select_stations().boxed()
    }

    fn list_train_types(&self) -> BoxFuture<'_, Result<Vec<TrainType>>> {
        self.select_train_types().boxed()
    }

    fn list_crew(&self) -> BoxFuture<'_, Result<Vec<CrewMember>>> {
        self.select_crew().boxed()
    }

    fn list_routes(&self, filter: RouteFilter) -> BoxFuture<'_, Result<Vec<RouteView>>> {
        self.select_routes(filter).boxed()
    }

    fn list_trains(&self, filter: TrainFilter) -> BoxFuture<'_, Result<Vec<TrainView>>> {
        self.select_trains(filter).boxed()
    }

    fn list_journeys(
        &self,
        filter: JourneyFilter,
        page: PageRequest,
    ) -> BoxFuture<'_, Result<Page<JourneyView>>> {
        self.select_journeys(filter, page).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::contains_pattern;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(contains_pattern("Inter"), "%Inter%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }
}
