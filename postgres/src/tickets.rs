//! [`TicketStore`] over `PostgreSQL`.
//!
//! Commit runs in one transaction: the order's journeys are share-locked in
//! ascending id order, then every ticket is inserted with
//! `ON CONFLICT DO NOTHING` against the committed-seat index. A ticket that
//! did not land means its seat was already held; the transaction is rolled
//! back and the first such ticket in request order is reported.

use crate::PostgresStore;
use crate::error::{column_u32, reservation_error, to_column};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use sqlx::FromRow;
use std::collections::{HashMap, HashSet};
use train_station_core::reservation::already_cancelled;
use train_station_core::{
    JourneyId, Order, OrderId, Page, PageRequest, PendingOrder, ReservationError, SeatCoordinate,
    Ticket, TicketStatus, TicketStore, UserId,
};
use uuid::Uuid;

type Result<T> = std::result::Result<T, ReservationError>;

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    order_id: Uuid,
    journey_id: Uuid,
    carriage: i32,
    seat: i32,
    cancelled_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct SeatRow {
    carriage: i32,
    seat: i32,
}

impl TryFrom<SeatRow> for SeatCoordinate {
    type Error = ReservationError;

    fn try_from(row: SeatRow) -> Result<Self> {
        Ok(Self::new(
            column_u32("carriage", row.carriage).map_err(ReservationError::Storage)?,
            column_u32("seat", row.seat).map_err(ReservationError::Storage)?,
        ))
    }
}

impl TryFrom<TicketRow> for Ticket {
    type Error = ReservationError;

    fn try_from(row: TicketRow) -> Result<Self> {
        Ok(Self {
            id: row.id.into(),
            journey: row.journey_id.into(),
            seat: SeatRow {
                carriage: row.carriage,
                seat: row.seat,
            }
            .try_into()?,
            order: row.order_id.into(),
            status: if row.cancelled_at.is_some() {
                TicketStatus::Cancelled
            } else {
                TicketStatus::Committed
            },
        })
    }
}

fn assemble(row: OrderRow, tickets: Vec<Ticket>) -> Order {
    Order {
        id: row.id.into(),
        user: row.user_id.into(),
        created_at: row.created_at,
        cancelled_at: row.cancelled_at,
        tickets,
    }
}

/// Column arrays for one `UNNEST` insert of an order's tickets.
#[derive(Default)]
struct TicketColumns {
    ids: Vec<Uuid>,
    journeys: Vec<Uuid>,
    carriages: Vec<i32>,
    seats: Vec<i32>,
    positions: Vec<i32>,
}

impl TicketColumns {
    fn from_pending(pending: &PendingOrder) -> Result<Self> {
        let mut columns = Self::default();
        for (position, ticket) in pending.tickets.iter().enumerate() {
            columns.ids.push(*ticket.id.as_uuid());
            columns.journeys.push(*ticket.journey.as_uuid());
            columns.carriages.push(
                to_column("carriage", ticket.seat.carriage).map_err(ReservationError::Validation)?,
            );
            columns
                .seats
                .push(to_column("seat", ticket.seat.seat).map_err(ReservationError::Validation)?);
            columns.positions.push(
                i32::try_from(position).map_err(|e| ReservationError::Validation(e.to_string()))?,
            );
        }
        Ok(columns)
    }
}

impl PostgresStore {
    #[tracing::instrument(skip(self, pending), fields(order_id = %pending.id, tickets = pending.tickets.len()))]
    async fn insert_order(&self, pending: PendingOrder) -> Result<Order> {
        let journeys = pending.lock_order();
        let columns = TicketColumns::from_pending(&pending)?;

        let mut tx = self
            .begin()
            .await
            .map_err(|e| reservation_error("Failed to start transaction", e))?;

        let locked: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT id, train_id FROM journeys WHERE id = ANY($1) ORDER BY id FOR SHARE",
        )
        .bind(journeys.iter().map(|id| *id.as_uuid()).collect::<Vec<_>>())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| reservation_error("Failed to lock journeys", e))?;

        let trains: HashMap<Uuid, Uuid> = locked.into_iter().collect();
        for (journey, train) in &pending.journey_trains {
            match trains.get(journey.as_uuid()) {
                None => return Err(ReservationError::not_found("journey", *journey)),
                Some(current) if current != train.as_uuid() => {
                    return Err(ReservationError::Busy(format!(
                        "journey {journey} changed train during commit"
                    )));
                }
                Some(_) => {}
            }
        }

        sqlx::query("INSERT INTO orders (id, user_id, created_at) VALUES ($1, $2, $3)")
            .bind(pending.id.as_uuid())
            .bind(pending.user.as_uuid())
            .bind(pending.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| reservation_error("Failed to insert order", e))?;

        let inserted: Vec<Uuid> = sqlx::query_scalar(
            "INSERT INTO tickets (id, order_id, journey_id, carriage, seat, position)
             SELECT t.id, $1::uuid, t.journey_id, t.carriage, t.seat, t.position
             FROM UNNEST($2::uuid[], $3::uuid[], $4::int4[], $5::int4[], $6::int4[])
                  AS t(id, journey_id, carriage, seat, position)
             ORDER BY t.journey_id, t.carriage, t.seat
             ON CONFLICT (journey_id, carriage, seat) WHERE cancelled_at IS NULL DO NOTHING
             RETURNING id",
        )
        .bind(pending.id.as_uuid())
        .bind(&columns.ids)
        .bind(&columns.journeys)
        .bind(&columns.carriages)
        .bind(&columns.seats)
        .bind(&columns.positions)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| reservation_error("Failed to insert tickets", e))?;

        if inserted.len() != pending.tickets.len() {
            let landed: HashSet<Uuid> = inserted.into_iter().collect();
            let taken = pending
                .tickets
                .iter()
                .find(|ticket| !landed.contains(ticket.id.as_uuid()))
                .ok_or_else(|| {
                    ReservationError::Storage("ticket count mismatch after insert".to_string())
                })?;
            tx.rollback()
                .await
                .map_err(|e| reservation_error("Failed to roll back order", e))?;
            return Err(ReservationError::SeatTaken {
                journey: taken.journey,
                seat: taken.seat,
            });
        }

        tx.commit()
            .await
            .map_err(|e| reservation_error("Failed to commit order", e))?;

        Ok(Order {
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
        })
    }

    async fn cancel(&self, order: OrderId, at: DateTime<Utc>) -> Result<Order> {
        let mut tx = self
            .begin()
            .await
            .map_err(|e| reservation_error("Failed to start transaction", e))?;

        let cancelled_at: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT cancelled_at FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| reservation_error("Failed to lock order", e))?;
        match cancelled_at {
            None => return Err(ReservationError::not_found("order", order)),
            Some(Some(_)) => return Err(already_cancelled()),
            Some(None) => {}
        }

        sqlx::query("UPDATE tickets SET cancelled_at = $2 WHERE order_id = $1 AND cancelled_at IS NULL")
            .bind(order.as_uuid())
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(|e| reservation_error("Failed to release seats", e))?;
        sqlx::query("UPDATE orders SET cancelled_at = $2 WHERE id = $1")
            .bind(order.as_uuid())
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(|e| reservation_error("Failed to cancel order", e))?;
        tx.commit()
            .await
            .map_err(|e| reservation_error("Failed to commit cancellation", e))?;

        self.load_order(order).await
    }

    async fn load_order(&self, order: OrderId) -> Result<Order> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, created_at, cancelled_at FROM orders WHERE id = $1",
        )
        .bind(order.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| reservation_error("Failed to get order", e))?
        .ok_or_else(|| ReservationError::not_found("order", order))?;

        let mut tickets = self.load_tickets(vec![row.id]).await?;
        let tickets = tickets.remove(&row.id).unwrap_or_default();
        Ok(assemble(row, tickets))
    }

    async fn load_tickets(&self, orders: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<Ticket>>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            "SELECT id, order_id, journey_id, carriage, seat, cancelled_at
             FROM tickets
             WHERE order_id = ANY($1)
             ORDER BY order_id, position",
        )
        .bind(orders)
        .fetch_all(self.pool())
        .await
        .map_err(|e| reservation_error("Failed to get tickets", e))?;

        let mut tickets: HashMap<Uuid, Vec<Ticket>> = HashMap::new();
        for row in rows {
            tickets.entry(row.order_id).or_default().push(row.try_into()?);
        }
        Ok(tickets)
    }

    async fn orders_of(&self, user: UserId, page: PageRequest) -> Result<Page<Order>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user.as_uuid())
            .fetch_one(self.pool())
            .await
            .map_err(|e| reservation_error("Failed to count orders", e))?;

        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, created_at, cancelled_at
             FROM orders
             WHERE user_id = $1
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3",
        )
        .bind(user.as_uuid())
        .bind(i64::from(page.page_size))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(|e| reservation_error("Failed to list orders", e))?;

        let mut tickets = self
            .load_tickets(rows.iter().map(|row| row.id).collect())
            .await?;
        let items = rows
            .into_iter()
            .map(|row| {
                let owned = tickets.remove(&row.id).unwrap_or_default();
                assemble(row, owned)
            })
            .collect();

        Ok(Page {
            items,
            page: page.page,
            page_size: page.page_size,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn seat_taken(&self, journey: JourneyId, seat: SeatCoordinate) -> Result<bool> {
        let carriage = to_column("carriage", seat.carriage).map_err(ReservationError::Validation)?;
        let number = to_column("seat", seat.seat).map_err(ReservationError::Validation)?;
        sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM tickets
                 WHERE journey_id = $1 AND carriage = $2 AND seat = $3 AND cancelled_at IS NULL
             )",
        )
        .bind(journey.as_uuid())
        .bind(carriage)
        .bind(number)
        .fetch_one(self.pool())
        .await
        .map_err(|e| reservation_error("Failed to check seat", e))
    }

    async fn seats_taken(&self, journey: JourneyId) -> Result<Vec<SeatCoordinate>> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT carriage, seat FROM tickets
             WHERE journey_id = $1 AND cancelled_at IS NULL
             ORDER BY carriage, seat",
        )
        .bind(journey.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| reservation_error("Failed to list taken seats", e))?;
        rows.into_iter().map(SeatCoordinate::try_from).collect()
    }

    async fn counts(&self, journeys: Vec<JourneyId>) -> Result<HashMap<JourneyId, u64>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT journey_id, COUNT(*) FROM tickets
             WHERE journey_id = ANY($1) AND cancelled_at IS NULL
             GROUP BY journey_id",
        )
        .bind(journeys.iter().map(|id| *id.as_uuid()).collect::<Vec<_>>())
        .fetch_all(self.pool())
        .await
        .map_err(|e| reservation_error("Failed to count tickets", e))?;

        let mut counts: HashMap<JourneyId, u64> =
            journeys.into_iter().map(|journey| (journey, 0)).collect();
        for (journey, count) in rows {
            counts.insert(journey.into(), u64::try_from(count).unwrap_or_default());
        }
        Ok(counts)
    }
}

impl TicketStore for PostgresStore {
    fn commit_order(&self, order: PendingOrder) -> BoxFuture<'_, Result<Order>> {
        self.insert_order(order).boxed()
    }

    fn cancel_order(&self, order: OrderId, at: DateTime<Utc>) -> BoxFuture<'_, Result<Order>> {
        self.cancel(order, at).boxed()
    }

    fn get_order(&self, order: OrderId) -> BoxFuture<'_, Result<Order>> {
        self.load_order(order).boxed()
    }

    fn list_orders(&self, user: UserId, page: PageRequest) -> BoxFuture<'_, Result<Page<Order>>> {
        self.orders_of(user, page).boxed()
    }

    fn is_taken(&self, journey: JourneyId, seat: SeatCoordinate) -> BoxFuture<'_, Result<bool>> {
        self.seat_taken(journey, seat).boxed()
    }

    fn taken_seats(&self, journey: JourneyId) -> BoxFuture<'_, Result<Vec<SeatCoordinate>>> {
        self.seats_taken(journey).boxed()
    }

    fn committed_counts(
        &self,
        journeys: Vec<JourneyId>,
    ) -> BoxFuture<'_, Result<HashMap<JourneyId, u64>>> {
        self.counts(journeys).boxed()
    }
}
