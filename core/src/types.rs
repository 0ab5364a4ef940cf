//! Domain types for the train station inventory.
//!
//! Identifiers, catalog entities (stations, routes, trains, journeys), the seat
//! coordinate value object, and the order/ticket records produced by the
//! reservation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a station
    StationId
);
uuid_id!(
    /// Unique identifier for a route
    RouteId
);
uuid_id!(
    /// Unique identifier for a train type
    TrainTypeId
);
uuid_id!(
    /// Unique identifier for a train
    TrainId
);
uuid_id!(
    /// Unique identifier for a crew member
    CrewId
);
uuid_id!(
    /// Unique identifier for a scheduled journey
    JourneyId
);
uuid_id!(
    /// Unique identifier for an order
    OrderId
);
uuid_id!(
    /// Unique identifier for a ticket
    TicketId
);
uuid_id!(
    /// Reference to a user managed by the external identity provider
    UserId
);

// ============================================================================
// Seat layout
// ============================================================================

/// A physical seat within a train: 1-based carriage and seat numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatCoordinate {
    /// Carriage number, starting at 1
    pub carriage: u32,
    /// Seat number within the carriage, starting at 1
    pub seat: u32,
}

impl SeatCoordinate {
    /// Creates a seat coordinate (not validated against any layout)
    #[must_use]
    pub const fn new(carriage: u32, seat: u32) -> Self {
        Self { carriage, seat }
    }
}

impl fmt::Display for SeatCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "carriage {} seat {}", self.carriage, self.seat)
    }
}

/// Carriage/seat template of a train.
///
/// The seat universe of a journey is `[1, carriages] × [1, seats_per_carriage]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatLayout {
    /// Number of carriages (≥ 1 for catalog-validated trains)
    pub carriages: u32,
    /// Seats in each carriage (≥ 1 for catalog-validated trains)
    pub seats_per_carriage: u32,
}

impl SeatLayout {
    /// Creates a layout
    #[must_use]
    pub const fn new(carriages: u32, seats_per_carriage: u32) -> Self {
        Self {
            carriages,
            seats_per_carriage,
        }
    }

    /// True iff the coordinate lies inside this layout.
    #[must_use]
    pub const fn contains(&self, seat: SeatCoordinate) -> bool {
        seat.carriage >= 1
            && seat.carriage <= self.carriages
            && seat.seat >= 1
            && seat.seat <= self.seats_per_carriage
    }

    /// Size of the seat universe.
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.carriages as u64 * self.seats_per_carriage as u64
    }

    /// Every coordinate of the layout, carriage-major.
    pub fn coordinates(&self) -> impl Iterator<Item = SeatCoordinate> + '_ {
        (1..=self.carriages).flat_map(move |carriage| {
            (1..=self.seats_per_carriage).map(move |seat| SeatCoordinate::new(carriage, seat))
        })
    }
}

impl fmt::Display for SeatLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} carriages x {} seats",
            self.carriages, self.seats_per_carriage
        )
    }
}

// ============================================================================
// Catalog entities
// ============================================================================

/// A railway station.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Station identifier
    pub id: StationId,
    /// Display name
    pub name: String,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

/// A route between two distinct stations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Route identifier
    pub id: RouteId,
    /// Departure station
    pub source: StationId,
    /// Arrival station
    pub destination: StationId,
    /// Distance in kilometres
    pub distance: u32,
}

/// Classification of trains (no behavioural effect on reservations).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainType {
    /// Train type identifier
    pub id: TrainTypeId,
    /// Unique name
    pub name: String,
}

/// A train and its capacity template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Train {
    /// Train identifier
    pub id: TrainId,
    /// Unique name
    pub name: String,
    /// Classification
    pub train_type: TrainTypeId,
    /// Number of carriages
    pub carriages: u32,
    /// Seats in each carriage
    pub seats_per_carriage: u32,
}

impl Train {
    /// The seat layout every journey on this train shares.
    #[must_use]
    pub const fn layout(&self) -> SeatLayout {
        SeatLayout::new(self.carriages, self.seats_per_carriage)
    }
}

/// A crew member assigned to journeys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    /// Crew member identifier
    pub id: CrewId,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
}

impl CrewMember {
    /// `"<first> <last>"`
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One scheduled run of a train along a route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journey {
    /// Journey identifier
    pub id: JourneyId,
    /// Route travelled
    pub route: RouteId,
    /// Train used (fixes the seat universe)
    pub train: TrainId,
    /// Departure time
    pub departure_time: DateTime<Utc>,
    /// Arrival time, strictly after departure
    pub arrival_time: DateTime<Utc>,
    /// Assigned crew, in assignment order
    pub crew: Vec<CrewId>,
}

// ============================================================================
// Orders and tickets
// ============================================================================

/// Lifecycle of a committed ticket.
///
/// `Requested` only exists inside a submission; stores persist `Committed`
/// and `Cancelled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// The seat is held by this ticket
    Committed,
    /// The order was cancelled and the seat released
    Cancelled,
}

/// Reservation of one seat on one journey.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// Journey the seat belongs to
    pub journey: JourneyId,
    /// Reserved seat
    pub seat: SeatCoordinate,
    /// Owning order
    pub order: OrderId,
    /// Current status
    pub status: TicketStatus,
}

/// A purchase transaction grouping one or more tickets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Owning user
    pub user: UserId,
    /// Commit time
    pub created_at: DateTime<Utc>,
    /// Cancellation time, if cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Tickets in request order
    pub tickets: Vec<Ticket>,
}

impl Order {
    /// Whether the order has been cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }

    /// Distinct journeys touched by this order, ascending.
    #[must_use]
    pub fn journeys(&self) -> Vec<JourneyId> {
        let mut journeys: Vec<JourneyId> = self.tickets.iter().map(|t| t.journey).collect();
        journeys.sort_unstable();
        journeys.dedup();
        journeys
    }
}

/// One requested seat in an order submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatRequest {
    /// Journey to reserve on
    pub journey: JourneyId,
    /// Carriage number
    pub carriage: u32,
    /// Seat number
    pub seat: u32,
}

impl SeatRequest {
    /// Creates a seat request
    #[must_use]
    pub const fn new(journey: JourneyId, carriage: u32, seat: u32) -> Self {
        Self {
            journey,
            carriage,
            seat,
        }
    }

    /// The requested coordinate
    #[must_use]
    pub const fn coordinate(&self) -> SeatCoordinate {
        SeatCoordinate::new(self.carriage, self.seat)
    }
}

/// Who is performing an operation.
///
/// Identity is established upstream; the core only distinguishes customers
/// from administrative actors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// Authenticated user
    pub user: UserId,
    /// Whether the user acts with administrative rights
    pub is_admin: bool,
}

impl Requester {
    /// A regular customer
    #[must_use]
    pub const fn customer(user: UserId) -> Self {
        Self {
            user,
            is_admin: false,
        }
    }

    /// An administrative actor
    #[must_use]
    pub const fn admin(user: UserId) -> Self {
        Self {
            user,
            is_admin: true,
        }
    }

    /// Whether this requester may act on an order owned by `owner`.
    #[must_use]
    pub fn may_access(&self, owner: UserId) -> bool {
        self.is_admin || self.user == owner
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// 1-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number, starting at 1
    pub page: u32,
    /// Items per page
    pub page_size: u32,
}

impl PageRequest {
    /// Largest page size any listing accepts.
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Creates a page request, clamping page to ≥ 1 and size to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    /// First page with the given size
    #[must_use]
    pub fn first(page_size: u32) -> Self {
        Self::new(1, page_size)
    }

    /// Number of items skipped before this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.page_size as u64
    }

    /// Slice one page out of a fully materialised, already ordered list.
    #[must_use]
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let skip = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let items = items
            .into_iter()
            .skip(skip)
            .take(self.page_size as usize)
            .collect();
        Page {
            items,
            page: self.page,
            page_size: self.page_size,
            total,
        }
    }
}

/// One page of results plus the total match count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Page number, starting at 1
    pub page: u32,
    /// Requested page size
    pub page_size: u32,
    /// Total number of matching items
    pub total: u64,
}

impl<T> Page<T> {
    /// Whether a later page has items.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        (self.page as u64) * (self.page_size as u64) < self.total
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Transform the items, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
        }
    }
}
