//! Proptest strategies for seat layouts and requests.

use proptest::collection::vec;
use proptest::prelude::*;
use train_station_core::{JourneyId, SeatCoordinate, SeatLayout, SeatRequest};

/// Small layouts, so random requests collide often.
pub fn small_layout() -> impl Strategy<Value = SeatLayout> {
    (1u32..=4, 1u32..=8).prop_map(|(carriages, seats)| SeatLayout::new(carriages, seats))
}

/// A coordinate inside `layout`.
pub fn seat_in(layout: SeatLayout) -> impl Strategy<Value = SeatCoordinate> {
    (1..=layout.carriages, 1..=layout.seats_per_carriage)
        .prop_map(|(carriage, seat)| SeatCoordinate::new(carriage, seat))
}

/// A coordinate that may fall up to two past either bound of `layout`, or be zero.
pub fn seat_near(layout: SeatLayout) -> impl Strategy<Value = SeatCoordinate> {
    (0..=layout.carriages + 2, 0..=layout.seats_per_carriage + 2)
        .prop_map(|(carriage, seat)| SeatCoordinate::new(carriage, seat))
}

/// Between one and `max` in-layout requests on `journey`, possibly repeating.
pub fn requests_in(
    journey: JourneyId,
    layout: SeatLayout,
    max: usize,
) -> impl Strategy<Value = Vec<SeatRequest>> {
    vec(seat_in(layout), 1..=max.max(1)).prop_map(move |coordinates| {
        coordinates
            .into_iter()
            .map(|seat| SeatRequest::new(journey, seat.carriage, seat.seat))
            .collect()
    })
}
