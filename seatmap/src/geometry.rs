//! Seat geometry supplied by the host rendering layer.

use crate::types::{Point, Rect, SeatId};
use std::sync::Arc;

/// Where seats currently are on screen
///
/// Queried synchronously on every drag update and every group recomputation.
/// Implementations must answer from the current layout; the seat map never
/// caches an answer.
pub trait GeometryProvider: Send + Sync {
    /// Every seat laid out by the host
    fn seat_ids(&self) -> Vec<SeatId>;

    /// Seat rectangle in the host frame, `None` while it is not laid out
    fn seat_rect(&self, seat: &SeatId) -> Option<Rect>;

    /// Top-left corner of the selection container in the host frame
    fn container_origin(&self) -> Point;
}

impl<G: GeometryProvider + ?Sized> GeometryProvider for Arc<G> {
    fn seat_ids(&self) -> Vec<SeatId> {
        (**self).seat_ids()
    }

    fn seat_rect(&self, seat: &SeatId) -> Option<Rect> {
        (**self).seat_rect(seat)
    }

    fn container_origin(&self) -> Point {
        (**self).container_origin()
    }
}

/// Seat rectangle in the selection container's frame
pub fn local_rect<G: GeometryProvider + ?Sized>(geometry: &G, seat: &SeatId) -> Option<Rect> {
    let origin = geometry.container_origin();
    geometry
        .seat_rect(seat)
        .map(|rect| rect.translated(-origin.x, -origin.y))
}
