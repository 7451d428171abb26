//! In-memory stand-ins for the host, the live channel and the reservation store.
//!
//! Used by the tests and by the `seatblock` binary's offline layout.

use crate::api::{CreatedReservation, ReservationApi, ReservationRequest};
use crate::channel::{ChannelEvent, LiveChannel};
use crate::error::SubmitFailure;
use crate::geometry::GeometryProvider;
use crate::types::{Point, Rect, ReservationId, SeatId};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

// ============================================================================
// Geometry
// ============================================================================

/// Host layout held in memory
///
/// Seats can be moved while the seat map runs, which is what a window resize
/// looks like from the seat map's side.
#[derive(Debug, Default)]
pub struct StaticGeometry {
    seats: RwLock<BTreeMap<SeatId, Rect>>,
    origin: RwLock<Point>,
}

impl StaticGeometry {
    /// Empty layout with the container at `origin`
    #[must_use]
    pub fn new(origin: Point) -> Self {
        Self {
            seats: RwLock::new(BTreeMap::new()),
            origin: RwLock::new(origin),
        }
    }

    /// Regular grid of `columns` x `rows` square seats in `zone`
    ///
    /// Column and row numbers start at 1; seat `(c, r)` sits at
    /// `((c - 1) * (size + gap), (r - 1) * (size + gap))`. Returns `None` when
    /// `zone` does not form valid identifiers.
    #[must_use]
    pub fn grid(zone: &str, columns: u32, rows: u32, size: f64, gap: f64) -> Option<Self> {
        let geometry = Self::new(Point::default());
        let pitch = size + gap;
        for column in 1..=columns {
            for row in 1..=rows {
                let seat: SeatId = format!("{zone}-{column}-{row}").parse().ok()?;
                geometry.set_seat(
                    seat,
                    Rect::new(
                        f64::from(column - 1) * pitch,
                        f64::from(row - 1) * pitch,
                        size,
                        size,
                    ),
                );
            }
        }
        Some(geometry)
    }

    /// Add a seat while building
    #[must_use]
    pub fn with_seat(self, seat: SeatId, rect: Rect) -> Self {
        self.set_seat(seat, rect);
        self
    }

    /// Place or move a seat
    pub fn set_seat(&self, seat: SeatId, rect: Rect) {
        self.seats
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(seat, rect);
    }

    /// Take a seat out of the layout
    pub fn remove_seat(&self, seat: &SeatId) {
        self.seats
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(seat);
    }

    /// Move the selection container
    pub fn set_origin(&self, origin: Point) {
        *self.origin.write().unwrap_or_else(PoisonError::into_inner) = origin;
    }
}

impl GeometryProvider for StaticGeometry {
    fn seat_ids(&self) -> Vec<SeatId> {
        self.seats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn seat_rect(&self, seat: &SeatId) -> Option<Rect> {
        self.seats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(seat)
            .copied()
    }

    fn container_origin(&self) -> Point {
        *self.origin.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Live channel
// ============================================================================

/// Channel that replays a fixed list of events
#[derive(Clone, Debug, Default)]
pub struct ScriptedChannel {
    events: Vec<ChannelEvent>,
}

impl ScriptedChannel {
    /// Replay `events` in order
    #[must_use]
    pub const fn new(events: Vec<ChannelEvent>) -> Self {
        Self { events }
    }
}

impl LiveChannel for ScriptedChannel {
    fn into_events(self) -> BoxStream<'static, ChannelEvent> {
        stream::iter(self.events).boxed()
    }
}

// ============================================================================
// Reservation store
// ============================================================================

/// Reservation store in memory
///
/// Answers from a queue of scripted outcomes; with the queue empty it accepts
/// the request as-is under a `mock-N` identifier. Every request is recorded.
#[derive(Debug)]
pub struct MockReservationApi {
    outcomes: Mutex<VecDeque<Result<CreatedReservation, SubmitFailure>>>,
    requests: Mutex<Vec<ReservationRequest>>,
    latency: Option<Duration>,
    next_id: AtomicU64,
}

impl MockReservationApi {
    /// Store that accepts everything immediately
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            latency: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn ReservationApi> {
        Arc::new(Self::new())
    }

    /// Hold every answer back for `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer the next unanswered request with `outcome`
    pub fn push_outcome(&self, outcome: Result<CreatedReservation, SubmitFailure>) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Requests received so far, oldest first
    #[must_use]
    pub fn requests(&self) -> Vec<ReservationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests received
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn accept(&self, request: &ReservationRequest) -> CreatedReservation {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        CreatedReservation {
            id: ReservationId::new(format!("mock-{n}")),
            seats: request.seat_identifiers.clone(),
        }
    }
}

impl Default for MockReservationApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationApi for MockReservationApi {
    async fn create_reservation(
        &self,
        request: ReservationRequest,
    ) -> Result<CreatedReservation, SubmitFailure> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        scripted.unwrap_or_else(|| Ok(self.accept(&request)))
    }
}
