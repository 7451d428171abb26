//! Reservation synchronizer.
//!
//! Mirrors the store's reservation records pushed over the live channel. Every
//! `initial_state` or `reservation_update` message is a full snapshot: the
//! group list and the reserved-seat index are rebuilt from it and swapped in
//! within one reduction. A message that fails to parse, or that names a seat
//! that does not parse, leaves the previous snapshot in place.
//!
//! Each group carries a bounding box (container frame) and a banner tilt
//! derived from the geometry provider and the venue's wing partition.

use crate::app::{SeatMapEnvironment, SeatMapState};
use crate::error::ProtocolError;
use crate::geometry::{GeometryProvider, local_rect};
use crate::types::{Color, Rect, ReservationId, SeatId};
use crate::venue::VenueLayout;
use chrono::{DateTime, Utc};
use seatblock_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

// ============================================================================
// Wire Format
// ============================================================================

/// Message pushed by the reservation store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChannelMessage {
    /// Snapshot sent right after connecting
    InitialState(Vec<ServerReservationRecord>),
    /// Snapshot sent after any change
    ReservationUpdate(Vec<ServerReservationRecord>),
    /// Opaque error payload for the operator
    Error(serde_json::Value),
}

/// One reservation as the store reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerReservationRecord {
    /// Reservation identifier
    pub id: ReservationId,
    /// Free-text group label
    pub group_label: String,
    /// Reserved seats
    #[serde(default)]
    pub seats: Vec<SeatEntry>,
}

/// Seat reference inside a record, either `"1F-2-3"` or `{"seat_identifier": "1F-2-3", ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeatEntry {
    /// Bare identifier
    Identifier(String),
    /// Seat object, extra fields ignored
    Detailed {
        /// Seat identifier
        seat_identifier: String,
    },
}

impl SeatEntry {
    /// Raw identifier text
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Identifier(id) | Self::Detailed {
                seat_identifier: id,
            } => id,
        }
    }
}

impl ServerReservationRecord {
    /// Parsed seat set
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidSeat`] on the first identifier that does not parse.
    pub fn seat_ids(&self) -> Result<BTreeSet<SeatId>, ProtocolError> {
        self.seats
            .iter()
            .map(|entry| {
                entry
                    .identifier()
                    .parse()
                    .map_err(|source| ProtocolError::InvalidSeat {
                        record: self.id.to_string(),
                        source,
                    })
            })
            .collect()
    }
}

// ============================================================================
// State
// ============================================================================

/// Live channel lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the channel to open
    #[default]
    Connecting,
    /// Receiving snapshots
    Open,
    /// Closed or failed, no reconnect is attempted
    Closed,
}

/// Server-confirmed cluster of seats sharing a label
#[derive(Clone, Debug, PartialEq)]
pub struct ReservationGroup {
    /// Mirrors the record identifier
    pub id: ReservationId,
    /// Group label
    pub label: String,
    /// Member seats
    pub seats: BTreeSet<SeatId>,
    /// Container-frame bounds of the laid-out members, `None` until one is known
    pub bounding_box: Option<Rect>,
    /// Banner tilt in degrees
    pub orientation_deg: f64,
    /// Display color
    pub color: Color,
}

impl ReservationGroup {
    fn from_record(
        record: ServerReservationRecord,
        seats: BTreeSet<SeatId>,
        venue: &VenueLayout,
    ) -> Self {
        Self {
            color: venue.color_for(&record.id),
            id: record.id,
            label: record.group_label,
            seats,
            bounding_box: None,
            orientation_deg: 0.0,
        }
    }

    /// Recompute bounds and tilt, returning whether anything changed
    fn refresh_geometry(&mut self, geometry: &dyn GeometryProvider, venue: &VenueLayout) -> bool {
        let (bounding_box, orientation_deg) = derive_geometry(&self.seats, geometry, venue);

        #[allow(clippy::float_cmp)] // field-by-field equality is the intent
        let unchanged =
            bounding_box == self.bounding_box && orientation_deg == self.orientation_deg;
        if unchanged {
            return false;
        }

        self.bounding_box = bounding_box;
        self.orientation_deg = orientation_deg;
        true
    }
}

fn derive_geometry(
    seats: &BTreeSet<SeatId>,
    geometry: &dyn GeometryProvider,
    venue: &VenueLayout,
) -> (Option<Rect>, f64) {
    if seats.is_empty() {
        return (None, 0.0);
    }

    let bounds = seats
        .iter()
        .filter_map(|seat| local_rect(geometry, seat))
        .fold(None, |acc: Option<(f64, f64, f64, f64)>, r| {
            Some(match acc {
                None => (r.x, r.y, r.right(), r.bottom()),
                Some((left, top, right, bottom)) => (
                    left.min(r.x),
                    top.min(r.y),
                    right.max(r.right()),
                    bottom.max(r.bottom()),
                ),
            })
        });
    let bounding_box =
        bounds.map(|(left, top, right, bottom)| Rect::new(left, top, right - left, bottom - top));

    (
        bounding_box,
        venue.orientation(seats.iter().map(SeatId::column)),
    )
}

/// Every seat held by any reservation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReservedSeatIndex(HashSet<SeatId>);

impl ReservedSeatIndex {
    /// Whether `seat` is taken
    #[must_use]
    pub fn contains(&self, seat: &SeatId) -> bool {
        self.0.contains(seat)
    }

    /// Number of reserved seats
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no seat is reserved
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reserved seats, unordered
    pub fn iter(&self) -> impl Iterator<Item = &SeatId> {
        self.0.iter()
    }
}

/// Renderable view of a group
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupOverlay {
    /// Group identifier
    pub id: ReservationId,
    /// Group label
    pub label: String,
    /// Banner rectangle, container frame
    pub rect: Rect,
    /// Banner tilt in degrees
    pub rotation_deg: f64,
    /// Banner color
    pub color: Color,
    /// Seats in the group
    pub seat_count: usize,
}

/// Mirror of the store's reservations
#[derive(Clone, Debug, Default)]
pub struct SyncState {
    connection: ConnectionState,
    groups: Vec<ReservationGroup>,
    reserved: ReservedSeatIndex,
    last_error: Option<String>,
    last_snapshot_at: Option<DateTime<Utc>>,
    revision: u64,
}

impl SyncState {
    /// Channel lifecycle state
    #[must_use]
    pub const fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Groups of the latest snapshot, in the order the store sent them
    #[must_use]
    pub fn groups(&self) -> &[ReservationGroup] {
        &self.groups
    }

    /// Group by identifier
    #[must_use]
    pub fn group(&self, id: &ReservationId) -> Option<&ReservationGroup> {
        self.groups.iter().find(|g| &g.id == id)
    }

    /// Seats that cannot be selected
    #[must_use]
    pub const fn reserved(&self) -> &ReservedSeatIndex {
        &self.reserved
    }

    /// Last protocol or transport problem, cleared by the next good snapshot
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// When the latest snapshot was applied
    #[must_use]
    pub const fn last_snapshot_at(&self) -> Option<DateTime<Utc>> {
        self.last_snapshot_at
    }

    /// Bumped whenever anything exposed here changes
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Groups that can be drawn: bounds known and strictly positive in both sides
    #[must_use]
    pub fn overlays(&self) -> Vec<GroupOverlay> {
        self.groups
            .iter()
            .filter_map(|group| {
                let rect = group.bounding_box.filter(Rect::is_renderable)?;
                Some(GroupOverlay {
                    id: group.id.clone(),
                    label: group.label.clone(),
                    rect,
                    rotation_deg: group.orientation_deg,
                    color: group.color,
                    seat_count: group.seats.len(),
                })
            })
            .collect()
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn apply_message(&mut self, text: &str, env: &SeatMapEnvironment) -> Result<(), ProtocolError> {
        let message: ChannelMessage =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let records = match message {
            ChannelMessage::InitialState(records) | ChannelMessage::ReservationUpdate(records) => {
                records
            },
            ChannelMessage::Error(payload) => {
                return Err(ProtocolError::Server(describe_payload(&payload)));
            },
        };

        // Build the whole snapshot before touching state
        let mut groups = Vec::with_capacity(records.len());
        let mut reserved = HashSet::new();
        for record in records {
            let seats = record.seat_ids()?;
            reserved.extend(seats.iter().cloned());
            let mut group = ReservationGroup::from_record(record, seats, &env.venue);
            group.refresh_geometry(env.geometry.as_ref(), &env.venue);
            groups.push(group);
        }

        tracing::debug!(
            groups = groups.len(),
            reserved = reserved.len(),
            "Reservation snapshot applied"
        );
        metrics::counter!("seatmap.snapshots.applied").increment(1);

        self.groups = groups;
        self.reserved = ReservedSeatIndex(reserved);
        self.last_error = None;
        self.last_snapshot_at = Some(env.clock.now());
        self.touch();
        Ok(())
    }
}

fn describe_payload(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Object(fields) => fields
            .get("detail")
            .or_else(|| fields.get("message"))
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| payload.to_string(), str::to_string),
        other => other.to_string(),
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Live channel input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncAction {
    /// Channel is connected
    ChannelOpened,
    /// Raw text frame
    MessageReceived(String),
    /// Channel closed by the peer
    ChannelClosed {
        /// Close reason, if the peer gave one
        reason: Option<String>,
    },
    /// Transport failure
    ChannelFailed {
        /// Failure description
        error: String,
    },
    /// Host reports that seat positions changed
    LayoutChanged,
}

/// Reducer for [`SyncAction`]
///
/// Writes only the sync slice.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncReducer;

impl Reducer for SyncReducer {
    type State = SeatMapState;
    type Action = SyncAction;
    type Environment = SeatMapEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let sync = &mut state.sync;

        match action {
            SyncAction::ChannelOpened => {
                tracing::info!("Reservation channel open");
                sync.connection = ConnectionState::Open;
                sync.touch();
            },
            SyncAction::MessageReceived(text) => {
                if sync.connection != ConnectionState::Open {
                    tracing::warn!(
                        connection = ?sync.connection,
                        "Dropping channel message received while not open"
                    );
                    return smallvec![Effect::None];
                }
                if let Err(error) = sync.apply_message(&text, env) {
                    tracing::warn!(%error, "Channel message rejected, keeping previous snapshot");
                    metrics::counter!("seatmap.snapshots.rejected").increment(1);
                    sync.last_error = Some(error.to_string());
                    sync.touch();
                }
            },
            SyncAction::ChannelClosed { reason } => {
                tracing::info!(reason = reason.as_deref().unwrap_or("none"), "Reservation channel closed");
                sync.connection = ConnectionState::Closed;
                sync.touch();
            },
            SyncAction::ChannelFailed { error } => {
                tracing::warn!(%error, "Reservation channel failed");
                sync.connection = ConnectionState::Closed;
                sync.last_error = Some(error);
                sync.touch();
            },
            SyncAction::LayoutChanged => {
                let mut changed = 0_usize;
                for group in &mut sync.groups {
                    if group.refresh_geometry(env.geometry.as_ref(), &env.venue) {
                        changed += 1;
                    }
                }
                if changed > 0 {
                    tracing::debug!(changed, "Group geometry recomputed");
                    sync.touch();
                }
            },
        }

        smallvec![Effect::None]
    }
}
