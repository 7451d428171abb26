//! # Seatblock Seat Map
//!
//! Operator-facing seat map for a ticketed venue: rectangle drag selection,
//! a live view of every reservation group, and the workflow that turns the
//! selection into a new reservation.
//!
//! The seat map is one [`SeatMapStore`] running [`SeatMapReducer`], which
//! composes three child reducers over a single [`SeatMapState`]:
//!
//! - [`selection`]: drag rectangle and click toggles, never picking a
//!   reserved seat
//! - [`sync`]: snapshots from the live channel, replaced atomically, with
//!   one overlay per reservation group
//! - [`submission`]: label prompt, the create call, and its verdict
//!
//! Collaborators come in through [`SeatMapEnvironment`]: seat geometry from
//! the host ([`GeometryProvider`]), the venue layout, the reservation store
//! ([`ReservationApi`]) and a clock.
//!
//! ## Example
//!
//! ```
//! use seatblock_seatmap::mocks::{MockReservationApi, StaticGeometry};
//! use seatblock_seatmap::{SeatMap, SeatMapEnvironment, VenueLayout};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let geometry = StaticGeometry::grid("1F", 6, 10, 20.0, 4.0).ok_or("bad zone")?;
//! let env = SeatMapEnvironment::new(
//!     Arc::new(geometry),
//!     VenueLayout::default(),
//!     MockReservationApi::shared(),
//! );
//! let seat_map = SeatMap::new(env);
//!
//! seat_map.toggle_seat("1F-2-3".parse()?).await;
//! assert_eq!(seat_map.selected_seats().await.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

pub mod api;
pub mod app;
pub mod channel;
pub mod config;
pub mod error;
pub mod geometry;
pub mod http;
pub mod mocks;
pub mod selection;
pub mod submission;
pub mod sync;
pub mod types;
pub mod venue;

pub use api::{CreatedReservation, ReservationApi, ReservationRequest};
pub use app::{SeatMap, SeatMapAction, SeatMapEnvironment, SeatMapReducer, SeatMapState, SeatMapStore};
pub use channel::{ChannelEvent, LiveChannel, WsChannel, pump_channel};
pub use config::Config;
pub use error::{
    ConfigError, ProtocolError, SeatIdError, SubmitError, SubmitFailure, UserInputError,
    VenueError,
};
pub use geometry::GeometryProvider;
pub use http::HttpReservationApi;
pub use selection::PointerTarget;
pub use submission::{SubmissionPhase, SubmissionSettings};
pub use sync::{ConnectionState, GroupOverlay};
pub use types::{Color, Point, Rect, ReservationId, SeatId};
pub use venue::VenueLayout;
