//! Error types for the seat map.
//!
//! Every failure here resolves to a retryable state: nothing is fatal to the
//! process and no error leaves the selection or the reservation groups half
//! updated.

use seatblock_runtime::StoreError;
use thiserror::Error;

/// A seat identifier that does not follow `<zone>-<column>-<row>`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeatIdError {
    /// Nothing to parse
    #[error("seat identifier is empty")]
    Empty,

    /// Not exactly three dash-separated segments
    #[error("seat identifier `{id}` has {found} segments, expected <zone>-<column>-<row>")]
    WrongSegmentCount {
        /// Offending identifier
        id: String,
        /// Number of segments found
        found: usize,
    },

    /// Zone is empty or not ASCII alphanumeric
    #[error("seat identifier `{id}` has an invalid zone")]
    InvalidZone {
        /// Offending identifier
        id: String,
    },

    /// Column is not an unsigned integer, optionally letter-prefixed
    #[error("seat identifier `{id}` has an invalid column")]
    InvalidColumn {
        /// Offending identifier
        id: String,
    },

    /// Row is not an unsigned integer, optionally letter-prefixed
    #[error("seat identifier `{id}` has an invalid row")]
    InvalidRow {
        /// Offending identifier
        id: String,
    },
}

/// Invalid venue layout
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VenueError {
    /// Layout document could not be read
    #[error("cannot read venue layout {path}: {message}")]
    Io {
        /// File that was read
        path: String,
        /// Underlying I/O error
        message: String,
    },

    /// Layout document is not valid JSON for a layout
    #[error("invalid venue layout document: {0}")]
    Parse(String),

    /// Wing boundaries are out of order
    #[error("left wing must end before the center ends (left_through {left_through}, center_through {center_through})")]
    InvalidPartition {
        /// Last left-wing column
        left_through: u32,
        /// Last center column
        center_through: u32,
    },

    /// No display colors
    #[error("venue palette is empty")]
    EmptyPalette,

    /// Tilt is NaN or infinite
    #[error("tilt for the {wing} wing is not a finite number")]
    NonFiniteTilt {
        /// Wing name
        wing: &'static str,
    },

    /// Color is not `#rrggbb`
    #[error("invalid color `{0}`, expected #rrggbb")]
    InvalidColor(String),
}

/// Operator input rejected locally, before any network call
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInputError {
    /// No seat is selected
    #[error("select at least one seat first")]
    EmptySelection,

    /// Label is blank after trimming
    #[error("the group label must not be blank")]
    EmptyLabel,

    /// Label or cancel sent outside the label step
    #[error("no label is being asked for")]
    NotAwaitingLabel,

    /// A reservation request is in flight
    #[error("a reservation is already being submitted")]
    Busy,

    /// The previous outcome has not been acknowledged
    #[error("acknowledge the previous outcome first")]
    Unacknowledged,
}

/// Outcome of a create-reservation call that did not produce a reservation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    /// One or more seats were taken first
    #[error("{detail}")]
    Conflict {
        /// Server explanation, shown verbatim
        detail: String,
    },

    /// Any other non-success status
    #[error("reservation rejected (HTTP {status}): {reason}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Readable excerpt of the response body
        reason: String,
    },

    /// The request never completed
    #[error("reservation service unreachable: {0}")]
    Transport(String),

    /// Success status with a body we cannot read
    #[error("unexpected reservation response: {0}")]
    MalformedResponse(String),
}

/// Why [`SeatMap::submit`](crate::app::SeatMap::submit) produced no verdict
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Refused locally, nothing was sent
    #[error(transparent)]
    Input(#[from] UserInputError),

    /// The verdict never arrived
    #[error("no verdict from the store: {0}")]
    Store(#[from] StoreError),
}

/// A live channel message that was not applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload is not a known message
    #[error("malformed channel message: {0}")]
    Malformed(String),

    /// A record names a seat that does not parse
    #[error("reservation {record} lists an invalid seat: {source}")]
    InvalidSeat {
        /// Record identifier
        record: String,
        /// Parse failure
        source: SeatIdError,
    },

    /// The store pushed an `error` message
    #[error("reservation channel reported an error: {0}")]
    Server(String),
}

/// Invalid configuration value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Numeric variable did not parse
    #[error("{key} must be a non-negative integer, got `{value}`")]
    InvalidNumber {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },

    /// Venue layout file is unusable
    #[error(transparent)]
    Venue(#[from] VenueError),
}
