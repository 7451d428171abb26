//! Domain types for the seat map.
//!
//! Seat identifiers, the container-local coordinate types used by selection
//! and overlays, reservation identifiers, and display colors.

use crate::error::{SeatIdError, VenueError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Seat identifier of the form `<zone>-<column>-<row>`, e.g. `1F-3-7`
///
/// Column and row may carry a letter prefix ahead of their digits, as in the
/// balcony seat `2L-R2-7`; the prefix is kept in the text and dropped from the
/// index.
///
/// Ordered by its text so seat sets iterate deterministically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatId {
    text: String,
    zone_len: usize,
    column: u32,
    row: u32,
}

impl SeatId {
    /// Zone prefix, e.g. `1F`
    #[must_use]
    pub fn zone(&self) -> &str {
        &self.text[..self.zone_len]
    }

    /// Column index within the zone
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Row index within the column
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Canonical text form
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

fn parse_index(segment: &str) -> Option<u32> {
    let digits = segment.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl FromStr for SeatId {
    type Err = SeatIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SeatIdError::Empty);
        }

        let segments: Vec<&str> = s.split('-').collect();
        let [zone, column, row] = segments.as_slice() else {
            return Err(SeatIdError::WrongSegmentCount {
                id: s.to_string(),
                found: segments.len(),
            });
        };

        if zone.is_empty() || !zone.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(SeatIdError::InvalidZone { id: s.to_string() });
        }
        let column = parse_index(column).ok_or_else(|| SeatIdError::InvalidColumn {
            id: s.to_string(),
        })?;
        let row = parse_index(row).ok_or_else(|| SeatIdError::InvalidRow { id: s.to_string() })?;

        Ok(Self {
            text: s.to_string(),
            zone_len: zone.len(),
            column,
            row,
        })
    }
}

impl TryFrom<String> for SeatId {
    type Error = SeatIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeatId> for String {
    fn from(seat: SeatId) -> Self {
        seat.text
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Server-assigned reservation identifier
///
/// The store may send it as a JSON string or an integer; both are kept as text.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReservationId(String);

impl ReservationId {
    /// Wrap an identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ReservationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ReservationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Integer(n) => Self(n.to_string()),
        })
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Point in the selection container's local frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal offset
    pub x: f64,
    /// Vertical offset, growing downwards
    pub y: f64,
}

impl Point {
    /// Create a point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width, never negative when built through [`Rect::spanning`]
    pub width: f64,
    /// Height, never negative when built through [`Rect::spanning`]
    pub height: f64,
}

impl Rect {
    /// Create a rectangle
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanned by two corners, in either drag direction
    #[must_use]
    pub fn spanning(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether both sides are strictly positive
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Strict overlap
    ///
    /// Rectangles that only share an edge do not overlap, and a rectangle
    /// without area overlaps nothing.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.is_renderable()
            && other.is_renderable()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Same rectangle moved by `(dx, dy)`
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

// ============================================================================
// Display
// ============================================================================

/// Display color, written as `#rrggbb`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Color {
    /// Create a color from its channels
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = VenueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VenueError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = VenueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
