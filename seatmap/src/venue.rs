//! Venue layout: wing partition, wing tilt, and group colors.
//!
//! Columns are split into three wings. Reservation banners are tilted to
//! follow the wings they cover, so a group straddling two tilted wings does
//! not render axis-aligned.

use crate::error::VenueError;
use crate::types::{Color, ReservationId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Seating wing
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wing {
    /// Columns up to `left_through`
    Left,
    /// Columns after the left wing, up to `center_through`
    Center,
    /// Everything else
    Right,
}

/// Banner tilt per wing, in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WingTilt {
    /// Left wing tilt
    pub left: f64,
    /// Center tilt
    pub center: f64,
    /// Right wing tilt
    pub right: f64,
}

impl Default for WingTilt {
    fn default() -> Self {
        Self {
            left: 2.0,
            center: 0.0,
            right: -2.0,
        }
    }
}

/// Per-venue layout constants
///
/// Defaults follow the first-floor plan: columns 1-2 form the left wing,
/// 3-4 the center, 5-6 the right wing.
///
/// ```
/// use seatblock_seatmap::venue::VenueLayout;
///
/// let venue = VenueLayout::from_json(r#"{"left_through": 3, "center_through": 7}"#).unwrap();
/// assert_eq!(venue.orientation([1, 9]), 0.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VenueLayout {
    /// Last column of the left wing
    pub left_through: u32,
    /// Last column of the center
    pub center_through: u32,
    /// Tilt per wing
    pub tilt: WingTilt,
    /// Colors handed out to reservation groups
    pub palette: Vec<Color>,
}

impl Default for VenueLayout {
    fn default() -> Self {
        Self {
            left_through: 2,
            center_through: 4,
            tilt: WingTilt::default(),
            palette: vec![
                Color::rgb(0xe5, 0x73, 0x73),
                Color::rgb(0x64, 0xb5, 0xf6),
                Color::rgb(0x81, 0xc7, 0x84),
                Color::rgb(0xff, 0xb7, 0x4d),
                Color::rgb(0xba, 0x68, 0xc8),
                Color::rgb(0x4d, 0xb6, 0xac),
            ],
        }
    }
}

const FALLBACK_COLOR: Color = Color::rgb(0x9e, 0x9e, 0x9e);

impl VenueLayout {
    /// Parse and validate a JSON layout document
    ///
    /// Missing fields take their default value.
    ///
    /// # Errors
    ///
    /// [`VenueError::Parse`] for invalid JSON or unknown fields, and any
    /// error from [`VenueLayout::validate`].
    pub fn from_json(document: &str) -> Result<Self, VenueError> {
        let layout: Self =
            serde_json::from_str(document).map_err(|e| VenueError::Parse(e.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    /// Read a JSON layout document from disk
    ///
    /// # Errors
    ///
    /// [`VenueError::Io`] if the file cannot be read, otherwise as
    /// [`VenueLayout::from_json`].
    pub fn load(path: &Path) -> Result<Self, VenueError> {
        let document = std::fs::read_to_string(path).map_err(|e| VenueError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&document)
    }

    /// Check the layout is usable
    ///
    /// # Errors
    ///
    /// - [`VenueError::InvalidPartition`] if the left wing does not end before the center
    /// - [`VenueError::EmptyPalette`] if there is no color to hand out
    /// - [`VenueError::NonFiniteTilt`] if a tilt is NaN or infinite
    pub fn validate(&self) -> Result<(), VenueError> {
        if self.left_through >= self.center_through {
            return Err(VenueError::InvalidPartition {
                left_through: self.left_through,
                center_through: self.center_through,
            });
        }
        if self.palette.is_empty() {
            return Err(VenueError::EmptyPalette);
        }
        for (wing, tilt) in [
            ("left", self.tilt.left),
            ("center", self.tilt.center),
            ("right", self.tilt.right),
        ] {
            if !tilt.is_finite() {
                return Err(VenueError::NonFiniteTilt { wing });
            }
        }
        Ok(())
    }

    /// Wing a column belongs to
    #[must_use]
    pub const fn wing_of(&self, column: u32) -> Wing {
        if column <= self.left_through {
            Wing::Left
        } else if column <= self.center_through {
            Wing::Center
        } else {
            Wing::Right
        }
    }

    /// Tilt of one wing
    #[must_use]
    pub const fn tilt_of(&self, wing: Wing) -> f64 {
        match wing {
            Wing::Left => self.tilt.left,
            Wing::Center => self.tilt.center,
            Wing::Right => self.tilt.right,
        }
    }

    /// Banner orientation for a group whose seats sit in `columns`
    ///
    /// The mean tilt of the distinct wings present. Seat counts do not weigh
    /// in, and no columns means no tilt.
    #[must_use]
    pub fn orientation(&self, columns: impl IntoIterator<Item = u32>) -> f64 {
        let wings: BTreeSet<Wing> = columns.into_iter().map(|c| self.wing_of(c)).collect();
        if wings.is_empty() {
            return 0.0;
        }

        let total: f64 = wings.iter().map(|w| self.tilt_of(*w)).sum();
        #[allow(clippy::cast_precision_loss)] // at most three wings
        let count = wings.len() as f64;
        total / count
    }

    /// Stable color for a reservation group
    ///
    /// The same identifier maps to the same palette entry on every client.
    #[must_use]
    pub fn color_for(&self, id: &ReservationId) -> Color {
        // FNV-1a, stable across builds and platforms
        let hash = id
            .as_str()
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |acc, byte| {
                (acc ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
            });

        u64::try_from(self.palette.len())
            .ok()
            .and_then(|len| hash.checked_rem(len))
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| self.palette.get(index).copied())
            .unwrap_or(FALLBACK_COLOR)
    }
}
