//! Configuration management for the seat map.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::ConfigError;
use crate::submission::SubmissionSettings;
use crate::venue::VenueLayout;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Reservation store base URL
    pub api_url: String,
    /// Live reservation channel URL
    pub channel_url: String,
    /// Timeout for one create-reservation call
    pub request_timeout: Duration,
    /// How long a success notice stays up
    pub success_dismiss: Duration,
    /// Longest failure excerpt shown to the operator, in characters
    pub failure_excerpt_chars: usize,
    /// Venue layout document; the built-in layout when unset
    pub venue_layout: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            channel_url: "ws://localhost:8000/ws/reservations".to_string(),
            request_timeout: Duration::from_secs(10),
            success_dismiss: Duration::from_millis(2500),
            failure_excerpt_chars: 200,
            venue_layout: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] if a numeric variable is set but
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] if a numeric variable is set but
    /// does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map_err(|_| ConfigError::InvalidNumber { key, value: raw })
                })
                .transpose()
        };

        Ok(Self {
            api_url: lookup("SEATBLOCK_API_URL").unwrap_or(defaults.api_url),
            channel_url: lookup("SEATBLOCK_CHANNEL_URL").unwrap_or(defaults.channel_url),
            request_timeout: number("SEATBLOCK_REQUEST_TIMEOUT_SECS")?
                .map_or(defaults.request_timeout, Duration::from_secs),
            success_dismiss: number("SEATBLOCK_SUCCESS_DISMISS_MS")?
                .map_or(defaults.success_dismiss, Duration::from_millis),
            failure_excerpt_chars: number("SEATBLOCK_FAILURE_EXCERPT_CHARS")?
                .map_or(Ok(defaults.failure_excerpt_chars), |n| {
                    usize::try_from(n).map_err(|_| ConfigError::InvalidNumber {
                        key: "SEATBLOCK_FAILURE_EXCERPT_CHARS",
                        value: n.to_string(),
                    })
                })?,
            venue_layout: lookup("SEATBLOCK_VENUE_LAYOUT")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    /// Venue layout from the configured file, or the built-in one
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Venue`] if the file cannot be read or is invalid.
    pub fn venue(&self) -> Result<VenueLayout, ConfigError> {
        match &self.venue_layout {
            Some(path) => Ok(VenueLayout::load(path)?),
            None => Ok(VenueLayout::default()),
        }
    }

    /// Workflow timing
    #[must_use]
    pub const fn submission_settings(&self) -> SubmissionSettings {
        SubmissionSettings {
            success_dismiss: self.success_dismiss,
        }
    }
}
