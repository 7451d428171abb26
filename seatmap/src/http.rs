//! Reservation store over HTTP.
//!
//! `POST {api_url}/reservations` with a [`ReservationRequest`] body. The store
//! answers `2xx` with the created record, `409` when a seat was taken first,
//! and anything else is a rejection.

use crate::api::{CreatedReservation, ReservationApi, ReservationRequest};
use crate::config::Config;
use crate::error::SubmitFailure;
use crate::sync::SeatEntry;
use crate::types::{ReservationId, SeatId};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Body of a successful create call
#[derive(Debug, Deserialize)]
struct CreatedBody {
    id: ReservationId,
    #[serde(default)]
    seats: Vec<SeatEntry>,
}

/// HTTP client for the reservation store
#[derive(Clone, Debug)]
pub struct HttpReservationApi {
    client: Client,
    endpoint: String,
    excerpt_chars: usize,
}

impl HttpReservationApi {
    /// Client for the store rooted at `api_url`
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn new(
        api_url: &str,
        timeout: Duration,
        excerpt_chars: usize,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/reservations", api_url.trim_end_matches('/')),
            excerpt_chars,
        })
    }

    /// Client configured from `config`
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            &config.api_url,
            config.request_timeout,
            config.failure_excerpt_chars,
        )
    }

    /// Full URL of the create endpoint
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReservationApi for HttpReservationApi {
    async fn create_reservation(
        &self,
        request: ReservationRequest,
    ) -> Result<CreatedReservation, SubmitFailure> {
        tracing::debug!(
            endpoint = %self.endpoint,
            seats = request.seat_identifiers.len(),
            "Creating reservation"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubmitFailure::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SubmitFailure::Transport(e.to_string()))?;

        interpret_response(status, &body, self.excerpt_chars)
    }
}

/// Turn a create-call response into a verdict
///
/// # Errors
///
/// - [`SubmitFailure::Conflict`] for `409`
/// - [`SubmitFailure::Rejected`] for any other non-`2xx` status
/// - [`SubmitFailure::MalformedResponse`] for a `2xx` body that does not parse
pub fn interpret_response(
    status: u16,
    body: &str,
    excerpt_chars: usize,
) -> Result<CreatedReservation, SubmitFailure> {
    match status {
        200..=299 => {
            let created: CreatedBody = serde_json::from_str(body)
                .map_err(|e| SubmitFailure::MalformedResponse(e.to_string()))?;
            let seats = created
                .seats
                .iter()
                .map(|entry| entry.identifier().parse::<SeatId>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| SubmitFailure::MalformedResponse(e.to_string()))?;
            Ok(CreatedReservation {
                id: created.id,
                seats,
            })
        },
        409 => Err(SubmitFailure::Conflict {
            detail: describe_failure_body(status, body, excerpt_chars),
        }),
        _ => Err(SubmitFailure::Rejected {
            status,
            reason: describe_failure_body(status, body, excerpt_chars),
        }),
    }
}

/// Readable excerpt of a failure body
///
/// A JSON `detail` string is returned whole. Other JSON is shown as compact
/// text; anything else has its markup stripped and whitespace collapsed.
/// Excerpts longer than `limit` characters are cut and end in `…`; a `limit`
/// of zero reports only the status.
#[must_use]
pub fn describe_failure_body(status: u16, body: &str, limit: usize) -> String {
    let text = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(mut fields)) => match fields.remove("detail") {
            Some(serde_json::Value::String(detail)) if !detail.trim().is_empty() => {
                return detail;
            },
            Some(serde_json::Value::String(_)) | None if fields.is_empty() => String::new(),
            Some(serde_json::Value::String(_)) | None => {
                serde_json::Value::Object(fields).to_string()
            },
            Some(other) => other.to_string(),
        },
        Ok(other) => other.to_string(),
        Err(_) => collapse_whitespace(&strip_markup(body)),
    };

    let excerpt = truncate(&text, limit);
    if excerpt.is_empty() {
        format!("HTTP {status}")
    } else {
        excerpt
    }
}

/// Drops `<tag>` runs; a `<` not followed by a letter, `/` or `!` is text
fn strip_markup(body: &str) -> String {
    let mut text = String::with_capacity(body.len());
    let mut in_tag = false;
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' if !in_tag
                && chars
                    .peek()
                    .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!')) =>
            {
                in_tag = true;
            },
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            },
            _ if !in_tag => text.push(c),
            _ => {},
        }
    }
    text
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A zero limit keeps nothing, leaving the caller's `HTTP {status}` fallback
fn truncate(text: &str, limit: usize) -> String {
    if limit == 0 {
        return String::new();
    }
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}
