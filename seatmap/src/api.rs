//! Create-reservation call.

use crate::error::SubmitFailure;
use crate::types::{ReservationId, SeatId};
use async_trait::async_trait;
use serde::Serialize;

/// Body of a create-reservation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReservationRequest {
    /// Label for the new group
    pub group_label: String,
    /// Every selected seat
    pub seat_identifiers: Vec<SeatId>,
}

/// Reservation confirmed by the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedReservation {
    /// Identifier assigned by the store
    pub id: ReservationId,
    /// Seats the store recorded
    pub seats: Vec<SeatId>,
}

/// The reservation store's write side
///
/// Exactly one call is in flight per submission; the workflow waits for its
/// verdict and never retries on its own.
#[async_trait]
pub trait ReservationApi: Send + Sync {
    /// Create a reservation for `request`
    ///
    /// # Errors
    ///
    /// - [`SubmitFailure::Conflict`]: a requested seat is already reserved
    /// - [`SubmitFailure::Rejected`]: any other non-success status
    /// - [`SubmitFailure::Transport`]: the call did not complete
    /// - [`SubmitFailure::MalformedResponse`]: success status with an unreadable body
    async fn create_reservation(
        &self,
        request: ReservationRequest,
    ) -> Result<CreatedReservation, SubmitFailure>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = ReservationRequest {
            group_label: "Choir".to_string(),
            seat_identifiers: vec!["1F-1-1".parse().unwrap(), "1F-1-2".parse().unwrap()],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"group_label": "Choir", "seat_identifiers": ["1F-1-1", "1F-1-2"]})
        );
    }
}
