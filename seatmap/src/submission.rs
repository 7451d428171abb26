//! Submission workflow.
//!
//! ```text
//! Idle -> AwaitingLabel -> Submitting -> Succeeded | Conflicted | Failed -> Idle
//! ```
//!
//! The workflow never inserts the new group itself. A created reservation
//! shows up through the next synchronizer snapshot, so a second operator
//! racing for the same seats always sees a conflict instead of overwriting.

use crate::api::{CreatedReservation, ReservationRequest};
use crate::app::{SeatMapEnvironment, SeatMapState};
use crate::error::{SubmitFailure, UserInputError};
use crate::types::ReservationId;
use seatblock_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use std::sync::Arc;
use std::time::Duration;

/// Workflow phase
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubmissionPhase {
    /// Nothing in progress
    #[default]
    Idle,
    /// Asking the operator for a group label
    AwaitingLabel,
    /// Request in flight, not cancellable
    Submitting {
        /// Label sent
        label: String,
    },
    /// Store created the reservation
    Succeeded {
        /// New reservation
        reservation_id: ReservationId,
    },
    /// A seat was taken first
    Conflicted {
        /// Server explanation
        detail: String,
    },
    /// Any other failure
    Failed {
        /// Readable reason
        reason: String,
    },
}

impl SubmissionPhase {
    /// Whether the phase is an outcome waiting to be acknowledged
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Conflicted { .. } | Self::Failed { .. }
        )
    }
}

/// Workflow state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmissionState {
    phase: SubmissionPhase,
    attempt: u64,
    last_rejection: Option<UserInputError>,
}

impl SubmissionState {
    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> &SubmissionPhase {
        &self.phase
    }

    /// Number of requests sent so far
    #[must_use]
    pub const fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Why the last operator input was refused, cleared by the next accepted one
    #[must_use]
    pub const fn last_rejection(&self) -> Option<UserInputError> {
        self.last_rejection
    }

    fn reject(&mut self, error: UserInputError) {
        tracing::warn!(%error, phase = ?self.phase, "Submission input rejected");
        self.last_rejection = Some(error);
    }

    fn enter(&mut self, phase: SubmissionPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "Submission phase changed");
        self.phase = phase;
        self.last_rejection = None;
    }
}

/// Workflow timing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmissionSettings {
    /// How long a success notice stays before returning to idle
    pub success_dismiss: Duration,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            success_dismiss: Duration::from_millis(2500),
        }
    }
}

/// Workflow input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionAction {
    /// Operator asked to reserve the selection
    RequestSubmit,
    /// Operator entered a label
    ConfirmLabel(String),
    /// Operator backed out of the label step
    Cancel,
    /// Operator dismissed the outcome
    Acknowledge,
    /// Success notice timed out
    DismissSucceeded {
        /// Attempt the notice belongs to
        attempt: u64,
    },
    /// Store created the reservation
    Created(CreatedReservation),
    /// Store or transport refused the request
    Rejected(SubmitFailure),
}

/// Reducer for [`SubmissionAction`]
///
/// Writes the submission slice, and clears the selection after a success.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubmissionReducer;

impl Reducer for SubmissionReducer {
    type State = SeatMapState;
    type Action = SubmissionAction;
    type Environment = SeatMapEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let submission = &mut state.submission;

        match action {
            SubmissionAction::RequestSubmit => match submission.phase {
                SubmissionPhase::Idle if state.selection.is_empty() => {
                    submission.reject(UserInputError::EmptySelection);
                },
                SubmissionPhase::Idle | SubmissionPhase::AwaitingLabel => {
                    submission.enter(SubmissionPhase::AwaitingLabel);
                },
                SubmissionPhase::Submitting { .. } => submission.reject(UserInputError::Busy),
                SubmissionPhase::Succeeded { .. }
                | SubmissionPhase::Conflicted { .. }
                | SubmissionPhase::Failed { .. } => {
                    submission.reject(UserInputError::Unacknowledged);
                },
            },
            SubmissionAction::ConfirmLabel(label) => {
                if submission.phase != SubmissionPhase::AwaitingLabel {
                    submission.reject(UserInputError::NotAwaitingLabel);
                    return smallvec![Effect::None];
                }
                let label = label.trim();
                if label.is_empty() {
                    submission.reject(UserInputError::EmptyLabel);
                    return smallvec![Effect::None];
                }
                if state.selection.is_empty() {
                    submission.reject(UserInputError::EmptySelection);
                    return smallvec![Effect::None];
                }

                let request = ReservationRequest {
                    group_label: label.to_string(),
                    seat_identifiers: state.selection.seats().iter().cloned().collect(),
                };
                submission.attempt += 1;
                submission.enter(SubmissionPhase::Submitting {
                    label: label.to_string(),
                });
                tracing::info!(
                    label,
                    seats = request.seat_identifiers.len(),
                    attempt = submission.attempt,
                    "Submitting reservation"
                );

                let api = Arc::clone(&env.api);
                return smallvec![Effect::Future(Box::pin(async move {
                    Some(match api.create_reservation(request).await {
                        Ok(created) => SubmissionAction::Created(created),
                        Err(failure) => SubmissionAction::Rejected(failure),
                    })
                }))];
            },
            SubmissionAction::Cancel => {
                if submission.phase == SubmissionPhase::AwaitingLabel {
                    submission.enter(SubmissionPhase::Idle);
                } else {
                    submission.reject(UserInputError::NotAwaitingLabel);
                }
            },
            SubmissionAction::Acknowledge => {
                if submission.phase.is_terminal() {
                    submission.enter(SubmissionPhase::Idle);
                }
            },
            SubmissionAction::DismissSucceeded { attempt } => {
                let current = matches!(submission.phase, SubmissionPhase::Succeeded { .. })
                    && attempt == submission.attempt;
                if current {
                    submission.enter(SubmissionPhase::Idle);
                }
            },
            SubmissionAction::Created(created) => {
                if !matches!(submission.phase, SubmissionPhase::Submitting { .. }) {
                    tracing::warn!(id = %created.id, "Ignoring creation outside a submission");
                    return smallvec![Effect::None];
                }
                tracing::info!(id = %created.id, seats = created.seats.len(), "Reservation created");
                metrics::counter!("seatmap.submissions", "outcome" => "created").increment(1);

                submission.enter(SubmissionPhase::Succeeded {
                    reservation_id: created.id,
                });
                let attempt = submission.attempt;
                state.selection.clear();

                return smallvec![Effect::Delay {
                    duration: env.settings.success_dismiss,
                    action: Box::new(SubmissionAction::DismissSucceeded { attempt }),
                }];
            },
            SubmissionAction::Rejected(failure) => {
                if !matches!(submission.phase, SubmissionPhase::Submitting { .. }) {
                    tracing::warn!(%failure, "Ignoring rejection outside a submission");
                    return smallvec![Effect::None];
                }
                let phase = match failure {
                    SubmitFailure::Conflict { detail } => {
                        tracing::info!(%detail, "Reservation conflicted");
                        metrics::counter!("seatmap.submissions", "outcome" => "conflict")
                            .increment(1);
                        SubmissionPhase::Conflicted { detail }
                    },
                    other => {
                        tracing::warn!(failure = %other, "Reservation failed");
                        metrics::counter!("seatmap.submissions", "outcome" => "failed")
                            .increment(1);
                        SubmissionPhase::Failed {
                            reason: other.to_string(),
                        }
                    },
                };
                submission.enter(phase);
            },
        }

        smallvec![Effect::None]
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::app::test_support::{seat, state_with_selection, test_env};
    use crate::types::SeatId;
    use seatblock_testing::{ReducerTest, assertions};
    use std::collections::BTreeSet;

    fn created(id: &str) -> SubmissionAction {
        SubmissionAction::Created(CreatedReservation {
            id: ReservationId::new(id),
            seats: vec![seat("1F-1-1")],
        })
    }

    fn submitting() -> SeatMapState {
        let env = test_env();
        let mut state = state_with_selection(&["1F-1-1", "1F-1-2"]);
        SubmissionReducer.reduce(&mut state, SubmissionAction::RequestSubmit, &env);
        SubmissionReducer.reduce(
            &mut state,
            SubmissionAction::ConfirmLabel("Choir".to_string()),
            &env,
        );
        state
    }

    fn selected(state: &SeatMapState) -> BTreeSet<SeatId> {
        state.selection.seats().clone()
    }

    #[test]
    fn test_request_with_empty_selection_is_rejected_without_effects() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(SeatMapState::default())
            .when_action(SubmissionAction::RequestSubmit)
            .then_state(|state| {
                assert_eq!(*state.submission.phase(), SubmissionPhase::Idle);
                assert_eq!(
                    state.submission.last_rejection(),
                    Some(UserInputError::EmptySelection)
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_request_asks_for_label() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(state_with_selection(&["1F-1-1"]))
            .when_action(SubmissionAction::RequestSubmit)
            .then_state(|state| {
                assert_eq!(*state.submission.phase(), SubmissionPhase::AwaitingLabel);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_blank_label_stays_awaiting_label() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(state_with_selection(&["1F-1-1"]))
            .given_action(SubmissionAction::RequestSubmit)
            .when_action(SubmissionAction::ConfirmLabel(" \t ".to_string()))
            .then_state(|state| {
                assert_eq!(*state.submission.phase(), SubmissionPhase::AwaitingLabel);
                assert_eq!(
                    state.submission.last_rejection(),
                    Some(UserInputError::EmptyLabel)
                );
                assert_eq!(state.submission.attempt(), 0);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_confirm_label_submits_trimmed_label() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(state_with_selection(&["1F-1-1"]))
            .given_action(SubmissionAction::RequestSubmit)
            .when_action(SubmissionAction::ConfirmLabel("  Choir ".to_string()))
            .then_state(|state| {
                assert_eq!(
                    *state.submission.phase(),
                    SubmissionPhase::Submitting {
                        label: "Choir".to_string()
                    }
                );
                assert_eq!(state.submission.attempt(), 1);
                assert!(state.submission.last_rejection().is_none());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_confirm_after_selection_emptied_is_rejected() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state({
                // Every seat was toggled off while the label was being typed
                let mut state = state_with_selection(&[]);
                state.submission.phase = SubmissionPhase::AwaitingLabel;
                state
            })
            .when_action(SubmissionAction::ConfirmLabel("Choir".to_string()))
            .then_state(|state| {
                assert_eq!(*state.submission.phase(), SubmissionPhase::AwaitingLabel);
                assert_eq!(
                    state.submission.last_rejection(),
                    Some(UserInputError::EmptySelection)
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_cancel_returns_to_idle_and_keeps_selection() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(state_with_selection(&["1F-1-1"]))
            .given_action(SubmissionAction::RequestSubmit)
            .when_action(SubmissionAction::Cancel)
            .then_state(|state| {
                assert_eq!(*state.submission.phase(), SubmissionPhase::Idle);
                assert_eq!(state.selection.len(), 1);
            })
            .run();
    }

    #[test]
    fn test_cancel_outside_label_step_is_rejected() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(submitting())
            .when_action(SubmissionAction::Cancel)
            .then_state(|state| {
                assert!(matches!(
                    state.submission.phase(),
                    SubmissionPhase::Submitting { .. }
                ));
                assert_eq!(
                    state.submission.last_rejection(),
                    Some(UserInputError::NotAwaitingLabel)
                );
            })
            .run();
    }

    #[test]
    fn test_resubmit_while_in_flight_is_busy() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(submitting())
            .when_action(SubmissionAction::RequestSubmit)
            .then_state(|state| {
                assert_eq!(state.submission.last_rejection(), Some(UserInputError::Busy));
                assert_eq!(state.submission.attempt(), 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_created_clears_selection_and_schedules_dismissal() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(submitting())
            .when_action(created("41"))
            .then_state(|state| {
                assert_eq!(
                    *state.submission.phase(),
                    SubmissionPhase::Succeeded {
                        reservation_id: ReservationId::new("41")
                    }
                );
                assert!(state.selection.is_empty());
                // No speculative group: only the channel adds groups
                assert!(state.sync.groups().is_empty());
            })
            .then_effects(|effects| {
                let (duration, action) = assertions::assert_has_delay_effect(effects);
                assert_eq!(*duration, SubmissionSettings::default().success_dismiss);
                assert_eq!(*action, SubmissionAction::DismissSucceeded { attempt: 1 });
            })
            .run();
    }

    #[test]
    fn test_dismissal_only_applies_to_its_own_attempt() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(submitting())
            .given_action(created("41"))
            .when_action(SubmissionAction::DismissSucceeded { attempt: 1 })
            .then_state(|state| {
                assert_eq!(*state.submission.phase(), SubmissionPhase::Idle);
            })
            .run();

        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(submitting())
            .given_action(created("41"))
            .when_action(SubmissionAction::DismissSucceeded { attempt: 0 })
            .then_state(|state| {
                assert!(matches!(
                    state.submission.phase(),
                    SubmissionPhase::Succeeded { .. }
                ));
            })
            .run();
    }

    #[test]
    fn test_conflict_keeps_selection_until_acknowledged() {
        let conflict = SubmissionAction::Rejected(SubmitFailure::Conflict {
            detail: "Seat 1F-1-2 is already reserved".to_string(),
        });

        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(submitting())
            .when_action(conflict.clone())
            .then_state(|state| {
                assert_eq!(
                    *state.submission.phase(),
                    SubmissionPhase::Conflicted {
                        detail: "Seat 1F-1-2 is already reserved".to_string()
                    }
                );
                assert_eq!(
                    selected(state),
                    [seat("1F-1-1"), seat("1F-1-2")].into_iter().collect::<BTreeSet<_>>()
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();

        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(submitting())
            .given_action(conflict.clone())
            .when_action(SubmissionAction::RequestSubmit)
            .then_state(|state| {
                assert!(matches!(
                    state.submission.phase(),
                    SubmissionPhase::Conflicted { .. }
                ));
                assert_eq!(
                    state.submission.last_rejection(),
                    Some(UserInputError::Unacknowledged)
                );
            })
            .run();

        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(submitting())
            .given_action(conflict)
            .when_action(SubmissionAction::Acknowledge)
            .then_state(|state| {
                assert_eq!(*state.submission.phase(), SubmissionPhase::Idle);
                assert_eq!(state.selection.len(), 2);
            })
            .run();
    }

    #[test]
    fn test_other_failures_become_failed_with_reason() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(submitting())
            .when_action(SubmissionAction::Rejected(SubmitFailure::Rejected {
                status: 502,
                reason: "Bad Gateway".to_string(),
            }))
            .then_state(|state| {
                assert_eq!(
                    *state.submission.phase(),
                    SubmissionPhase::Failed {
                        reason: "reservation rejected (HTTP 502): Bad Gateway".to_string()
                    }
                );
                assert_eq!(state.selection.len(), 2);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_stale_verdicts_are_ignored() {
        ReducerTest::new(SubmissionReducer)
            .with_env(test_env())
            .given_state(state_with_selection(&["1F-1-1"]))
            .when_action(created("7"))
            .then_state(|state| {
                assert_eq!(*state.submission.phase(), SubmissionPhase::Idle);
                assert_eq!(state.selection.len(), 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
