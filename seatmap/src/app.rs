//! Seat map composition.
//!
//! One state tree with three slices, one reducer delegating to the selection,
//! sync and submission reducers, and the [`SeatMap`] facade over the store.
//! Each child reducer writes only its own slice, with one exception: a
//! successful submission clears the selection.

use crate::api::ReservationApi;
use crate::error::{SubmitError, SubmitFailure, UserInputError};
use crate::geometry::GeometryProvider;
use crate::selection::{PointerTarget, SelectionAction, SelectionReducer, SelectionState};
use crate::submission::{
    SubmissionAction, SubmissionPhase, SubmissionReducer, SubmissionSettings, SubmissionState,
};
use crate::sync::{ConnectionState, GroupOverlay, SyncAction, SyncReducer, SyncState};
use crate::types::{Point, SeatId};
use crate::venue::VenueLayout;
use seatblock_core::environment::{Clock, SystemClock};
use seatblock_core::{SmallVec, effect::Effect, reducer::Reducer};
use seatblock_runtime::{EffectHandle, Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// Whole seat map state
#[derive(Clone, Debug, Default)]
pub struct SeatMapState {
    /// Operator's pending picks
    pub selection: SelectionState,
    /// Mirror of the reservation store
    pub sync: SyncState,
    /// Reservation workflow
    pub submission: SubmissionState,
}

/// Any seat map input
#[derive(Clone, Debug, PartialEq)]
pub enum SeatMapAction {
    /// Pointer and toggle input
    Selection(SelectionAction),
    /// Live channel input
    Sync(SyncAction),
    /// Reservation workflow input
    Submission(SubmissionAction),
}

impl From<SelectionAction> for SeatMapAction {
    fn from(action: SelectionAction) -> Self {
        Self::Selection(action)
    }
}

impl From<SyncAction> for SeatMapAction {
    fn from(action: SyncAction) -> Self {
        Self::Sync(action)
    }
}

impl From<SubmissionAction> for SeatMapAction {
    fn from(action: SubmissionAction) -> Self {
        Self::Submission(action)
    }
}

/// Injected dependencies
#[derive(Clone)]
pub struct SeatMapEnvironment {
    /// Seat positions from the host
    pub geometry: Arc<dyn GeometryProvider>,
    /// Wing partition, tilt and palette
    pub venue: Arc<VenueLayout>,
    /// Create-reservation call
    pub api: Arc<dyn ReservationApi>,
    /// Time source for snapshot timestamps
    pub clock: Arc<dyn Clock>,
    /// Workflow timing
    pub settings: SubmissionSettings,
}

impl SeatMapEnvironment {
    /// Environment on the system clock with default workflow timing
    #[must_use]
    pub fn new(
        geometry: Arc<dyn GeometryProvider>,
        venue: VenueLayout,
        api: Arc<dyn ReservationApi>,
    ) -> Self {
        Self {
            geometry,
            venue: Arc::new(venue),
            api,
            clock: Arc::new(SystemClock),
            settings: SubmissionSettings::default(),
        }
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the workflow timing
    #[must_use]
    pub fn with_settings(mut self, settings: SubmissionSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Root reducer
#[derive(Clone, Copy, Debug, Default)]
pub struct SeatMapReducer;

impl Reducer for SeatMapReducer {
    type State = SeatMapState;
    type Action = SeatMapAction;
    type Environment = SeatMapEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SeatMapAction::Selection(action) => SelectionReducer
                .reduce(state, action, env)
                .into_iter()
                .map(|effect| effect.map(SeatMapAction::Selection))
                .collect(),
            SeatMapAction::Sync(action) => SyncReducer
                .reduce(state, action, env)
                .into_iter()
                .map(|effect| effect.map(SeatMapAction::Sync))
                .collect(),
            SeatMapAction::Submission(action) => SubmissionReducer
                .reduce(state, action, env)
                .into_iter()
                .map(|effect| effect.map(SeatMapAction::Submission))
                .collect(),
        }
    }
}

/// Store running the seat map
pub type SeatMapStore = Store<SeatMapState, SeatMapAction, SeatMapEnvironment, SeatMapReducer>;

/// Seat map facade
///
/// One method per operator or host input, plus read accessors. Cloning is
/// cheap and every clone drives the same store.
#[derive(Clone)]
pub struct SeatMap {
    store: SeatMapStore,
}

impl SeatMap {
    /// Start an empty seat map
    #[must_use]
    pub fn new(environment: SeatMapEnvironment) -> Self {
        Self {
            store: Store::new(SeatMapState::default(), SeatMapReducer, environment),
        }
    }

    /// Underlying store
    #[must_use]
    pub const fn store(&self) -> &SeatMapStore {
        &self.store
    }

    async fn send(&self, action: impl Into<SeatMapAction>) -> EffectHandle {
        self.store.send(action.into()).await
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Pointer went down at `origin`
    pub async fn begin_drag(&self, origin: Point, extend: bool, target: PointerTarget) {
        self.send(SelectionAction::BeginDrag {
            origin,
            extend,
            target,
        })
        .await;
    }

    /// Pointer moved to `point`
    pub async fn update_drag(&self, point: Point, extend: bool) {
        self.send(SelectionAction::UpdateDrag { point, extend }).await;
    }

    /// Pointer went up
    pub async fn end_drag(&self) {
        self.send(SelectionAction::EndDrag).await;
    }

    /// Pointer left the selection surface
    pub async fn pointer_left(&self) {
        self.send(SelectionAction::PointerLeft).await;
    }

    /// Button released anywhere in the window
    pub async fn pointer_released(&self) {
        self.send(SelectionAction::PointerReleased).await;
    }

    /// Seat clicked
    pub async fn toggle_seat(&self, seat: SeatId) {
        self.send(SelectionAction::ToggleSeat(seat)).await;
    }

    /// Drop the whole selection
    pub async fn clear_selection(&self) {
        self.send(SelectionAction::Clear).await;
    }

    // ------------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------------

    /// Host moved seats; recompute group geometry
    pub async fn layout_changed(&self) {
        self.send(SyncAction::LayoutChanged).await;
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    /// Ask to reserve the selection
    pub async fn request_submit(&self) {
        self.send(SubmissionAction::RequestSubmit).await;
    }

    /// Enter the group label
    ///
    /// The returned handle completes once the store's verdict was reduced.
    pub async fn confirm_label(&self, label: impl Into<String>) -> EffectHandle {
        self.send(SubmissionAction::ConfirmLabel(label.into())).await
    }

    /// Back out of the label step
    pub async fn cancel(&self) {
        self.send(SubmissionAction::Cancel).await;
    }

    /// Dismiss the outcome of the last submission
    pub async fn acknowledge(&self) {
        self.send(SubmissionAction::Acknowledge).await;
    }

    /// Run the whole workflow for the current selection and wait for the verdict
    ///
    /// Returns the outcome phase as it was entered; the caller still has to
    /// acknowledge a conflict or failure.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::Input`]: refused locally, nothing was sent
    /// - [`SubmitError::Store`]: no verdict within `timeout`
    pub async fn submit(
        &self,
        label: impl Into<String>,
        timeout: Duration,
    ) -> Result<SubmissionPhase, SubmitError> {
        self.request_submit().await;
        if let Some(rejection) = self.last_rejection().await {
            return Err(rejection.into());
        }

        let mut verdicts = self.store.subscribe_actions();
        self.confirm_label(label).await;
        if let Some(rejection) = self.last_rejection().await {
            self.cancel().await;
            return Err(rejection.into());
        }

        let wait = async {
            loop {
                match verdicts.recv().await {
                    Ok(SeatMapAction::Submission(SubmissionAction::Created(created))) => {
                        return Ok(SubmissionPhase::Succeeded {
                            reservation_id: created.id,
                        });
                    },
                    Ok(SeatMapAction::Submission(SubmissionAction::Rejected(failure))) => {
                        return Ok(match failure {
                            SubmitFailure::Conflict { detail } => {
                                SubmissionPhase::Conflicted { detail }
                            },
                            other => SubmissionPhase::Failed {
                                reason: other.to_string(),
                            },
                        });
                    },
                    Ok(_) => {},
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Verdict observer lagged");
                    },
                    Err(RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed.into());
                    },
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or_else(|_| Err(StoreError::Timeout.into()))
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Read any part of the state
    pub async fn state<T>(&self, f: impl FnOnce(&SeatMapState) -> T) -> T {
        self.store.state(f).await
    }

    /// Selected seats, in identifier order
    pub async fn selected_seats(&self) -> Vec<SeatId> {
        self.state(|s| s.selection.seats().iter().cloned().collect())
            .await
    }

    /// Drawable reservation banners
    pub async fn overlays(&self) -> Vec<GroupOverlay> {
        self.state(|s| s.sync.overlays()).await
    }

    /// Submission phase
    pub async fn phase(&self) -> SubmissionPhase {
        self.state(|s| s.submission.phase().clone()).await
    }

    /// Live channel state
    pub async fn connection(&self) -> ConnectionState {
        self.state(|s| s.sync.connection()).await
    }

    /// Whether `seat` belongs to any reservation
    pub async fn is_reserved(&self, seat: &SeatId) -> bool {
        self.state(|s| s.sync.reserved().contains(seat)).await
    }

    /// Why the last submission input was refused
    pub async fn last_rejection(&self) -> Option<UserInputError> {
        self.state(|s| s.submission.last_rejection()).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::mocks::{MockReservationApi, StaticGeometry};
    use crate::sync::{ChannelMessage, SeatEntry, ServerReservationRecord};
    use crate::types::ReservationId;
    use seatblock_testing::test_clock;

    pub fn seat(id: &str) -> SeatId {
        id.parse().unwrap()
    }

    pub fn environment_with<G: GeometryProvider + 'static>(geometry: G) -> SeatMapEnvironment {
        SeatMapEnvironment::new(
            Arc::new(geometry),
            VenueLayout::default(),
            Arc::new(MockReservationApi::new()),
        )
        .with_clock(Arc::new(test_clock()))
    }

    pub fn test_env() -> SeatMapEnvironment {
        environment_with(StaticGeometry::new(Point::default()))
    }

    pub fn record(id: &str, label: &str, seats: &[&str]) -> ServerReservationRecord {
        ServerReservationRecord {
            id: ReservationId::new(id),
            group_label: label.to_string(),
            seats: seats
                .iter()
                .map(|s| SeatEntry::Identifier((*s).to_string()))
                .collect(),
        }
    }

    pub fn snapshot_message(records: Vec<ServerReservationRecord>) -> String {
        serde_json::to_string(&ChannelMessage::InitialState(records)).unwrap()
    }

    pub fn snapshot_state(
        env: &SeatMapEnvironment,
        records: Vec<ServerReservationRecord>,
    ) -> SeatMapState {
        let mut state = SeatMapState::default();
        SyncReducer.reduce(&mut state, SyncAction::ChannelOpened, env);
        SyncReducer.reduce(
            &mut state,
            SyncAction::MessageReceived(snapshot_message(records)),
            env,
        );
        state
    }

    pub fn state_with_selection(seats: &[&str]) -> SeatMapState {
        let env = test_env();
        let mut state = SeatMapState::default();
        for id in seats {
            SelectionReducer.reduce(&mut state, SelectionAction::ToggleSeat(seat(id)), &env);
        }
        state
    }
}
