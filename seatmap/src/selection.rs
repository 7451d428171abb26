//! Selection engine: rectangle drag and single-seat toggles.
//!
//! A drag starts on the empty surface, grows a rectangle from its origin, and
//! selects every seat whose current on-screen rectangle strictly overlaps it.
//! The seat set is rewritten on every update so the host can give continuous
//! feedback. Seats already reserved are never picked up by a drag.

use crate::app::{SeatMapEnvironment, SeatMapState};
use crate::geometry::local_rect;
use crate::types::{Point, Rect, SeatId};
use seatblock_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use std::collections::BTreeSet;

/// What the pointer went down on
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty selection surface, the only valid drag origin
    Surface,
    /// A seat, handled as a toggle
    Seat(SeatId),
    /// A submission control
    Control,
}

/// Selection input
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionAction {
    /// Pointer went down
    BeginDrag {
        /// Container-local pointer position
        origin: Point,
        /// Keep the current selection and add to it
        extend: bool,
        /// Element under the pointer
        target: PointerTarget,
    },
    /// Pointer moved
    UpdateDrag {
        /// Container-local pointer position
        point: Point,
        /// Modifier currently held
        extend: bool,
    },
    /// Pointer went up on the surface
    EndDrag,
    /// Pointer left the tracked surface
    PointerLeft,
    /// Button released anywhere in the window
    PointerReleased,
    /// Seat clicked
    ToggleSeat(SeatId),
    /// Drop every selected seat
    Clear,
}

/// Drag in progress
#[derive(Clone, Debug, PartialEq)]
pub struct DragState {
    origin: Point,
    current: Point,
    /// Selection committed before the drag, kept when extending
    base: BTreeSet<SeatId>,
}

/// Locally held, not yet submitted seats
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionState {
    seats: BTreeSet<SeatId>,
    drag: Option<DragState>,
}

impl SelectionState {
    /// Selected seats, in identifier order
    #[must_use]
    pub const fn seats(&self) -> &BTreeSet<SeatId> {
        &self.seats
    }

    /// Whether `seat` is selected
    #[must_use]
    pub fn contains(&self, seat: &SeatId) -> bool {
        self.seats.contains(seat)
    }

    /// Number of selected seats
    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Whether nothing is selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Whether a drag is in progress
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Rectangle to draw for the drag in progress
    #[must_use]
    pub fn drag_rect(&self) -> Option<Rect> {
        self.drag
            .as_ref()
            .map(|drag| Rect::spanning(drag.origin, drag.current))
    }

    /// Drop every selected seat, including the base of a drag in progress
    pub(crate) fn clear(&mut self) {
        self.seats.clear();
        if let Some(drag) = self.drag.as_mut() {
            drag.base.clear();
        }
    }

    fn end_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            tracing::debug!(
                selected = self.seats.len(),
                rect = ?Rect::spanning(drag.origin, drag.current),
                "Drag ended"
            );
        }
    }
}

/// Reducer for [`SelectionAction`]
///
/// Writes only the selection slice; reads the reserved-seat index.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelectionReducer;

impl Reducer for SelectionReducer {
    type State = SeatMapState;
    type Action = SelectionAction;
    type Environment = SeatMapEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let selection = &mut state.selection;

        match action {
            SelectionAction::BeginDrag {
                origin,
                extend,
                target,
            } => {
                if target != PointerTarget::Surface {
                    tracing::trace!(?target, "Pointer down on an element, not a drag origin");
                    return smallvec![Effect::None];
                }
                if !extend {
                    selection.seats.clear();
                }
                selection.drag = Some(DragState {
                    origin,
                    current: origin,
                    base: selection.seats.clone(),
                });
                tracing::debug!(?origin, extend, "Drag started");
            },
            SelectionAction::UpdateDrag { point, extend } => {
                let Some(drag) = selection.drag.as_mut() else {
                    return smallvec![Effect::None];
                };
                drag.current = point;
                let rect = Rect::spanning(drag.origin, point);

                let mut working = if extend {
                    drag.base.clone()
                } else {
                    BTreeSet::new()
                };
                let reserved = state.sync.reserved();
                for seat in env.geometry.seat_ids() {
                    if reserved.contains(&seat) {
                        continue;
                    }
                    if local_rect(env.geometry.as_ref(), &seat).is_some_and(|r| rect.overlaps(&r)) {
                        working.insert(seat);
                    }
                }
                selection.seats = working;
            },
            SelectionAction::EndDrag
            | SelectionAction::PointerLeft
            | SelectionAction::PointerReleased => selection.end_drag(),
            SelectionAction::ToggleSeat(seat) => {
                if selection.seats.remove(&seat) {
                    tracing::debug!(%seat, "Seat deselected");
                } else if state.sync.reserved().contains(&seat) {
                    tracing::debug!(%seat, "Seat already reserved, not selectable");
                } else {
                    tracing::debug!(%seat, "Seat selected");
                    selection.seats.insert(seat);
                }
            },
            SelectionAction::Clear => selection.clear(),
        }

        smallvec![Effect::None]
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::app::test_support::{environment_with, record, seat, snapshot_state};
    use crate::mocks::StaticGeometry;
    use seatblock_testing::{ReducerTest, assertions};

    /// Three seats in a row, 20x20 with 10 gaps, container at (100, 100)
    fn row_geometry() -> StaticGeometry {
        StaticGeometry::new(Point::new(100.0, 100.0))
            .with_seat(seat("1F-1-1"), Rect::new(100.0, 100.0, 20.0, 20.0))
            .with_seat(seat("1F-2-1"), Rect::new(130.0, 100.0, 20.0, 20.0))
            .with_seat(seat("1F-3-1"), Rect::new(160.0, 100.0, 20.0, 20.0))
    }

    fn begin(x: f64, y: f64, extend: bool) -> SelectionAction {
        SelectionAction::BeginDrag {
            origin: Point::new(x, y),
            extend,
            target: PointerTarget::Surface,
        }
    }

    fn update(x: f64, y: f64, extend: bool) -> SelectionAction {
        SelectionAction::UpdateDrag {
            point: Point::new(x, y),
            extend,
        }
    }

    fn seats(ids: &[&str]) -> BTreeSet<SeatId> {
        ids.iter().map(|id| seat(id)).collect()
    }

    #[test]
    fn test_drag_selects_overlapping_seats_continuously() {
        ReducerTest::new(SelectionReducer)
            .with_env(environment_with(row_geometry()))
            .given_state(SeatMapState::default())
            .given_action(begin(5.0, 5.0, false))
            .when_action(update(35.0, 15.0, false))
            .then_state(|state| {
                assert_eq!(*state.selection.seats(), seats(&["1F-1-1", "1F-2-1"]));
                assert!(state.selection.is_dragging());
                assert_eq!(
                    state.selection.drag_rect(),
                    Some(Rect::new(5.0, 5.0, 30.0, 10.0))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_shrinking_drag_drops_seats_no_longer_covered() {
        ReducerTest::new(SelectionReducer)
            .with_env(environment_with(row_geometry()))
            .given_state(SeatMapState::default())
            .given_action(begin(5.0, 5.0, false))
            .given_action(update(75.0, 15.0, false))
            .when_action(update(15.0, 15.0, false))
            .then_state(|state| {
                assert_eq!(*state.selection.seats(), seats(&["1F-1-1"]));
            })
            .run();
    }

    #[test]
    fn test_drag_direction_does_not_matter() {
        ReducerTest::new(SelectionReducer)
            .with_env(environment_with(row_geometry()))
            .given_state(SeatMapState::default())
            .given_action(begin(75.0, 15.0, false))
            .when_action(update(45.0, 5.0, false))
            .then_state(|state| {
                assert_eq!(*state.selection.seats(), seats(&["1F-2-1", "1F-3-1"]));
            })
            .run();
    }

    #[test]
    fn test_edge_touching_seat_is_not_selected() {
        // Drag ends exactly on the left edge of 1F-2-1 (local x = 30)
        ReducerTest::new(SelectionReducer)
            .with_env(environment_with(row_geometry()))
            .given_state(SeatMapState::default())
            .given_action(begin(0.0, 0.0, false))
            .when_action(update(30.0, 20.0, false))
            .then_state(|state| {
                assert_eq!(*state.selection.seats(), seats(&["1F-1-1"]));
            })
            .run();
    }

    #[test]
    fn test_click_without_extend_clears_selection() {
        ReducerTest::new(SelectionReducer)
            .with_env(environment_with(row_geometry()))
            .given_state(SeatMapState::default())
            .given_action(SelectionAction::ToggleSeat(seat("1F-3-1")))
            .given_action(begin(50.0, 50.0, false))
            .given_action(update(50.0, 50.0, false))
            .when_action(SelectionAction::EndDrag)
            .then_state(|state| {
                assert!(state.selection.is_empty());
                assert!(!state.selection.is_dragging());
            })
            .run();
    }

    #[test]
    fn test_extending_keeps_committed_seats_outside_the_rectangle() {
        ReducerTest::new(SelectionReducer)
            .with_env(environment_with(row_geometry()))
            .given_state(SeatMapState::default())
            .given_action(SelectionAction::ToggleSeat(seat("1F-3-1")))
            .given_action(begin(0.0, 0.0, true))
            .when_action(update(15.0, 15.0, true))
            .then_state(|state| {
                assert_eq!(*state.selection.seats(), seats(&["1F-1-1", "1F-3-1"]));
            })
            .run();
    }

    #[test]
    fn test_releasing_modifier_mid_drag_keeps_only_covered_seats() {
        ReducerTest::new(SelectionReducer)
            .with_env(environment_with(row_geometry()))
            .given_state(SeatMapState::default())
            .given_action(SelectionAction::ToggleSeat(seat("1F-3-1")))
            .given_action(begin(0.0, 0.0, true))
            .given_action(update(15.0, 15.0, true))
            .when_action(update(15.0, 15.0, false))
            .then_state(|state| {
                assert_eq!(*state.selection.seats(), seats(&["1F-1-1"]));
            })
            .run();
    }

    #[test]
    fn test_pointer_down_on_seat_or_control_is_not_a_drag() {
        for target in [PointerTarget::Seat(seat("1F-1-1")), PointerTarget::Control] {
            ReducerTest::new(SelectionReducer)
                .with_env(environment_with(row_geometry()))
                .given_state(SeatMapState::default())
                .given_action(SelectionAction::ToggleSeat(seat("1F-2-1")))
                .given_action(SelectionAction::BeginDrag {
                    origin: Point::new(0.0, 0.0),
                    extend: false,
                    target,
                })
                .when_action(update(100.0, 100.0, false))
                .then_state(|state| {
                    assert_eq!(*state.selection.seats(), seats(&["1F-2-1"]));
                    assert!(!state.selection.is_dragging());
                })
                .run();
        }
    }

    #[test]
    fn test_update_without_drag_is_ignored() {
        ReducerTest::new(SelectionReducer)
            .with_env(environment_with(row_geometry()))
            .given_state(SeatMapState::default())
            .when_action(update(100.0, 100.0, false))
            .then_state(|state| assert!(state.selection.is_empty()))
            .run();
    }

    #[test]
    fn test_pointer_leaving_or_window_release_ends_drag() {
        for cancel in [SelectionAction::PointerLeft, SelectionAction::PointerReleased] {
            ReducerTest::new(SelectionReducer)
                .with_env(environment_with(row_geometry()))
                .given_state(SeatMapState::default())
                .given_action(begin(0.0, 0.0, false))
                .given_action(update(15.0, 15.0, false))
                .given_action(cancel)
                .when_action(update(100.0, 100.0, false))
                .then_state(|state| {
                    assert!(!state.selection.is_dragging());
                    assert_eq!(*state.selection.seats(), seats(&["1F-1-1"]));
                })
                .run();
        }
    }

    #[test]
    fn test_drag_reads_live_geometry() {
        let geometry = std::sync::Arc::new(row_geometry());
        let env = environment_with(std::sync::Arc::clone(&geometry));
        let mut state = SeatMapState::default();

        SelectionReducer.reduce(&mut state, begin(0.0, 0.0, false), &env);
        SelectionReducer.reduce(&mut state, update(15.0, 15.0, false), &env);
        assert_eq!(*state.selection.seats(), seats(&["1F-1-1"]));

        // Layout reflows: 1F-1-1 moves away, 1F-3-1 moves under the pointer
        geometry.set_seat(seat("1F-1-1"), Rect::new(300.0, 300.0, 20.0, 20.0));
        geometry.set_seat(seat("1F-3-1"), Rect::new(105.0, 105.0, 5.0, 5.0));
        SelectionReducer.reduce(&mut state, update(15.0, 15.0, false), &env);
        assert_eq!(*state.selection.seats(), seats(&["1F-3-1"]));
    }

    #[test]
    fn test_drag_skips_reserved_seats() {
        let env = environment_with(row_geometry());
        ReducerTest::new(SelectionReducer)
            .with_env(env.clone())
            .given_state(snapshot_state(&env, vec![record("1", "Choir", &["1F-2-1"])]))
            .given_action(begin(0.0, 0.0, false))
            .when_action(update(75.0, 15.0, false))
            .then_state(|state| {
                assert_eq!(*state.selection.seats(), seats(&["1F-1-1", "1F-3-1"]));
            })
            .run();
    }

    #[test]
    fn test_toggle_flips_membership() {
        ReducerTest::new(SelectionReducer)
            .with_env(environment_with(row_geometry()))
            .given_state(SeatMapState::default())
            .given_action(SelectionAction::ToggleSeat(seat("1F-1-1")))
            .given_action(SelectionAction::ToggleSeat(seat("1F-2-1")))
            .when_action(SelectionAction::ToggleSeat(seat("1F-1-1")))
            .then_state(|state| {
                assert_eq!(*state.selection.seats(), seats(&["1F-2-1"]));
            })
            .run();
    }

    #[test]
    fn test_toggle_refuses_reserved_seat_but_allows_deselect() {
        let env = environment_with(row_geometry());
        let mut state = SeatMapState::default();
        SelectionReducer.reduce(
            &mut state,
            SelectionAction::ToggleSeat(seat("1F-1-1")),
            &env,
        );

        // 1F-1-1 becomes reserved while still selected, 1F-2-1 is reserved too
        let mut reserved = snapshot_state(&env, vec![record("9", "Band", &["1F-1-1", "1F-2-1"])]);
        reserved.selection = state.selection;

        SelectionReducer.reduce(
            &mut reserved,
            SelectionAction::ToggleSeat(seat("1F-2-1")),
            &env,
        );
        assert!(!reserved.selection.contains(&seat("1F-2-1")));

        SelectionReducer.reduce(
            &mut reserved,
            SelectionAction::ToggleSeat(seat("1F-1-1")),
            &env,
        );
        assert!(reserved.selection.is_empty());
    }

    #[test]
    fn test_clear_empties_selection_and_drag_base() {
        ReducerTest::new(SelectionReducer)
            .with_env(environment_with(row_geometry()))
            .given_state(SeatMapState::default())
            .given_action(SelectionAction::ToggleSeat(seat("1F-3-1")))
            .given_action(begin(0.0, 0.0, true))
            .given_action(SelectionAction::Clear)
            .when_action(update(15.0, 15.0, true))
            .then_state(|state| {
                assert_eq!(*state.selection.seats(), seats(&["1F-1-1"]));
            })
            .run();
    }
}
