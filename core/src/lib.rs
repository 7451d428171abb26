//! # Seatblock Core
//!
//! Reducer and effect abstractions shared by the seatblock crates.
//!
//! Every interactive component of the seat map (drag selection, reservation
//! synchronization, the submit workflow) is written as a reducer:
//!
//! - **State**: owned data for one component
//! - **Action**: every input the component reacts to (pointer input, channel
//!   messages, server verdicts)
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: a description of work for the runtime, never executed here
//! - **Environment**: injected collaborators (geometry, HTTP API, clock)
//!
//! ## Example
//!
//! ```
//! use seatblock_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Default)]
//! struct PickState {
//!     picked: Vec<String>,
//! }
//!
//! enum PickAction {
//!     Pick(String),
//! }
//!
//! struct PickReducer;
//!
//! impl Reducer for PickReducer {
//!     type State = PickState;
//!     type Action = PickAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut PickState,
//!         action: PickAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<PickAction>; 4]> {
//!         match action {
//!             PickAction::Pick(seat) => state.picked.push(seat),
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = PickState::default();
//! PickReducer.reduce(&mut state, PickAction::Pick("A-1-1".into()), &());
//! assert_eq!(state.picked, vec!["A-1-1".to_string()]);
//! ```

pub use smallvec::{smallvec, SmallVec};

/// Reducer module - the trait every component implements
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for component logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer owns
    /// - `Action`: The inputs this reducer processes
    /// - `Environment`: The injected collaborators this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Implementations validate the action, update state in place, and
        /// return descriptions of any asynchronous work. They must not block
        /// or perform I/O themselves.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects are values returned from reducers. The runtime executes them and
/// feeds any resulting action back into the same reducer.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Dispatch an action after a delay
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after the delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// If the future resolves to `Some`, the action is fed back into the reducer.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Whether this effect does nothing at all
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// Lift the actions this effect produces into another action type
        ///
        /// Used by parent reducers that embed a child reducer: the child's
        /// effects are mapped into the parent's action enum before they reach
        /// the runtime.
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            Action: Send + 'static,
            B: Send + 'static,
            F: Fn(Action) -> B + Send + Sync + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Effect::Future(fut) => Effect::Future(Box::pin(async move { fut.await.map(f) })),
            }
        }
    }
}

/// Environment module - dependency injection traits
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
