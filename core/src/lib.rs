//! # Turnstile Core
//!
//! Core traits and types for the Turnstile check-in client.
//!
//! Every interactive workflow in Turnstile (the door check-in session being
//! the main one) is written as a reducer over explicit state, with side
//! effects returned as descriptions and executed by the runtime crate.
//!
//! ## Core Concepts
//!
//! - **State**: Owned, cloneable state of one workflow
//! - **Action**: Every input to a reducer (user intents, timer ticks, API results)
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies (clock, API client, camera, notifier)
//!
//! ## Example
//!
//! ```ignore
//! use turnstile_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for DoorReducer {
//!     type State = DoorState;
//!     type Action = DoorAction;
//!     type Environment = DoorEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut DoorState,
//!         action: DoorAction,
//!         env: &DoorEnvironment,
//!     ) -> SmallVec<[Effect<DoorAction>; 4]> {
//!         match action {
//!             DoorAction::Open => {
//!                 state.open = true;
//!                 smallvec![Effect::Delay {
//!                     duration: std::time::Duration::from_secs(3),
//!                     action: Box::new(DoorAction::Close),
//!                 }]
//!             }
//!             DoorAction::Close => {
//!                 state.open = false;
//!                 smallvec![Effect::None]
//!             }
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Reducers: where a workflow makes its decisions.
///
/// A reducer sees one action at a time, mutates state in place and answers
/// with effect descriptions. No I/O happens inside it, so the same inputs
/// always give the same state.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Decision logic of one workflow.
    pub trait Reducer {
        /// Workflow state
        type State;

        /// Inputs the workflow reacts to
        type Action;

        /// Clock, API client and other seams
        type Environment;

        /// Apply `action` to `state` and describe the follow-up work.
        ///
        /// Actions that make no sense in the current state are ignored by
        /// returning no effects.
        ///
        /// Most actions produce at most a handful of effects, so the return
        /// type keeps up to four inline without allocating.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effects: descriptions of work a reducer wants done.
///
/// Nothing here runs by itself. The runtime `Store` executes them and
/// feeds any produced actions back into the reducer.
pub mod effect {
    use futures::Stream;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Work requested by a reducer, possibly producing more `Action`s.
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// All at once
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially, each one finishing before the next starts
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (timers: re-arming, auto-dismiss)
        Delay {
            /// Wait before dispatching
            duration: Duration,
            /// Dispatched when the wait is over
            action: Box<Action>,
        },

        /// One async computation; a `Some` result goes back to the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Long-running producer of actions
        ///
        /// Every item is fed back into the reducer in order. The effect is
        /// complete when the stream ends.
        Stream(Pin<Box<dyn Stream<Item = Action> + Send>>),
    }

    // Futures and streams print as placeholders
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Stream(_) => write!(f, "Effect::Stream(<stream>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Run `effects` concurrently
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Run `effects` one after the other
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap an async computation that may produce a follow-up action
        #[must_use]
        pub fn future<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
            Action: 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Wrap an async side effect whose outcome the reducer doesn't need
        #[must_use]
        pub fn fire_and_forget<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = ()> + Send + 'static,
            Action: 'static,
        {
            Effect::Future(Box::pin(async move {
                fut.await;
                None
            }))
        }

        /// Schedule `action` after `duration`
        #[must_use]
        pub fn delay(duration: Duration, action: Action) -> Effect<Action> {
            Effect::Delay {
                duration,
                action: Box::new(action),
            }
        }

        /// `true` for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Shared environment seams.
///
/// Reducers reach the outside world only through their `Environment`. Only time is shared across every workflow, so
/// it lives here; domain seams (API, camera, notifier) live in their crates.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of "now" for timestamps and debounce windows.
    ///
    /// Production uses [`SystemClock`]; tests use the fixed and manual clocks
    /// from the testing crate.
    pub trait Clock: Send + Sync {
        /// Current time in UTC
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use super::environment::{Clock, SystemClock};
    use std::time::Duration;

    #[test]
    fn test_effect_debug_hides_futures() {
        let effect: Effect<u8> = Effect::future(async { Some(1) });
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");

        let effect: Effect<u8> = Effect::delay(Duration::from_millis(5), 7);
        let rendered = format!("{effect:?}");
        assert!(rendered.contains("Effect::Delay"));
        assert!(rendered.contains('7'));
    }

    #[test]
    fn test_merge_and_chain() {
        let merged = Effect::<u8>::merge(vec![Effect::None, Effect::None]);
        assert!(matches!(merged, Effect::Parallel(ref v) if v.len() == 2));

        let chained = Effect::<u8>::chain(vec![Effect::None]);
        assert!(matches!(chained, Effect::Sequential(ref v) if v.len() == 1));
        assert!(Effect::<u8>::None.is_none());
    }

    #[tokio::test]
    async fn test_fire_and_forget_produces_no_action() {
        let effect: Effect<u8> = Effect::fire_and_forget(async {});
        match effect {
            Effect::Future(fut) => assert_eq!(fut.await, None),
            other => unreachable!("unexpected effect: {other:?}"),
        }
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
