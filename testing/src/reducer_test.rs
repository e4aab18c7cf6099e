//! Given-When-Then harness for reducers.
//!
//! Reducers are pure, so they are tested by calling them directly: no
//! store, no runtime, and effects are inspected as values.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use turnstile_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Several actions may be queued with repeated `when_action` calls. They are
/// reduced in order against the same state, and effect assertions see the
/// effects of the last one only.
///
/// # Example
///
/// ```ignore
/// use turnstile_testing::ReducerTest;
///
/// ReducerTest::new(CheckinReducer::new())
///     .with_env(test_environment())
///     .given_state(CheckinState::default())
///     .when_action(CheckinAction::SelectEvent { event_id: "evt-1".into() })
///     .then_state(|state| {
///         assert_eq!(state.selected_event.as_deref(), Some("evt-1"));
///     })
///     .then_effects(|effects| {
///         assert_eq!(effects.len(), 1);
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Queue an action to reduce (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Reduce every queued action, then run the assertions
    ///
    /// # Panics
    ///
    /// Panics when state, environment or actions are missing, and when an
    /// assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use std::time::Duration;
    use turnstile_core::effect::Effect;

    /// Flatten `Parallel` and `Sequential` effects and drop `None`s
    ///
    /// Order is preserved, so a reducer that returns
    /// `[Parallel([Future, Delay]), None]` flattens to `[Future, Delay]`.
    #[must_use]
    pub fn flatten<A>(effects: &[Effect<A>]) -> Vec<&Effect<A>> {
        let mut out = Vec::new();
        for effect in effects {
            match effect {
                Effect::None => {},
                Effect::Parallel(inner) | Effect::Sequential(inner) => {
                    out.extend(flatten(inner));
                },
                other => out.push(other),
            }
        }
        out
    }

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect other than `Effect::None` is present.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            flatten(effects).is_empty(),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            flatten(effects)
                .iter()
                .any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects contain at least one Stream effect
    ///
    /// # Panics
    ///
    /// Panics if no Stream effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_stream_effect<A>(effects: &[Effect<A>]) {
        assert!(
            flatten(effects)
                .iter()
                .any(|e| matches!(e, Effect::Stream(_))),
            "Expected at least one Stream effect, but none found"
        );
    }

    /// Find the first delayed action scheduled for exactly `duration`
    #[must_use]
    pub fn find_delay<A>(effects: &[Effect<A>], duration: Duration) -> Option<&A> {
        flatten(effects).into_iter().find_map(|e| match e {
            Effect::Delay {
                duration: d,
                action,
            } if *d == duration => Some(action.as_ref()),
            _ => None,
        })
    }

    /// Assert that a delayed action is scheduled for `duration`, and return it
    ///
    /// # Panics
    ///
    /// Panics if no matching Delay effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay_effect<A: std::fmt::Debug>(
        effects: &[Effect<A>],
        duration: Duration,
    ) -> &A {
        match find_delay(effects, duration) {
            Some(action) => action,
            None => panic!("Expected a Delay effect of {duration:?}, found {effects:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use turnstile_core::effect::Effect;
    use turnstile_core::reducer::Reducer;
    use turnstile_core::{SmallVec, smallvec};

    #[derive(Clone, Debug)]
    struct DoorState {
        inside: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum DoorAction {
        Enter,
        Leave,
        EnterSoon,
    }

    struct DoorReducer;

    struct DoorEnv;

    impl Reducer for DoorReducer {
        type State = DoorState;
        type Action = DoorAction;
        type Environment = DoorEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                DoorAction::Enter => {
                    state.inside += 1;
                    smallvec![Effect::None]
                },
                DoorAction::Leave => {
                    state.inside -= 1;
                    smallvec![Effect::None]
                },
                DoorAction::EnterSoon => smallvec![Effect::merge(vec![
                    Effect::None,
                    Effect::delay(Duration::from_millis(250), DoorAction::Enter),
                ])],
            }
        }
    }

    #[test]
    fn test_single_action() {
        ReducerTest::new(DoorReducer)
            .with_env(DoorEnv)
            .given_state(DoorState { inside: 0 })
            .when_action(DoorAction::Enter)
            .then_state(|state| {
                assert_eq!(state.inside, 1);
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_actions_reduce_in_order() {
        ReducerTest::new(DoorReducer)
            .with_env(DoorEnv)
            .given_state(DoorState { inside: 5 })
            .when_action(DoorAction::Leave)
            .when_action(DoorAction::Leave)
            .when_action(DoorAction::Enter)
            .then_state(|state| {
                assert_eq!(state.inside, 4);
            })
            .run();
    }

    #[test]
    fn test_delay_lookup_sees_through_parallel() {
        ReducerTest::new(DoorReducer)
            .with_env(DoorEnv)
            .given_state(DoorState { inside: 0 })
            .when_action(DoorAction::EnterSoon)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                let action =
                    assertions::assert_has_delay_effect(effects, Duration::from_millis(250));
                assert_eq!(action, &DoorAction::Enter);
                assert!(assertions::find_delay(effects, Duration::from_millis(1)).is_none());
            })
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<DoorAction>(&[Effect::None]);
        assertions::assert_no_effects::<DoorAction>(&[]);
        assertions::assert_no_effects::<DoorAction>(&[Effect::merge(vec![Effect::None])]);
    }

    #[test]
    fn test_future_and_stream_assertions() {
        let effects = [
            Effect::future(async { Some(DoorAction::Enter) }),
            Effect::Stream(Box::pin(futures::stream::empty())),
        ];
        assertions::assert_has_future_effect(&effects);
        assertions::assert_has_stream_effect(&effects);
    }
}
