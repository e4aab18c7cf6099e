//! # Turnstile Runtime
//!
//! The [`Store`] that runs a reducer: it owns the state, calls the reducer for
//! every action, executes the returned effects on tokio and feeds the actions
//! they produce back in.
//!
//! ```ignore
//! use turnstile_runtime::Store;
//!
//! let store = Store::new(CheckinState::default(), CheckinReducer::new(), environment);
//!
//! let mut handle = store.send(CheckinAction::LoadEvents).await?;
//! handle.wait().await;
//!
//! let count = store.state(|s| s.events.len()).await;
//! ```
//!
//! Front ends learn about API answers and timer ticks through
//! [`Store::subscribe_actions`], which carries every action an effect
//! produced once the reducer has applied it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use turnstile_core::{effect::Effect, reducer::Reducer};

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors returned by [`Store`](crate::Store) operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// `send` was called after shutdown began
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Effects were still running when the shutdown timeout expired
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// No matching action arrived in time
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Tuning knobs of a [`Store`]
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(64)
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// let store = Store::with_config(state, reducer, env, config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Actions buffered per subscriber before a slow one starts lagging
    pub broadcast_capacity: usize,
    /// Timeout used by [`Store::shutdown_default`]
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Effect tracking
// ============================================================================

/// Completion of the effects started by one `send`
///
/// Only the effects the reducer returned for that action are counted. An
/// action an effect feeds back is reduced before the effect counts as done,
/// but the effects of that second action get their own handle.
///
/// ```ignore
/// let mut handle = store.send(CheckinAction::SelectEvent { event_id }).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // The stats answer has been reduced
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    running: Arc<AtomicUsize>,
    settled: watch::Receiver<()>,
}

impl EffectHandle {
    fn pair() -> (Self, Tracker) {
        let running = Arc::new(AtomicUsize::new(0));
        let (settled_tx, settled) = watch::channel(());
        let handle = Self {
            running: Arc::clone(&running),
            settled,
        };
        (
            handle,
            Tracker {
                running,
                settled: settled_tx,
            },
        )
    }

    /// A handle with nothing to wait for
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracker) = Self::pair();
        handle
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait until every tracked effect has finished
    pub async fn wait(&mut self) {
        while self.pending() > 0 {
            if self.settled.changed().await.is_err() {
                // No tracker left, so nothing can still be running
                break;
            }
        }
    }

    /// [`EffectHandle::wait`] bounded by `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when
    /// `timeout` expires.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Write side of an [`EffectHandle`]
#[derive(Clone)]
struct Tracker {
    running: Arc<AtomicUsize>,
    settled: watch::Sender<()>,
}

/// One running effect task, counted by its handle and by the store
///
/// Dropping it (normally or on panic) releases both counts.
struct Running {
    tracker: Tracker,
    store_pending: Arc<AtomicUsize>,
}

impl Running {
    fn begin(tracker: &Tracker, store_pending: &Arc<AtomicUsize>) -> Self {
        tracker.running.fetch_add(1, Ordering::SeqCst);
        store_pending.fetch_add(1, Ordering::SeqCst);
        Self {
            tracker: tracker.clone(),
            store_pending: Arc::clone(store_pending),
        }
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.store_pending.fetch_sub(1, Ordering::SeqCst);
        if self.tracker.running.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.tracker.settled.send(());
        }
    }
}

// ============================================================================
// Store
// ============================================================================

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicUsize, Duration, Effect, EffectHandle, Ordering, Reducer, RwLock,
        Running, StoreConfig, StoreError, Tracker,
    };
    use futures::StreamExt;
    use tokio::sync::broadcast;

    /// Runs a reducer over shared state
    ///
    /// Cloning is cheap and every clone drives the same state. Reducer calls
    /// are serialized by a write lock; effects run as spawned tokio tasks.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        default_shutdown_timeout: Duration,
        actions: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Store with the default [`StoreConfig`]
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Store with an explicit configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (actions, _) = broadcast::channel(config.broadcast_capacity.max(1));
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                default_shutdown_timeout: config.default_shutdown_timeout,
                actions,
            }
        }

        /// Effects running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Stop accepting actions and wait for running effects
        ///
        /// Effects that never end on their own, such as an open camera feed,
        /// have to be ended by the reducer before this is called.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still
        /// running when `timeout` expires.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Store shutting down");
            metrics::counter!("store.shutdown.initiated").increment(1);
            self.shutdown.store(true, Ordering::Release);

            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let pending = self.pending_effects();
                if pending == 0 {
                    tracing::info!("Store drained");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }
                if tokio::time::Instant::now() >= deadline {
                    tracing::error!(pending, "Shutdown timed out");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(pending, "Waiting for effects");
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }

        /// [`Store::shutdown`] with the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.default_shutdown_timeout).await
        }

        /// Reduce `action` and start its effects
        ///
        /// Returns once the effects are spawned, not when they finish; use
        /// the returned [`EffectHandle`] to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] once shutdown began.
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            self.dispatch(action, false).await
        }

        /// Reduce `action`, broadcasting it when `announce` is set
        ///
        /// The broadcast happens under the state lock, right after the
        /// reducer ran, so a subscriber reading state on receipt sees the
        /// action's changes and actions arrive in reduction order.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        async fn dispatch(&self, action: A, announce: bool) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::debug!("Action rejected during shutdown");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }
            metrics::counter!("store.commands.total").increment(1);

            let effects = {
                let mut state = self.state.write().await;
                let announced = announce.then(|| action.clone());
                let started = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                if let Some(action) = announced {
                    let _ = self.actions.send(action);
                }
                effects
            };

            // Effect counts are tiny
            #[allow(clippy::cast_precision_loss)]
            metrics::histogram!("store.effects.count").record(effects.len() as f64);
            tracing::trace!(effects = effects.len(), "Action reduced");

            let (handle, tracker) = EffectHandle::pair();
            for effect in effects {
                self.run(effect, &tracker);
            }
            Ok(handle)
        }

        /// Send `action`, then wait for the first effect-produced action
        /// matching `predicate`
        ///
        /// The subscription is taken before sending, so an immediate answer
        /// is not missed.
        ///
        /// # Errors
        ///
        /// - [`StoreError::ShutdownInProgress`] once shutdown began
        /// - [`StoreError::Timeout`] if nothing matched within `timeout`
        /// - [`StoreError::ChannelClosed`] if the broadcast closed
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            let mut rx = self.actions.subscribe();
            self.send(action).await?;

            let matching = async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Waiter lagged behind the action broadcast");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            };
            tokio::time::timeout(timeout, matching)
                .await
                .map_err(|_| StoreError::Timeout)?
        }

        /// Actions produced by effects, in the order they were reduced
        ///
        /// An action is broadcast once its state change is visible. Actions
        /// passed to [`Store::send`] directly are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.actions.subscribe()
        }

        /// Read the state through `f`
        ///
        /// ```ignore
        /// let history_len = store.state(|s| s.history.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            f(&*self.state.read().await)
        }

        /// Reduce an effect-produced action and broadcast it
        async fn feed_back(&self, action: A)
        where
            R: Clone,
            E: Clone,
        {
            if let Err(error) = self.dispatch(action, true).await {
                tracing::debug!(error = %error, "Dropped effect-produced action");
            }
        }

        fn spawn<F>(&self, tracker: &Tracker, task: F)
        where
            F: std::future::Future<Output = ()> + Send + 'static,
        {
            let running = Running::begin(tracker, &self.pending_effects);
            tokio::spawn(async move {
                let _running = running;
                task.await;
            });
        }

        /// Start one effect, counted by `tracker`
        ///
        /// Futures and delays feed back at most one action, streams every
        /// item in order. `Parallel` starts its children side by side under
        /// the same tracker; `Sequential` waits for each child before
        /// starting the next.
        fn run(&self, effect: Effect<A>, tracker: &Tracker)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {},
                Effect::Future(future) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    let store = self.clone();
                    self.spawn(tracker, async move {
                        if let Some(action) = future.await {
                            store.feed_back(action).await;
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    let store = self.clone();
                    self.spawn(tracker, async move {
                        tokio::time::sleep(duration).await;
                        store.feed_back(*action).await;
                    });
                },
                Effect::Stream(mut stream) => {
                    metrics::counter!("store.effects.executed", "type" => "stream").increment(1);
                    let store = self.clone();
                    self.spawn(tracker, async move {
                        let mut forwarded = 0_u64;
                        while let Some(action) = stream.next().await {
                            forwarded += 1;
                            store.feed_back(action).await;
                        }
                        tracing::trace!(forwarded, "Stream effect ended");
                    });
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.run(effect, tracker);
                    }
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential")
                        .increment(1);
                    let store = self.clone();
                    self.spawn(tracker, async move {
                        for effect in effects {
                            let (mut step, step_tracker) = EffectHandle::pair();
                            store.run(effect, &step_tracker);
                            drop(step_tracker);
                            step.wait().await;
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                default_shutdown_timeout: self.default_shutdown_timeout,
                actions: self.actions.clone(),
            }
        }
    }
}

pub use store::Store;
