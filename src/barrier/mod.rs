//! The quiescence barrier.
//!
//! A [`Barrier`] tracks in-flight animations and holds back the results of
//! wrapped asynchronous operations until no animation is tracked. Both halves
//! share one guarded state machine:
//!
//! - **Animation registry**: animations join the active epoch when registered
//!   and leave it when their signal settles or their fail-safe expiry fires.
//!   The epoch's [`BarrierSignal`] settles when the last one leaves.
//! - **Request gate**: each wrapped operation becomes a [`Gate`]. Once the
//!   operation settles, the gate is released at once if the barrier is
//!   quiescent, otherwise on the next drain.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use quiesce::{AnimationLabel, Barrier, BarrierConfig};
//!
//! let barrier = Barrier::new(BarrierConfig::default())?;
//! barrier.register(slide_out, Some(Duration::from_millis(300)), AnimationLabel::from("#flyout"));
//!
//! // Resolves with the response, but not before the flyout finishes.
//! let page = barrier.wrap(fetch_page()).await?;
//! ```

mod animation;
mod config;
mod signal;
mod stats;

pub use animation::AnimationLabel;
pub use config::{BarrierConfig, DEFAULT_DEFAULT_TIMEOUT_MS, DEFAULT_MIN_TIMEOUT_MS};
pub use signal::BarrierSignal;
pub use stats::BarrierStats;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{BarrierError, Result};
use crate::gate::{CancelHandle, Gate, Operation};
use crate::id::{AnimationId, EpochId, IdSequence, RequestId};
use signal::SignalOwner;

/// Deadline offset used when an expiry does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Deferred release of a settled gate.
type Release = Box<dyn FnOnce() + Send + 'static>;

/// How a tracked animation left the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Finish {
    Settled,
    Expired,
}

/// One lifetime of the "all animations done" signal.
struct Epoch {
    id: EpochId,
    clear: SignalOwner,
    animations: HashMap<AnimationId, AnimationLabel>,
}

/// A wrapped operation whose gate has not been released yet.
struct PendingRequest {
    /// Set once the operation settled while animations were tracked.
    release: Option<Release>,
}

#[derive(Default)]
struct State {
    ids: IdSequence,
    epoch: Option<Epoch>,
    pending: HashMap<RequestId, PendingRequest>,
    stats: BarrierStats,
}

impl State {
    /// Take every pending request whose operation already settled.
    fn take_releasable(&mut self) -> Vec<Release> {
        let ready: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|(_, req)| req.release.is_some())
            .map(|(id, _)| *id)
            .collect();

        ready
            .into_iter()
            .filter_map(|id| self.pending.remove(&id).and_then(|req| req.release))
            .collect()
    }
}

struct Shared {
    config: BarrierConfig,
    runtime: Handle,
    state: Mutex<State>,
}

/// Quiescence barrier shared between animation producers and I/O callers.
///
/// Cloning is cheap; clones observe and mutate the same barrier.
#[derive(Clone)]
pub struct Barrier {
    shared: Arc<Shared>,
}

impl Barrier {
    /// Create a barrier driven by the current tokio runtime.
    pub fn new(config: BarrierConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| BarrierError::NoRuntime(e.to_string()))?;
        config.validate()?;
        Ok(Self::with_handle(config, runtime))
    }

    /// Create a barrier whose watchers and gates run on `runtime`.
    pub fn with_handle(config: BarrierConfig, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                runtime,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn config(&self) -> &BarrierConfig {
        &self.shared.config
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track an in-flight animation.
    ///
    /// `signal` completing (with any output) marks the animation done. If it
    /// has not completed within the fail-safe expiry derived from `duration`
    /// it is dropped from the barrier anyway.
    ///
    /// Returns the active epoch's signal, or an already-settled one if
    /// `signal` had already completed and nothing was tracked.
    pub fn register<F>(&self, signal: F, duration: Option<Duration>, label: impl Into<AnimationLabel>) -> BarrierSignal
    where
        F: Future + Send + 'static,
    {
        let label = label.into();
        let mut signal = Box::pin(signal);
        if signal.as_mut().now_or_never().is_some() {
            self.state().stats.animations_skipped += 1;
            tracing::trace!(label = %label, "Animation already settled, not tracking");
            return BarrierSignal::settled();
        }

        let expiry = self.shared.config.expiry_for(duration);
        let now = Instant::now();
        let deadline = now.checked_add(expiry).unwrap_or_else(|| now + FAR_FUTURE);

        let (id, barrier_signal) = {
            let mut state = self.state();
            let State { ids, epoch, stats, .. } = &mut *state;
            let epoch = epoch.get_or_insert_with(|| {
                let epoch_id = ids.next_epoch();
                stats.epochs_started += 1;
                tracing::debug!(epoch_id = %epoch_id, "Barrier epoch started");
                Epoch {
                    id: epoch_id,
                    clear: SignalOwner::new(),
                    animations: HashMap::new(),
                }
            });
            let id = ids.next_animation();
            stats.animations_registered += 1;
            epoch.animations.insert(id, label.clone());
            tracing::debug!(
                animation_id = %id,
                epoch_id = %epoch.id,
                label = %label,
                expiry_ms = expiry.as_millis() as u64,
                "Animation registered"
            );
            (id, epoch.clear.subscribe())
        };

        self.shared
            .runtime
            .spawn(animation::watch_animation(self.clone(), id, label, signal, deadline, expiry));

        barrier_signal
    }

    /// Signal for the active epoch, or an already-settled one when quiescent.
    pub fn barrier_signal(&self) -> BarrierSignal {
        match &self.state().epoch {
            Some(epoch) => epoch.clear.subscribe(),
            None => BarrierSignal::settled(),
        }
    }

    /// Gate an in-flight operation behind the barrier.
    pub fn wrap<T, E, F>(&self, operation: F) -> Gate<T, E>
    where
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.wrap_operation(Operation::new(operation))
    }

    /// Gate an operation that carries its own canceller.
    pub fn wrap_operation<T, E>(&self, operation: Operation<T, E>) -> Gate<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut state = self.state();
            let id = state.ids.next_request();
            state.pending.insert(id, PendingRequest { release: None });
            state.stats.requests_wrapped += 1;
            id
        };

        let Operation { future, canceller } = operation;
        let guard = PendingGuard {
            barrier: self.clone(),
            id,
            armed: true,
        };
        let task = self.shared.runtime.spawn(async move {
            let outcome = future.await;
            guard.settle(move || {
                let _ = tx.send(outcome);
            });
        });

        Gate::new(id, rx, CancelHandle::new(task.abort_handle(), canceller))
    }

    /// Record a settled operation; release its gate now if quiescent.
    fn settle_request(&self, id: RequestId, release: Release) {
        let release = {
            let mut state = self.state();
            if state.epoch.is_some() {
                match state.pending.get_mut(&id) {
                    Some(req) => {
                        req.release = Some(release);
                        tracing::debug!(request_id = %id, "Request settled, held by barrier");
                        return;
                    }
                    None => release,
                }
            } else {
                state.pending.remove(&id);
                state.stats.requests_released_immediately += 1;
                release
            }
        };
        tracing::debug!(request_id = %id, "Request released");
        release();
    }

    /// Drop a request whose operation was cancelled before settling.
    fn forget_request(&self, id: RequestId) {
        let mut state = self.state();
        if state.pending.remove(&id).is_some() {
            state.stats.requests_cancelled += 1;
            tracing::debug!(request_id = %id, "Request cancelled");
        }
    }

    /// Remove a tracked animation, draining if it was the last one.
    ///
    /// Only the first call for a given animation has any effect.
    pub(crate) fn finish_animation(&self, id: AnimationId, how: Finish) {
        let (epoch, releases) = {
            let mut state = self.state();
            let Some(epoch) = state.epoch.as_mut() else {
                return;
            };
            if epoch.animations.remove(&id).is_none() {
                return;
            }
            let now_empty = epoch.animations.is_empty();
            match how {
                Finish::Settled => state.stats.animations_settled += 1,
                Finish::Expired => state.stats.animations_expired += 1,
            }
            if !now_empty {
                return;
            }

            // Clear the active epoch before releasing anything, so a
            // registration racing the drain opens a fresh epoch.
            let Some(epoch) = state.epoch.take() else {
                return;
            };
            let releases = state.take_releasable();
            state.stats.epochs_drained += 1;
            state.stats.requests_released_by_drain += releases.len() as u64;
            (epoch, releases)
        };

        tracing::debug!(epoch_id = %epoch.id, released = releases.len(), "Barrier epoch drained");
        for release in releases {
            release();
        }
        epoch.clear.settle();
    }

    /// Whether no animation is currently tracked.
    pub fn is_quiescent(&self) -> bool {
        self.state().epoch.is_none()
    }

    /// Number of animations currently tracked.
    pub fn tracked_animations(&self) -> usize {
        self.state().epoch.as_ref().map(|e| e.animations.len()).unwrap_or(0)
    }

    /// Number of gates not yet released.
    pub fn pending_requests(&self) -> usize {
        self.state().pending.len()
    }

    /// The active epoch, if any.
    pub fn current_epoch(&self) -> Option<EpochId> {
        self.state().epoch.as_ref().map(|e| e.id)
    }

    pub fn stats(&self) -> BarrierStats {
        self.state().stats
    }
}

impl std::fmt::Debug for Barrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Barrier")
            .field("config", &self.shared.config)
            .field("epoch", &state.epoch.as_ref().map(|e| e.id))
            .field("tracked_animations", &state.epoch.as_ref().map(|e| e.animations.len()).unwrap_or(0))
            .field("pending_requests", &state.pending.len())
            .finish()
    }
}

/// Removes a pending request if its driving task is dropped before the
/// operation settles.
struct PendingGuard {
    barrier: Barrier,
    id: RequestId,
    armed: bool,
}

impl PendingGuard {
    fn settle<R>(mut self, release: R)
    where
        R: FnOnce() + Send + 'static,
    {
        self.armed = false;
        self.barrier.settle_request(self.id, Box::new(release));
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.armed {
            self.barrier.forget_request(self.id);
        }
    }
}
