//! Gated operations.
//!
//! [`Barrier::wrap`](crate::Barrier::wrap) hands back a [`Gate`] in place of
//! the caller's operation. The gate resolves to exactly what the operation
//! produced, but never while an animation is still tracked by the barrier.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::error::GateError;
use crate::id::RequestId;

/// Cancellation entry point supplied alongside an operation.
pub type Canceller = Box<dyn FnOnce() + Send + 'static>;

/// An in-flight asynchronous operation, optionally with its own canceller.
///
/// Without a canceller, cancelling the gate drops the operation future,
/// which is how cancellation propagates for ordinary Rust futures. With one,
/// cancelling the gate calls it and lets the operation settle through its
/// own path (typically as an error).
pub struct Operation<T, E> {
    pub(crate) future: BoxFuture<'static, Result<T, E>>,
    pub(crate) canceller: Option<Canceller>,
}

impl<T, E> Operation<T, E> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            future: future.boxed(),
            canceller: None,
        }
    }

    /// Attach the operation's own cancel/abort entry point.
    pub fn with_canceller<C>(mut self, canceller: C) -> Self
    where
        C: FnOnce() + Send + 'static,
    {
        self.canceller = Some(Box::new(canceller));
        self
    }

    pub fn has_canceller(&self) -> bool {
        self.canceller.is_some()
    }
}

impl<T, E> fmt::Debug for Operation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("has_canceller", &self.canceller.is_some())
            .finish_non_exhaustive()
    }
}

enum CancelMode {
    /// Drop the task driving the operation.
    Abort(AbortHandle),
    /// Call the operation's canceller, once.
    Hook(Mutex<Option<Canceller>>),
}

/// Cloneable handle that cancels a gate's underlying operation.
#[derive(Clone)]
pub struct CancelHandle {
    mode: Arc<CancelMode>,
}

impl CancelHandle {
    pub(crate) fn new(abort: AbortHandle, canceller: Option<Canceller>) -> Self {
        let mode = match canceller {
            Some(hook) => CancelMode::Hook(Mutex::new(Some(hook))),
            None => CancelMode::Abort(abort),
        };
        Self { mode: Arc::new(mode) }
    }

    /// Forward cancellation to the underlying operation.
    ///
    /// Without a canceller this has no effect once the operation has settled;
    /// the gate still resolves with the recorded outcome. A canceller is
    /// called on the first cancel whatever the operation's state, including
    /// when its settled outcome is only waiting on the barrier.
    pub fn cancel(&self) {
        match &*self.mode {
            CancelMode::Abort(abort) => abort.abort(),
            CancelMode::Hook(hook) => {
                let hook = hook.lock().unwrap_or_else(PoisonError::into_inner).take();
                if let Some(hook) = hook {
                    hook();
                }
            }
        }
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match &*self.mode {
            CancelMode::Abort(_) => "abort",
            CancelMode::Hook(_) => "hook",
        };
        f.debug_struct("CancelHandle").field("mode", &mode).finish()
    }
}

/// Derived future returned in place of a wrapped operation.
///
/// Resolves to `Ok(value)` or `Err(GateError::Operation(err))` carrying the
/// operation's own payload, or `Err(GateError::Cancelled)` if the operation
/// was dropped by [`Gate::cancel`] before settling.
pub struct Gate<T, E> {
    id: RequestId,
    rx: oneshot::Receiver<Result<T, E>>,
    cancel: CancelHandle,
}

impl<T, E> Gate<T, E> {
    pub(crate) fn new(id: RequestId, rx: oneshot::Receiver<Result<T, E>>, cancel: CancelHandle) -> Self {
        Self { id, rx, cancel }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Cancel the underlying operation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that can cancel the operation after the gate is moved into
    /// an `.await`.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl<T, E> Future for Gate<T, E> {
    type Output = Result<T, GateError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = match ready!(Pin::new(&mut self.rx).poll(cx)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(GateError::Operation(err)),
            Err(_) => Err(GateError::Cancelled),
        };
        Poll::Ready(outcome)
    }
}

impl<T, E> fmt::Debug for Gate<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("id", &self.id)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}
