//! Hierarchical cancellation context.
//!
//! A `Context` is done once its deadline elapses, once a cause is recorded
//! through its `Canceller`, or once its parent is done. The first cause
//! wins and is retained for the lifetime of the context. Readers never take
//! a lock: the cause is a `OnceLock` and the done signal is a
//! `CancellationToken`, so every waiter is woken at once.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::Error;

/// Shared cancellation signal carrying an optional deadline and a
/// write-once cause. Cheap to clone; clones observe the same state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    token: CancellationToken,
    /// Effective deadline: the earlier of our own and the parent's.
    deadline: Option<Instant>,
    cause: OnceLock<Error>,
    parent: Option<Context>,
}

/// Records the cause that makes a context done.
#[derive(Clone)]
pub struct Canceller {
    ctx: Context,
}

impl Context {
    /// Root context. Never done on its own.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                deadline: None,
                cause: OnceLock::new(),
                parent: None,
            }),
        }
    }

    fn derive(parent: &Context, deadline: Option<Instant>) -> Self {
        let deadline = match (parent.deadline(), deadline) {
            (Some(inherited), Some(own)) => Some(inherited.min(own)),
            (inherited, own) => inherited.or(own),
        };
        Self {
            inner: Arc::new(Inner {
                token: parent.inner.token.child_token(),
                deadline,
                cause: OnceLock::new(),
                parent: Some(parent.clone()),
            }),
        }
    }

    /// Child context that expires at `deadline` (or earlier, if the parent
    /// expires first).
    pub fn with_deadline(parent: &Context, deadline: Instant) -> Self {
        Self::derive(parent, Some(deadline))
    }

    /// Child context that expires `timeout` from now.
    pub fn with_timeout(parent: &Context, timeout: Duration) -> Self {
        Self::with_deadline(parent, Instant::now() + timeout)
    }

    /// Child context plus the handle that cancels it.
    pub fn with_cancel(parent: &Context) -> (Self, Canceller) {
        let ctx = Self::derive(parent, None);
        let canceller = Canceller { ctx: ctx.clone() };
        (ctx, canceller)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Non-blocking check. Observing an elapsed deadline here records
    /// `DeadlineExceeded` just as `done()` would.
    pub fn is_done(&self) -> bool {
        if self.inner.token.is_cancelled() {
            return true;
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.fire(Error::DeadlineExceeded);
                true
            }
            _ => false,
        }
    }

    /// Resolves once the context is done. Any number of tasks may wait
    /// concurrently; once done, every later call resolves immediately.
    pub async fn done(&self) {
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.inner.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {
                        self.fire(Error::DeadlineExceeded);
                    }
                }
            }
            None => self.inner.token.cancelled().await,
        }
    }

    /// The retained cause, or `None` while the context is still live.
    pub fn cause(&self) -> Option<Error> {
        if !self.is_done() {
            return None;
        }
        if let Some(cause) = self.inner.cause.get() {
            return Some(cause.clone());
        }
        // Done through the parent: adopt its cause once, then keep it.
        let inherited = self
            .inner
            .parent
            .as_ref()
            .and_then(Context::cause)
            .unwrap_or(Error::Cancelled);
        Some(self.inner.cause.get_or_init(|| inherited).clone())
    }

    /// Expiration kind only: `DeadlineExceeded` or `Cancelled`.
    pub fn err(&self) -> Option<Error> {
        self.cause().map(|cause| {
            if cause.is_deadline() {
                Error::DeadlineExceeded
            } else {
                Error::Cancelled
            }
        })
    }

    /// Record `cause` and trip the token. Returns false when the context
    /// was already done or another writer got there first.
    fn fire(&self, cause: Error) -> bool {
        if self.inner.token.is_cancelled() {
            return false;
        }
        let won = self.inner.cause.set(cause).is_ok();
        // The cause is stored before waiters can wake.
        self.inner.token.cancel();
        won
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("done", &self.inner.token.is_cancelled())
            .field("cause", &self.inner.cause.get())
            .finish()
    }
}

impl Canceller {
    /// Cancel with `cause`. Idempotent: only the first cause is kept, and
    /// cancelling a context that is already done does nothing. Returns
    /// whether this call's cause was retained.
    pub fn cancel(&self, cause: Error) -> bool {
        // A passed deadline counts as done even if nobody has polled yet.
        if self.ctx.is_done() {
            return false;
        }
        self.ctx.fire(cause)
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceller").field("ctx", &self.ctx).finish()
    }
}
