//! Single-task races against a deadline.
//!
//! Both races run the work on a detached tokio task and stop *waiting* when
//! they lose. They do not stop the work itself: a computation that never
//! looks at a context keeps running to completion in the background, and
//! its late result is dropped. Work that should stop early belongs in a
//! `FanOut`, whose tasks are stopped on cancellation.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use super::slot::result_slot;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::flog_debug;

/// How long the demonstration computation takes.
pub const COMPUTATION_TIME: Duration = Duration::from_secs(2);

/// Fixed timer used by `compute_fixed`.
pub const FIXED_TIMEOUT: Duration = Duration::from_secs(1);

/// Stand-in for an expensive computation that ignores cancellation.
pub async fn time_consuming_computation() -> i64 {
    tokio::time::sleep(COMPUTATION_TIME).await;
    10
}

/// Run `work` until `ctx` is done.
///
/// Returns the work's value if it finishes first, otherwise the context's
/// expiration error (`DeadlineExceeded` or `Cancelled`). On expiry the work
/// is left running in the background.
pub async fn compute_until_done<F>(ctx: &Context, work: F) -> Result<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let (tx, mut slot) = result_slot();
    tokio::spawn(async move {
        let _ = tx.deliver(work.await);
    });

    tokio::select! {
        value = slot.recv() => value.ok_or_else(|| Error::TaskJoin("computation ended without a result".to_string())),
        _ = ctx.done() => {
            let err = ctx.err().unwrap_or(Error::Cancelled);
            flog_debug!("compute_until_done: gave up waiting: {}", err);
            Err(err)
        }
    }
}

/// Run `work` against a fixed timer, independent of any caller context.
///
/// Returns `Error::Timeout(limit)` if the timer wins. On timeout the work is
/// left running in the background.
pub async fn compute_with_timeout<F>(limit: Duration, work: F) -> Result<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let (tx, mut slot) = result_slot();
    tokio::spawn(async move {
        let _ = tx.deliver(work.await);
    });

    match timeout(limit, slot.recv()).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(Error::TaskJoin(
            "computation ended without a result".to_string(),
        )),
        Err(_) => {
            flog_debug!("compute_with_timeout: timer won after {:?}", limit);
            Err(Error::Timeout(limit))
        }
    }
}

/// The demonstration computation under the caller's context.
pub async fn compute(ctx: &Context) -> Result<i64> {
    compute_until_done(ctx, time_consuming_computation()).await
}

/// The demonstration computation against `FIXED_TIMEOUT`. Always times out,
/// since the computation takes longer than the timer.
pub async fn compute_fixed() -> Result<i64> {
    compute_with_timeout(FIXED_TIMEOUT, time_consuming_computation()).await
}
