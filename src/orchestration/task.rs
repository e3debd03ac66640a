//! The unit of work launched by the orchestrator.

use std::future::Future;

use crate::context::Context;
use crate::error::Result;

/// A unit of asynchronous work producing one typed value or one error.
///
/// The orchestrator hands every task the shared context. Tasks that make
/// external calls should pass it along so the call can be abandoned once
/// the context is done.
///
/// Any `FnOnce(Context) -> impl Future<Output = Result<T>>` closure is a
/// task:
///
/// ```ignore
/// let task = |ctx: Context| async move {
///     let status = fetcher.fetch(&ctx, url).await?;
///     check_status(url, status)?;
///     Ok(Product { id: 1, name: "Product1".to_string() })
/// };
/// ```
pub trait Task: Send + 'static {
    type Output: Send + 'static;

    fn execute(self, ctx: Context) -> impl Future<Output = Result<Self::Output>> + Send;
}

impl<F, Fut, T> Task for F
where
    F: FnOnce(Context) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn execute(self, ctx: Context) -> impl Future<Output = Result<T>> + Send {
        self(ctx)
    }
}
