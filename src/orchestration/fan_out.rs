//! Fan-out/fan-in orchestration under one shared cancellation context.
//!
//! `FanOut` launches tasks concurrently and then waits for exactly one
//! terminal event per task: either the task's delivery into its slot, or
//! the shared context becoming done. The first failing task's error becomes
//! the shared cause, which stops every sibling and is returned to the
//! caller unchanged. Partial results are discarded on any error.

use tokio::task::JoinSet;

use super::slot::{next_settled, result_slot, Delivery, ResultSlot, SlotEvent};
use super::task::Task;
use crate::context::{Canceller, Context};
use crate::error::{Error, Result};
use crate::{flog_debug, flog_trace};

/// One fan-out/fan-in call.
///
/// Owns a cancellable child of the caller's context and every launched
/// task. Dropping it (including when `join` returns) cancels the child
/// context and aborts tasks that are still running, so nothing outlives
/// the call.
///
/// # Example
///
/// ```ignore
/// let mut fan = FanOut::new(&ctx);
/// let mut customer = fan.spawn(customer_task);
/// let mut product = fan.spawn(product_task);
/// fan.join(&mut [&mut customer, &mut product]).await?;
/// ```
pub struct FanOut {
    ctx: Context,
    canceller: Canceller,
    tasks: JoinSet<()>,
    launched: usize,
}

impl FanOut {
    pub fn new(parent: &Context) -> Self {
        let (ctx, canceller) = Context::with_cancel(parent);
        Self {
            ctx,
            canceller,
            tasks: JoinSet::new(),
            launched: 0,
        }
    }

    /// The shared context every task receives.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn launched(&self) -> usize {
        self.launched
    }

    /// Launch `task` and return the slot its value will be delivered into.
    ///
    /// On error the task cancels the shared context with its error as the
    /// cause and delivers nothing. The task is also stopped at its next
    /// suspension point once the shared context is done.
    pub fn spawn<T: Task>(&mut self, task: T) -> ResultSlot<T::Output> {
        let (tx, slot) = result_slot();
        let ctx = self.ctx.clone();
        let canceller = self.canceller.clone();
        let index = self.launched;
        self.launched += 1;

        flog_debug!("FanOut: launching task #{}", index);
        self.tasks.spawn(async move {
            tokio::select! {
                _ = ctx.done() => {
                    flog_trace!("FanOut: task #{} stopped, context done", index);
                }
                result = task.execute(ctx.clone()) => match result {
                    Ok(_) if tx.is_closed() => {
                        flog_trace!("FanOut: task #{} finished after its slot was dropped", index);
                    }
                    Ok(value) => {
                        if tx.deliver(value).is_err() {
                            flog_trace!("FanOut: task #{} delivered after join returned", index);
                        }
                    }
                    Err(cause) => {
                        flog_debug!("FanOut: task #{} failed: {}", index, cause);
                        canceller.cancel(cause);
                    }
                },
            }
        });

        slot
    }

    /// Wait for one terminal event per launched task.
    ///
    /// `slots` must be exactly the slots returned by `spawn` on this
    /// `FanOut`, in any order. On success every slot holds its value. On
    /// failure the retained cause is returned and every slot is discarded,
    /// including ones that already received a value.
    pub async fn join(self, slots: &mut [&mut dyn Delivery]) -> Result<()> {
        if slots.len() != self.launched {
            return Err(Error::Validation(format!(
                "join expects {} slots, got {}",
                self.launched,
                slots.len()
            )));
        }
        flog_debug!("FanOut: joining {} tasks", self.launched());

        let outcome = self.collect(slots).await;
        if outcome.is_err() {
            for slot in slots.iter_mut() {
                slot.discard();
            }
        }
        outcome
    }

    async fn collect(&self, slots: &mut [&mut dyn Delivery]) -> Result<()> {
        let mut settled = 0;
        while settled < slots.len() {
            tokio::select! {
                (index, event) = next_settled(slots) => match event {
                    SlotEvent::Delivered => {
                        flog_trace!("FanOut: slot #{} delivered", index);
                        settled += 1;
                    }
                    SlotEvent::Closed => {
                        // Only a panicking task drops its sender without
                        // delivering or cancelling first.
                        if !self.ctx.is_done() {
                            self.canceller.cancel(Error::TaskJoin(format!(
                                "task #{} ended without a result",
                                index
                            )));
                        }
                        return Err(self.cause());
                    }
                },
                _ = self.ctx.done() => {
                    let cause = self.cause();
                    flog_debug!(
                        "FanOut: cancelled after {}/{} deliveries: {}",
                        settled,
                        slots.len(),
                        cause
                    );
                    return Err(cause);
                }
            }
        }

        flog_debug!("FanOut: all {} tasks delivered", settled);
        Ok(())
    }

    fn cause(&self) -> Error {
        self.ctx.cause().unwrap_or(Error::Cancelled)
    }
}

impl Drop for FanOut {
    fn drop(&mut self) {
        // Releases any task still waiting on the context; JoinSet's own drop
        // then aborts whatever is left.
        self.canceller.cancel(Error::Cancelled);
    }
}

/// Run two heterogeneous tasks and return both values, or the first cause.
pub async fn join2<A, B>(parent: &Context, a: A, b: B) -> Result<(A::Output, B::Output)>
where
    A: Task,
    B: Task,
{
    let mut fan = FanOut::new(parent);
    let mut first = fan.spawn(a);
    let mut second = fan.spawn(b);
    fan.join(&mut [&mut first, &mut second]).await?;

    match (first.take(), second.take()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(missing_value()),
    }
}

/// Run N tasks of the same kind; values come back in task order.
pub async fn join_all<T, I>(parent: &Context, tasks: I) -> Result<Vec<T::Output>>
where
    T: Task,
    I: IntoIterator<Item = T>,
{
    let mut fan = FanOut::new(parent);
    let mut slots: Vec<ResultSlot<T::Output>> = tasks.into_iter().map(|t| fan.spawn(t)).collect();

    {
        let mut pending: Vec<&mut dyn Delivery> = slots
            .iter_mut()
            .map(|slot| slot as &mut dyn Delivery)
            .collect();
        fan.join(&mut pending).await?;
    }

    slots
        .iter_mut()
        .map(|slot| slot.take().ok_or_else(missing_value))
        .collect()
}

fn missing_value() -> Error {
    Error::TaskJoin("slot settled without a value".to_string())
}
