//! Single-use result slots.
//!
//! Each launched task gets its own slot: one producer, one consumer, at most
//! one value. Slots are buffered, so delivering never blocks, and a value
//! delivered after the consumer has gone is simply dropped.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskCx, Poll};

use tokio::sync::oneshot;

/// Producer half of a result slot.
#[derive(Debug)]
pub struct SlotSender<T> {
    tx: oneshot::Sender<T>,
}

/// Consumer half of a result slot.
#[derive(Debug)]
pub struct ResultSlot<T> {
    state: SlotState<T>,
}

#[derive(Debug)]
enum SlotState<T> {
    Waiting(oneshot::Receiver<T>),
    Filled(T),
    /// Producer went away without delivering.
    Closed,
    Taken,
}

/// What happened to a slot when it stopped waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEvent {
    Delivered,
    Closed,
}

/// Create a connected sender/slot pair.
pub fn result_slot<T>() -> (SlotSender<T>, ResultSlot<T>) {
    let (tx, rx) = oneshot::channel();
    (
        SlotSender { tx },
        ResultSlot {
            state: SlotState::Waiting(rx),
        },
    )
}

impl<T> SlotSender<T> {
    /// Hand the value over. Gives it back if the slot was dropped.
    pub fn deliver(self, value: T) -> std::result::Result<(), T> {
        self.tx.send(value)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> ResultSlot<T> {
    pub fn is_waiting(&self) -> bool {
        matches!(self.state, SlotState::Waiting(_))
    }

    pub fn is_filled(&self) -> bool {
        matches!(self.state, SlotState::Filled(_))
    }

    /// Move the delivered value out, leaving the slot spent.
    pub fn take(&mut self) -> Option<T> {
        match std::mem::replace(&mut self.state, SlotState::Taken) {
            SlotState::Filled(value) => Some(value),
            other @ (SlotState::Waiting(_) | SlotState::Closed) => {
                self.state = other;
                None
            }
            SlotState::Taken => None,
        }
    }

    /// Wait for the producer and take its value. `None` if the producer
    /// went away without delivering or the value was already taken.
    pub async fn recv(&mut self) -> Option<T>
    where
        T: Send,
    {
        if self.is_waiting() {
            futures::future::poll_fn(|cx| self.poll_settle(cx)).await;
        }
        self.take()
    }
}

/// Type-erased view of a slot, so that slots of different result types can
/// be awaited together.
pub trait Delivery: Send {
    /// Poll a waiting slot. Stores a delivered value inside the slot and
    /// reports the transition exactly once. Returns `Pending` forever for a
    /// slot that is no longer waiting.
    fn poll_settle(&mut self, cx: &mut TaskCx<'_>) -> Poll<SlotEvent>;

    fn is_waiting(&self) -> bool;

    /// Drop whatever the slot holds or is still waiting for. A spent slot
    /// yields nothing, and a later delivery goes nowhere.
    fn discard(&mut self);
}

impl<T: Send> Delivery for ResultSlot<T> {
    fn poll_settle(&mut self, cx: &mut TaskCx<'_>) -> Poll<SlotEvent> {
        let SlotState::Waiting(rx) = &mut self.state else {
            return Poll::Pending;
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(value)) => {
                self.state = SlotState::Filled(value);
                Poll::Ready(SlotEvent::Delivered)
            }
            Poll::Ready(Err(_)) => {
                self.state = SlotState::Closed;
                Poll::Ready(SlotEvent::Closed)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_waiting(&self) -> bool {
        ResultSlot::is_waiting(self)
    }

    fn discard(&mut self) {
        self.state = SlotState::Taken;
    }
}

/// Wait until any still-waiting slot settles; returns its index and event.
/// Pending forever when no slot is waiting.
pub(crate) async fn next_settled(slots: &mut [&mut dyn Delivery]) -> (usize, SlotEvent) {
    futures::future::poll_fn(|cx| {
        for (index, slot) in slots.iter_mut().enumerate() {
            if !slot.is_waiting() {
                continue;
            }
            if let Poll::Ready(event) = slot.poll_settle(cx) {
                return Poll::Ready((index, event));
            }
        }
        Poll::Pending
    })
    .await
}
