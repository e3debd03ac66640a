//! Orchestration core.
//!
//! Fan-out/fan-in over typed result slots with one shared cancellation
//! context, single-task deadline races, and a partitioned parallel sum.

mod fan_out;
mod race;
mod reduce;
mod slot;
mod task;

pub use fan_out::{join2, join_all, FanOut};
pub use race::{
    compute, compute_fixed, compute_until_done, compute_with_timeout,
    time_consuming_computation, COMPUTATION_TIME, FIXED_TIMEOUT,
};
pub use reduce::{partitions, sum};
pub use slot::{result_slot, Delivery, ResultSlot, SlotEvent, SlotSender};
pub use task::Task;
