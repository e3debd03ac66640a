//! Fan-out/fan-in correctness tests.
//!
//! These tests verify result collection, first-failure-wins cancellation,
//! and that nothing outlives an orchestration call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fanout::orchestration::{join2, join_all, Delivery, FanOut};
use fanout::{Context, Error};

use crate::fixtures::{fail_after, succeed_after};

/// Test: All tasks succeed regardless of completion order
/// Given three tasks that finish in reverse launch order
/// When they are fanned out
/// Then every value comes back with no error
#[tokio::test(start_paused = true)]
async fn test_all_results_regardless_of_order() {
    let mut fan = FanOut::new(&Context::background());
    let mut slow = fan.spawn(succeed_after(Duration::from_secs(3), 1u8));
    let mut medium = fan.spawn(succeed_after(Duration::from_secs(2), "two".to_string()));
    let mut fast = fan.spawn(succeed_after(Duration::from_secs(1), 3.0f64));

    fan.join(&mut [&mut slow, &mut medium, &mut fast])
        .await
        .unwrap();

    assert_eq!(slow.take(), Some(1));
    assert_eq!(medium.take().as_deref(), Some("two"));
    assert_eq!(fast.take(), Some(3.0));
}

/// Test: A failing task's cause is the orchestrator's error
/// Given one task that fails and one that would succeed later
/// When they are fanned out
/// Then the failure cause is returned unchanged
#[tokio::test(start_paused = true)]
async fn test_failure_cause_surfaces_unchanged() {
    let result = join2(
        &Context::background(),
        succeed_after(Duration::from_secs(2), 1u32),
        fail_after::<u32>(Duration::from_millis(500), "in customer task: bad status"),
    )
    .await;

    match result {
        Err(Error::Transport(msg)) => assert_eq!(msg, "in customer task: bad status"),
        other => panic!("expected the task's cause, got {:?}", other),
    }
}

/// Test: First failure wins
/// Given two tasks failing at different times
/// When they are fanned out
/// Then the earlier failure is the cause
#[tokio::test(start_paused = true)]
async fn test_first_failure_wins() {
    let result = join2(
        &Context::background(),
        fail_after::<()>(Duration::from_secs(2), "late"),
        fail_after::<()>(Duration::from_secs(1), "early"),
    )
    .await;

    match result {
        Err(Error::Transport(msg)) => assert_eq!(msg, "early"),
        other => panic!("expected the early failure, got {:?}", other),
    }
}

/// Test: Near-simultaneous failures
/// Given many tasks failing at the same instant
/// When they are fanned out
/// Then exactly one of their causes is reported
#[tokio::test(start_paused = true)]
async fn test_simultaneous_failures_pick_one_cause() {
    let names: Vec<String> = (0..6).map(|i| format!("worker-{}", i)).collect();
    let tasks = names
        .iter()
        .map(|name| fail_after::<()>(Duration::from_millis(100), name));

    match join_all(&Context::background(), tasks).await {
        Err(Error::Transport(msg)) => assert!(names.contains(&msg), "unknown cause {}", msg),
        other => panic!("expected one transport cause, got {:?}", other),
    }
}

/// Test: Deadline before any delivery
/// Given a 1s deadline and tasks needing 2s
/// When they are fanned out
/// Then the error is deadline-kind, not a task failure
#[tokio::test(start_paused = true)]
async fn test_deadline_error_is_distinct_from_task_failure() {
    let ctx = Context::with_timeout(&Context::background(), Duration::from_secs(1));
    let err = join2(
        &ctx,
        succeed_after(Duration::from_secs(2), ()),
        succeed_after(Duration::from_secs(2), ()),
    )
    .await
    .unwrap_err();

    assert!(err.is_deadline());
    assert!(!err.is_fetch_failure());
}

/// Test: Cancellation stops cooperative siblings
/// Given a failing task and siblings counting their progress
/// When the failure cancels the context
/// Then no sibling makes progress afterwards
#[tokio::test(start_paused = true)]
async fn test_siblings_stop_after_cancellation() {
    let ticks = Arc::new(AtomicUsize::new(0));

    let mut fan = FanOut::new(&Context::background());
    let mut slots = Vec::new();
    for _ in 0..3 {
        let ticks = Arc::clone(&ticks);
        slots.push(fan.spawn(move |_ctx: Context| async move {
            for _ in 0..1_000 {
                tokio::time::sleep(Duration::from_millis(100)).await;
                ticks.fetch_add(1, Ordering::SeqCst);
            }
            Ok::<(), Error>(())
        }));
    }
    let mut failing = fan.spawn(fail_after::<()>(Duration::from_millis(350), "stop"));

    let result = {
        let mut pending: Vec<&mut dyn Delivery> = slots
            .iter_mut()
            .map(|slot| slot as &mut dyn Delivery)
            .collect();
        pending.push(&mut failing);
        fan.join(&mut pending).await
    };
    assert!(result.is_err());

    let at_cancel = ticks.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), at_cancel);
}

/// Test: Partial results are discarded
/// Given one instant success and one later failure
/// When the orchestration fails
/// Then the success already delivered is no longer readable
#[tokio::test(start_paused = true)]
async fn test_partial_results_discarded_on_error() {
    let mut fan = FanOut::new(&Context::background());
    let mut fast = fan.spawn(succeed_after(Duration::ZERO, "customer"));
    let mut failing = fan.spawn(fail_after::<&str>(Duration::from_secs(1), "product down"));

    let result = fan.join(&mut [&mut fast, &mut failing]).await;

    assert!(matches!(result, Err(Error::Transport(_))));
    assert_eq!(fast.take(), None);
    assert_eq!(failing.take(), None);

    let result = join2(
        &Context::background(),
        succeed_after(Duration::ZERO, "customer"),
        fail_after::<&str>(Duration::from_secs(1), "product unavailable"),
    )
    .await;
    assert!(result.is_err());
}

/// Test: Late deliveries are not observable
/// Given a context that expires before a task delivers
/// When the task would deliver later
/// Then the caller's slot stays empty
#[tokio::test(start_paused = true)]
async fn test_no_delivery_after_return() {
    let ctx = Context::with_timeout(&Context::background(), Duration::from_secs(1));
    let mut fan = FanOut::new(&ctx);
    let mut late = fan.spawn(succeed_after(Duration::from_secs(2), 99u32));

    assert!(fan.join(&mut [&mut late]).await.is_err());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!late.is_filled());
    assert_eq!(late.take(), None);
}

/// Test: Homogeneous N-way fan-out
/// Given ten tasks of the same kind
/// When joined
/// Then values arrive in task order
#[tokio::test(start_paused = true)]
async fn test_join_all_ten_tasks() {
    let tasks = (0..10u64).map(|i| succeed_after(Duration::from_millis(1000 - i * 100), i * i));
    let values = join_all(&Context::background(), tasks).await.unwrap();
    assert_eq!(values, (0..10u64).map(|i| i * i).collect::<Vec<_>>());
}
