//! Parallel joins on a real tokio host.

use std::time::Duration;

use effio_core::{CompletionSignal, Effect, EffectError, Runtime, all, all3, sequence};
use pretty_assertions::assert_eq;

use crate::common::{Calls, Log, append_after, queue_runtime};

fn ticket(calls: &Calls) -> Effect<usize> {
    let calls = calls.clone();
    Effect::deferred(move || {
        let calls = calls.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let number = calls.hit();
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(number)
        }
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_execution_hands_out_each_ticket_once() {
    let rt = Runtime::current().unwrap();
    let calls = Calls::default();
    let op = ticket(&calls);

    let (a, b, c) = rt
        .perform(&all3(op.clone(), op.clone(), op))
        .await
        .unwrap();

    let mut tickets = vec![a, b, c];
    tickets.sort_unstable();
    assert_eq!(tickets, vec![1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn branches_overlap_in_time() {
    let rt = Runtime::current().unwrap();
    let calls = Calls::default();
    let op = ticket(&calls);

    let started = tokio::time::Instant::now();
    let tickets = rt
        .perform(&all(vec![op.clone(); 6]))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(tickets.len(), 6);
    assert_eq!(calls.count(), 6);
    // Six sequential runs would take well over 600ms.
    assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequence_keeps_list_order_under_timers() {
    let rt = Runtime::current().unwrap();
    let log = Log::default();
    let effects = vec![
        append_after(&log, "a", Duration::from_millis(15)),
        append_after(&log, "b", Duration::from_millis(1)),
        append_after(&log, "c", Duration::from_millis(5)),
    ];

    let values = rt.perform(&sequence(effects)).await.unwrap();
    assert_eq!(values, vec!["a", "b", "c"]);
    assert_eq!(log.entries(), vec!["a", "b", "c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn all_returns_argument_order_regardless_of_finish_order() {
    let rt = Runtime::current().unwrap();
    let log = Log::default();
    let effects = vec![
        append_after(&log, "slow", Duration::from_millis(40)),
        append_after(&log, "fast", Duration::from_millis(1)),
    ];

    let values = rt.perform(&all(effects)).await.unwrap();
    assert_eq!(values, vec!["slow", "fast"]);
    assert_eq!(log.entries(), vec!["fast", "slow"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn later_failure_in_time_loses_to_earlier_argument() {
    let rt = Runtime::current().unwrap();
    let slow_failure = Effect::<u8>::deferred(|| async {
        tokio::time::sleep(Duration::from_millis(40)).await;
        Err(EffectError::new("first argument"))
    });
    let fast_failure = Effect::<u8>::deferred(|| async {
        tokio::time::sleep(Duration::from_millis(1)).await;
        Err(EffectError::new("second argument"))
    });

    let err = rt
        .perform(&all(vec![slow_failure, fast_failure]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "first argument");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn siblings_of_a_failure_run_to_completion() {
    let rt = Runtime::current().unwrap();
    let done = CompletionSignal::<()>::new();
    let finished = done.clone();
    let survivor = Effect::deferred(move || {
        let finished = finished.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = finished.succeed(());
            Ok(())
        }
    });

    let err = rt
        .perform(&all(vec![Effect::failed("fails at once"), survivor]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "fails at once");

    done.await.unwrap();
}

#[test]
fn eager_branches_yield_so_later_ones_can_start() {
    let (scheduler, rt) = queue_runtime();
    let log = Log::default();
    let gate = CompletionSignal::<()>::new();

    let branch = |label: &'static str| {
        let log = log.clone();
        let gate = gate.clone();
        Effect::deferred(move || {
            let log = log.clone();
            let gate = gate.clone();
            async move {
                log.push(format!("{label}:start"));
                gate.await?;
                log.push(format!("{label}:end"));
                Ok(label)
            }
        })
    };

    let signal = rt.perform(&all3(branch("a"), branch("b"), branch("c")));
    // Only the final branch started on the caller's stack.
    assert_eq!(log.entries(), vec!["c:start"]);

    scheduler.run_until_idle();
    assert_eq!(log.entries(), vec!["c:start", "a:start", "b:start"]);

    gate.succeed(()).unwrap();
    assert_eq!(signal.wait().unwrap(), ("a", "b", "c"));
    assert_eq!(log.entries().len(), 6);
}

#[test]
fn template_setup_waits_for_the_yield_too() {
    let (scheduler, rt) = queue_runtime();
    let log = Log::default();
    let eager = |label: &'static str| {
        let log = log.clone();
        Effect::deferred(move || {
            log.push(label);
            async move { Ok(label) }
        })
    };
    let built = {
        let log = log.clone();
        Effect::suspend(move || {
            log.push("b");
            Effect::pure("b")
        })
    };

    let signal = rt.perform(&all3(eager("a"), built, eager("c")));
    assert_eq!(log.entries(), vec!["c"]);

    scheduler.run_until_idle();
    assert_eq!(log.entries(), vec!["c", "a", "b"]);
    assert_eq!(signal.wait().unwrap(), ("a", "b", "c"));
}
