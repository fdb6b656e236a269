//! Performing one effect value many times.

use std::time::Duration;

use effio_core::{CompletionSignal, Effect, Runtime, all2};
use pretty_assertions::assert_eq;

use crate::common::{Calls, Log, append, queue_runtime};

#[test]
fn double_perform_runs_side_effects_each_time() {
    let (_, rt) = queue_runtime();
    let log = Log::default();
    let op = append(&log, "abcd");

    for _ in 0..4 {
        rt.block_on(&op).unwrap();
    }

    assert_eq!(log.entries(), vec!["abcd"; 4]);
}

#[test]
fn other_performances_do_not_disturb_the_count() {
    let (_, rt) = queue_runtime();
    let log = Log::default();
    let op = append(&log, "op");
    let other = append(&log, "other");

    rt.block_on(&op).unwrap();
    rt.block_on(&other).unwrap();
    rt.block_on(&op).unwrap();
    rt.block_on(&other).unwrap();
    rt.block_on(&op).unwrap();

    let ops = log.entries().iter().filter(|e| *e == "op").count();
    assert_eq!(ops, 3);
}

#[test]
fn overlapping_performances_keep_separate_state() {
    let (_, rt) = queue_runtime();
    let gate = CompletionSignal::<u32>::new();
    let waiting = gate.clone();
    let op = Effect::deferred(move || {
        let waiting = waiting.clone();
        async move {
            let mut steps = vec![1];
            let value = waiting.await?;
            steps.push(value);
            Ok(steps)
        }
    });

    let first = rt.perform(&op);
    let second = rt.perform(&op);
    assert!(!first.is_resolved());
    assert!(!second.is_resolved());

    gate.succeed(2).unwrap();
    assert_eq!(first.wait().unwrap(), vec![1, 2]);
    assert_eq!(second.wait().unwrap(), vec![1, 2]);
}

#[test]
fn a_finished_performance_does_not_leak_into_the_next() {
    let (_, rt) = queue_runtime();
    let calls = Calls::default();
    let counted = calls.clone();
    let op = Effect::deferred(move || {
        let counted = counted.clone();
        async move {
            let mut local = 0;
            for _ in 0..3 {
                local += 1;
                counted.hit();
            }
            Ok(local)
        }
    });

    assert_eq!(rt.block_on(&op).unwrap(), 3);
    assert_eq!(rt.block_on(&op).unwrap(), 3);
    assert_eq!(calls.count(), 6);
}

#[test]
fn same_effect_twice_in_one_join() {
    let (scheduler, rt) = queue_runtime();
    let calls = Calls::default();
    let counted = calls.clone();
    let op = Effect::deferred(move || {
        let counted = counted.clone();
        async move { Ok(counted.hit()) }
    });

    let signal = rt.perform(&all2(op.clone(), op));
    scheduler.run_until_idle();
    let (a, b) = signal.wait().unwrap();

    assert_eq!(calls.count(), 2);
    assert_ne!(a, b);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn awaiting_a_performed_effect_just_works() {
    let rt = Runtime::current().unwrap();
    let calls = Calls::default();
    let counted = calls.clone();
    let fetch = Effect::deferred(move || {
        let counted = counted.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(format!("ticket-{}", counted.hit()))
        }
    });

    let first = rt.perform(&fetch).await.unwrap();
    let second = rt.perform(&fetch).await.unwrap();
    assert_ne!(first, second);

    let both = Effect::deferred_with(move |rt: Runtime| {
        let fetch = fetch.clone();
        async move {
            let a = rt.perform(&fetch).await?;
            let b = rt.perform(&fetch).await?;
            Ok(format!("{a} -- {b}"))
        }
    });
    let x = rt.perform(&both).await.unwrap();
    let y = rt.perform(&both).await.unwrap();
    assert_ne!(x, y);
    assert_eq!(calls.count(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn effects_can_be_awaited_directly() {
    let calls = Calls::default();
    let counted = calls.clone();
    let fetch = Effect::deferred(move || {
        let counted = counted.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(counted.hit())
        }
    });

    let first = fetch.clone().await.unwrap();
    let second = fetch.clone().await.unwrap();
    assert_eq!((first, second), (1, 2));

    let nested = Effect::deferred(move || {
        let fetch = fetch.clone();
        async move { Ok(fetch.clone().await? + fetch.await?) }
    });
    assert_eq!(nested.await.unwrap(), 3 + 4);
    assert_eq!(calls.count(), 4);
}
