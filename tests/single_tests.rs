use rs2_bridge::reactive::{Observable, TestObserver};
use rs2_bridge::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_task_result_is_shared_by_subscribers() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let task = tokio::spawn(async move {
        counter.fetch_add(1, Ordering::SeqCst);
        sleep(Duration::from_millis(10)).await;
        42u32
    });
    let single = task_to_single(task);

    let first = TestObserver::new();
    let second = TestObserver::new();
    single.subscribe(first.observer());
    single.subscribe(second.observer());

    assert!(first.await_terminal(WAIT).await);
    assert!(second.await_terminal(WAIT).await);
    assert_eq!(first.values(), vec![42]);
    assert_eq!(second.values(), vec![42]);
    assert_eq!(first.completions(), 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_task_fails_single() {
    let task = tokio::spawn(async {
        sleep(Duration::from_secs(10)).await;
        1u8
    });
    task.abort();
    let single = task_to_single(task);

    let observer = TestObserver::new();
    single.subscribe(observer.observer());

    assert!(observer.await_terminal(WAIT).await);
    assert!(observer.values().is_empty());
    assert_eq!(
        observer.errors(),
        vec![StreamError::Upstream("task was cancelled".to_string())]
    );
}

#[tokio::test]
async fn test_panicked_task_fails_single() {
    let task = tokio::spawn(async {
        if true {
            panic!("compute failed");
        }
        0i64
    });
    let single = task_to_single(task);

    let observer = TestObserver::new();
    single.subscribe(observer.observer());

    assert!(observer.await_terminal(WAIT).await);
    assert_eq!(
        observer.errors(),
        vec![StreamError::Panicked("compute failed".to_string())]
    );
}

#[tokio::test]
async fn test_deferred_maybe_with_and_without_value() {
    let present = deferred_to_maybe(|| async { Ok(Some("found")) });
    let observer = TestObserver::new();
    present.subscribe(observer.observer());
    assert!(observer.await_terminal(WAIT).await);
    assert_eq!(observer.values(), vec!["found"]);
    assert_eq!(observer.completions(), 1);

    let absent = deferred_to_maybe(|| async { Ok::<Option<&str>, StreamError>(None) });
    let observer = TestObserver::new();
    absent.subscribe(observer.observer());
    assert!(observer.await_terminal(WAIT).await);
    assert!(observer.values().is_empty());
    assert_eq!(observer.completions(), 1);
}

#[tokio::test]
async fn test_deferred_single_requires_a_value() {
    let absent = deferred_to_single(|| async { Ok::<Option<u8>, StreamError>(None) });
    let observer = TestObserver::new();
    absent.subscribe(observer.observer());

    assert!(observer.await_terminal(WAIT).await);
    assert_eq!(observer.errors(), vec![StreamError::NoElements]);

    let failing = deferred_to_single(|| async {
        Err::<Option<u8>, _>(StreamError::IO("unreachable host".to_string()))
    });
    let observer = TestObserver::new();
    failing.subscribe(observer.observer());

    assert!(observer.await_terminal(WAIT).await);
    assert_eq!(
        observer.errors(),
        vec![StreamError::IO("unreachable host".to_string())]
    );
}

#[tokio::test]
async fn test_deferred_runs_once_per_subscriber() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let single = deferred_to_single(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok(Some(n)) }
    });

    let first = TestObserver::new();
    let second = TestObserver::new();
    single.subscribe(first.observer());
    assert!(first.await_terminal(WAIT).await);
    single.subscribe(second.observer());
    assert!(second.await_terminal(WAIT).await);

    assert_eq!(first.values(), vec![0]);
    assert_eq!(second.values(), vec![1]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
