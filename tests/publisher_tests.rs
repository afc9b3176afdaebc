use futures_util::stream::{self, StreamExt};
use rs2_bridge::reactive::{Publisher, Subscription, TestSubscriber};
use rs2_bridge::sequence::{from_fn, from_iter};
use rs2_bridge::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const WAIT: Duration = Duration::from_secs(2);

fn counted(limit: u32, pulls: Arc<AtomicUsize>) -> impl LazySequence<u32> {
    from_fn(move || {
        let pulls = pulls.clone();
        stream::iter(0..limit).map(move |n| {
            pulls.fetch_add(1, Ordering::SeqCst);
            Ok::<u32, StreamError>(n)
        })
    })
}

#[tokio::test]
async fn test_unbounded_request_drains_sequence() {
    let publisher = sequence_to_publisher(from_iter(vec![1, 2, 3]));

    let subscriber = TestSubscriber::new();
    publisher.subscribe(subscriber.subscriber());

    assert!(subscriber.await_terminal(WAIT).await);
    assert_eq!(subscriber.values(), vec![1, 2, 3]);
    assert_eq!(subscriber.completions(), 1);
}

#[tokio::test]
async fn test_pulls_only_what_was_requested() {
    let pulls = Arc::new(AtomicUsize::new(0));
    let publisher = counted(5, pulls.clone()).into_publisher();

    let subscriber = TestSubscriber::with_initial_request(2);
    publisher.subscribe(subscriber.subscriber());

    assert!(subscriber.await_count(2, WAIT).await);
    sleep(Duration::from_millis(30)).await;
    assert_eq!(subscriber.values(), vec![0, 1]);
    assert_eq!(pulls.load(Ordering::SeqCst), 2);
    assert_eq!(subscriber.terminal_count(), 0);

    subscriber.request(10);
    assert!(subscriber.await_terminal(WAIT).await);
    assert_eq!(subscriber.values(), vec![0, 1, 2, 3, 4]);
    assert_eq!(subscriber.completions(), 1);
}

#[tokio::test]
async fn test_nothing_flows_without_demand() {
    let pulls = Arc::new(AtomicUsize::new(0));
    let publisher = sequence_to_publisher(counted(3, pulls.clone()));

    let subscriber = TestSubscriber::with_initial_request(0);
    let subscription = publisher.subscribe_tracked(subscriber.subscriber());

    sleep(Duration::from_millis(30)).await;
    assert!(subscriber.values().is_empty());
    assert_eq!(pulls.load(Ordering::SeqCst), 0);
    assert_eq!(subscription.outstanding(), 0);

    subscription.request(1);
    assert!(subscriber.await_count(1, WAIT).await);
    assert_eq!(subscriber.values(), vec![0]);
}

#[tokio::test]
async fn test_zero_request_is_a_protocol_error() {
    let publisher = sequence_to_publisher(from_iter(vec![1, 2, 3]));

    let subscriber = TestSubscriber::with_initial_request(0);
    publisher.subscribe(subscriber.subscriber());
    subscriber.request(0);

    assert!(subscriber.await_terminal(WAIT).await);
    assert_eq!(subscriber.errors(), vec![StreamError::InvalidRequest(0)]);
    assert!(subscriber.values().is_empty());
}

#[tokio::test]
async fn test_demand_accumulates_and_saturates() {
    let publisher = sequence_to_publisher(from_iter(vec![1]));

    let subscriber = TestSubscriber::with_initial_request(0);
    let subscription = publisher.subscribe_tracked(subscriber.subscriber());

    subscription.request(u64::MAX - 1);
    subscription.request(5);
    assert!(subscriber.await_terminal(WAIT).await);
    assert_eq!(subscription.outstanding(), u64::MAX);
    assert_eq!(subscription.state(), BridgeState::Completed);
}

#[tokio::test]
async fn test_cancel_stops_delivery() {
    let pulls = Arc::new(AtomicUsize::new(0));
    let publisher = sequence_to_publisher(counted(100, pulls.clone()));

    let subscriber = TestSubscriber::with_initial_request(3);
    let subscription = publisher.subscribe_tracked(subscriber.subscriber());

    assert!(subscriber.await_count(3, WAIT).await);
    subscriber.cancel();
    assert_eq!(subscription.state(), BridgeState::Cancelled);

    subscription.request(50);
    sleep(Duration::from_millis(30)).await;

    assert_eq!(subscriber.values(), vec![0, 1, 2]);
    assert_eq!(subscriber.terminal_count(), 0);
    assert!(pulls.load(Ordering::SeqCst) <= 4);
}

#[tokio::test]
async fn test_publisher_is_cold() {
    let opened = Arc::new(AtomicUsize::new(0));
    let counter = opened.clone();
    let publisher = sequence_to_publisher(from_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        stream::iter(vec![Ok('a'), Ok('b')])
    }));

    let first = TestSubscriber::new();
    let second = TestSubscriber::new();
    publisher.subscribe(first.subscriber());
    publisher.subscribe(second.subscriber());

    assert!(first.await_terminal(WAIT).await);
    assert!(second.await_terminal(WAIT).await);
    assert_eq!(first.values(), vec!['a', 'b']);
    assert_eq!(second.values(), vec!['a', 'b']);
    assert_eq!(opened.load(Ordering::SeqCst), 2);
}
