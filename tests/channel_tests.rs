use rs2_bridge::channel::{bounded, ChannelError};
use rs2_bridge::StreamError;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn test_bounded_channel_basic() {
    let (tx, mut rx) = bounded(2);

    assert!(tx.send(1).await.is_ok());
    assert!(tx.send(2).await.is_ok());

    // Test try_send when full
    assert!(matches!(tx.try_send(3), Err(ChannelError::Full(3))));

    assert_eq!(rx.recv().await, Some(Ok(1)));
    assert_eq!(rx.recv().await, Some(Ok(2)));

    // Should be able to send again
    assert!(tx.send(3).await.is_ok());
    assert_eq!(rx.recv().await, Some(Ok(3)));
}

#[tokio::test]
async fn test_channel_close_drains_buffer() {
    let (tx, mut rx) = bounded(5);

    tx.send(1).await.unwrap();
    tx.send(2).await.unwrap();

    assert!(tx.close(None));
    assert!(tx.is_closed());
    assert!(rx.is_closed());

    // Should not be able to send
    match tx.send(3).await {
        Err(err) => {
            assert_eq!(err.to_string(), "Channel is closed");
            assert_eq!(err.into_inner(), 3);
        }
        Ok(()) => panic!("send after close must fail"),
    }

    // Should still be able to receive existing items
    assert_eq!(rx.recv().await, Some(Ok(1)));
    assert_eq!(rx.recv().await, Some(Ok(2)));
    assert_eq!(rx.recv().await, None);
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_close_cause_follows_buffered_items() {
    let (tx, mut rx) = bounded(4);

    tx.send("a").await.unwrap();
    assert!(tx.close(Some(StreamError::Upstream("E".to_string()))));

    assert_eq!(rx.recv().await, Some(Ok("a")));
    assert_eq!(rx.recv().await, Some(Err(StreamError::Upstream("E".to_string()))));
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_only_first_close_counts() {
    let (tx, mut rx) = bounded::<i32>(4);
    let other = tx.clone();

    assert!(tx.close(Some(StreamError::Custom("first".to_string()))));
    assert!(!other.close(Some(StreamError::Custom("second".to_string()))));
    assert!(!tx.close(None));

    assert_eq!(rx.recv().await, Some(Err(StreamError::Custom("first".to_string()))));
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_close_wakes_waiting_receiver() {
    let (tx, mut rx) = bounded::<i32>(4);

    let waiter = tokio::spawn(async move { rx.recv().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    tx.close(Some(StreamError::Timeout));

    let received = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert_eq!(received, Some(Err(StreamError::Timeout)));
}

#[tokio::test]
async fn test_dropped_senders_abandon_channel() {
    let (tx, mut rx) = bounded(4);

    tx.send(7).await.unwrap();
    drop(tx);

    assert_eq!(rx.recv().await, Some(Ok(7)));
    assert_eq!(rx.recv().await, Some(Err(StreamError::Abandoned)));
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_dropped_receiver_disconnects_sender() {
    let (tx, rx) = bounded(4);
    assert!(!tx.is_disconnected());

    drop(rx);

    assert!(tx.is_disconnected());
    assert!(matches!(tx.send(1).await, Err(ChannelError::Disconnected(1))));
    assert!(matches!(tx.try_send(2), Err(ChannelError::Disconnected(2))));
}

#[tokio::test]
async fn test_zero_capacity_is_raised_to_one() {
    let (tx, mut rx) = bounded(0);

    assert_eq!(tx.capacity(), 1);
    assert!(tx.try_send(1).is_ok());
    assert!(matches!(tx.try_send(2), Err(ChannelError::Full(2))));
    assert_eq!(rx.recv().await, Some(Ok(1)));
}

#[tokio::test]
async fn test_channel_stats() {
    let (tx, rx) = bounded(10);

    tx.send(1).await.unwrap();
    tx.send(2).await.unwrap();

    let stats = rx.stats();
    assert_eq!(stats.length, 2);
    assert_eq!(stats.capacity, 10);
    assert!(!stats.is_closed);
    assert_eq!(stats.to_string(), "Channel(2/10)");

    tx.close(None);
    assert_eq!(rx.stats().to_string(), "Channel(2/10, closed)");

    println!("Channel stats: {}", rx.stats());
}

#[test]
fn test_blocking_sender_outside_runtime() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (tx, mut rx) = bounded(1);

    let producer = std::thread::spawn(move || {
        for i in 0..5 {
            tx.send_blocking(i).unwrap();
        }
        tx.close(None);
    });

    let received: Vec<i32> = rt.block_on(async move {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item.unwrap());
        }
        items
    });
    producer.join().unwrap();

    assert_eq!(received, vec![0, 1, 2, 3, 4]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_sender_on_runtime_worker() {
    let (tx, mut rx) = bounded(1);

    let producer = tokio::spawn(async move {
        for i in 0..3 {
            tx.send_blocking(i).unwrap();
        }
        tx.close(None);
    });

    let mut received = Vec::new();
    while let Some(item) = rx.recv().await {
        received.push(item.unwrap());
    }
    producer.await.unwrap();

    assert_eq!(received, vec![0, 1, 2]);
}

#[test]
fn test_recv_pending_until_send() {
    let (tx, mut rx) = bounded(2);
    let mut recv = tokio_test::task::spawn(rx.recv());

    tokio_test::assert_pending!(recv.poll());
    tx.try_send(5).unwrap();
    assert!(recv.is_woken());
    assert_eq!(tokio_test::assert_ready!(recv.poll()), Some(Ok(5)));
}

#[test]
fn test_recv_woken_by_close() {
    let (tx, mut rx) = bounded::<u8>(2);
    let mut recv = tokio_test::task::spawn(rx.recv());

    tokio_test::assert_pending!(recv.poll());
    tx.close(Some(StreamError::Cancelled));
    assert!(recv.is_woken());
    assert_eq!(
        tokio_test::assert_ready!(recv.poll()),
        Some(Err(StreamError::Cancelled))
    );
}

#[tokio::test]
async fn test_blocking_sender_on_current_thread_worker() {
    let (tx, mut rx) = bounded(1);

    // Free room needs no blocking
    tx.send_blocking(1).unwrap();
    // A full buffer would stall the only worker
    assert!(matches!(tx.send_blocking(2), Err(ChannelError::WouldBlock(2))));

    assert_eq!(rx.recv().await, Some(Ok(1)));
    tx.send_blocking(3).unwrap();
    assert_eq!(rx.recv().await, Some(Ok(3)));
}
