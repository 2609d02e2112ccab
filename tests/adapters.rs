//! Adapters driven by callbacks that complete on foreign threads.

use eddy::{Signal, Single, SinkError, Streaming};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[tokio::test]
async fn single_completed_from_a_plain_thread() {
    let single = Single::<_, SinkError>::create(|sink| {
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            let _ = sink.succeed("from thread");
        });
    });

    assert_eq!(single.await, Ok(Some("from thread")));
}

#[tokio::test]
async fn racing_writers_deliver_exactly_one_outcome() {
    let single = Single::<usize, SinkError>::create(|sink| {
        for n in 0..8 {
            let sink = sink.clone();
            thread::spawn(move || {
                let _ = sink.succeed(n);
            });
        }
    });

    for _ in 0..20 {
        let outcome = single.subscribe().await;
        assert!(matches!(outcome, Ok(Some(n)) if n < 8));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_subscriptions_are_independent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let single = {
        let calls = Arc::clone(&calls);
        Single::<_, SinkError>::create(move |sink| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            thread::spawn(move || {
                let _ = sink.succeed(n);
            });
        })
    };

    let handles: Vec<_> = (0..16).map(|_| tokio::spawn(single.subscribe())).collect();
    let mut seen = Vec::new();
    for handle in handles {
        seen.push(handle.await.unwrap().unwrap().unwrap());
    }
    seen.sort_unstable();

    assert_eq!(seen, (0..16).collect::<Vec<_>>());
    assert_eq!(calls.load(Ordering::SeqCst), 16);
}

#[tokio::test]
async fn stream_keeps_emission_order_across_threads() {
    let streaming = Streaming::<usize, SinkError>::create(|sink| {
        thread::spawn(move || {
            for n in 0..100 {
                if sink.emit(n).is_err() {
                    return;
                }
            }
            let _ = sink.complete();
        });
    });

    assert_eq!(streaming.collect_all().await, Ok((0..100).collect()));
}

#[tokio::test]
async fn stream_values_before_failure_are_delivered() {
    let streaming = Streaming::<_, SinkError>::from_signals(vec![
        Signal::Next(1),
        Signal::Next(2),
        Signal::Failure(SinkError::Abandoned),
        Signal::Next(3),
    ]);

    let mut subscription = streaming.subscribe();
    assert_eq!(subscription.next().await, Some(Ok(1)));
    assert_eq!(subscription.next().await, Some(Ok(2)));
    assert_eq!(subscription.next().await, Some(Err(SinkError::Abandoned)));
    assert_eq!(subscription.next().await, None);
}

#[tokio::test]
async fn dropped_stream_sink_ends_with_abandoned() {
    let streaming = Streaming::<i32, SinkError>::create(|sink| {
        let _ = sink.emit(1);
    });

    let items: Vec<_> = streaming.subscribe().collect().await;
    assert_eq!(items, vec![Ok(1), Err(SinkError::Abandoned)]);
}

#[tokio::test]
async fn producer_observes_stream_cancellation() {
    let stopped = Arc::new(AtomicBool::new(false));
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let done_tx = Arc::new(std::sync::Mutex::new(Some(done_tx)));

    let streaming = {
        let stopped = Arc::clone(&stopped);
        Streaming::<u64, SinkError>::create(move |sink| {
            let stopped = Arc::clone(&stopped);
            let done_tx = done_tx.lock().unwrap().take();
            thread::spawn(move || {
                let mut n = 0;
                while sink.emit(n).is_ok() {
                    n += 1;
                    thread::sleep(Duration::from_millis(1));
                }
                stopped.store(sink.is_cancelled(), Ordering::SeqCst);
                if let Some(tx) = done_tx {
                    let _ = tx.send(());
                }
            });
        })
    };

    let mut subscription = streaming.subscribe();
    assert_eq!(subscription.next().await, Some(Ok(0)));
    assert_eq!(subscription.next().await, Some(Ok(1)));
    drop(subscription);

    done_rx.await.unwrap();
    assert!(stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn explicit_cancel_ends_the_subscription() {
    let streaming = Streaming::<i32, SinkError>::create(|sink| {
        let _ = sink.emit(1);
        thread::spawn(move || {
            while !sink.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
        });
    });

    let mut subscription = streaming.subscribe();
    assert_eq!(subscription.next().await, Some(Ok(1)));
    subscription.cancel();
    assert!(!subscription.is_active());
    assert_eq!(subscription.next().await, None);
}
