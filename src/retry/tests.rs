//! Integration tests for the retry decorators.

use super::*;
use crate::adapter::{Single, Streaming};
use crate::sink::{SingleSink, SinkError};
use futures::StreamExt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing_test::traced_test;

#[derive(Debug, Clone, PartialEq)]
enum TestError {
    ConnectionExhausted,
    Timeout,
    Sink(SinkError),
}

impl From<SinkError> for TestError {
    fn from(error: SinkError) -> Self {
        TestError::Sink(error)
    }
}

/// Fails with `error` for the first `failures` subscriptions, then yields "X".
fn flaky(calls: Arc<AtomicU32>, failures: u32, error: TestError) -> Single<&'static str, TestError> {
    Single::defer(move || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let error = error.clone();
        async move {
            if n < failures {
                Err(error)
            } else {
                Ok(Some("X"))
            }
        }
    })
}

fn every(delay: Duration) -> RetryPolicy<TestError> {
    retry_with_delay(move |_, _| Some(delay))
}

#[tokio::test]
async fn test_connection_exhausted_then_value() {
    let calls = Arc::new(AtomicU32::new(0));
    let get = flaky(calls.clone(), 1, TestError::ConnectionExhausted)
        .retry_when(retry_if(|e| matches!(e, TestError::ConnectionExhausted)));

    assert_eq!(get.await, Ok(Some("X")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rejected_failure_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let get = flaky(calls.clone(), 1, TestError::Timeout)
        .retry_when(retry_if(|e| matches!(e, TestError::ConnectionExhausted)));

    assert_eq!(get.await, Err(TestError::Timeout));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_give_up_after_mixed_failures_returns_last_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let get = {
        let calls = calls.clone();
        Single::<(), TestError>::defer(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(TestError::ConnectionExhausted)
                } else {
                    Err(TestError::Timeout)
                }
            }
        })
    }
    .retry_when(retry_if(|e| matches!(e, TestError::ConnectionExhausted)));

    assert_eq!(get.await, Err(TestError::Timeout));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_delay_function_giving_up_stops_after_that_attempt() {
    for m in 1..5u32 {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = retry_with_delay(move |_: &TestError, attempt| {
            (attempt < m).then_some(Duration::from_millis(10))
        });
        let get = flaky(calls.clone(), u32::MAX, TestError::Timeout).retry_when(policy);

        let started = Instant::now();
        assert_eq!(get.await, Err(TestError::Timeout));
        assert_eq!(calls.load(Ordering::SeqCst), m);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(10) * (m - 1));
        assert!(elapsed < Duration::from_millis(10) * m);
    }
}

#[tokio::test]
async fn test_stream_delay_function_giving_up_delivers_the_failure() {
    let runs = Arc::new(AtomicU32::new(0));
    let streaming = {
        let runs = runs.clone();
        Streaming::<_, TestError>::create(move |sink| {
            runs.fetch_add(1, Ordering::SeqCst);
            let _ = sink.emit(1);
            let _ = sink.fail(TestError::ConnectionExhausted);
        })
    };
    let policy = retry_with_delay(|_: &TestError, attempt| (attempt < 3).then_some(Duration::ZERO));

    let items: Vec<_> = streaming.retry_when(policy).subscribe().collect().await;
    assert_eq!(
        items,
        vec![Ok(1), Ok(1), Ok(1), Err(TestError::ConnectionExhausted)]
    );
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_success_without_value_is_not_retried() {
    let get = Single::<u8, TestError>::empty().retry_when(RetryPolicy::immediately());
    assert_eq!(get.await, Ok(None));
}

#[tokio::test(start_paused = true)]
async fn test_k_failures_wait_exactly_k_delays() {
    for k in 0..5u32 {
        let calls = Arc::new(AtomicU32::new(0));
        let delays = Arc::new(Mutex::new(Vec::new()));
        let policy = {
            let delays = delays.clone();
            every(Duration::from_millis(100)).on_retry(move |event| {
                delays.lock().unwrap().push(event.next_delay);
            })
        };

        let started = Instant::now();
        let result = flaky(calls.clone(), k, TestError::ConnectionExhausted)
            .retry_when(policy)
            .await;
        let elapsed = started.elapsed();

        assert_eq!(result, Ok(Some("X")));
        assert_eq!(calls.load(Ordering::SeqCst), k + 1);
        assert_eq!(delays.lock().unwrap().len(), k as usize);
        assert!(elapsed >= Duration::from_millis(100) * k);
        assert!(elapsed < Duration::from_millis(100) * k + Duration::from_millis(50));
    }
}

#[tokio::test(start_paused = true)]
async fn test_attempts_never_overlap() {
    let in_flight = Arc::new(AtomicU32::new(0));
    let peak = Arc::new(AtomicU32::new(0));
    let calls = Arc::new(AtomicU32::new(0));

    let attempt = {
        let (in_flight, peak, calls) = (in_flight.clone(), peak.clone(), calls.clone());
        Single::<(), TestError>::defer(move || {
            let (in_flight, peak, calls) = (in_flight.clone(), peak.clone(), calls.clone());
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::ConnectionExhausted)
            }
        })
    };

    let result = attempt
        .retry_when(every(Duration::ZERO).with_max_attempts(4))
        .await;

    assert_eq!(result, Err(TestError::ConnectionExhausted));
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_each_subscription_starts_a_fresh_session() {
    let calls = Arc::new(AtomicU32::new(0));
    let always_fails = {
        let calls = calls.clone();
        Single::<(), TestError>::defer(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::ConnectionExhausted) }
        })
    };
    let get = always_fails.retry_when(every(Duration::ZERO).with_max_attempts(2));

    assert!(get.subscribe().await.is_err());
    assert!(get.subscribe().await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_subscription_during_delay_stops_retrying() {
    let calls = Arc::new(AtomicU32::new(0));
    let get = flaky(calls.clone(), u32::MAX, TestError::ConnectionExhausted)
        .retry_when(every(Duration::from_secs(1)));

    let outcome = tokio::time::timeout(Duration::from_millis(500), get.subscribe()).await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_subscription_cancels_running_attempt() {
    let pending: Arc<Mutex<Vec<SingleSink<(), TestError>>>> = Arc::new(Mutex::new(Vec::new()));
    let get = {
        let pending = pending.clone();
        Single::create(move |sink| pending.lock().unwrap().push(sink))
    }
    .retry_when(RetryPolicy::immediately());

    let outcome = tokio::time::timeout(Duration::from_millis(100), get.subscribe()).await;
    assert!(outcome.is_err());

    let pending = pending.lock().unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].is_cancelled());
    assert_eq!(pending[0].succeed(()), Err(SinkError::Cancelled));
}

#[tokio::test]
async fn test_abandoned_attempt_is_a_retryable_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let get = {
        let calls = calls.clone();
        Single::<u8, TestError>::create(move |sink| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                drop(sink);
            } else {
                let _ = sink.succeed(7);
            }
        })
    }
    .retry_when(retry_if(|e| matches!(e, TestError::Sink(SinkError::Abandoned))));

    assert_eq!(get.await, Ok(Some(7)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// First subscription emits a, b then fails; later ones emit a, b, c.
fn flaky_stream(calls: Arc<AtomicU32>) -> Streaming<&'static str, TestError> {
    Streaming::create(move |sink| {
        let _ = sink.emit("a");
        let _ = sink.emit("b");
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            let _ = sink.fail(TestError::ConnectionExhausted);
        } else {
            let _ = sink.emit("c");
            let _ = sink.complete();
        }
    })
}

#[tokio::test]
async fn test_stream_retry_restarts_from_the_beginning() {
    let calls = Arc::new(AtomicU32::new(0));
    let stream = flaky_stream(calls.clone()).retry_when(RetryPolicy::immediately());

    let items: Vec<_> = stream.subscribe().collect().await;

    assert_eq!(
        items,
        vec![Ok("a"), Ok("b"), Ok("a"), Ok("b"), Ok("c")]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stream_give_up_keeps_delivered_values() {
    let calls = Arc::new(AtomicU32::new(0));
    let stream = flaky_stream(calls.clone()).retry_when(RetryPolicy::never());

    let items: Vec<_> = stream.subscribe().collect().await;

    assert_eq!(
        items,
        vec![Ok("a"), Ok("b"), Err(TestError::ConnectionExhausted)]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stream_without_failure_runs_once() {
    let stream = Streaming::<u8, TestError>::iter(vec![1, 2, 3]).retry_when(RetryPolicy::immediately());
    assert_eq!(stream.collect_all().await, Ok(vec![1, 2, 3]));
}

#[tokio::test(start_paused = true)]
async fn test_cancelling_stream_during_delay_stops_retrying() {
    let calls = Arc::new(AtomicU32::new(0));
    let stream = flaky_stream(calls.clone()).retry_when(every(Duration::from_secs(1)));

    let mut subscription = stream.subscribe();
    assert_eq!(subscription.next().await, Some(Ok("a")));
    assert_eq!(subscription.next().await, Some(Ok("b")));

    let waiting = tokio::time::timeout(Duration::from_millis(500), subscription.next()).await;
    assert!(waiting.is_err());
    subscription.cancel();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(subscription.next().await, None);
}

#[tokio::test]
#[traced_test]
async fn test_retry_decisions_are_logged() {
    let calls = Arc::new(AtomicU32::new(0));
    let get = flaky(calls, 2, TestError::ConnectionExhausted)
        .retry_when(every(Duration::ZERO).with_max_attempts(1));

    assert_eq!(get.await, Err(TestError::ConnectionExhausted));
    assert!(logs_contain("operation failed, retrying"));
    assert!(logs_contain("operation failed, giving up"));
}
