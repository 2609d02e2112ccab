//! Completion listeners a callback client reports to, and the sink-backed
//! implementations that bridge them into [`Single`](crate::Single) and
//! [`Streaming`](crate::Streaming).

use std::fmt;

use crate::client::error::ClientError;
use crate::client::types::{Key, KeyExists, KeyRecord};
use crate::sink::{SingleSink, StreamSink};

/// Receives the single outcome of a callback operation.
///
/// Exactly one method is called, exactly once. Dropping a listener without
/// calling either makes the adapted operation fail as abandoned.
pub trait Listener<T>: Send + 'static {
    /// The operation succeeded with `value`.
    fn on_success(self: Box<Self>, value: T);

    /// The operation failed.
    fn on_failure(self: Box<Self>, error: ClientError);
}

/// Receives the items of a callback operation that produces a sequence.
pub trait SequenceListener<T>: Send + 'static {
    /// One item. An `Err` means the consumer is gone; the client should stop
    /// producing and must not call this listener again.
    fn on_next(&mut self, value: T) -> Result<(), ClientError>;

    /// The sequence ended normally.
    fn on_success(self: Box<Self>);

    /// The sequence ended with a failure.
    fn on_failure(self: Box<Self>, error: ClientError);
}

/// Bridges a [`Listener`] to a [`SingleSink`].
///
/// `map` turns the raw callback value into the container's value, or `None`
/// for a success without one.
pub struct SingleListener<R, T> {
    sink: SingleSink<T, ClientError>,
    map: fn(R) -> Option<T>,
}

impl<R, T> SingleListener<R, T> {
    /// Bridge with a custom mapping.
    pub fn new(sink: SingleSink<T, ClientError>, map: fn(R) -> Option<T>) -> Self {
        Self { sink, map }
    }
}

impl<T> SingleListener<T, T> {
    /// Every success carries its value.
    pub fn value(sink: SingleSink<T, ClientError>) -> Self {
        Self::new(sink, Some)
    }
}

impl SingleListener<(), ()> {
    /// Every success is a success without value.
    pub fn unit(sink: SingleSink<(), ClientError>) -> Self {
        Self::new(sink, |_| None)
    }
}

impl SingleListener<KeyExists, Key> {
    /// The key if the record exists, otherwise empty.
    ///
    /// Also used for delete, where the flag reports whether a record existed.
    pub fn existing_key(sink: SingleSink<Key, ClientError>) -> Self {
        Self::new(sink, |found| found.exists.then_some(found.key))
    }
}

impl SingleListener<KeyRecord, KeyRecord> {
    /// The key and record if one was found, otherwise empty.
    pub fn found_record(sink: SingleSink<KeyRecord, ClientError>) -> Self {
        Self::new(sink, |found| found.record.is_some().then_some(found))
    }
}

impl<R, T> Listener<R> for SingleListener<R, T>
where
    R: 'static,
    T: Send + 'static,
{
    fn on_success(self: Box<Self>, value: R) {
        let result = match (self.map)(value) {
            Some(value) => self.sink.succeed(value),
            None => self.sink.succeed_empty(),
        };
        if let Err(error) = result {
            tracing::trace!(%error, "listener success not delivered");
        }
    }

    fn on_failure(self: Box<Self>, error: ClientError) {
        if let Err(sink_error) = self.sink.fail(error) {
            tracing::trace!(error = %sink_error, "listener failure not delivered");
        }
    }
}

impl<R, T> fmt::Debug for SingleListener<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleListener")
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

/// Bridges a [`SequenceListener`] to a [`StreamSink`].
pub struct SequenceSinkListener<T> {
    sink: StreamSink<T, ClientError>,
}

impl<T> SequenceSinkListener<T> {
    /// Bridge into `sink`.
    pub fn new(sink: StreamSink<T, ClientError>) -> Self {
        Self { sink }
    }
}

impl<T: Send + 'static> SequenceListener<T> for SequenceSinkListener<T> {
    fn on_next(&mut self, value: T) -> Result<(), ClientError> {
        self.sink.emit(value).map_err(ClientError::from)
    }

    fn on_success(self: Box<Self>) {
        if let Err(error) = self.sink.complete() {
            tracing::trace!(%error, "sequence completion not delivered");
        }
    }

    fn on_failure(self: Box<Self>, error: ClientError) {
        if let Err(sink_error) = self.sink.fail(error) {
            tracing::trace!(error = %sink_error, "sequence failure not delivered");
        }
    }
}

impl<T> fmt::Debug for SequenceSinkListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceSinkListener")
            .field("sink", &self.sink)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Single, Streaming};
    use crate::client::error::ErrorKind;
    use crate::client::types::Record;

    fn key() -> Key {
        Key::new("test", "users", 1)
    }

    #[tokio::test]
    async fn existing_key_maps_missing_to_empty() {
        let present = Single::create(|sink| {
            Box::new(SingleListener::existing_key(sink)).on_success(KeyExists {
                key: key(),
                exists: true,
            })
        });
        let missing = Single::create(|sink| {
            Box::new(SingleListener::existing_key(sink)).on_success(KeyExists {
                key: key(),
                exists: false,
            })
        });

        assert_eq!(present.await, Ok(Some(key())));
        assert_eq!(missing.await, Ok(None));
    }

    #[tokio::test]
    async fn found_record_maps_missing_to_empty() {
        let missing = Single::create(|sink| {
            Box::new(SingleListener::found_record(sink)).on_success(KeyRecord {
                key: key(),
                record: None,
            })
        });
        let found = Single::create(|sink| {
            Box::new(SingleListener::found_record(sink)).on_success(KeyRecord {
                key: key(),
                record: Some(Record::default()),
            })
        });

        assert_eq!(missing.await, Ok(None));
        assert!(found.await.unwrap().unwrap().record.is_some());
    }

    #[tokio::test]
    async fn unit_listener_completes_empty() {
        let done = Single::create(|sink| Box::new(SingleListener::unit(sink)).on_success(()));
        assert_eq!(done.await, Ok(None));
    }

    #[tokio::test]
    async fn failure_is_forwarded() {
        let failed = Single::<Key, ClientError>::create(|sink| {
            Box::new(SingleListener::value(sink)).on_failure(ClientError::timeout(false))
        });
        assert_eq!(failed.await.unwrap_err().kind, ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn dropped_listener_is_abandoned() {
        let dropped = Single::<Key, ClientError>::create(|sink| drop(SingleListener::value(sink)));
        assert_eq!(dropped.await.unwrap_err().kind, ErrorKind::Abandoned);
    }

    #[tokio::test]
    async fn sequence_listener_streams_items() {
        let stream = Streaming::create(|sink| {
            let mut listener = Box::new(SequenceSinkListener::new(sink));
            for n in 0..3 {
                listener.on_next(n).unwrap();
            }
            listener.on_success();
        });
        assert_eq!(stream.collect_all().await, Ok(vec![0, 1, 2]));
    }

    #[test]
    fn sequence_listener_reports_closed_sink() {
        let (sink, _rx) = StreamSink::<i32, ClientError>::channel(Default::default());
        let _ = sink.complete();

        let mut listener = SequenceSinkListener::new(sink);
        assert_eq!(listener.on_next(1).unwrap_err().kind, ErrorKind::Terminated);
    }

    #[tokio::test]
    async fn sequence_listener_reports_consumer_gone_as_cancelled() {
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
        let seen_tx = std::sync::Mutex::new(Some(seen_tx));
        let stream = Streaming::<i32, ClientError>::create(move |sink| {
            let mut listener = SequenceSinkListener::new(sink);
            let _ = listener.on_next(1);
            if let Some(tx) = seen_tx.lock().unwrap().take() {
                let _ = tx.send(listener);
            }
        });

        let mut subscription = stream.subscribe();
        assert_eq!(futures::StreamExt::next(&mut subscription).await, Some(Ok(1)));
        drop(subscription);

        let mut listener = seen_rx.await.unwrap();
        assert_eq!(listener.on_next(2).unwrap_err().kind, ErrorKind::Cancelled);
    }
}
