//! Listener sink and stream types
//!
//! Each listener is an unbounded in-process channel: the registry keeps the
//! [`ListenerSink`] and the transport streams the [`ListenerStream`] to the
//! client. Writes never wait on the client, so one slow connection only grows
//! its own backlog and never delays the others.
//!
//! The backlog has no cap. A client that keeps its connection open but stops
//! reading holds every chunk written since, and that memory is released only
//! when the connection drops and the listener is unregistered or pruned.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identifier for a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned when writing to a listener whose stream has gone away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerClosed;

impl fmt::Display for ListenerClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener closed")
    }
}

impl std::error::Error for ListenerClosed {}

/// Write end of a listener's byte channel
#[derive(Debug)]
pub struct ListenerSink {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ListenerSink {
    /// Check whether the receiving stream has been dropped or closed
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue a chunk for the listener without waiting
    pub fn write(&self, chunk: Bytes) -> Result<(), ListenerClosed> {
        self.tx.send(chunk).map_err(|_| ListenerClosed)
    }
}

/// Read end of a listener's byte channel
///
/// Yields chunks in the order they were written. Dropping the stream (or
/// calling [`close`](Self::close)) marks the matching sink as closed.
#[derive(Debug)]
pub struct ListenerStream {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl ListenerStream {
    /// Receive the next chunk; `None` once the sink is gone and drained
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Take an already queued chunk without waiting
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting chunks; queued chunks can still be received
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for ListenerStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Create a connected sink/stream pair
pub fn channel() -> (ListenerSink, ListenerStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ListenerSink { tx }, ListenerStream { rx })
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = ListenerId::new();
        let b = ListenerId::new();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_write_then_receive_in_order() {
        let (sink, mut stream) = channel();

        sink.write(Bytes::from_static(b"one")).unwrap();
        sink.write(Bytes::from_static(b"two")).unwrap();

        assert_eq!(stream.recv().await.unwrap(), Bytes::from_static(b"one"));
        assert_eq!(stream.next().await.unwrap(), Bytes::from_static(b"two"));
    }

    #[test]
    fn test_stream_pending_until_written() {
        let (sink, stream) = channel();
        let mut stream = task::spawn(stream);

        assert_pending!(stream.poll_next());

        sink.write(Bytes::from_static(b"chunk")).unwrap();
        assert!(stream.is_woken());
        assert_ready_eq!(stream.poll_next(), Some(Bytes::from_static(b"chunk")));
    }

    #[test]
    fn test_dropped_stream_closes_sink() {
        let (sink, stream) = channel();
        assert!(!sink.is_closed());

        drop(stream);

        assert!(sink.is_closed());
        assert_eq!(sink.write(Bytes::from_static(b"late")), Err(ListenerClosed));
    }

    #[test]
    fn test_close_keeps_queued_chunks() {
        let (sink, mut stream) = channel();
        sink.write(Bytes::from_static(b"queued")).unwrap();

        stream.close();

        assert!(sink.is_closed());
        assert_eq!(stream.try_recv(), Some(Bytes::from_static(b"queued")));
        assert_eq!(stream.try_recv(), None);
    }
}
