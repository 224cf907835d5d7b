//! Pipeline task and handle

use std::future::Future;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broadcast::BroadcastSink;
use crate::error::{Error, Result};
use crate::track::Track;

use super::throttle::Throttle;

/// How a pipeline ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineExit {
    /// The source reached end of file
    Finished,
    /// The pipeline was stopped explicitly
    Stopped,
    /// A stage failed mid-stream
    Failed(String),
}

/// Handle to a running pipeline
///
/// Dropping the handle does not stop the pipeline; call [`stop`](Self::stop).
#[derive(Debug)]
pub struct PipelineHandle {
    cancel: CancellationToken,
    done: CancellationToken,
    task: JoinHandle<PipelineExit>,
}

impl PipelineHandle {
    /// Future that resolves once the pipeline has ended for any reason
    pub fn finished(&self) -> impl Future<Output = ()> + Send + 'static {
        let done = self.done.clone();
        async move { done.cancelled().await }
    }

    /// End the pacing stage and wait for the pipeline to wind down
    ///
    /// Returns the pipeline's exit; if it had already ended on its own, that
    /// earlier exit is returned instead of `Stopped`.
    pub async fn stop(self) -> PipelineExit {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the pipeline to end without stopping it
    pub async fn join(self) -> PipelineExit {
        match self.task.await {
            Ok(exit) => exit,
            Err(e) => PipelineExit::Failed(format!("pipeline task aborted: {}", e)),
        }
    }
}

/// Connects a byte source through a [`Throttle`] into a [`BroadcastSink`]
pub struct ThrottledPipeline;

impl ThrottledPipeline {
    /// Open `track` and start broadcasting it at `bytes_per_second`
    ///
    /// Fails without spawning anything if the track cannot be opened.
    pub async fn spawn(
        track: &Track,
        bytes_per_second: u64,
        sink: BroadcastSink,
    ) -> Result<PipelineHandle> {
        let file = File::open(track.path())
            .await
            .map_err(|source| Error::TrackUnavailable {
                path: track.path().to_path_buf(),
                source,
            })?;

        tracing::debug!(track = %track, bytes_per_second = bytes_per_second, "Track opened");

        Ok(Self::from_reader(file, bytes_per_second, sink))
    }

    /// Start broadcasting an already opened source
    pub fn from_reader<R>(source: R, bytes_per_second: u64, sink: BroadcastSink) -> PipelineHandle
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        let throttle = Throttle::new(bytes_per_second);

        let task = tokio::spawn({
            let cancel = cancel.clone();
            let done_guard = done.clone().drop_guard();

            async move {
                let _done = done_guard;
                pump(source, throttle, sink, cancel).await
            }
        });

        PipelineHandle { cancel, done, task }
    }
}

async fn pump<R>(
    mut source: R,
    mut throttle: Throttle,
    sink: BroadcastSink,
    cancel: CancellationToken,
) -> PipelineExit
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; throttle.chunk_size()];

    let exit = loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break PipelineExit::Stopped,
            read = source.read(&mut buf) => read,
        };

        let n = match read {
            Ok(0) => break PipelineExit::Finished,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => break PipelineExit::Failed(e.to_string()),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break PipelineExit::Stopped,
            _ = throttle.acquire(n) => {}
        }

        sink.write(Bytes::copy_from_slice(&buf[..n])).await;
    };

    tracing::debug!(
        exit = ?exit,
        bytes = throttle.released(),
        bytes_per_second = throttle.bytes_per_second(),
        "Pipeline ended"
    );

    exit
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::registry::ClientRegistry;

    fn track_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    async fn drain(stream: &mut crate::registry::ListenerStream) -> Vec<u8> {
        let mut received = Vec::new();
        while let Some(chunk) = stream.recv().await {
            received.extend_from_slice(&chunk);
        }
        received
    }

    #[tokio::test]
    async fn test_streams_whole_file_in_order() {
        let contents: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let file = track_file(&contents);

        let registry = Arc::new(ClientRegistry::new());
        let (id, mut stream) = registry.register().await;
        let sink = BroadcastSink::new(registry.clone());

        let handle = ThrottledPipeline::spawn(&Track::new(file.path()), 10_000_000, sink)
            .await
            .unwrap();

        assert_eq!(handle.join().await, PipelineExit::Finished);

        // Release the registry's sender so the stream terminates
        registry.unregister(&id).await;

        assert_eq!(drain(&mut stream).await, contents);
    }

    #[tokio::test]
    async fn test_missing_track_fails_to_start() {
        let registry = Arc::new(ClientRegistry::new());
        let sink = BroadcastSink::new(registry);

        let result =
            ThrottledPipeline::spawn(&Track::new("/nonexistent/track.mp3"), 16_000, sink).await;

        assert!(matches!(result, Err(Error::TrackUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_stop_ends_slow_pipeline() {
        let file = track_file(&[0u8; 64 * 1024]);
        let registry = Arc::new(ClientRegistry::new());
        let (_, mut stream) = registry.register().await;
        let sink = BroadcastSink::new(registry.clone());

        // 100 bytes per second: the file would take over ten minutes
        let handle = ThrottledPipeline::spawn(&Track::new(file.path()), 100, sink)
            .await
            .unwrap();

        let first = stream.recv().await.unwrap();
        assert_eq!(first.len(), 10);

        let exit = tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("stop should not hang");
        assert_eq!(exit, PipelineExit::Stopped);
    }

    #[tokio::test]
    async fn test_finished_signal_fires_on_end_of_file() {
        let registry = Arc::new(ClientRegistry::new());
        let sink = BroadcastSink::new(registry);

        let handle = ThrottledPipeline::from_reader(&b"short track"[..], 1_000_000, sink);
        let finished = handle.finished();

        tokio::time::timeout(Duration::from_secs(1), finished)
            .await
            .expect("finished signal");
        assert_eq!(handle.join().await, PipelineExit::Finished);
    }

    #[tokio::test]
    async fn test_read_error_fails_pipeline() {
        let source = tokio_test::io::Builder::new()
            .read(b"first bytes")
            .read_error(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
            .build();

        let registry = Arc::new(ClientRegistry::new());
        let (_, mut stream) = registry.register().await;
        let sink = BroadcastSink::new(registry);

        let handle = ThrottledPipeline::from_reader(source, 1_000_000, sink);

        assert_eq!(
            handle.join().await,
            PipelineExit::Failed("disk gone".to_string())
        );
        assert_eq!(stream.try_recv(), Some(Bytes::from_static(b"first bytes")));
    }
}
