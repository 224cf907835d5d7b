//! Fan-out sink

use std::sync::Arc;

use bytes::Bytes;

use crate::registry::ClientRegistry;
use crate::stats::BroadcastStats;

/// Writes pipeline chunks to every registered listener
///
/// Cheap to clone; clones share the registry and the counters.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    registry: Arc<ClientRegistry>,
    stats: Arc<BroadcastStats>,
}

impl BroadcastSink {
    /// Create a sink that fans out to `registry`
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self {
            registry,
            stats: Arc::new(BroadcastStats::new()),
        }
    }

    /// Get the registry this sink writes to
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Get the sink's counters
    pub fn stats(&self) -> &Arc<BroadcastStats> {
        &self.stats
    }

    /// Write one chunk to every open listener
    ///
    /// Listeners whose stream has closed are removed instead of written to.
    /// Writes never wait on a listener, so this returns once every listener
    /// has been attempted. Returns the number of listeners that got the chunk.
    pub async fn write(&self, chunk: Bytes) -> usize {
        let mut delivered = 0;
        let mut pruned = 0;

        {
            let mut listeners = self.registry.lock().await;

            listeners.retain(|id, sink| {
                if sink.is_closed() {
                    tracing::debug!(listener = %id, "Pruning closed listener");
                    pruned += 1;
                    return false;
                }

                match sink.write(chunk.clone()) {
                    Ok(()) => {
                        delivered += 1;
                        true
                    }
                    Err(e) => {
                        // Stream dropped between the check and the write
                        tracing::debug!(listener = %id, error = %e, "Pruning closed listener");
                        pruned += 1;
                        false
                    }
                }
            });
        }

        self.stats.record_chunk(chunk.len(), delivered);
        if pruned > 0 {
            self.stats.record_pruned(pruned);
        }

        tracing::trace!(
            bytes = chunk.len(),
            delivered = delivered,
            pruned = pruned,
            "Chunk broadcast"
        );

        delivered
    }
}
