//! In-process counters for summarization activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct SummaryMetrics {
    documents_summarized: AtomicU64,
    chunks_summarized: AtomicU64,
    failures: AtomicU64,
    // Zero doubles as "unset".
    last_chunk_count: AtomicU64,
}

impl SummaryMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a summarized document and the number of chunks it was split into.
    pub fn record_document(&self, chunk_count: u64) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(chunk_count, Ordering::Relaxed);
        self.last_chunk_count.store(chunk_count, Ordering::Relaxed);
    }

    /// Record a pipeline run that ended in an error.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let last = self.last_chunk_count.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_chunk_count: (last > 0).then_some(last),
        }
    }
}

/// Immutable view of summarization counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents summarized successfully since startup.
    pub documents_summarized: u64,
    /// Chunks summarized across all successful documents.
    pub chunks_summarized: u64,
    /// Pipeline runs that ended in an error.
    pub failures: u64,
    /// Chunk count of the most recent successful document, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = SummaryMetrics::new();
        metrics.record_document(2);
        metrics.record_document(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_summarized, 2);
        assert_eq!(snapshot.chunks_summarized, 5);
        assert_eq!(snapshot.last_chunk_count, Some(3));
    }

    #[test]
    fn failures_do_not_touch_document_counters() {
        let metrics = SummaryMetrics::new();
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.documents_summarized, 0);
        assert!(snapshot.last_chunk_count.is_none());
    }
}
