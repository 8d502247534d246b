//! Pipeline service coordinating extraction, chunking, and per-chunk summarization.

use crate::{
    chunking::{TextChunk, chunk_words},
    config::{Config, DEFAULT_CHUNK_MAX_WORDS},
    extraction::{DocumentPayload, TextExtractor},
    metrics::{MetricsSnapshot, SummaryMetrics},
    pipeline::types::{
        FinalSummary, PipelineError, PipelineFailure, PipelineStage, SummaryFragment,
        SummaryOutcome,
    },
    summarization::{HuggingFaceSummarizer, Summarizer, SummaryError},
};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Tunables for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Word budget per chunk.
    pub max_words: usize,
    /// Chunks of one document in flight at once.
    pub concurrency: usize,
    /// Deadline for text extraction.
    pub extraction_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_CHUNK_MAX_WORDS,
            concurrency: 1,
            extraction_timeout: Duration::from_secs(60),
        }
    }
}

impl PipelineSettings {
    /// Settings taken from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_words: config.chunk_max_words,
            concurrency: config.summary_concurrency,
            extraction_timeout: config.extraction_timeout,
        }
    }
}

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait SummaryApi: Send + Sync {
    /// Turn one uploaded document into a summary.
    async fn summarize_document(
        &self,
        payload: DocumentPayload,
    ) -> Result<SummaryOutcome, PipelineFailure>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Drives extraction, chunking, summarization and joining for each upload.
///
/// Stages run strictly in order and the first failure ends the run; nothing is retried and no
/// partial summary is ever returned. Construct once at start-up and share through an `Arc`.
pub struct SummaryPipeline {
    extractor: TextExtractor,
    summarizer: Arc<dyn Summarizer>,
    settings: PipelineSettings,
    metrics: Arc<SummaryMetrics>,
}

impl SummaryPipeline {
    /// Assemble a pipeline from its parts.
    pub fn new(
        extractor: TextExtractor,
        summarizer: Arc<dyn Summarizer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            extractor,
            summarizer,
            settings: PipelineSettings {
                max_words: settings.max_words.max(1),
                concurrency: settings.concurrency.max(1),
                ..settings
            },
            metrics: Arc::new(SummaryMetrics::new()),
        }
    }

    /// Pipeline backed by the Hugging Face summarizer described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, SummaryError> {
        let summarizer = HuggingFaceSummarizer::from_config(config)?;
        tracing::info!(endpoint = %config.hf_api_url, "Summarization client initialized");
        Ok(Self::new(
            TextExtractor::new(),
            Arc::new(summarizer),
            PipelineSettings::from_config(config),
        ))
    }

    /// Run the full pipeline for one upload.
    pub async fn run(&self, payload: DocumentPayload) -> Result<SummaryOutcome, PipelineFailure> {
        let run_id = Uuid::new_v4().simple().to_string();
        let span = tracing::info_span!(
            "summarize",
            run_id = %run_id,
            filename = %payload.filename,
            content_type = %payload.content_type,
            bytes = payload.bytes.len(),
        );

        let result = self.execute(payload, &run_id).instrument(span.clone()).await;

        span.in_scope(|| match &result {
            Ok(outcome) => {
                self.metrics.record_document(outcome.chunk_count as u64);
                tracing::info!(chunks = outcome.chunk_count, "Document summarized");
            }
            Err(failure) => {
                self.metrics.record_failure();
                tracing::warn!(
                    stage = %failure.stage,
                    kind = ?failure.kind(),
                    error = %failure,
                    "Document summarization failed"
                );
            }
        });
        result
    }

    async fn execute(
        &self,
        payload: DocumentPayload,
        run_id: &str,
    ) -> Result<SummaryOutcome, PipelineFailure> {
        let mut stage = PipelineStage::Idle;

        advance(&mut stage, PipelineStage::Extracting);
        let text = self
            .extract(payload, run_id)
            .await
            .map_err(|error| PipelineFailure { stage, error })?;

        advance(&mut stage, PipelineStage::Chunking);
        let chunks = chunk_words(&text, self.settings.max_words);
        drop(text);
        let total = chunks.len();
        tracing::debug!(chunks = total, max_words = self.settings.max_words, "Chunked document");

        if let Some(first) = chunks.first() {
            advance(
                &mut stage,
                PipelineStage::Summarizing {
                    index: first.index,
                    total,
                },
            );
        }
        let fragments = self.summarize_chunks(&chunks).await.map_err(|error| {
            let stage = match &error {
                PipelineError::Summarization { index, .. } => PipelineStage::Summarizing {
                    index: *index,
                    total,
                },
                _ => stage,
            };
            PipelineFailure { stage, error }
        })?;

        advance(&mut stage, PipelineStage::Joining);
        let summary = FinalSummary::join(&fragments);

        advance(&mut stage, PipelineStage::Done);
        Ok(SummaryOutcome {
            summary,
            chunk_count: total,
        })
    }

    async fn extract(
        &self,
        payload: DocumentPayload,
        run_id: &str,
    ) -> Result<String, PipelineError> {
        // Reject unknown formats before handing anything to the blocking pool.
        self.extractor.resolve(&payload.content_type)?;

        let extractor = self.extractor.clone();
        let scope = run_id.to_string();
        let task = tokio::task::spawn_blocking(move || extractor.extract(&payload, &scope));

        let joined = tokio::time::timeout(self.settings.extraction_timeout, task)
            .await
            .map_err(|_| PipelineError::ExtractionTimeout(self.settings.extraction_timeout))?;
        let text = joined.map_err(|error| PipelineError::Task(error.to_string()))??;
        Ok(text)
    }

    /// Summarize chunks in a bounded window that yields results in chunk order.
    ///
    /// With a concurrency of one this is a plain sequential loop. The first failing chunk (in
    /// chunk order) aborts the rest.
    async fn summarize_chunks(
        &self,
        chunks: &[TextChunk],
    ) -> Result<Vec<SummaryFragment>, PipelineError> {
        let total = chunks.len();

        // Each future owns its chunk and summarizer handle so the stream stays `Send`.
        let mut fragments: Vec<SummaryFragment> = stream::iter(chunks.iter().cloned())
            .map(|chunk| {
                let summarizer = Arc::clone(&self.summarizer);
                async move {
                    tracing::debug!(
                        index = chunk.index,
                        total,
                        words = chunk.word_count,
                        "Summarizing chunk"
                    );
                    summarizer
                        .summarize(&chunk.text)
                        .await
                        .map(|text| SummaryFragment {
                            index: chunk.index,
                            text,
                        })
                        .map_err(|source| PipelineError::Summarization {
                            index: chunk.index,
                            source,
                        })
                }
            })
            .buffered(self.settings.concurrency)
            .try_collect()
            .await?;

        fragments.sort_by_key(|fragment| fragment.index);
        Ok(fragments)
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn advance(current: &mut PipelineStage, next: PipelineStage) {
    tracing::debug!(from = %current, to = %next, "Pipeline stage");
    *current = next;
}

#[async_trait]
impl SummaryApi for SummaryPipeline {
    async fn summarize_document(
        &self,
        payload: DocumentPayload,
    ) -> Result<SummaryOutcome, PipelineFailure> {
        SummaryPipeline::run(self, payload).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SummaryPipeline::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::fixtures::pdf_with_pages;
    use crate::pipeline::types::ErrorKind;
    use serde_json::json;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&str) -> Result<String, SummaryError> + Send + Sync>;

    struct ScriptedSummarizer {
        calls: Mutex<Vec<String>>,
        respond: Responder,
        delay: Option<Box<dyn Fn(&str) -> Duration + Send + Sync>>,
    }

    impl ScriptedSummarizer {
        fn new(respond: impl Fn(&str) -> Result<String, SummaryError> + Send + Sync + 'static) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                respond: Box::new(respond),
                delay: None,
            }
        }

        fn echo_first_word() -> Self {
            Self::new(|text| {
                let first = text.split(' ').next().unwrap_or_default();
                Ok(format!("summary of {first}"))
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl Summarizer for ScriptedSummarizer {
        async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
            self.calls.lock().expect("calls lock").push(text.to_string());
            if let Some(delay) = &self.delay {
                tokio::time::sleep(delay(text)).await;
            }
            (self.respond)(text)
        }
    }

    fn pipeline(summarizer: Arc<ScriptedSummarizer>, max_words: usize) -> SummaryPipeline {
        SummaryPipeline::new(
            TextExtractor::new(),
            summarizer,
            PipelineSettings {
                max_words,
                ..PipelineSettings::default()
            },
        )
    }

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|n| format!("w{n}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[tokio::test]
    async fn empty_document_yields_sentinel_without_remote_calls() {
        let summarizer = Arc::new(ScriptedSummarizer::echo_first_word());
        let pipeline = pipeline(summarizer.clone(), 700);

        let outcome = pipeline
            .run(DocumentPayload::new("empty.txt", "text/plain", "  \n "))
            .await
            .expect("outcome");

        assert_eq!(outcome.summary, FinalSummary::NoSummary);
        assert_eq!(outcome.summary.as_str(), "No summary generated.");
        assert_eq!(outcome.chunk_count, 0);
        assert!(summarizer.calls().is_empty());
    }

    #[tokio::test]
    async fn single_chunk_summary_is_the_fragment_itself() {
        let summarizer = Arc::new(ScriptedSummarizer::new(|_| Ok("Just this.".into())));
        let pipeline = pipeline(summarizer.clone(), 700);

        let outcome = pipeline
            .run(DocumentPayload::new("a.txt", "text/plain", "a few words here"))
            .await
            .expect("outcome");

        assert_eq!(outcome.summary.as_str(), "Just this.");
        assert_eq!(summarizer.calls(), vec!["a few words here".to_string()]);
    }

    #[tokio::test]
    async fn fifteen_hundred_words_make_three_ordered_calls() {
        let summarizer = Arc::new(ScriptedSummarizer::echo_first_word());
        let pipeline = pipeline(summarizer.clone(), 700);

        let outcome = pipeline
            .run(DocumentPayload::new(
                "long.txt",
                "text/plain",
                numbered_words(1500),
            ))
            .await
            .expect("outcome");

        let calls = summarizer.calls();
        let sizes: Vec<_> = calls
            .iter()
            .map(|text| text.split_whitespace().count())
            .collect();
        assert_eq!(sizes, vec![700, 700, 100]);
        assert!(calls[0].starts_with("w0 "));
        assert!(calls[1].starts_with("w700 "));
        assert!(calls[2].starts_with("w1400 "));
        assert_eq!(outcome.chunk_count, 3);
        assert_eq!(
            outcome.summary.as_str(),
            "summary of w0\n\nsummary of w700\n\nsummary of w1400"
        );
    }

    #[tokio::test]
    async fn malformed_reply_aborts_without_partial_summary() {
        let summarizer = Arc::new(ScriptedSummarizer::new(|text| {
            if text.starts_with("c1") {
                Err(SummaryError::UnexpectedResponseShape { raw: json!([]) })
            } else {
                Ok("fine".into())
            }
        }));
        let pipeline = pipeline(summarizer.clone(), 2);

        let failure = pipeline
            .run(DocumentPayload::new(
                "doc.txt",
                "text/plain",
                "c0 c0 c1 c1 c2 c2",
            ))
            .await
            .expect_err("failure");

        assert_eq!(failure.kind(), ErrorKind::UnexpectedResponseShape);
        assert_eq!(failure.raw_response(), Some(&json!([])));
        assert_eq!(failure.stage, PipelineStage::Summarizing { index: 1, total: 3 });
        // Sequential dispatch never reaches the third chunk.
        assert_eq!(summarizer.calls().len(), 2);
        assert_eq!(pipeline.metrics_snapshot().failures, 1);
        assert_eq!(pipeline.metrics_snapshot().documents_summarized, 0);
    }

    #[tokio::test]
    async fn unsupported_type_fails_before_any_work() {
        let summarizer = Arc::new(ScriptedSummarizer::echo_first_word());
        let pipeline = pipeline(summarizer.clone(), 700);

        let failure = pipeline
            .run(DocumentPayload::new("logo.png", "image/png", vec![1, 2, 3]))
            .await
            .expect_err("failure");

        assert_eq!(failure.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(failure.stage, PipelineStage::Extracting);
        assert_eq!(failure.to_string(), "Unsupported file type: image/png");
        assert!(summarizer.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_decode_failure() {
        let summarizer = Arc::new(ScriptedSummarizer::echo_first_word());
        let pipeline = pipeline(summarizer.clone(), 700);

        let failure = pipeline
            .run(DocumentPayload::new("bad.txt", "text/plain", vec![0xff, 0xfe]))
            .await
            .expect_err("failure");

        assert_eq!(failure.kind(), ErrorKind::DecodeError);
        assert!(summarizer.calls().is_empty());
    }

    #[tokio::test]
    async fn concurrent_dispatch_still_joins_in_chunk_order() {
        let mut scripted = ScriptedSummarizer::echo_first_word();
        // Earlier chunks finish last.
        scripted.delay = Some(Box::new(|text: &str| {
            let index: u64 = text[1..2].parse().unwrap_or(0);
            Duration::from_millis(20 * (4 - index))
        }));
        let summarizer = Arc::new(scripted);
        let pipeline = SummaryPipeline::new(
            TextExtractor::new(),
            summarizer.clone(),
            PipelineSettings {
                max_words: 2,
                concurrency: 4,
                ..PipelineSettings::default()
            },
        );

        let outcome = pipeline
            .run(DocumentPayload::new(
                "doc.txt",
                "text/plain",
                "c0 x c1 x c2 x c3 x",
            ))
            .await
            .expect("outcome");

        assert_eq!(
            outcome.summary.as_str(),
            "summary of c0\n\nsummary of c1\n\nsummary of c2\n\nsummary of c3"
        );
        assert_eq!(summarizer.calls().len(), 4);
    }

    #[tokio::test]
    async fn pdf_upload_flows_through_extraction() {
        let summarizer = Arc::new(ScriptedSummarizer::new(|_| Ok("pdf summary".into())));
        let pipeline = pipeline(summarizer.clone(), 700);

        let outcome = pipeline
            .run(DocumentPayload::new(
                "report.pdf",
                "application/pdf",
                pdf_with_pages(&["Quarterly numbers", "Outlook"]),
            ))
            .await
            .expect("outcome");

        assert_eq!(outcome.summary.as_str(), "pdf summary");
        let calls = summarizer.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("Quarterly numbers"));
        assert!(calls[0].contains("Outlook"));
    }

    #[tokio::test]
    async fn successful_runs_update_metrics() {
        let summarizer = Arc::new(ScriptedSummarizer::echo_first_word());
        let pipeline = pipeline(summarizer, 2);

        pipeline
            .run(DocumentPayload::new("a.txt", "text/plain", "one two three"))
            .await
            .expect("outcome");

        let snapshot = pipeline.metrics_snapshot();
        assert_eq!(snapshot.documents_summarized, 1);
        assert_eq!(snapshot.chunks_summarized, 2);
        assert_eq!(snapshot.last_chunk_count, Some(2));
    }

    #[tokio::test]
    async fn multi_chunk_run_can_be_spawned_through_the_trait() {
        let summarizer = Arc::new(ScriptedSummarizer::echo_first_word());
        let service: Arc<dyn SummaryApi> = Arc::new(SummaryPipeline::new(
            TextExtractor::new(),
            summarizer.clone(),
            PipelineSettings {
                max_words: 2,
                concurrency: 2,
                ..PipelineSettings::default()
            },
        ));

        let handle = tokio::spawn({
            let service = Arc::clone(&service);
            async move {
                service
                    .summarize_document(DocumentPayload::new("a.txt", "text/plain", "a b c d e"))
                    .await
            }
        });
        let outcome = handle.await.expect("join").expect("outcome");

        assert_eq!(outcome.chunk_count, 3);
        assert_eq!(
            outcome.summary.as_str(),
            "summary of a\n\nsummary of c\n\nsummary of e"
        );
        assert_eq!(summarizer.calls().len(), 3);
    }
}
