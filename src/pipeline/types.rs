//! Core data types and error definitions for the summarization pipeline.

use crate::extraction::ExtractionError;
use crate::summarization::SummaryError;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Text reported when a document produced no summary text at all.
pub const NO_SUMMARY_SENTINEL: &str = "No summary generated.";

/// Separator placed between consecutive fragments.
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Summary returned for one chunk, tagged with that chunk's index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryFragment {
    /// Index of the chunk this fragment summarizes.
    pub index: usize,
    /// Summary text as returned by the service.
    pub text: String,
}

/// Reassembled summary of a whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalSummary {
    /// Fragments joined in chunk order.
    Generated(String),
    /// The document yielded no summary text.
    NoSummary,
}

impl FinalSummary {
    /// Join fragments in index order; an empty result becomes [`FinalSummary::NoSummary`].
    pub fn join(fragments: &[SummaryFragment]) -> Self {
        let mut ordered: Vec<&SummaryFragment> = fragments.iter().collect();
        ordered.sort_by_key(|fragment| fragment.index);
        let joined = ordered
            .iter()
            .map(|fragment| fragment.text.as_str())
            .collect::<Vec<_>>()
            .join(FRAGMENT_SEPARATOR);

        if joined.is_empty() {
            Self::NoSummary
        } else {
            Self::Generated(joined)
        }
    }

    /// Text shown to callers, with the sentinel standing in for an empty summary.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Generated(text) => text,
            Self::NoSummary => NO_SUMMARY_SENTINEL,
        }
    }
}

/// Successful pipeline result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    /// Reassembled summary.
    pub summary: FinalSummary,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
}

/// Steps of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum PipelineStage {
    /// Nothing has happened yet.
    Idle,
    /// Turning the upload into text.
    Extracting,
    /// Splitting text into word-bounded chunks.
    Chunking,
    /// Waiting on the summary of chunk `index` out of `total`.
    Summarizing {
        /// Chunk being summarized.
        index: usize,
        /// Number of chunks in the document.
        total: usize,
    },
    /// Concatenating fragments.
    Joining,
    /// Finished successfully.
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Extracting => f.write_str("extracting"),
            Self::Chunking => f.write_str("chunking"),
            Self::Summarizing { index, total } => write!(f, "summarizing {}/{}", index + 1, total),
            Self::Joining => f.write_str("joining"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Error categories reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Content type not recognized.
    UnsupportedFormat,
    /// Bytes were not valid text.
    DecodeError,
    /// Summarization service returned a non-success status.
    RemoteServiceError,
    /// Summarization service returned a malformed success body.
    UnexpectedResponseShape,
    /// A bounded step ran out of time.
    Timeout,
    /// Anything else.
    PipelineError,
}

/// Errors emitted by the summarization pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text extraction failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Summarizing a chunk failed.
    #[error("{source}")]
    Summarization {
        /// Index of the chunk whose summary failed.
        index: usize,
        /// Underlying client error.
        #[source]
        source: SummaryError,
    },
    /// Extraction did not finish in time.
    #[error("Text extraction timed out after {0:?}")]
    ExtractionTimeout(Duration),
    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

impl PipelineError {
    /// Category used for logging and for choosing a response.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction(ExtractionError::UnsupportedFormat(_)) => ErrorKind::UnsupportedFormat,
            Self::Extraction(ExtractionError::Decode(_)) => ErrorKind::DecodeError,
            Self::Extraction(_) | Self::Task(_) => ErrorKind::PipelineError,
            Self::ExtractionTimeout(_) => ErrorKind::Timeout,
            Self::Summarization { source, .. } => match source {
                SummaryError::RemoteService { .. } => ErrorKind::RemoteServiceError,
                SummaryError::UnexpectedResponseShape { .. } => ErrorKind::UnexpectedResponseShape,
                SummaryError::Timeout(_) => ErrorKind::Timeout,
                SummaryError::Transport(_) => ErrorKind::PipelineError,
            },
        }
    }

    /// Raw service response kept for diagnosing a malformed reply.
    pub fn raw_response(&self) -> Option<&Value> {
        match self {
            Self::Summarization {
                source: SummaryError::UnexpectedResponseShape { raw },
                ..
            } => Some(raw),
            _ => None,
        }
    }
}

/// Terminal failure of a pipeline run: what went wrong and at which stage.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PipelineFailure {
    /// Stage that was active when the run failed.
    pub stage: PipelineStage,
    /// Underlying error.
    #[source]
    pub error: PipelineError,
}

impl PipelineFailure {
    /// Error category.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Raw service response, when the failure was a malformed reply.
    pub fn raw_response(&self) -> Option<&Value> {
        self.error.raw_response()
    }
}
