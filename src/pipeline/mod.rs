//! Document-to-summary pipeline: extraction, chunking, per-chunk summarization, and joining.

mod service;
pub mod types;

pub use service::{PipelineSettings, SummaryApi, SummaryPipeline};
pub use types::{
    ErrorKind, FinalSummary, NO_SUMMARY_SENTINEL, PipelineError, PipelineFailure, PipelineStage,
    SummaryFragment, SummaryOutcome,
};
