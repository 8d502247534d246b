#![deny(missing_docs)]

//! Core library for the docsum document summarization service.

/// HTTP routing and REST handlers.
pub mod api;
/// Word-budget text chunking.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from uploaded documents.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization metrics helpers.
pub mod metrics;
/// Document-to-summary pipeline orchestration.
pub mod pipeline;
/// Summarization client abstraction and the Hugging Face adapter.
pub mod summarization;
