// src/lib.rs
//! notion-autotag library: tags, summarizes and categorizes the pages of a
//! Notion database with a language model.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ValidationError`
//! - **Configuration**: `RunConfig`, `CommandLineInput`
//! - **Domain model**: `ClipPage`, `PageUpdate`, `PropertyNames`, `CategoryCatalog`
//! - **API client**: `NotionRepository`, `NotionHttpClient`, `QueryPager`
//! - **Models**: `LlmClient`, `CompletionBackend` and its two backends
//! - **Pipeline**: `PagePipeline`, `ClipProcessor`, `Stage`

pub mod api;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod error;
pub mod error_recovery;
pub mod llm;
pub mod model;
pub mod pipeline;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, NotionErrorCode};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{BackendKind, CommandLineInput, DatabaseTarget, RunConfig, RunTarget};
pub use crate::error_recovery::RetryPolicy;

// --- Domain Model ---
pub use crate::classifier::{normalize_label, CategoryCatalog, CategoryClassifier};
pub use crate::model::{ClipPage, PageUpdate, PropertyNames, SummaryUpdate};

// --- Domain Types ---
pub use crate::types::{ApiKey, DatabaseId, NotionToken, PageId, ValidatedUrl};

// --- API Client ---
pub use crate::api::{HttpClient, NotionHttpClient, NotionRepository, QueryPager};

// --- Models ---
pub use crate::llm::{ChatCompletionBackend, CompletionBackend, LlmClient, OllamaBackend};

// --- Pipeline ---
pub use crate::pipeline::{
    ClipProcessor, PageOutcome, PagePipeline, RunSummary, SkipReason, Stage,
};
