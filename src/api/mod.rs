// src/api/mod.rs
//! Notion API interaction: reading database rows and page bodies, writing
//! page properties.
//!
//! Business logic depends on the [`NotionRepository`] trait, never on HTTP
//! details; [`NotionHttpClient`] is the production implementation.

pub mod client;
pub mod notion;
pub mod pagination;
pub mod parser;
pub mod types;

use crate::error::AppError;
use crate::types::PageId;
use serde_json::Value;

/// The ability to read and update pages of a Notion workspace.
#[async_trait::async_trait]
pub trait NotionRepository: Send + Sync {
    /// Runs one page of a filtered database query.
    async fn query_database(
        &self,
        query_url: &str,
        filter: &Value,
        start_cursor: Option<&str>,
    ) -> Result<types::PaginatedResponse<Value>, AppError>;

    /// Fetches a page object; `None` when Notion returns nothing.
    async fn retrieve_page(&self, id: &PageId) -> Result<Option<Value>, AppError>;

    /// Applies a `{"properties": ...}` update to a page.
    async fn update_page(&self, id: &PageId, body: &Value) -> Result<(), AppError>;

    /// Lists every top-level block of a page body, following cursors.
    async fn block_children(&self, id: &PageId) -> Result<Vec<Value>, AppError>;
}

pub use client::{HttpClient, HttpResponse};
pub use notion::NotionHttpClient;
pub use pagination::QueryPager;
pub use types::{PaginatedResponse, QueryBatch};
