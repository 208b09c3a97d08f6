// src/api/notion.rs
//! Notion REST client: database queries, page retrieval and page updates.

use super::client::HttpClient;
use super::parser::{describe_notion_error, parse_page_response, parse_query_response};
use super::types::PaginatedResponse;
use super::NotionRepository;
use crate::constants::{NOTION_API_BASE_URL, NOTION_API_PAGE_SIZE, NOTION_API_VERSION};
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::types::{DatabaseId, NotionToken, PageId};
use reqwest::header;
use serde_json::{json, Value};
use std::time::Duration;

/// Notion API client authenticated with an integration token.
#[derive(Clone)]
pub struct NotionHttpClient {
    http: HttpClient,
    api_base: String,
    timeout: Duration,
}

impl NotionHttpClient {
    /// Creates a new client with Notion API authentication.
    pub fn new(
        token: &NotionToken,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, AppError> {
        Ok(Self {
            http: HttpClient::new(Self::create_headers(token)?, retry)?,
            api_base: NOTION_API_BASE_URL.to_string(),
            timeout,
        })
    }

    /// Points the client at another API base (a proxy or a test server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Creates the default headers for Notion API requests.
    fn create_headers(token: &NotionToken) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", token.as_str());
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth_header).map_err(|e| {
                AppError::MissingConfiguration(format!("Invalid Notion token format: {}", e))
            })?,
        );

        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_static(NOTION_API_VERSION),
        );

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    /// Query endpoint for a database.
    pub fn database_query_url(&self, id: &DatabaseId) -> String {
        format!("{}/databases/{}/query", self.api_base, id.to_dashed())
    }

    fn page_url(&self, id: &PageId) -> String {
        format!("{}/pages/{}", self.api_base, id.to_dashed())
    }

    fn block_children_url(&self, id: &PageId) -> String {
        format!("{}/blocks/{}/children", self.api_base, id.to_dashed())
    }
}

/// Logs what Notion said about a rejected request before passing the error on.
fn explain_rejection(operation: &str, error: AppError) -> AppError {
    if let Some((code, message)) = describe_notion_error(&error) {
        log::error!("Notion rejected {} ({}): {}", operation, code, message);
        if code.is_access_problem() {
            log::error!("Check the token and that the database is shared with the integration");
        }
    } else if let Some(status) = error.status() {
        log::error!("Notion rejected {} with HTTP {}", operation, status);
    }
    error
}

#[async_trait::async_trait]
impl NotionRepository for NotionHttpClient {
    async fn query_database(
        &self,
        query_url: &str,
        filter: &Value,
        start_cursor: Option<&str>,
    ) -> Result<PaginatedResponse<Value>, AppError> {
        let mut body = json!({
            "filter": filter,
            "page_size": NOTION_API_PAGE_SIZE,
        });
        if let Some(cursor) = start_cursor {
            body["start_cursor"] = json!(cursor);
        }

        log::debug!("Querying {} (cursor: {:?})", query_url, start_cursor);
        let response = self
            .http
            .post(query_url, &body, self.timeout)
            .await
            .map_err(|e| explain_rejection("database query", e))?;
        parse_query_response(&response)
    }

    async fn retrieve_page(&self, id: &PageId) -> Result<Option<Value>, AppError> {
        let response = self
            .http
            .get(&self.page_url(id), self.timeout)
            .await
            .map_err(|e| explain_rejection("page retrieval", e))?;
        parse_page_response(&response)
    }

    async fn update_page(&self, id: &PageId, body: &Value) -> Result<(), AppError> {
        self.http
            .patch(&self.page_url(id), body, self.timeout)
            .await
            .map_err(|e| explain_rejection("page update", e))?;
        Ok(())
    }

    async fn block_children(&self, id: &PageId) -> Result<Vec<Value>, AppError> {
        let base_endpoint = self.block_children_url(id);
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let endpoint = match &cursor {
                Some(c) => format!(
                    "{}?page_size={}&start_cursor={}",
                    base_endpoint, NOTION_API_PAGE_SIZE, c
                ),
                None => format!("{}?page_size={}", base_endpoint, NOTION_API_PAGE_SIZE),
            };

            let response = self
                .http
                .get(&endpoint, self.timeout)
                .await
                .map_err(|e| explain_rejection("block listing", e))?;
            let parsed = parse_query_response(&response)?;
            blocks.extend(parsed.results);
            cursor = parsed.next_cursor;

            if !parsed.has_more || cursor.is_none() {
                break;
            }
        }

        log::debug!("Page {} has {} top-level blocks", id, blocks.len());
        Ok(blocks)
    }
}
