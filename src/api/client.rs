// src/api/client.rs
//! Thin HTTP client wrapper shared by the Notion and model clients.
//!
//! Every request goes through [`HttpClient::request`], which sends a JSON
//! body, turns non-2xx answers into [`AppError::HttpStatus`] and retries
//! network-level failures according to the configured [`RetryPolicy`].

use crate::error::AppError;
use crate::error_recovery::{retry_transient, RetryPolicy};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: String,
    pub body: String,
}

impl HttpResponse {
    /// Decodes the body as JSON. An empty body decodes as an empty object.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        if self.body.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Object(Default::default()))?);
        }
        serde_json::from_str(&self.body).map_err(|e| {
            log::error!("Failed to parse response from {}: {}", self.url, e);
            AppError::MalformedResponse(format!(
                "{} (body: {})",
                e,
                crate::error::preview(&self.body)
            ))
        })
    }
}

/// A thin wrapper around reqwest Client with status checking and retries.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Creates a client with the given default headers and retry policy.
    pub fn new(default_headers: HeaderMap, retry: RetryPolicy) -> Result<Self, AppError> {
        let client = Client::builder().default_headers(default_headers).build()?;
        Ok(Self { client, retry })
    }

    /// Sends a request and reads the whole response.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `url` - Absolute URL
    /// * `headers` - Extra headers on top of the client defaults
    /// * `body` - Optional JSON body
    /// * `timeout` - Per-attempt timeout
    ///
    /// # Returns
    ///
    /// The response for any 2xx status, `AppError::HttpStatus` otherwise.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<HttpResponse, AppError> {
        let operation = format!("{} {}", method, url);
        let response = retry_transient(&self.retry, &operation, || {
            self.send_once(method.clone(), url, headers, body, timeout)
        })
        .await?;

        log::debug!("{} -> {}", operation, response.status);
        if !response.status.is_success() {
            return Err(AppError::HttpStatus {
                status: response.status,
                url: response.url,
                body: response.body,
            });
        }

        Ok(response)
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<HttpResponse, AppError> {
        let mut builder = self
            .client
            .request(method, url)
            .headers(headers.clone())
            .timeout(timeout);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().to_string();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            url,
            body,
        })
    }

    pub async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, AppError> {
        self.request(Method::GET, url, &HeaderMap::new(), None, timeout)
            .await
    }

    pub async fn post(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpResponse, AppError> {
        self.request(Method::POST, url, &HeaderMap::new(), Some(body), timeout)
            .await
    }

    pub async fn patch(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpResponse, AppError> {
        self.request(Method::PATCH, url, &HeaderMap::new(), Some(body), timeout)
            .await
    }
}
