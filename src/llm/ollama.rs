//! Local Ollama backend using the `/api/generate` endpoint.

use super::CompletionBackend;
use crate::api::client::HttpClient;
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::types::ValidatedUrl;
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OllamaBackend {
    http: HttpClient,
    base_url: ValidatedUrl,
    model: String,
    timeout: Duration,
}

/// Request body for `/api/generate`. A fixed seed keeps answers stable
/// across reruns of the same page.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    seed: u64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

impl OllamaBackend {
    pub fn new(
        base_url: ValidatedUrl,
        model: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        Ok(Self {
            http: HttpClient::new(headers, retry)?,
            base_url,
            model: model.into(),
            timeout,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url.trimmed())
    }
}

#[async_trait::async_trait]
impl CompletionBackend for OllamaBackend {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AppError> {
        let request = GenerateRequest {
            model: &self.model,
            system,
            prompt: user,
            stream: false,
            options: GenerateOptions { seed: 0 },
        };
        let body = serde_json::to_value(&request)?;

        let response = self
            .http
            .post(&self.generate_url(), &body, self.timeout)
            .await?;
        let parsed: GenerateResponse = response.json()?;

        match parsed.response {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(AppError::EmptyCompletion {
                backend: self.name().to_string(),
                body: response.body.clone(),
            }),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
