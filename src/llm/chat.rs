//! OpenAI-compatible chat-completions backend (GLM by default).

use super::CompletionBackend;
use crate::api::client::HttpClient;
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::types::{ApiKey, ValidatedUrl};
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Calls `POST <endpoint>` with `{model, messages}` and reads
/// `choices[0].message.content`.
pub struct ChatCompletionBackend {
    http: HttpClient,
    endpoint: ValidatedUrl,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Default)]
struct ChatResponse {
    #[serde(default)]
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionBackend {
    pub fn new(
        api_key: &ApiKey,
        endpoint: ValidatedUrl,
        model: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key.as_str())).map_err(
                |e| AppError::MissingConfiguration(format!("Invalid API key format: {}", e)),
            )?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(Self {
            http: HttpClient::new(headers, retry)?,
            endpoint,
            model: model.into(),
            timeout,
        })
    }
}

#[async_trait::async_trait]
impl CompletionBackend for ChatCompletionBackend {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AppError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };
        let body = serde_json::to_value(&request)?;

        let response = self
            .http
            .post(self.endpoint.as_str(), &body, self.timeout)
            .await?;
        let parsed: ChatResponse = response.json()?;

        extract_content(parsed).ok_or_else(|| AppError::EmptyCompletion {
            backend: self.name().to_string(),
            body: response.body.clone(),
        })
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}

/// Content of the first choice; `None` when there are no choices.
fn extract_content(response: ChatResponse) -> Option<String> {
    let first = response.choices?.into_iter().next()?;
    Some(
        first
            .message
            .and_then(|message| message.content)
            .unwrap_or_default(),
    )
}
