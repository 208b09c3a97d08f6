//! Language-model access: summarizing, tagging and classifying page text.
//!
//! Prompting and output parsing live in [`LlmClient`]; how text actually
//! reaches a model is a [`CompletionBackend`]. Two backends ship: a hosted
//! OpenAI-compatible chat-completions API and a local Ollama server.

mod chat;
mod ollama;
pub mod parsing;

pub use chat::ChatCompletionBackend;
pub use ollama::OllamaBackend;
pub use parsing::{parse_model_json, strip_code_fences, ParsedOutput, TaggedSummary};

use crate::classifier::CategoryCatalog;
use crate::error::AppError;

const TAGGING_SYSTEM_PROMPT: &str = "你是一名擅长内容分析的助手。";

const TAGGING_INSTRUCTION: &str = "请根据以上内容生成一个简短摘要，并给出若干标签。\
\n要求返回严格 JSON 格式，例如 {\"summary\": \"...\", \"tags\": [\"...\"]}。\
\n只返回 JSON。";

const CLASSIFY_SYSTEM_PROMPT: &str = "你是一名分类助手，只返回一个分类名称。";

const SUMMARY_SYSTEM_PROMPT: &str = "你是一名擅长总结文章的助手。";

const SUMMARY_INSTRUCTION: &str =
    "请用中文帮我按照下面格式详细汇总上面文章的主旨和主要内容。\n字数限制：字数在100-500字之间";

/// The ability to turn a system prompt and a user prompt into assistant text.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AppError>;

    /// Short name used in diagnostics.
    fn name(&self) -> &str;
}

/// Prompts a backend for summaries, tags and categories.
pub struct LlmClient {
    backend: Box<dyn CompletionBackend>,
}

impl LlmClient {
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Asks for a short summary and a tag list, answered as strict JSON.
    pub async fn generate_summary_and_tags(&self, text: &str) -> Result<TaggedSummary, AppError> {
        let user = format!("内容如下：\n{}\n{}", text, TAGGING_INSTRUCTION);
        let content = self.backend.complete(TAGGING_SYSTEM_PROMPT, &user).await?;

        let parsed = parse_model_json(&content)?;
        if parsed.repaired {
            log::debug!("{} output needed quote repair", self.backend.name());
        }
        TaggedSummary::from_value(parsed.value, text)
    }

    /// Asks for a detailed summary of an article body. A blank answer is an
    /// [`AppError::EmptyCompletion`].
    pub async fn summarize(&self, text: &str) -> Result<String, AppError> {
        let user = format!("{}\n{}", text, SUMMARY_INSTRUCTION);
        let content = self.backend.complete(SUMMARY_SYSTEM_PROMPT, &user).await?;
        let summary = content.trim();
        if summary.is_empty() {
            return Err(AppError::EmptyCompletion {
                backend: self.backend.name().to_string(),
                body: content,
            });
        }
        Ok(summary.to_string())
    }

    /// Asks for the single best-fit category. The raw trimmed answer is
    /// returned; see [`crate::classifier::normalize_label`].
    pub async fn classify(
        &self,
        summary: &str,
        tags: &[String],
        catalog: &CategoryCatalog,
    ) -> Result<String, AppError> {
        let user = classification_prompt(summary, tags, catalog);
        let content = self.backend.complete(CLASSIFY_SYSTEM_PROMPT, &user).await?;
        Ok(content.trim().to_string())
    }
}

fn classification_prompt(summary: &str, tags: &[String], catalog: &CategoryCatalog) -> String {
    let tags_part = if tags.is_empty() {
        String::new()
    } else {
        format!("，标签：{}", tags.join(","))
    };
    let categories_part = if catalog.is_empty() {
        String::new()
    } else {
        format!("可选分类列表：{}。", catalog.joined(","))
    };
    format!(
        "摘要：{}{}。请结合以上信息{}给出最合适的分类名称，直接输出分类名称，不要附带额外文字。",
        summary, tags_part, categories_part
    )
}
