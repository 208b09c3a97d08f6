//! Best-effort extraction of structured data from free-form model output.
//!
//! Output is first parsed into an untyped document, then coerced into
//! [`TaggedSummary`]. Each step has its own error so the pipeline can tell
//! "not JSON at all" from "JSON of the wrong shape".

use crate::error::AppError;
use crate::model::unique_tags;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?:json)?|```$").expect("code fence regex is valid"));

/// Summary and tags produced for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedSummary {
    pub summary: String,
    pub tags: Vec<String>,
}

/// A JSON document recovered from model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOutput {
    pub value: Value,
    /// True when the document only parsed after quote repair.
    pub repaired: bool,
}

/// Removes a leading ```` ``` ````/```` ```json ```` fence and a trailing fence.
pub fn strip_code_fences(content: &str) -> String {
    let content = content.trim();
    if !content.starts_with("```") {
        return content.to_string();
    }
    CODE_FENCE.replace_all(content, "").trim().to_string()
}

/// Parses model output as JSON, falling back to replacing single quotes
/// with double quotes.
pub fn parse_model_json(content: &str) -> Result<ParsedOutput, AppError> {
    let cleaned = strip_code_fences(content);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(ParsedOutput {
            value,
            repaired: false,
        });
    }

    let repaired = cleaned.replace('\'', "\"");
    serde_json::from_str::<Value>(&repaired)
        .map(|value| ParsedOutput {
            value,
            repaired: true,
        })
        .map_err(|_| AppError::UnparseableOutput {
            content: content.to_string(),
        })
}

impl TaggedSummary {
    /// Coerces a parsed document into a summary and tag list.
    ///
    /// `tags` that is not a list becomes empty, non-string and empty entries
    /// are dropped and repeats removed. A missing or blank `summary` falls
    /// back to `source_text`.
    pub fn from_value(value: Value, source_text: &str) -> Result<Self, AppError> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(AppError::UnexpectedShape {
                    found: json_kind(&other).to_string(),
                })
            }
        };

        let tags = match fields.get("tags") {
            Some(Value::Array(items)) => unique_tags(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string),
            ),
            _ => Vec::new(),
        };

        let summary = fields
            .get("summary")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(source_text)
            .trim()
            .to_string();

        Ok(Self { summary, tags })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
