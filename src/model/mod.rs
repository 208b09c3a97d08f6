//! Domain model: a web-clip page and the update written back to it.

pub mod properties;
mod update;

pub use properties::PropertyNames;
pub use update::{PageUpdate, SummaryUpdate};

use crate::constants::{TAG_SEPARATOR, UNTITLED_PAGE};
use crate::error::AppError;
use crate::types::{PageId, ValidationError};
use indexmap::IndexSet;
use properties::{RawBlock, RawPage};
use serde::Deserialize;
use serde_json::Value;

/// A row of the web-clip database.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPage {
    pub id: PageId,
    pub title: Option<String>,
    pub summary: String,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub processed: bool,
    /// Whether the page body has already been summarized.
    pub marked: bool,
}

impl ClipPage {
    /// Builds a page from a Notion page object.
    ///
    /// Missing properties read as empty; only a missing or invalid page id
    /// is an error.
    pub fn from_value(value: Value, names: &PropertyNames) -> Result<Self, AppError> {
        let raw: RawPage = serde_json::from_value(value)?;
        if raw.id.trim().is_empty() {
            return Err(ValidationError::EmptyField("id").into());
        }
        let id = PageId::parse(&raw.id)?;

        let text_of = |name: &str| {
            raw.properties
                .get(name)
                .map(|p| p.plain_text().trim().to_string())
                .unwrap_or_default()
        };

        let title = Some(text_of(&names.title)).filter(|t| !t.is_empty());
        let summary = text_of(&names.summary);

        let tags = raw
            .properties
            .get(&names.tags)
            .map(|p| {
                let from_text = p.plain_text();
                let from_text = from_text
                    .split(TAG_SEPARATOR)
                    .map(|t| t.trim().to_string());
                let from_options = p.multi_select.iter().map(|o| o.name.trim().to_string());
                unique_tags(from_text.chain(from_options))
            })
            .unwrap_or_default();

        let category = raw
            .properties
            .get(&names.category)
            .and_then(|p| p.select.as_ref())
            .map(|s| s.name.clone())
            .filter(|name| !name.is_empty());

        let ticked = |name: &str| {
            raw.properties
                .get(name)
                .and_then(|p| p.checkbox)
                .unwrap_or(false)
        };
        let processed = ticked(&names.processed);
        let marked = ticked(&names.marked);

        Ok(Self {
            id,
            title,
            summary,
            tags,
            category,
            processed,
            marked,
        })
    }

    /// Name shown in diagnostics.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(UNTITLED_PAGE)
    }

    /// Best-effort display name for a page object that failed to parse.
    pub fn display_name_hint(value: &Value, names: &PropertyNames) -> String {
        value
            .get("properties")
            .and_then(|p| p.get(&names.title))
            .and_then(|p| p.get("title"))
            .and_then(|t| t.get(0))
            .and_then(|t| t.get("plain_text"))
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| value.get("id").and_then(Value::as_str))
            .unwrap_or(UNTITLED_PAGE)
            .to_string()
    }
}

/// Text of the paragraph blocks of a page body, one line per paragraph.
///
/// Other block types and paragraphs without text are left out.
pub fn paragraph_text(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter_map(|block| RawBlock::deserialize(block).ok())
        .filter_map(|block| block.paragraph)
        .map(|paragraph| {
            paragraph
                .rich_text
                .iter()
                .map(|item| item.plain_text.as_str())
                .collect::<String>()
        })
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drops empty entries and repeats, keeping first occurrences in order.
pub fn unique_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tags.into_iter()
        .map(Into::into)
        .filter(|tag| !tag.is_empty())
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect()
}
