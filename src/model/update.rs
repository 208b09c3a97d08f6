use super::PropertyNames;
use crate::constants::{FALLBACK_CATEGORY, NOTION_RICH_TEXT_LIMIT, TAG_SEPARATOR};
use serde_json::{json, Map, Value};

/// The single write applied to a page once it has been analyzed.
#[derive(Debug, Clone, PartialEq)]
pub struct PageUpdate {
    pub tags: Vec<String>,
    pub category: String,
}

impl PageUpdate {
    /// A blank category is written as the fallback label.
    pub fn new(tags: Vec<String>, category: &str) -> Self {
        let category = match category.trim() {
            "" => FALLBACK_CATEGORY.to_string(),
            label => label.to_string(),
        };
        Self { tags, category }
    }

    /// Tags joined into one rich-text value, cut to Notion's length limit.
    pub fn tags_text(&self) -> Option<String> {
        if self.tags.is_empty() {
            return None;
        }
        Some(fit_rich_text("Tag list", self.tags.join(TAG_SEPARATOR)))
    }

    /// Request body for `PATCH /pages/{id}`: tags, category and the processed
    /// flag in one request.
    pub fn to_request_body(&self, names: &PropertyNames) -> Value {
        let mut properties = Map::new();

        if let Some(text) = self.tags_text() {
            properties.insert(names.tags.clone(), rich_text_value(&text));
        }

        properties.insert(
            names.category.clone(),
            json!({"select": {"name": self.category}}),
        );
        properties.insert(
            names.processed.clone(),
            json!({"type": "checkbox", "checkbox": true}),
        );

        json!({ "properties": properties })
    }
}

/// A model-written summary of the page body, stored together with the
/// summarized checkbox.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryUpdate {
    pub summary: String,
}

impl SummaryUpdate {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: fit_rich_text("Summary", summary.into()),
        }
    }

    /// Request body for `PATCH /pages/{id}`: the summary and the marked flag.
    pub fn to_request_body(&self, names: &PropertyNames) -> Value {
        let mut properties = Map::new();
        properties.insert(names.summary.clone(), rich_text_value(&self.summary));
        properties.insert(
            names.marked.clone(),
            json!({"type": "checkbox", "checkbox": true}),
        );
        json!({ "properties": properties })
    }
}

fn rich_text_value(text: &str) -> Value {
    json!({
        "type": "rich_text",
        "rich_text": [
            {"type": "text", "text": {"content": text, "link": null}}
        ]
    })
}

/// Cuts text to Notion's rich-text length limit.
fn fit_rich_text(what: &str, text: String) -> String {
    if text.chars().count() <= NOTION_RICH_TEXT_LIMIT {
        return text;
    }
    log::warn!("{} exceeds {} characters, truncating", what, NOTION_RICH_TEXT_LIMIT);
    text.chars().take(NOTION_RICH_TEXT_LIMIT).collect()
}
