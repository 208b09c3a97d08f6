//! Raw Notion property payloads and the property names this tool reads and writes.

use crate::constants::{
    DEFAULT_CATEGORY_PROPERTY, DEFAULT_MARKED_PROPERTY, DEFAULT_PROCESSED_PROPERTY,
    DEFAULT_SUMMARY_PROPERTY, DEFAULT_TAGS_PROPERTY, DEFAULT_TITLE_PROPERTY,
};
use serde::Deserialize;
use std::collections::HashMap;

/// Names of the database columns the pipeline works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyNames {
    pub title: String,
    pub summary: String,
    pub tags: String,
    pub category: String,
    pub processed: String,
    /// Checkbox ticked once the page body has been summarized.
    pub marked: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE_PROPERTY.to_string(),
            summary: DEFAULT_SUMMARY_PROPERTY.to_string(),
            tags: DEFAULT_TAGS_PROPERTY.to_string(),
            category: DEFAULT_CATEGORY_PROPERTY.to_string(),
            processed: DEFAULT_PROCESSED_PROPERTY.to_string(),
            marked: DEFAULT_MARKED_PROPERTY.to_string(),
        }
    }
}

/// A page object as returned by the Notion API, reduced to what we read.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawPage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, RawProperty>,
}

/// One property value. Only the shapes this tool understands are kept;
/// every other property type deserializes to the empty default.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawProperty {
    #[serde(default)]
    pub title: Vec<RawRichText>,
    #[serde(default)]
    pub rich_text: Vec<RawRichText>,
    #[serde(default)]
    pub checkbox: Option<bool>,
    #[serde(default)]
    pub select: Option<RawSelectOption>,
    #[serde(default)]
    pub multi_select: Vec<RawSelectOption>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawRichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSelectOption {
    #[serde(default)]
    pub name: String,
}

impl RawProperty {
    /// Concatenated plain text of a title or rich-text property.
    pub fn plain_text(&self) -> String {
        self.title
            .iter()
            .chain(self.rich_text.iter())
            .map(|item| item.plain_text.as_str())
            .collect()
    }
}

/// A block object, reduced to the paragraph text it may carry.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawBlock {
    #[serde(default)]
    pub paragraph: Option<RawParagraph>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawParagraph {
    #[serde(default)]
    pub rich_text: Vec<RawRichText>,
}
