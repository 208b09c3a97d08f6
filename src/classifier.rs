// src/classifier.rs
//! Category classification against a closed catalog of labels.
//!
//! The model is asked for one label, and whatever it answers is normalized
//! so that only catalog labels (or the fallback label) are ever written.

use crate::constants::{DEFAULT_CATEGORIES, FALLBACK_CATEGORY};
use crate::error::AppError;
use crate::llm::LlmClient;
use crate::types::ValidationError;
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Prefixes models like to put in front of the label ("category:", "category name:" ...).
static LABEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"分类名称：|分类：|分类为：|分类为:|分类:|分类名称:")
        .expect("label prefix regex is valid")
});

/// The closed, ordered set of labels a page may be filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    labels: IndexSet<String>,
}

impl CategoryCatalog {
    /// Builds a catalog; blank entries and repeats are dropped.
    pub fn new<I, S>(labels: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels: IndexSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();

        if labels.is_empty() {
            return Err(ValidationError::InvalidCatalog {
                reason: "catalog has no labels".to_string(),
            });
        }
        Ok(Self { labels })
    }

    /// Reads one label per line; blank lines and `#` comments are ignored.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        let labels = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#'));
        Ok(Self::new(labels)?)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Labels joined for inclusion in a prompt.
    pub fn joined(&self, separator: &str) -> String {
        self.iter().collect::<Vec<_>>().join(separator)
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self {
            labels: DEFAULT_CATEGORIES.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// Reduces raw model output to a catalog label.
///
/// Returns an empty string when nothing is left after stripping (the page
/// could not be classified) and the fallback label for anything outside the
/// catalog.
pub fn normalize_label(raw: &str, catalog: &CategoryCatalog) -> String {
    let stripped = LABEL_PREFIX.replace_all(raw, "");
    let label = stripped.trim();

    if label.is_empty() {
        String::new()
    } else if catalog.contains(label) {
        label.to_string()
    } else {
        log::debug!("Label '{}' is not in the catalog, using fallback", label);
        FALLBACK_CATEGORY.to_string()
    }
}

/// Asks the model for a category and normalizes the answer.
pub struct CategoryClassifier<'a> {
    llm: &'a LlmClient,
    catalog: &'a CategoryCatalog,
}

impl<'a> CategoryClassifier<'a> {
    pub fn new(llm: &'a LlmClient, catalog: &'a CategoryCatalog) -> Self {
        Self { llm, catalog }
    }

    /// Best-fit label for the summary and tags, or `""` when the model fails
    /// or gives no usable answer.
    pub async fn classify(&self, summary: &str, tags: &[String]) -> String {
        match self.llm.classify(summary, tags, self.catalog).await {
            Ok(raw) => normalize_label(&raw, self.catalog),
            Err(e) => {
                log::warn!("Classification failed: {}", e);
                String::new()
            }
        }
    }
}
