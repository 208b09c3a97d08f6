// src/api/types.rs
//! Type definitions for the Notion API module.

use serde::Deserialize;
use serde_json::{json, Value};

/// Generic paginated response from Notion API.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedResponse<T> {
    #[serde(default)]
    pub object: String,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// One batch of database query results.
#[derive(Debug, Clone)]
pub struct QueryBatch {
    /// Cursor this batch was fetched with (`None` for the first batch).
    pub cursor: Option<String>,
    /// Raw page objects, parsed one by one by the pipeline.
    pub pages: Vec<Value>,
    pub has_more: bool,
}

/// Filter selecting pages whose checkbox property is still unticked.
pub fn unticked_filter(checkbox_property: &str) -> Value {
    json!({
        "property": checkbox_property,
        "checkbox": { "equals": false }
    })
}

/// Filter selecting pages filed under one category.
pub fn category_filter(category_property: &str, label: &str) -> Value {
    json!({
        "property": category_property,
        "select": { "equals": label }
    })
}
