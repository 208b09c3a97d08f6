use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// Strong typing for IDs with phantom types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id<T> {
    value: String,
    _phantom: PhantomData<T>,
}

/// Marker types for different ID kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatabaseMarker;

/// Type aliases for specific ID types
pub type PageId = Id<PageMarker>;
pub type DatabaseId = Id<DatabaseMarker>;

static ID_IN_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:[/-])([a-fA-F0-9]{32}|[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12})(?:[/?#]|$)",
    )
    .expect("Notion ID regex is valid")
});

impl<T> Id<T> {
    /// Parse a bare ID (dashed or not) or a notion.so URL into a normalized ID.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = normalize_notion_id(input)?;
        Ok(Self {
            value: normalized,
            _phantom: PhantomData,
        })
    }

    /// Get the ID as a string reference (32 lowercase hex characters)
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Get the ID with dashes for API calls
    pub fn to_dashed(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            &self.value[0..8],
            &self.value[8..12],
            &self.value[12..16],
            &self.value[16..20],
            &self.value[20..32]
        )
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dashed())
    }
}

/// Normalize various Notion ID formats into 32 lowercase hex characters.
fn normalize_notion_id(input: &str) -> Result<String, ValidationError> {
    let cleaned = input.trim().trim_end_matches('/');

    if let Ok(uuid) = Uuid::parse_str(cleaned) {
        return Ok(uuid.as_simple().to_string());
    }

    if cleaned.starts_with("http://") || cleaned.starts_with("https://") {
        return ID_IN_URL
            .captures(cleaned)
            .and_then(|captures| captures.get(1))
            .and_then(|m| Uuid::parse_str(m.as_str()).ok())
            .map(|uuid| uuid.as_simple().to_string())
            .ok_or_else(|| {
                ValidationError::InvalidId(format!("No valid ID found in URL: {}", cleaned))
            });
    }

    Err(ValidationError::InvalidId(format!(
        "Could not parse Notion ID from: {}",
        input
    )))
}
