//! Domain-specific newtypes for type safety and validation.

use super::ValidationError;
use std::fmt;
use url::Url;

/// Integration token for Notion API authentication
#[derive(Clone, PartialEq, Eq)]
pub struct NotionToken(String);

impl NotionToken {
    /// Create a new Notion token with validation
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into().trim().to_string();

        if token.is_empty() {
            return Err(ValidationError::InvalidApiKey {
                reason: "Notion token cannot be empty".to_string(),
            });
        }

        if !token.starts_with("secret_") && !token.starts_with("ntn_") {
            return Err(ValidationError::InvalidApiKey {
                reason: "Notion token must start with 'secret_' or 'ntn_'".to_string(),
            });
        }

        if token.len() < 20 {
            return Err(ValidationError::InvalidApiKey {
                reason: "Notion token is too short".to_string(),
            });
        }

        Ok(Self(token))
    }

    /// Get the token as a string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...", &self.0[..10])
    }
}

impl fmt::Debug for NotionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NotionToken({})", self)
    }
}

/// Bearer key for a hosted model API
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Create a new API key; the only requirement is that it is not blank
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(ValidationError::InvalidApiKey {
                reason: "API key cannot be empty".to_string(),
            });
        }
        Ok(Self(key))
    }

    /// Get the API key as a string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: String = self.0.chars().take(4).collect();
        write!(f, "ApiKey({}...)", shown)
    }
}

/// Validated http(s) URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl(Url);

impl ValidatedUrl {
    /// Create a new validated URL
    pub fn parse(url: &str) -> Result<Self, ValidationError> {
        match Url::parse(url.trim()) {
            Ok(parsed_url) => {
                if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
                    return Err(ValidationError::InvalidUrl {
                        url: url.to_string(),
                        reason: "Only HTTP and HTTPS URLs are supported".to_string(),
                    });
                }
                Ok(Self(parsed_url))
            }
            Err(e) => Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Get the URL as a string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the URL without a trailing slash, for joining endpoint paths
    pub fn trimmed(&self) -> &str {
        self.0.as_str().trim_end_matches('/')
    }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
