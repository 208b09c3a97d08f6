// src/api/parser.rs
//! Decoding of Notion API responses.

use super::client::HttpResponse;
use super::types::PaginatedResponse;
use crate::error::{AppError, NotionErrorCode};
use notion_client::objects::error::Error as NotionError;
use serde_json::Value;

/// Parse a paginated list (database query or block children); items stay raw.
pub fn parse_query_response(response: &HttpResponse) -> Result<PaginatedResponse<Value>, AppError> {
    response.json()
}

/// Parse a page retrieval response. An empty body or empty object means
/// Notion returned nothing.
pub fn parse_page_response(response: &HttpResponse) -> Result<Option<Value>, AppError> {
    let value: Value = response.json()?;
    match &value {
        Value::Object(fields) if fields.is_empty() => Ok(None),
        Value::Object(_) => Ok(Some(value)),
        Value::Null => Ok(None),
        _ => Err(AppError::MalformedResponse(format!(
            "expected a page object from {}",
            response.url
        ))),
    }
}

/// Notion's structured error (code and message) behind a rejected request.
pub fn describe_notion_error(error: &AppError) -> Option<(NotionErrorCode, String)> {
    let AppError::HttpStatus { body, .. } = error else {
        return None;
    };
    let parsed: NotionError = serde_json::from_str(body).ok()?;
    Some((
        NotionErrorCode::from_api_response(&parsed.code.to_string()),
        parsed.message,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            url: "https://api.notion.com/v1/pages/x".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn empty_page_body_is_no_page() {
        assert!(parse_page_response(&ok("")).unwrap().is_none());
        assert!(parse_page_response(&ok("{}")).unwrap().is_none());
        assert!(parse_page_response(&ok(r#"{"id": "x"}"#)).unwrap().is_some());
        assert!(parse_page_response(&ok("[1]")).is_err());
    }

    #[test]
    fn query_response_keeps_cursor() {
        let response = parse_query_response(&ok(
            r#"{"object": "list", "results": [{"id": "a"}], "has_more": true, "next_cursor": "c2"}"#,
        ))
        .unwrap();
        assert_eq!(response.results.len(), 1);
        assert!(response.has_more);
        assert_eq!(response.next_cursor.as_deref(), Some("c2"));
    }

    #[test]
    fn test_error_parsing_with_notion_client() {
        let error = AppError::HttpStatus {
            status: StatusCode::BAD_REQUEST,
            url: "https://api.notion.com/v1/pages/x".to_string(),
            body: r#"{
                "object": "error",
                "status": 400,
                "code": "validation_error",
                "message": "Classfiy is not a property that exists.",
                "request_id": "req_123"
            }"#
            .to_string(),
        };

        let (code, message) = describe_notion_error(&error).unwrap();
        assert_eq!(code, NotionErrorCode::ValidationFailed);
        assert_eq!(message, "Classfiy is not a property that exists.");

        let opaque = AppError::HttpStatus {
            status: StatusCode::BAD_GATEWAY,
            url: "https://api.notion.com/v1/pages/x".to_string(),
            body: "<html>bad gateway</html>".to_string(),
        };
        assert!(describe_notion_error(&opaque).is_none());
    }
}
