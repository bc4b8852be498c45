//! Error types for collection operations
//!
//! Callers need to tell "found nothing" (an empty or absent result, never an
//! error) apart from "not permitted" ([`Error::Unsupported`]) and from
//! server failures ([`Error::Api`], which carries the HTTP status and the
//! structured error list the server reported).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// One entry of the structured error list returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Id of the member the error refers to, when the server names one
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
}

impl ErrorInfo {
    /// Entry recorded for an id whose delete call came back 404 without detail
    pub fn not_found(id: &str) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            field: None,
            description: Some(format!("No member with id {}", id)),
            id: Some(id.to_string()),
        }
    }
}

/// Ids arrive as either `"7"` or `7` depending on the endpoint
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The collection type does not allow the operation
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Bad caller input, rejected before any network call
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A lookup that had to produce exactly one member found none
    #[error("no such item: {0}")]
    NoSuchItem(String),

    /// Non-2xx response from the server
    #[error("API request failed: {status}")]
    Api { status: u16, errors: Vec<ErrorInfo> },

    /// A 2xx response whose body lacks what the endpoint always returns
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("failed to send request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse response JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// HTTP status for server failures
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Decode the structured error list out of a failed response body.
///
/// The API answers failures with `{"httpStatus": 404, "errors": [...]}`;
/// anything else decodes to an empty list.
pub fn parse_error_body(body: &str) -> Vec<ErrorInfo> {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        errors: Vec<ErrorInfo>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.errors)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_body_reads_errors() {
        let body = r#"{"httpStatus":404,"errors":[{"code":"INVALID_ID","field":"id","description":"gone","id":"999"}]}"#;
        let errors = parse_error_body(body);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "INVALID_ID");
        assert_eq!(errors[0].id.as_deref(), Some("999"));
    }

    #[test]
    fn test_parse_error_body_numeric_id() {
        let errors = parse_error_body(r#"{"errors":[{"code":"X","id":12}]}"#);
        assert_eq!(errors[0].id.as_deref(), Some("12"));
    }

    #[test]
    fn test_parse_error_body_garbage_is_empty() {
        assert!(parse_error_body("<html>oops</html>").is_empty());
        assert!(parse_error_body("").is_empty());
    }

    #[test]
    fn test_is_not_found() {
        let err = Error::Api {
            status: 404,
            errors: vec![],
        };
        assert!(err.is_not_found());
        assert!(!Error::InvalidInput("x".into()).is_not_found());
    }
}
