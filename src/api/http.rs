//! HTTP utilities for Jamf Pro API calls

use super::error::{parse_error_body, Error, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let char_count = body.chars().count();
    let truncated = if char_count > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for Jamf Pro API calls
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jcoll/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Make a GET request
    pub async fn get(&self, url: &Url, token: Option<&str>) -> Result<Value> {
        tracing::debug!("GET {}", url);
        let request = authorize(self.client.get(url.clone()), token);
        send(request).await
    }

    /// Make a POST request
    pub async fn post(
        &self,
        url: &Url,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value> {
        tracing::debug!("POST {}", url);

        let mut request = authorize(self.client.post(url.clone()), token);
        if let Some(body) = body {
            request = request.json(body);
        }

        send(request).await
    }

    /// Make a PUT request
    pub async fn put(&self, url: &Url, token: Option<&str>, body: &Value) -> Result<Value> {
        tracing::debug!("PUT {}", url);
        let request = authorize(self.client.put(url.clone()), token).json(body);
        send(request).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &Url, token: Option<&str>) -> Result<Value> {
        tracing::debug!("DELETE {}", url);
        let request = authorize(self.client.delete(url.clone()), token);
        send(request).await
    }
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn send(request: RequestBuilder) -> Result<Value> {
    let response = request.send().await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        // 404s are routine during identifier lookups
        if status.as_u16() == 404 {
            tracing::debug!("API not found: {}", sanitize_for_log(&body));
        } else {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
        }
        return Err(Error::Api {
            status: status.as_u16(),
            errors: parse_error_body(&body),
        });
    }

    // Handle empty response
    if body.is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let logged = sanitize_for_log(&body);
        assert!(logged.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(logged.contains("500 bytes total"));
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize_for_log("a\nb\tc"), "abc");
    }

    #[test]
    fn test_sanitize_multibyte_boundary() {
        let body = "é".repeat(300);
        let logged = sanitize_for_log(&body);
        assert!(logged.contains("truncated"));
    }
}
