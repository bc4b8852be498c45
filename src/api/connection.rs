//! API Connection
//!
//! Main handle for talking to a Jamf Pro server. Besides the HTTP plumbing it
//! owns the per-connection collection state: the full-collection cache and the
//! paging cursors, both keyed by collection type. Two connections never share
//! that state.

use super::error::{Error, Result};
use super::http::HttpClient;
use crate::resource::cache::CollectionCache;
use crate::resource::paging::{PageRequest, PagingCursors};
use crate::resource::{get_resource, Collection};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

/// Mutable collection state scoped to one connection
#[derive(Debug, Default)]
pub struct CollectionState {
    pub cache: CollectionCache,
    pub cursors: PagingCursors,
}

/// Connection to one Jamf Pro server
#[derive(Clone)]
pub struct Connection {
    http: HttpClient,
    base_url: Url,
    token: Option<String>,
    state: Arc<Mutex<CollectionState>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl Connection {
    /// Create a new connection.
    ///
    /// `base_url` is the API root, e.g. `https://jamf.example.com/api`.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join drops the last segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: HttpClient::new()?,
            base_url,
            token: token.map(str::to_string),
            state: Arc::new(Mutex::new(CollectionState::default())),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Access a registered collection type through this connection
    pub fn collection(&self, key: &str) -> Result<Collection<'_>> {
        let def = get_resource(key)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown collection type: {}", key)))?;
        Ok(Collection::new(self, def))
    }

    /// Build the absolute URL for an API path (which may carry a query string)
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = self.url(path)?;
        self.http.get(&url, self.token.as_deref()).await
    }

    /// Make a POST request
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path)?;
        self.http.post(&url, self.token.as_deref(), Some(body)).await
    }

    /// Make a PUT request
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path)?;
        self.http.put(&url, self.token.as_deref(), body).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<Value> {
        let url = self.url(path)?;
        self.http.delete(&url, self.token.as_deref()).await
    }

    // =========================================================================
    // Collection state
    // =========================================================================

    // The guard is always dropped before the caller awaits anything.
    fn state(&self) -> MutexGuard<'_, CollectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached full snapshot for a collection type, if any
    pub(crate) fn cached_records(&self, key: &str) -> Option<Arc<Vec<Value>>> {
        self.state().cache.get(key)
    }

    /// Replace the cached snapshot for a collection type
    pub(crate) fn store_records(&self, key: &str, records: Vec<Value>) -> Arc<Vec<Value>> {
        self.state().cache.store(key, records)
    }

    /// Drop the cached snapshot for one collection type, or for all of them
    pub fn flush_cache(&self, key: Option<&str>) {
        let mut state = self.state();
        match key {
            Some(key) => state.cache.invalidate(key),
            None => state.cache.clear(),
        }
    }

    /// Start a new paging cursor, discarding any previous one for the type
    pub(crate) fn start_cursor(&self, key: &str, request: PageRequest) {
        self.state().cursors.start(key, request);
    }

    /// Forget the paging cursor for a type; `next_page_of_all` then returns nothing
    pub(crate) fn stop_cursor(&self, key: &str) {
        self.state().cursors.stop(key);
    }

    /// Advance the paging cursor and return the request for the next page
    pub(crate) fn advance_cursor(&self, key: &str) -> Option<PageRequest> {
        self.state().cursors.advance(key)
    }
}

/// Format an API error for display
pub fn format_api_error(error: &Error) -> String {
    match error {
        Error::Api { status, errors } => {
            let detail = errors
                .iter()
                .filter_map(|e| e.description.as_deref())
                .next()
                .map(|d| format!(" ({})", d))
                .unwrap_or_default();
            let summary = match status {
                401 => "Authentication failed. Check your API token.",
                403 => "Permission denied. Check the API role privileges.",
                404 => "Resource not found.",
                409 => "Resource conflict. The resource may already exist or be in use.",
                429 => "Rate limit exceeded. Please try again later.",
                400 => "Invalid request. Check your parameters.",
                500..=599 => "Jamf Pro server error. Please try again.",
                _ => "Request failed.",
            };
            format!("{}{}", summary, detail)
        }
        Error::Http(_) => {
            "Request failed. Check your network connection and try again.".to_string()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorInfo;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let conn = Connection::new("https://jamf.example.com/api", None).unwrap();
        assert_eq!(
            conn.url("v1/categories").unwrap().as_str(),
            "https://jamf.example.com/api/v1/categories"
        );
        assert_eq!(
            conn.url("/v1/categories?page=0").unwrap().as_str(),
            "https://jamf.example.com/api/v1/categories?page=0"
        );
    }

    #[test]
    fn test_unknown_collection_type() {
        let conn = Connection::new("https://jamf.example.com/api", None).unwrap();
        assert!(matches!(
            conn.collection("no-such-type"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_connections_do_not_share_cache() {
        let a = Connection::new("https://a.example.com/api", None).unwrap();
        let b = Connection::new("https://b.example.com/api", None).unwrap();
        a.store_records("categories", vec![serde_json::json!({"id": "1"})]);
        assert!(a.cached_records("categories").is_some());
        assert!(b.cached_records("categories").is_none());

        // clones share
        let a2 = a.clone();
        assert!(a2.cached_records("categories").is_some());
        a2.flush_cache(None);
        assert!(a.cached_records("categories").is_none());
    }

    #[test]
    fn test_format_api_error_includes_description() {
        let err = Error::Api {
            status: 403,
            errors: vec![ErrorInfo {
                code: "FORBIDDEN".into(),
                description: Some("missing privilege".into()),
                ..Default::default()
            }],
        };
        let msg = format_api_error(&err);
        assert!(msg.starts_with("Permission denied"));
        assert!(msg.contains("missing privilege"));
    }
}
