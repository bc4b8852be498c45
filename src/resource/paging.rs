//! Paging, sorting and filtering of collection requests
//!
//! Collection endpoints take `page`, `page-size`, `sort` and `filter` query
//! parameters and answer with `{"totalCount": n, "results": [...]}`. A page
//! with no results marks the end of the collection.

use crate::api::error::{Error, Result};
use crate::api::Connection;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const MIN_PAGE_SIZE: u32 = 1;
pub const MAX_PAGE_SIZE: u32 = 2000;
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Clamp a requested page size into the range the server accepts
pub fn clamp_page_size(size: Option<u32>) -> u32 {
    size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// Server-side sort criteria
///
/// Each criterion is a `field:direction` token. Tokens are kept exactly as
/// given; `"name:asc,id:desc"` and `["name:asc", "id:desc"]` are the same sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    tokens: Vec<String>,
}

impl Sort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a criterion
    pub fn by(mut self, field: &str, direction: SortDirection) -> Self {
        self.tokens.push(format!("{}:{}", field, direction));
        self
    }

    /// Parse a sequence of tokens, any of which may itself be comma-joined
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let mut sort = Self::new();
        for chunk in tokens {
            for token in chunk.as_ref().split(',') {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                validate_sort_token(token)?;
                sort.tokens.push(token.to_string());
            }
        }
        Ok(sort)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Comma-joined form sent as the `sort` query parameter
    pub fn to_query(&self) -> Option<String> {
        if self.tokens.is_empty() {
            None
        } else {
            Some(self.tokens.join(","))
        }
    }
}

impl FromStr for Sort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Sort::parse(&[s])
    }
}

fn validate_sort_token(token: &str) -> Result<()> {
    let valid = match token.split_once(':') {
        Some((field, direction)) => {
            !field.trim().is_empty()
                && (direction.eq_ignore_ascii_case("asc") || direction.eq_ignore_ascii_case("desc"))
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Invalid sort criterion '{}', expected field:asc or field:desc",
            token
        )))
    }
}

/// Normalize a filter expression: surrounding whitespace trimmed, empty means none
pub fn normalize_filter(filter: Option<&str>) -> Option<String> {
    filter
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}

/// RSQL equality on one field, with the value single-quoted and escaped
pub fn equals_filter(field: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("{}=='{}'", field, escaped)
}

/// One page request against a collection path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub rsrc_path: String,
    pub page: u32,
    pub page_size: u32,
    pub sort: Option<String>,
    pub filter: Option<String>,
}

impl PageRequest {
    /// Request for page 0
    pub fn first(
        rsrc_path: &str,
        page_size: u32,
        sort: Option<String>,
        filter: Option<String>,
    ) -> Self {
        Self {
            rsrc_path: rsrc_path.to_string(),
            page: 0,
            page_size: page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE),
            sort,
            filter,
        }
    }

    /// The same request, one page further
    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }

    /// Path with the query string for this page
    pub fn path(&self) -> String {
        let mut path = format!(
            "{}?page={}&page-size={}",
            self.rsrc_path, self.page, self.page_size
        );
        if let Some(sort) = &self.sort {
            path.push_str(&format!("&sort={}", urlencoding::encode(sort)));
        }
        if let Some(filter) = &self.filter {
            path.push_str(&format!("&filter={}", urlencoding::encode(filter)));
        }
        path
    }
}

/// Paging cursors, at most one per collection type
#[derive(Debug, Default)]
pub struct PagingCursors {
    cursors: HashMap<String, PageRequest>,
}

impl PagingCursors {
    /// Remember a first-page request, replacing any unfinished cursor
    pub fn start(&mut self, key: &str, request: PageRequest) {
        tracing::debug!("paging cursor for {} reset to page {}", key, request.page);
        self.cursors.insert(key.to_string(), request);
    }

    /// Move the cursor one page forward, returning the request to issue.
    /// `None` when no paged request was ever made for this type.
    pub fn advance(&mut self, key: &str) -> Option<PageRequest> {
        let cursor = self.cursors.get_mut(key)?;
        *cursor = cursor.next();
        Some(cursor.clone())
    }

    pub fn stop(&mut self, key: &str) {
        if self.cursors.remove(key).is_some() {
            tracing::debug!("paging cursor for {} discarded", key);
        }
    }
}

/// Members contained in a page response
fn page_results(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Fetch one page
pub async fn fetch_page(conn: &Connection, request: &PageRequest) -> Result<Vec<Value>> {
    let body = conn.get(&request.path()).await?;
    let results = page_results(body);
    tracing::debug!(
        "{} page {} returned {} records",
        request.rsrc_path,
        request.page,
        results.len()
    );
    Ok(results)
}

/// Fetch every page, in server order, until a page comes back empty
pub async fn fetch_all_pages(
    conn: &Connection,
    rsrc_path: &str,
    sort: Option<String>,
    filter: Option<String>,
) -> Result<Vec<Value>> {
    let mut all_items = Vec::new();
    let mut request = PageRequest::first(rsrc_path, MAX_PAGE_SIZE, sort, filter);

    loop {
        let page = fetch_page(conn, &request).await?;
        if page.is_empty() {
            break;
        }
        all_items.extend(page);
        request = request.next();
    }

    Ok(all_items)
}

/// Number of members in a collection, as reported by the server
pub async fn collection_count(conn: &Connection, rsrc_path: &str) -> Result<u64> {
    let request = PageRequest::first(rsrc_path, MIN_PAGE_SIZE, None, None);
    let body = conn.get(&request.path()).await?;
    body.get("totalCount")
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            Error::UnexpectedResponse(format!("no totalCount in response from {}", rsrc_path))
        })
}
