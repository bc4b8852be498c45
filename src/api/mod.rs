//! Jamf Pro API interaction module
//!
//! This module provides the transport layer the collection resources are
//! built on: an HTTP client, the connection that owns per-server state, and
//! the error taxonomy shared by every operation.
//!
//! # Module Structure
//!
//! - [`connection`] - Connection handle, owner of the collection cache and paging cursors
//! - [`http`] - HTTP utilities for REST API calls
//! - [`error`] - Error types and the structured API error list
//!
//! # Example
//!
//! ```ignore
//! use jamf_collections::api::Connection;
//!
//! async fn example() -> jamf_collections::Result<()> {
//!     let cnx = Connection::new("https://jamf.example.com/api", Some("token"))?;
//!     let categories = cnx.collection("categories")?.all(&Default::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod error;
pub mod http;

pub use connection::{format_api_error, Connection};
pub use error::{Error, ErrorInfo, Result};
