//! Typed access to the collection resources of the Jamf Pro API.
//!
//! A [`Connection`] owns the per-server state (full-collection cache and
//! paging cursors); [`Connection::collection`] hands out a [`Collection`]
//! for one registered collection type, which offers cached and paged
//! retrieval, identifier lookup, creation and deletion.

pub mod api;
pub mod config;
pub mod resource;

pub use api::{format_api_error, Connection, Error, ErrorInfo, Result};
pub use resource::{
    get_all_resource_keys, get_resource, AllOptions, Collection, DeletePolicy, Instance, Lookup,
    Sort, SortDirection,
};
