//! Collection resource layer
//!
//! This module provides a data-driven approach to Jamf Pro collection
//! resources. Type definitions (fields, identifiers, aliases, capabilities)
//! are loaded from JSON files at compile time, so new collection types can
//! be added without code changes.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches collection type definitions from embedded JSON
//! - [`paging`] - Paging cursors plus sort and filter normalization
//! - [`cache`] - Per-connection cache of full collection snapshots
//! - [`resolver`] - Finds one member by id or any other identifier
//! - [`collection`] - The collection façade: `all`, `fetch`, `create`, `delete`, ...
//! - [`instance`] - Typed members that can save and delete themselves
//!
//! # Resource Definitions
//!
//! Collection types are defined in JSON files under `src/resources/`:
//! - `base.json` - The abstract base plus categories, departments, buildings, sites
//! - `inventory.json` - Inventory preload records, prestages, computer inventory
//! - `settings.json` - API roles, scripts
//!
//! # Example
//!
//! ```ignore
//! use jamf_collections::{AllOptions, Connection, Lookup};
//!
//! async fn rename(cnx: &Connection) -> jamf_collections::Result<()> {
//!     let categories = cnx.collection("categories")?;
//!     let mut cat = categories.fetch(&Lookup::by("name", "Utilities")).await?;
//!     cat.set("name", "Tools".into())?;
//!     cat.save().await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod collection;
pub mod instance;
pub mod paging;
mod registry;
pub mod resolver;

pub use collection::{AllOptions, Collection, DeletePolicy};
pub use instance::Instance;
pub use paging::{Sort, SortDirection};
pub use registry::*;
pub use resolver::Lookup;
