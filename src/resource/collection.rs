//! Collection Resource
//!
//! The public face of one collection type on one connection. Calls without
//! sort, filter or paging go through the per-connection cache of the full
//! collection; anything else hits the server every time and leaves the
//! cache alone.

use super::instance::Instance;
use super::paging::{
    clamp_page_size, collection_count, fetch_all_pages, fetch_page, normalize_filter,
    PageRequest, Sort,
};
use super::registry::ResourceDef;
use super::resolver::Lookup;
use crate::api::error::{Error, ErrorInfo, Result};
use crate::api::Connection;
use rand::seq::SliceRandom;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Options for [`Collection::all`]
#[derive(Debug, Clone, Default)]
pub struct AllOptions {
    pub sort: Option<Sort>,
    /// RSQL filter expression, passed through verbatim
    pub filter: Option<String>,
    /// Return only the first page; continue with [`Collection::next_page_of_all`]
    pub paged: bool,
    /// Clamped to 1..=2000, default 100. Only used when paged.
    pub page_size: Option<u32>,
    /// Re-fetch the cached full collection. Only used on the cached path.
    pub refresh: bool,
}

impl AllOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn paged(mut self, page_size: u32) -> Self {
        self.paged = true;
        self.page_size = Some(page_size);
        self
    }

    pub fn refresh(mut self) -> Self {
        self.refresh = true;
        self
    }
}

/// What to do when deleting one id at a time hits a non-404 failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Stop and return the error; ids already deleted stay deleted
    #[default]
    AbortOnError,
    /// Record the failure and carry on with the remaining ids
    ContinueOnError,
}

/// One collection type, bound to a connection
#[derive(Debug, Clone, Copy)]
pub struct Collection<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) def: &'static ResourceDef,
}

impl<'a> Collection<'a> {
    pub fn new(conn: &'a Connection, def: &'static ResourceDef) -> Self {
        Self { conn, def }
    }

    pub fn def(&self) -> &'static ResourceDef {
        self.def
    }

    pub fn connection(&self) -> &'a Connection {
        self.conn
    }

    // =========================================================================
    // Retrieval
    // =========================================================================

    /// Raw records of the collection, in server order.
    ///
    /// Without sort, filter or paging this is the cached full collection.
    /// Any non-paged call ends the current paging session for the type.
    pub async fn all(&self, options: &AllOptions) -> Result<Vec<Value>> {
        self.def.stop_if_abstract()?;

        if !options.paged {
            self.conn.stop_cursor(&self.def.key);
        }

        let sort = options.sort.as_ref().and_then(Sort::to_query);
        let filter = normalize_filter(options.filter.as_deref());

        if !options.paged && sort.is_none() && filter.is_none() {
            return Ok(self.cached_all(options.refresh).await?.to_vec());
        }

        let filter = if self.def.capabilities.filterable {
            filter
        } else {
            if filter.is_some() {
                tracing::debug!("{} does not support filters, ignoring", self.def.display_name);
            }
            None
        };

        if options.paged {
            let request = PageRequest::first(
                &self.def.rsrc_path,
                clamp_page_size(options.page_size),
                sort,
                filter,
            );
            self.conn.start_cursor(&self.def.key, request.clone());
            fetch_page(self.conn, &request).await
        } else {
            fetch_all_pages(self.conn, &self.def.rsrc_path, sort, filter).await
        }
    }

    /// Like [`Collection::all`], with every record materialized
    pub async fn all_instances(&self, options: &AllOptions) -> Result<Vec<Instance>> {
        let records = self.all(options).await?;
        Ok(self.materialize(records))
    }

    /// Next page of the last paged `all` for this type. Empty at the end,
    /// and empty when no paged request was made.
    pub async fn next_page_of_all(&self) -> Result<Vec<Value>> {
        let Some(request) = self.conn.advance_cursor(&self.def.key) else {
            return Ok(Vec::new());
        };
        fetch_page(self.conn, &request).await
    }

    /// Build instances from raw records
    pub fn materialize(&self, records: impl IntoIterator<Item = Value>) -> Vec<Instance> {
        records
            .into_iter()
            .map(|record| Instance::from_raw(self.def, self.conn.clone(), record))
            .collect()
    }

    /// The cached full collection, fetched first if missing or when refreshing
    pub(crate) async fn cached_all(&self, refresh: bool) -> Result<Arc<Vec<Value>>> {
        let key = &self.def.key;
        if refresh {
            self.conn.flush_cache(Some(key));
        }

        if let Some(records) = self.conn.cached_records(key) {
            tracing::debug!("cache hit for {}", key);
            return Ok(records);
        }

        tracing::debug!("cache miss for {}, fetching all pages", key);
        let records = fetch_all_pages(self.conn, &self.def.rsrc_path, None, None).await?;
        Ok(self.conn.store_records(key, records))
    }

    pub async fn count(&self) -> Result<u64> {
        self.def.stop_if_abstract()?;
        collection_count(self.conn, &self.def.rsrc_path).await
    }

    // =========================================================================
    // Derived lists
    // =========================================================================

    /// Ids of every member
    pub async fn all_ids(&self, refresh: bool) -> Result<Vec<Value>> {
        self.def.stop_if_abstract()?;
        let records = self.cached_all(refresh).await?;
        Ok(records.iter().filter_map(|r| r.get("id").cloned()).collect())
    }

    /// Every value of one field across the collection.
    ///
    /// Primitive fields are de-duplicated, keeping first-seen order.
    pub async fn all_values(&self, field: &str, refresh: bool) -> Result<Vec<Value>> {
        self.def.stop_if_abstract()?;
        let field_def = self.def.field(field).ok_or_else(|| {
            Error::InvalidInput(format!(
                "No attribute {} for {}",
                field, self.def.display_name
            ))
        })?;

        let records = self.cached_all(refresh).await?;
        let values = records
            .iter()
            .map(|r| r.get(&field_def.name).cloned().unwrap_or(Value::Null));

        if !field_def.kind.is_primitive() {
            return Ok(values.collect());
        }

        let mut seen = HashSet::new();
        Ok(values.filter(|v| seen.insert(v.to_string())).collect())
    }

    /// Map one identifier to another attribute for every member.
    /// Aliases are accepted for both names.
    pub async fn map_all(
        &self,
        ident: &str,
        to: &str,
        refresh: bool,
    ) -> Result<HashMap<String, Value>> {
        self.def.stop_if_abstract()?;

        let real_ident = self.def.attr_key_for_alias(ident);
        if !self.def.is_identifier(real_ident) {
            return Err(Error::InvalidInput(format!(
                "No identifier {} for {}",
                ident, self.def.display_name
            )));
        }
        let real_to = self.def.attr_key_for_alias(to);
        if self.def.field(real_to).is_none() {
            return Err(Error::InvalidInput(format!(
                "No attribute {} for {}",
                to, self.def.display_name
            )));
        }

        let records = self.cached_all(refresh).await?;
        Ok(records
            .iter()
            .filter_map(|r| {
                let key = r.get(real_ident).filter(|v| !v.is_null())?;
                let value = r.get(real_to).cloned().unwrap_or(Value::Null);
                Some((value_to_string(key), value))
            })
            .collect())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Materialize one member found by any identifier
    pub async fn fetch(&self, lookup: &Lookup) -> Result<Instance> {
        self.def.stop_if_abstract()?;
        match self.raw_data(lookup).await? {
            Some(record) => Ok(Instance::from_raw(self.def, self.conn.clone(), record)),
            None => Err(Error::NoSuchItem(format!(
                "No matching {}",
                self.def.display_name
            ))),
        }
    }

    /// Materialize a randomly chosen member of the cached collection
    pub async fn fetch_random(&self) -> Result<Instance> {
        self.def.stop_if_abstract()?;
        let records = self.cached_all(false).await?;
        let record = records
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| Error::NoSuchItem(format!("No {} members", self.def.display_name)))?;
        Ok(Instance::from_raw(self.def, self.conn.clone(), record))
    }

    /// New, unsaved member. Call [`Instance::save`] to send it to the server.
    pub fn create(&self, fields: Map<String, Value>) -> Result<Instance> {
        self.def.stop_if_abstract()?;
        if !self.def.capabilities.creatable {
            return Err(Error::Unsupported(format!(
                "{} objects are not currently creatable via the API",
                self.def.display_name
            )));
        }

        let mut data = Map::new();
        for (name, value) in fields {
            let Some(field) = self.def.field(&name) else {
                return Err(Error::InvalidInput(format!(
                    "Unknown parameter: {}",
                    name
                )));
            };
            // ids are assigned by the server
            if field.name == "id" {
                continue;
            }
            data.insert(field.name.clone(), field.validate(value)?);
        }

        Ok(Instance::new_unsaved(self.def, self.conn.clone(), data))
    }

    /// Delete members by id, stopping at the first non-404 failure.
    ///
    /// Returns the error details for ids that could not be deleted.
    pub async fn delete<I, S>(&self, ids: I) -> Result<Vec<ErrorInfo>>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.delete_with(ids, DeletePolicy::AbortOnError).await
    }

    pub async fn delete_with<I, S>(&self, ids: I, policy: DeletePolicy) -> Result<Vec<ErrorInfo>>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        if self.def.is_abstract || !self.def.capabilities.deletable {
            return Err(Error::Unsupported(format!(
                "Deleting {} objects is not currently supported",
                self.def.display_name
            )));
        }

        let ids: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(bulk_path) = &self.def.capabilities.bulk_delete_path {
            return self.bulk_delete(bulk_path, &ids).await;
        }

        let mut errors = Vec::new();
        for id in &ids {
            match self.conn.delete(&self.def.member_path(id)).await {
                Ok(_) => tracing::info!("deleted {} {}", self.def.display_name, id),
                Err(Error::Api {
                    status: 404,
                    errors: detail,
                }) => {
                    tracing::warn!("{} {} not found, skipping", self.def.display_name, id);
                    if detail.is_empty() {
                        errors.push(ErrorInfo::not_found(id));
                    } else {
                        errors.extend(detail);
                    }
                }
                Err(Error::Api { status, errors: detail })
                    if policy == DeletePolicy::ContinueOnError =>
                {
                    tracing::warn!(
                        "deleting {} {} failed with {}, continuing",
                        self.def.display_name,
                        id,
                        status
                    );
                    if detail.is_empty() {
                        errors.push(ErrorInfo {
                            code: status.to_string(),
                            description: Some(format!("Delete failed with HTTP {}", status)),
                            id: Some(id.clone()),
                            field: None,
                        });
                    } else {
                        errors.extend(detail);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(errors)
    }

    async fn bulk_delete(&self, bulk_path: &str, ids: &[String]) -> Result<Vec<ErrorInfo>> {
        tracing::info!("bulk deleting {} {} objects", ids.len(), self.def.display_name);
        match self.conn.post(bulk_path, &json!({ "ids": ids })).await {
            Ok(body) => match body.get("errors") {
                Some(errors) if !errors.is_null() => {
                    Ok(serde_json::from_value::<Vec<ErrorInfo>>(errors.clone())?)
                }
                _ => Ok(Vec::new()),
            },
            Err(Error::Api {
                status: 404,
                errors,
            }) => Ok(errors),
            Err(e) => Err(e),
        }
    }
}

/// String form of a field value: strings unquoted, everything else as JSON
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
