//! Identifier Resolver
//!
//! Finds the raw record behind an identifier value using the cheapest
//! strategy available: a direct fetch for ids, a server-side filter for
//! identifiers the server can filter on, and a scan of the cached full
//! collection for everything else.

use super::collection::{value_to_string, Collection};
use super::paging::{equals_filter, fetch_page, PageRequest};
use crate::api::error::Result;
use serde_json::Value;
use std::fmt;

/// How a member is identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// By id, fetched directly from the member path
    ById(String),
    /// By a named identifier (aliases accepted), e.g. `serialNumber`
    ByIdentifier(String, String),
    /// By a value of unknown kind. Integers are taken as ids, anything else
    /// is tried against each identifier in declaration order.
    ByAnyIdentifier(String),
}

impl Lookup {
    pub fn id(id: impl fmt::Display) -> Self {
        Lookup::ById(id.to_string())
    }

    pub fn by(identifier: &str, value: impl fmt::Display) -> Self {
        Lookup::ByIdentifier(identifier.to_string(), value.to_string())
    }

    pub fn any(value: impl fmt::Display) -> Self {
        Lookup::ByAnyIdentifier(value.to_string())
    }
}

/// Does a record's field hold the wanted value?
/// Ids compare exactly, everything else as a case-insensitive string.
fn field_matches(record: &Value, field: &str, wanted: &str) -> bool {
    let Some(value) = record.get(field).filter(|v| !v.is_null()) else {
        return false;
    };
    let value = value_to_string(value);
    if field == "id" {
        value == wanted
    } else {
        value.to_lowercase() == wanted.to_lowercase()
    }
}

impl<'a> Collection<'a> {
    /// Raw data of the member matching the lookup, or `None`
    pub async fn raw_data(&self, lookup: &Lookup) -> Result<Option<Value>> {
        self.def.stop_if_abstract()?;

        match lookup {
            Lookup::ById(id) => self.raw_data_by_id(id).await,
            Lookup::ByIdentifier(ident, value) => {
                let real = self.def.attr_key_for_alias(ident);
                if real == "id" {
                    return self.raw_data_by_id(value).await;
                }
                if !self.def.is_identifier(real) {
                    tracing::debug!("{} is not an identifier of {}", ident, self.def.display_name);
                    return Ok(None);
                }
                self.raw_data_by_other_identifier(real, value).await
            }
            Lookup::ByAnyIdentifier(value) => {
                let trimmed = value.trim();
                if trimmed.parse::<i64>().is_ok() {
                    return self.raw_data_by_id(trimmed).await;
                }
                for ident in self.def.identifiers().filter(|i| *i != "id") {
                    if let Some(record) = self.raw_data_by_other_identifier(ident, value).await? {
                        return Ok(Some(record));
                    }
                }
                Ok(None)
            }
        }
    }

    /// Id of the member matching the lookup, or `None`
    pub async fn valid_id(&self, lookup: &Lookup) -> Result<Option<Value>> {
        Ok(self
            .raw_data(lookup)
            .await?
            .and_then(|record| record.get("id").cloned()))
    }

    async fn raw_data_by_id(&self, id: &str) -> Result<Option<Value>> {
        match self.conn.get(&self.def.member_path(id)).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn raw_data_by_other_identifier(
        &self,
        ident: &str,
        value: &str,
    ) -> Result<Option<Value>> {
        let filter_key = self.def.field(ident).is_some_and(|f| f.filter_key);

        // one filtered page of size 1; the caller's paging cursor is left alone
        if filter_key && self.def.capabilities.filterable {
            let request = PageRequest::first(
                &self.def.rsrc_path,
                1,
                None,
                Some(equals_filter(ident, value)),
            );
            return Ok(fetch_page(self.conn, &request).await?.into_iter().next());
        }

        let records = self.cached_all(false).await?;
        Ok(records
            .iter()
            .find(|record| field_matches(record, ident, value))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_constructors() {
        assert_eq!(Lookup::id(7), Lookup::ById("7".into()));
        assert_eq!(
            Lookup::by("sn", "C02X"),
            Lookup::ByIdentifier("sn".into(), "C02X".into())
        );
        assert_eq!(Lookup::any("Marketing"), Lookup::ByAnyIdentifier("Marketing".into()));
    }

    #[test]
    fn test_field_matches_case_insensitive() {
        let record = json!({"id": "12", "name": "Marketing"});
        assert!(field_matches(&record, "name", "marketing"));
        assert!(field_matches(&record, "name", "MARKETING"));
        assert!(!field_matches(&record, "name", "sales"));
    }

    #[test]
    fn test_field_matches_id_exact() {
        let record = json!({"id": 12, "name": "x"});
        assert!(field_matches(&record, "id", "12"));
        assert!(!field_matches(&record, "id", "012"));
    }

    #[test]
    fn test_field_matches_missing_or_null() {
        let record = json!({"id": "1", "name": null});
        assert!(!field_matches(&record, "name", "null"));
        assert!(!field_matches(&record, "serialNumber", "x"));
    }
}
