//! Typed Instance
//!
//! One member of a collection, built from a raw record and its schema.
//! Instances keep the connection that produced them so they can save and
//! delete themselves.

use super::collection::value_to_string;
use super::registry::ResourceDef;
use crate::api::error::{Error, Result};
use crate::api::Connection;
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct Instance {
    def: &'static ResourceDef,
    conn: Connection,
    id: Option<Value>,
    data: Map<String, Value>,
}

impl Instance {
    /// Build from a raw record as returned by the server
    pub fn from_raw(def: &'static ResourceDef, conn: Connection, record: Value) -> Self {
        let mut data = match record {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let id = data.remove("id").filter(|v| !v.is_null());
        Self {
            def,
            conn,
            id,
            data,
        }
    }

    /// Not yet on the server; `save` assigns the id
    pub(crate) fn new_unsaved(
        def: &'static ResourceDef,
        conn: Connection,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            def,
            conn,
            id: None,
            data,
        }
    }

    pub fn def(&self) -> &'static ResourceDef {
        self.def
    }

    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    pub fn exists(&self) -> bool {
        self.id.is_some()
    }

    /// Member path, once saved
    pub fn rsrc_path(&self) -> Option<String> {
        self.id
            .as_ref()
            .map(|id| self.def.member_path(&value_to_string(id)))
    }

    /// Field value by name or alias
    pub fn get(&self, field: &str) -> Option<&Value> {
        let real = self.def.attr_key_for_alias(field);
        if real == "id" {
            return self.id.as_ref();
        }
        self.data.get(real)
    }

    /// Set a declared, writable field after validating the value
    pub fn set(&mut self, field: &str, value: Value) -> Result<()> {
        let def = self.def.field(field).ok_or_else(|| {
            Error::InvalidInput(format!(
                "No attribute {} for {}",
                field, self.def.display_name
            ))
        })?;
        if def.readonly {
            return Err(Error::InvalidInput(format!(
                "{} is read-only for {}",
                def.name, self.def.display_name
            )));
        }
        let value = def.validate(value)?;
        self.data.insert(def.name.clone(), value);
        Ok(())
    }

    /// The record as it would be sent to the server
    pub fn to_json(&self) -> Value {
        let mut map = self.data.clone();
        if let Some(id) = &self.id {
            map.insert("id".to_string(), id.clone());
        }
        Value::Object(map)
    }

    /// Create the member on the server, or update it if it already exists
    pub async fn save(&mut self) -> Result<Option<&Value>> {
        let body = Value::Object(self.writable_data());

        if let Some(path) = self.rsrc_path() {
            self.conn.put(&path, &body).await?;
            tracing::info!("updated {} {}", self.def.display_name, path);
            return Ok(self.id.as_ref());
        }

        if !self.def.capabilities.creatable {
            return Err(Error::Unsupported(format!(
                "{} objects are not currently creatable via the API",
                self.def.display_name
            )));
        }

        let result = self.conn.post(&self.def.rsrc_path, &body).await?;
        self.id = result.get("id").cloned().filter(|v| !v.is_null());
        tracing::info!("created {} {:?}", self.def.display_name, self.id);
        Ok(self.id.as_ref())
    }

    /// Delete this member from the server
    pub async fn delete(&self) -> Result<()> {
        if !self.def.capabilities.deletable {
            return Err(Error::Unsupported(format!(
                "Deleting {} objects is not currently supported",
                self.def.display_name
            )));
        }
        let Some(path) = self.rsrc_path() else {
            return Err(Error::NoSuchItem(format!(
                "This {} has not been saved",
                self.def.display_name
            )));
        };
        self.conn.delete(&path).await?;
        tracing::info!("deleted {} {}", self.def.display_name, path);
        Ok(())
    }

    fn writable_data(&self) -> Map<String, Value> {
        self.data
            .iter()
            .filter(|(name, _)| !self.def.field(name).is_some_and(|f| f.readonly))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Numeric ids order numerically, others as strings; unsaved instances sort first
    fn sort_key(&self) -> Option<(Option<i64>, String)> {
        self.id.as_ref().map(|id| {
            let s = value_to_string(id);
            (s.parse::<i64>().ok(), s)
        })
    }
}

/// Two instances are the same if their ids are the same
impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for Instance {}

impl PartialOrd for Instance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Instance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::get_resource;
    use serde_json::json;

    fn conn() -> Connection {
        Connection::new("https://jamf.example.com/api", None).unwrap()
    }

    #[test]
    fn test_from_raw_splits_id() {
        let def = get_resource("categories").unwrap();
        let record = json!({"id": "5", "name": "Apps", "priority": 9});
        let inst = Instance::from_raw(def, conn(), record);
        assert!(inst.exists());
        assert_eq!(inst.id(), Some(&json!("5")));
        assert_eq!(inst.get("name"), Some(&json!("Apps")));
        assert_eq!(inst.get("id"), Some(&json!("5")));
        assert_eq!(inst.rsrc_path().as_deref(), Some("v1/categories/5"));
        assert_eq!(inst.to_json()["priority"], 9);
    }

    #[test]
    fn test_set_validates_and_respects_readonly() {
        let def = get_resource("categories").unwrap();
        let mut inst = Instance::from_raw(def, conn(), json!({"id": "5", "name": "Apps"}));
        inst.set("priority", json!("3")).unwrap();
        assert_eq!(inst.get("priority"), Some(&json!(3)));
        assert!(matches!(inst.set("id", json!("6")), Err(Error::InvalidInput(_))));
        assert!(matches!(inst.set("colour", json!("red")), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_alias_get() {
        let def = get_resource("inventory-preload-records").unwrap();
        let inst = Instance::from_raw(def, conn(), json!({"id": "1", "serialNumber": "C02ABC"}));
        assert_eq!(inst.get("sn"), Some(&json!("C02ABC")));
    }

    #[test]
    fn test_ordering_by_id() {
        let def = get_resource("departments").unwrap();
        let mut list = vec![
            Instance::from_raw(def, conn(), json!({"id": "10", "name": "b"})),
            Instance::from_raw(def, conn(), json!({"id": "9", "name": "a"})),
        ];
        list.sort();
        assert_eq!(list[0].id(), Some(&json!("9")));
        assert_eq!(
            Instance::from_raw(def, conn(), json!({"id": "9"})),
            list[0].clone()
        );
    }

    #[test]
    fn test_unsaved_instance_cannot_delete() {
        let def = get_resource("departments").unwrap();
        let inst = Instance::new_unsaved(def, conn(), Map::new());
        assert!(!inst.exists());
        let result = tokio_test::block_on(inst.delete());
        assert!(matches!(result, Err(Error::NoSuchItem(_))));
    }

    #[test]
    fn test_delete_rejected_when_not_deletable() {
        let def = get_resource("sites").unwrap();
        let inst = Instance::from_raw(def, conn(), json!({"id": "1", "name": "HQ"}));
        let result = tokio_test::block_on(inst.delete());
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }
}
