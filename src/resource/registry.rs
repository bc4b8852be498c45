//! Resource Registry - Load collection type definitions from JSON
//!
//! This module loads every collection type's schema (fields, identifiers,
//! aliases and capabilities) from embedded JSON files and provides lookup
//! functions for the rest of the library.

use crate::api::error::{Error, Result};
use serde::Deserialize;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/base.json"),
    include_str!("../resources/inventory.json"),
    include_str!("../resources/settings.json"),
];

/// Value type of a field, as declared in the JSON definitions
///
/// Written as `string`, `integer`, `number`, `boolean`, `object`,
/// `array:<kind>` or `class:<Name>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array(Box<FieldKind>),
    /// A nested structured value, kept as a JSON object
    Class(String),
}

impl TryFrom<String> for FieldKind {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if let Some(inner) = s.strip_prefix("array:") {
            return FieldKind::try_from(inner.to_string()).map(|k| FieldKind::Array(Box::new(k)));
        }
        if let Some(name) = s.strip_prefix("class:") {
            return Ok(FieldKind::Class(name.to_string()));
        }
        match s.as_str() {
            "string" => Ok(FieldKind::String),
            "integer" => Ok(FieldKind::Integer),
            "number" => Ok(FieldKind::Number),
            "boolean" => Ok(FieldKind::Boolean),
            "object" => Ok(FieldKind::Object),
            other => Err(format!("unknown field kind: {}", other)),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Integer => write!(f, "integer"),
            FieldKind::Number => write!(f, "number"),
            FieldKind::Boolean => write!(f, "boolean"),
            FieldKind::Object => write!(f, "object"),
            FieldKind::Array(inner) => write!(f, "array:{}", inner),
            FieldKind::Class(name) => write!(f, "class:{}", name),
        }
    }
}

impl FieldKind {
    /// Primitive values can be compared and de-duplicated as plain JSON
    pub fn is_primitive(&self) -> bool {
        !matches!(self, FieldKind::Class(_) | FieldKind::Object)
    }

    /// Check a value against this kind, coercing where the conversion is lossless
    fn coerce(&self, value: Value) -> std::result::Result<Value, Value> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (FieldKind::String, Value::String(s)) => Ok(Value::String(s)),
            (FieldKind::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (FieldKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Ok(Value::Number(n))
            }
            (FieldKind::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(|i| Value::Number(i.into()))
                .map_err(|_| Value::String(s)),
            (FieldKind::Number, Value::Number(n)) => Ok(Value::Number(n)),
            (FieldKind::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or(Value::String(s)),
            (FieldKind::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
            (FieldKind::Boolean, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(Value::String(s)),
            },
            (FieldKind::Object | FieldKind::Class(_), Value::Object(m)) => Ok(Value::Object(m)),
            (FieldKind::Array(inner), Value::Array(items)) => items
                .into_iter()
                .map(|item| inner.coerce(item))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array),
            (_, other) => Err(other),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Field definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    /// Can this field uniquely name a member?
    #[serde(default)]
    pub identifier: bool,
    /// Can the server filter on this identifier?
    #[serde(default)]
    pub filter_key: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub readonly: bool,
}

impl FieldDef {
    /// Validate a value for this field, coercing it where possible.
    /// Sequence-valued fields are checked element by element.
    pub fn validate(&self, value: Value) -> Result<Value> {
        self.kind.coerce(value).map_err(|bad| {
            Error::InvalidInput(format!(
                "Value {} is not valid for {} ({})",
                bad, self.name, self.kind
            ))
        })
    }
}

/// What a collection type allows
#[derive(Debug, Clone, Deserialize)]
pub struct Capabilities {
    #[serde(default = "default_true")]
    pub creatable: bool,
    #[serde(default = "default_true")]
    pub deletable: bool,
    /// Does the server accept RSQL `filter` parameters?
    #[serde(default = "default_true")]
    pub filterable: bool,
    /// Path accepting `{"ids": [...]}` to delete several members at once
    #[serde(default)]
    pub bulk_delete_path: Option<String>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            creatable: true,
            deletable: true,
            filterable: true,
            bulk_delete_path: None,
        }
    }
}

/// Collection type definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    /// Registry key, filled in from the JSON map key
    #[serde(skip)]
    pub key: String,
    pub display_name: String,
    /// Collection path relative to the API root, e.g. `v1/categories`
    #[serde(default)]
    pub rsrc_path: String,
    /// Abstract base types only describe shared fields
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Fields in declaration order
    pub fields: Vec<FieldDef>,
}

impl ResourceDef {
    /// Resolve an alias to the canonical field name.
    /// Names that are not aliases are returned unchanged.
    pub fn attr_key_for_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.fields
            .iter()
            .find(|f| f.aliases.iter().any(|a| a == name))
            .map(|f| f.name.as_str())
            .unwrap_or(name)
    }

    /// Field by canonical name or alias
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        let real = self.attr_key_for_alias(name);
        self.fields.iter().find(|f| f.name == real)
    }

    /// Identifier field names, in declaration order
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.identifier)
            .map(|f| f.name.as_str())
    }

    pub fn is_identifier(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.identifier)
    }

    /// Path of one member
    pub fn member_path(&self, id: &str) -> String {
        format!("{}/{}", self.rsrc_path, urlencoding::encode(id))
    }

    pub(crate) fn stop_if_abstract(&self) -> Result<()> {
        if self.is_abstract {
            return Err(Error::Unsupported(format!(
                "{} is an abstract base type; use one of its concrete types",
                self.display_name
            )));
        }
        Ok(())
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            resources: HashMap::new(),
        };

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        for (key, def) in final_config.resources.iter_mut() {
            def.key = key.clone();
        }

        final_config
    })
}

/// Get a resource definition by key
pub fn get_resource(key: &str) -> Option<&'static ResourceDef> {
    get_registry().resources.get(key)
}

/// Get all concrete resource keys, sorted (for listings and completion)
pub fn get_all_resource_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = get_registry()
        .resources
        .iter()
        .filter(|(_, def)| !def.is_abstract)
        .map(|(key, _)| key.as_str())
        .collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = get_registry();
        assert!(
            !registry.resources.is_empty(),
            "Registry should have resources"
        );
    }

    #[test]
    fn test_every_concrete_type_has_id_identifier() {
        for key in get_all_resource_keys() {
            let def = get_resource(key).unwrap();
            assert_eq!(def.key, key);
            assert!(
                def.identifiers().any(|i| i == "id"),
                "{} should declare id as an identifier",
                key
            );
            assert!(!def.rsrc_path.is_empty(), "{} needs a path", key);
        }
    }

    #[test]
    fn test_categories_bulk_delete() {
        let def = get_resource("categories").unwrap();
        assert_eq!(def.display_name, "Category");
        assert_eq!(
            def.capabilities.bulk_delete_path.as_deref(),
            Some("v1/categories/delete-multiple")
        );
    }

    #[test]
    fn test_abstract_base_is_hidden_from_keys() {
        assert!(get_resource("collection").unwrap().is_abstract);
        assert!(!get_all_resource_keys().contains(&"collection"));
    }

    #[test]
    fn test_alias_resolution() {
        let def = get_resource("inventory-preload-records").unwrap();
        assert_eq!(def.attr_key_for_alias("sn"), "serialNumber");
        assert_eq!(def.attr_key_for_alias("serialNumber"), "serialNumber");
        assert_eq!(def.attr_key_for_alias("bogus"), "bogus");
        assert!(def.is_identifier("sn"));
        assert!(def.field("bogus").is_none());
    }

    #[test]
    fn test_identifiers_in_declaration_order() {
        let def = get_resource("inventory-preload-records").unwrap();
        let idents: Vec<&str> = def.identifiers().collect();
        assert_eq!(idents, vec!["id", "serialNumber"]);
    }

    #[test]
    fn test_field_kind_parsing() {
        assert_eq!(
            FieldKind::try_from("array:integer".to_string()).unwrap(),
            FieldKind::Array(Box::new(FieldKind::Integer))
        );
        assert_eq!(
            FieldKind::try_from("class:Address".to_string()).unwrap(),
            FieldKind::Class("Address".into())
        );
        assert!(FieldKind::try_from("date".to_string()).is_err());
    }

    #[test]
    fn test_validate_coerces() {
        let field = FieldDef {
            name: "priority".into(),
            kind: FieldKind::Integer,
            identifier: false,
            filter_key: false,
            aliases: vec![],
            readonly: false,
        };
        assert_eq!(field.validate(json!("9")).unwrap(), json!(9));
        assert!(matches!(
            field.validate(json!("high")),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_arrays_element_wise() {
        let field = FieldDef {
            name: "siteIds".into(),
            kind: FieldKind::Array(Box::new(FieldKind::String)),
            identifier: false,
            filter_key: false,
            aliases: vec![],
            readonly: false,
        };
        assert_eq!(field.validate(json!([1, "2"])).unwrap(), json!(["1", "2"]));
        assert!(field.validate(json!([true])).is_err());
        assert!(field.validate(json!("1")).is_err());
    }
}
