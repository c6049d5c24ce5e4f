// Schema registry client for CNL compilation
//
// The compiler does not own type definitions; it consumes a point-in-time
// read of a registry maintained by an external collaborator. This module
// provides that read-only view plus a thread-safe registration surface so
// hosts can push definitions at runtime (typically deserialized from the
// collaborator's JSON).

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::error::CnlError;

/// Global singleton schema registry with built-in types
pub static SCHEMAS: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::create);

/// A node type ("role" in CNL terms) a node may declare in its heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// A relation type with optional domain/range constraints.
///
/// Empty `domain`/`range` means unconstrained; a non-empty list restricts
/// which roles may appear as source/target and drives role inference in the
/// neighborhood resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub range: Vec<String>,
}

/// An attribute type with an optional role scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
}

/// A named function expression. The compiler only references functions by
/// name; evaluation belongs to the collaborator that owns attribute values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionTypeDef {
    pub name: String,
    #[serde(default)]
    pub expression: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
}

/// JSON document shape accepted by [`SchemaRegistry::register_from_json`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub node_types: Vec<NodeTypeDef>,
    #[serde(default)]
    pub relation_types: Vec<RelationTypeDef>,
    #[serde(default)]
    pub attribute_types: Vec<AttributeTypeDef>,
    #[serde(default)]
    pub function_types: Vec<FunctionTypeDef>,
}

#[derive(Debug, Default)]
struct SchemaInner {
    node_types: HashMap<String, Arc<NodeTypeDef>>,
    relation_types: HashMap<String, Arc<RelationTypeDef>>,
    /// alias -> canonical name
    relation_aliases: HashMap<String, String>,
    attribute_types: HashMap<String, Arc<AttributeTypeDef>>,
    function_types: HashMap<String, Arc<FunctionTypeDef>>,
}

/// Thread-safe registry of node, relation, attribute, and function types.
///
/// Reads are cheap Arc clones. A compile call takes its point-in-time reads
/// against this structure; nothing in the compile path ever writes to it.
pub struct SchemaRegistry(Arc<RwLock<SchemaInner>>);

impl Clone for SchemaRegistry {
    fn clone(&self) -> Self {
        SchemaRegistry(self.0.clone())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        SchemaRegistry::create()
    }
}

impl SchemaRegistry {
    /// Create a registry seeded with the built-in types every CNL graph
    /// relies on: the `individual` and `class` roles and the `is_a`
    /// classification relation.
    pub fn create() -> Self {
        let registry = SchemaRegistry(Arc::new(RwLock::new(SchemaInner::default())));

        registry.register_node_type(NodeTypeDef {
            name: "individual".to_string(),
            description: Some("Default role for undeclared nodes".to_string()),
            parents: vec![],
        });
        registry.register_node_type(NodeTypeDef {
            name: "class".to_string(),
            description: Some("A category of individuals".to_string()),
            parents: vec![],
        });
        registry.register_relation_type(RelationTypeDef {
            name: "is_a".to_string(),
            inverse_name: Some("has_instance".to_string()),
            aliases: vec![
                "is a".to_string(),
                "is an".to_string(),
                "is".to_string(),
            ],
            domain: vec![],
            range: vec!["class".to_string()],
        });

        registry
    }

    /// Create a registry with no definitions at all, built-ins included.
    /// Useful for validation tests that exercise unknown-type errors.
    pub fn empty() -> Self {
        SchemaRegistry(Arc::new(RwLock::new(SchemaInner::default())))
    }

    fn write(&self) -> parking_lot::RwLockWriteGuard<'_, SchemaInner> {
        while self.0.is_locked() {
            tracing::info!("[SchemaRegistry] Waiting for write access to schema registry");
            std::thread::sleep(Duration::from_millis(100));
        }
        self.0.write()
    }

    fn read(&self) -> parking_lot::RwLockReadGuard<'_, SchemaInner> {
        while self.0.is_locked_exclusive() {
            tracing::info!("[SchemaRegistry] Waiting for read access to schema registry");
            std::thread::sleep(Duration::from_millis(100));
        }
        self.0.read()
    }

    /// Register a node type, overwriting any previous definition of the same
    /// name.
    pub fn register_node_type(&self, def: NodeTypeDef) {
        let mut writer = self.write();
        if writer.node_types.contains_key(&def.name) {
            tracing::info!(
                "[SchemaRegistry] Overwriting existing node type: {}",
                def.name
            );
        }
        writer.node_types.insert(def.name.clone(), Arc::new(def));
    }

    /// Register a relation type along with its alias mappings.
    pub fn register_relation_type(&self, def: RelationTypeDef) {
        let mut writer = self.write();
        if writer.relation_types.contains_key(&def.name) {
            tracing::info!(
                "[SchemaRegistry] Overwriting existing relation type: {}",
                def.name
            );
        }
        for alias in def.aliases.iter() {
            writer
                .relation_aliases
                .insert(alias.clone(), def.name.clone());
        }
        writer
            .relation_types
            .insert(def.name.clone(), Arc::new(def));
    }

    pub fn register_attribute_type(&self, def: AttributeTypeDef) {
        let mut writer = self.write();
        writer
            .attribute_types
            .insert(def.name.clone(), Arc::new(def));
    }

    pub fn register_function_type(&self, def: FunctionTypeDef) {
        let mut writer = self.write();
        writer
            .function_types
            .insert(def.name.clone(), Arc::new(def));
    }

    /// Ingest a JSON schema document from the external collaborator.
    pub fn register_from_json(&self, json: &str) -> Result<(), CnlError> {
        let document: SchemaDocument = serde_json::from_str(json)
            .map_err(|src| CnlError::Schema(format!("Malformed schema document: {src}")))?;
        for def in document.node_types {
            self.register_node_type(def);
        }
        for def in document.relation_types {
            self.register_relation_type(def);
        }
        for def in document.attribute_types {
            self.register_attribute_type(def);
        }
        for def in document.function_types {
            self.register_function_type(def);
        }
        Ok(())
    }

    /// Look up a node type (role) by name.
    pub fn node_type(&self, name: &str) -> Option<Arc<NodeTypeDef>> {
        self.read().node_types.get(name).cloned()
    }

    /// Look up a relation type by canonical name or alias.
    pub fn relation_type(&self, name: &str) -> Option<Arc<RelationTypeDef>> {
        let reader = self.read();
        if let Some(def) = reader.relation_types.get(name) {
            return Some(def.clone());
        }
        reader
            .relation_aliases
            .get(name)
            .and_then(|canonical| reader.relation_types.get(canonical).cloned())
    }

    pub fn attribute_type(&self, name: &str) -> Option<Arc<AttributeTypeDef>> {
        self.read().attribute_types.get(name).cloned()
    }

    pub fn function_type(&self, name: &str) -> Option<Arc<FunctionTypeDef>> {
        self.read().function_types.get(name).cloned()
    }

    /// List registered role names, mainly for host UIs and tests.
    pub fn node_type_names(&self) -> Vec<String> {
        self.read().node_types.keys().cloned().collect()
    }
}
