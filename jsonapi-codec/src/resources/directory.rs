//! Resource-type directory
//!
//! The directory answers "what does type X look like" for both converters. Hosts with
//! their own model metadata implement [`ResourceDirectory`]; everyone else registers
//! shapes in a [`ResourceGraph`], in code or from a JSON schema file.

use super::resource::Resource;
use super::shape::ResourceShape;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Longest base-type chain followed before giving up on cyclic declarations.
const MAX_BASE_TYPE_DEPTH: usize = 32;

/// Lookup of registered resource shapes.
pub trait ResourceDirectory {
    /// Shape registered under a public type name.
    fn resolve(&self, type_name: &str) -> Option<&ResourceShape>;

    fn resolve_resource(&self, resource: &Resource) -> Option<&ResourceShape> {
        self.resolve(&resource.type_name)
    }

    /// Whether a resource of type `actual` may appear where `declared` is expected.
    fn is_assignable(&self, declared: &str, actual: &str) -> bool {
        let mut current = actual;
        for _ in 0..MAX_BASE_TYPE_DEPTH {
            if current == declared {
                return true;
            }
            match self.resolve(current).and_then(|shape| shape.base_type.as_deref()) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}

/// Problems found while building a [`ResourceGraph`]
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema: {0}")]
    Json(#[from] serde_json::Error),
    #[error("resource type '{0}' is declared more than once")]
    DuplicateType(String),
    #[error("relationship '{relationship}' of '{type_name}' points to unknown type '{related}'")]
    UnknownRelatedType {
        type_name: String,
        relationship: String,
        related: String,
    },
    #[error("resource type '{type_name}' derives from unknown type '{base}'")]
    UnknownBaseType { type_name: String, base: String },
}

#[derive(Deserialize)]
struct SchemaFile {
    #[serde(default)]
    resources: Vec<ResourceShape>,
}

/// Registry of resource shapes keyed by public type name
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    shapes: BTreeMap<String, ResourceShape>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        ResourceGraph::default()
    }

    /// Register a shape, replacing any previous shape with the same name.
    pub fn register(&mut self, shape: ResourceShape) {
        self.shapes.insert(shape.name.clone(), shape);
    }

    /// Builder-style [`ResourceGraph::register`].
    pub fn with(mut self, shape: ResourceShape) -> Self {
        self.register(shape);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&ResourceShape> {
        self.shapes.get(type_name)
    }

    pub fn has(&self, type_name: &str) -> bool {
        self.shapes.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn list_types(&self) -> Vec<String> {
        self.shapes.keys().cloned().collect()
    }

    /// Load a schema of the form `{ "resources": [ <shape>, ... ] }` and validate it.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let schema: SchemaFile = serde_json::from_str(text)?;
        let mut graph = ResourceGraph::new();
        for shape in schema.resources {
            if graph.has(&shape.name) {
                return Err(SchemaError::DuplicateType(shape.name));
            }
            graph.register(shape);
        }
        graph.validate()?;
        tracing::debug!(types = graph.shapes.len(), "loaded resource schema");
        Ok(graph)
    }

    /// Check that every relationship and base type points at a registered type.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for shape in self.shapes.values() {
            if let Some(base) = &shape.base_type {
                if !self.has(base) {
                    return Err(SchemaError::UnknownBaseType {
                        type_name: shape.name.clone(),
                        base: base.clone(),
                    });
                }
            }
            for relationship in &shape.relationships {
                if !self.has(&relationship.related_type) {
                    return Err(SchemaError::UnknownRelatedType {
                        type_name: shape.name.clone(),
                        relationship: relationship.name.clone(),
                        related: relationship.related_type.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl ResourceDirectory for ResourceGraph {
    fn resolve(&self, type_name: &str) -> Option<&ResourceShape> {
        self.get(type_name)
    }
}
