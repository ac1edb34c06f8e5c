//! In-memory resource graph.
//!
//! Resources are dynamic: attributes are JSON values keyed by public name and
//! relationships own their related resources. A relationship key that is missing from
//! [`Resource::relationships`] is *unassigned*, which is distinct from an empty to-one
//! (`ToOne(None)`) or empty to-many (`ToMany(vec![])`).

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// One of the two ways a resource can be identified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    Id(String),
    Lid(String),
}

/// Deduplication key: `(type, id)` when the id is known, otherwise `(type, lid)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub type_name: String,
    pub identity: Identity,
}

impl ResourceKey {
    /// Build a key from loose identity members. Returns `None` when neither is set.
    pub fn from_parts(type_name: &str, id: Option<&str>, lid: Option<&str>) -> Option<Self> {
        let identity = match (id, lid) {
            (Some(id), _) => Identity::Id(id.to_string()),
            (None, Some(lid)) => Identity::Lid(lid.to_string()),
            (None, None) => return None,
        };
        Some(ResourceKey {
            type_name: type_name.to_string(),
            identity,
        })
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identity {
            Identity::Id(id) => write!(f, "{}:{}", self.type_name, id),
            Identity::Lid(lid) => write!(f, "{}:lid:{}", self.type_name, lid),
        }
    }
}

/// A typed resource instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, RelationshipValue>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
}

impl Resource {
    pub fn new(type_name: impl Into<String>) -> Self {
        Resource {
            type_name: type_name.into(),
            ..Resource::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_lid(mut self, lid: impl Into<String>) -> Self {
        self.lid = Some(lid.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_to_one(mut self, name: impl Into<String>, related: Option<Resource>) -> Self {
        self.relationships
            .insert(name.into(), RelationshipValue::ToOne(related.map(Box::new)));
        self
    }

    pub fn with_to_many(mut self, name: impl Into<String>, related: Vec<Resource>) -> Self {
        self.relationships
            .insert(name.into(), RelationshipValue::ToMany(related));
        self
    }

    pub fn with_meta(mut self, name: impl Into<String>, value: Value) -> Self {
        self.meta.insert(name.into(), value);
        self
    }

    pub fn key(&self) -> Option<ResourceKey> {
        ResourceKey::from_parts(&self.type_name, self.id.as_deref(), self.lid.as_deref())
    }

    /// Identity-only copy, the way related resources appear before linking.
    pub fn shell(&self) -> Resource {
        Resource {
            type_name: self.type_name.clone(),
            id: self.id.clone(),
            lid: self.lid.clone(),
            ..Resource::default()
        }
    }

    /// Assigned value of a relationship, `None` when unassigned.
    pub fn related(&self, name: &str) -> Option<&RelationshipValue> {
        self.relationships.get(name)
    }

    pub fn related_mut(&mut self, name: &str) -> Option<&mut RelationshipValue> {
        self.relationships.get_mut(name)
    }
}

/// Assigned value of a relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelationshipValue {
    ToOne(Option<Box<Resource>>),
    ToMany(Vec<Resource>),
}

impl RelationshipValue {
    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        match self {
            RelationshipValue::ToOne(Some(resource)) => {
                std::slice::from_ref(resource.as_ref()).iter()
            }
            RelationshipValue::ToOne(None) => Default::default(),
            RelationshipValue::ToMany(resources) => resources.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Resource> {
        match self {
            RelationshipValue::ToOne(Some(resource)) => {
                std::slice::from_mut(resource.as_mut()).iter_mut()
            }
            RelationshipValue::ToOne(None) => Default::default(),
            RelationshipValue::ToMany(resources) => resources.iter_mut(),
        }
    }

    /// Null to-one or empty to-many.
    pub fn is_empty(&self) -> bool {
        match self {
            RelationshipValue::ToOne(related) => related.is_none(),
            RelationshipValue::ToMany(related) => related.is_empty(),
        }
    }
}
