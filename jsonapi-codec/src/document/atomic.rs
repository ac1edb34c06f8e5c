//! Wire shapes of the atomic operations extension.

use super::data::Data;
use super::nodes::{Meta, ResourceObject};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The `op` member of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomicOperationCode {
    Add,
    Update,
    Remove,
}

impl fmt::Display for AtomicOperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicOperationCode::Add => write!(f, "add"),
            AtomicOperationCode::Update => write!(f, "update"),
            AtomicOperationCode::Remove => write!(f, "remove"),
        }
    }
}

/// One entry of `atomic:operations`.
///
/// `data` is either a resource object (resource operations) or identifier objects
/// (relationship operations); identifiers are read as resource objects without fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtomicOperationObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<AtomicOperationCode>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<AtomicReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Data::is_absent")]
    pub data: Data<ResourceObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// The `ref` member: the target resource, optionally narrowed to one of its relationships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicReference {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

/// One entry of `atomic:results`, in the same position as its operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtomicResultObject {
    #[serde(default, skip_serializing_if = "Data::is_absent")]
    pub data: Data<ResourceObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}
