//! Field hooks
//!
//! The inbound pipeline reports every attribute and relationship it assigns to a
//! [`FieldHook`]. Servers record those names ([`TargetedFields`]) so that an update only
//! touches what the client sent; clients have nothing to record ([`NoTracking`]).

use crate::resources::{AttrDef, RelationshipDef, Resource};
use std::collections::BTreeSet;

/// A field that was just assigned on a resource.
#[derive(Debug, Clone, Copy)]
pub enum TargetedField<'a> {
    Attribute(&'a AttrDef),
    Relationship(&'a RelationshipDef),
}

impl TargetedField<'_> {
    pub fn name(&self) -> &str {
        match self {
            TargetedField::Attribute(def) => &def.name,
            TargetedField::Relationship(def) => &def.name,
        }
    }
}

pub trait FieldHook {
    fn field_processed(&mut self, resource: &Resource, field: TargetedField<'_>);
}

impl<H: FieldHook + ?Sized> FieldHook for &mut H {
    fn field_processed(&mut self, resource: &Resource, field: TargetedField<'_>) {
        (**self).field_processed(resource, field)
    }
}

/// Hook used when reading responses: nothing is recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTracking;

impl FieldHook for NoTracking {
    fn field_processed(&mut self, _resource: &Resource, _field: TargetedField<'_>) {}
}

/// Names of the attributes and relationships a request assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetedFields {
    pub attributes: BTreeSet<String>,
    pub relationships: BTreeSet<String>,
}

impl TargetedFields {
    pub fn new() -> Self {
        TargetedFields::default()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.relationships.is_empty()
    }

    pub fn clear(&mut self) {
        self.attributes.clear();
        self.relationships.clear();
    }
}

impl FieldHook for TargetedFields {
    fn field_processed(&mut self, _resource: &Resource, field: TargetedField<'_>) {
        match field {
            TargetedField::Attribute(def) => {
                self.attributes.insert(def.name.clone());
            }
            TargetedField::Relationship(def) => {
                self.relationships.insert(def.name.clone());
            }
        }
    }
}
