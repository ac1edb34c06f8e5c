//! The set of resource objects produced by one outbound conversion.
//!
//! Every resource object is stored once, keyed by [`ResourceKey`]. Primary resources get
//! their slots reserved up front so that a primary resource reached again through an
//! include path is merged into `data` instead of being repeated in `included`.

use crate::document::ResourceObject;
use crate::resources::ResourceKey;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Primary(usize),
    Included(usize),
}

#[derive(Debug, Default)]
pub(crate) struct IncludedSet {
    primary: Vec<ResourceObject>,
    included: Vec<ResourceObject>,
    index: HashMap<ResourceKey, Slot>,
}

impl IncludedSet {
    pub(crate) fn new() -> Self {
        IncludedSet::default()
    }

    /// Reserve (or find) the primary slot for a resource. Returns its position and
    /// whether the slot was newly created.
    pub(crate) fn reserve_primary(&mut self, key: Option<ResourceKey>) -> (usize, bool) {
        if let Some(Slot::Primary(position)) = key.as_ref().and_then(|k| self.index.get(k)) {
            return (*position, false);
        }
        let position = self.primary.len();
        self.primary.push(ResourceObject::default());
        if let Some(key) = key {
            self.index.insert(key, Slot::Primary(position));
        }
        (position, true)
    }

    pub(crate) fn place_primary(&mut self, position: usize, object: ResourceObject) {
        if let Some(existing) = self.primary.get_mut(position) {
            merge_into(existing, object);
        }
    }

    /// Add a related resource object, merging with an earlier occurrence of the same key.
    /// Returns `true` when the object was not seen before.
    pub(crate) fn place(&mut self, key: Option<ResourceKey>, object: ResourceObject) -> bool {
        let Some(key) = key else {
            self.included.push(object);
            return true;
        };
        match self.index.get(&key) {
            Some(Slot::Primary(position)) => {
                merge_into(&mut self.primary[*position], object);
                false
            }
            Some(Slot::Included(position)) => {
                merge_into(&mut self.included[*position], object);
                false
            }
            None => {
                self.index
                    .insert(key, Slot::Included(self.included.len()));
                self.included.push(object);
                true
            }
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<ResourceObject>, Vec<ResourceObject>) {
        (self.primary, self.included)
    }
}

/// Merge a later occurrence into an existing resource object.
///
/// Relationship keys whose `data` is already assigned keep it; keys with absent `data` are
/// filled; keys never seen are added. Attributes, links and meta only fill gaps.
fn merge_into(existing: &mut ResourceObject, incoming: ResourceObject) {
    if existing.type_name.is_none() {
        existing.type_name = incoming.type_name;
        existing.id = incoming.id;
        existing.lid = incoming.lid;
    }

    if let Some(attributes) = incoming.attributes {
        let target = existing.attributes.get_or_insert_with(Default::default);
        for (name, value) in attributes {
            target.entry(name).or_insert(value);
        }
    }

    if let Some(relationships) = incoming.relationships {
        let target = existing.relationships.get_or_insert_with(Default::default);
        for (name, relationship) in relationships {
            match target.get_mut(&name) {
                Some(current) => {
                    if current.data.is_absent() && relationship.data.is_assigned() {
                        current.data = relationship.data;
                    }
                    if current.links.is_none() {
                        current.links = relationship.links;
                    }
                    if current.meta.is_none() {
                        current.meta = relationship.meta;
                    }
                }
                None => {
                    target.insert(name, relationship);
                }
            }
        }
    }

    if existing.links.is_none() {
        existing.links = incoming.links;
    }

    if let Some(meta) = incoming.meta {
        let target = existing.meta.get_or_insert_with(Default::default);
        for (name, value) in meta {
            target.entry(name).or_insert(value);
        }
    }
}
