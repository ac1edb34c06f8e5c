//! Sparse fieldsets and per-request field selection.

use crate::request::RequestScope;
use crate::resources::ResourceShape;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

/// Attribute and relationship names selected for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    pub attributes: BTreeSet<String>,
    pub relationships: BTreeSet<String>,
}

impl FieldSet {
    pub fn empty() -> Self {
        FieldSet::default()
    }

    /// Every declared field of a shape.
    pub fn all(shape: &ResourceShape) -> Self {
        FieldSet {
            attributes: shape.attributes.iter().map(|a| a.name.clone()).collect(),
            relationships: shape.relationships.iter().map(|r| r.name.clone()).collect(),
        }
    }

    pub fn contains_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    pub fn contains_relationship(&self, name: &str) -> bool {
        self.relationships.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.relationships.is_empty()
    }
}

/// Requested field names per resource type, as in `fields[articles]=title,author`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseFieldSets {
    requested: BTreeMap<String, BTreeSet<String>>,
}

impl SparseFieldSets {
    pub fn new() -> Self {
        SparseFieldSets::default()
    }

    /// Request `fields` for `type_name`, merging with earlier requests for the same type.
    pub fn with<I, S>(mut self, type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested
            .entry(type_name.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Collect `fields[type]=a,b` pairs. Keys of any other form are ignored.
    pub fn parse_query<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut sets = SparseFieldSets::new();
        for (key, value) in pairs {
            let Some(type_name) = key
                .strip_prefix("fields[")
                .and_then(|rest| rest.strip_suffix(']'))
            else {
                continue;
            };
            let names = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string);
            sets = sets.with(type_name, names);
        }
        sets
    }

    pub fn get(&self, type_name: &str) -> Option<&BTreeSet<String>> {
        self.requested.get(type_name)
    }

    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }
}

/// Decides which fields of a resource type to render in the current request.
///
/// Selectors may cache per type; [`FieldSelector::reset`] drops that cache, which the
/// batch converter does between operations because each entry has its own scope.
pub trait FieldSelector {
    fn selected_fields(&mut self, shape: &ResourceShape, scope: &RequestScope) -> Rc<FieldSet>;

    fn reset(&mut self);
}

/// The default selector, driven by requested sparse fieldsets.
#[derive(Debug, Default)]
pub struct SparseFieldSetCache {
    requested: SparseFieldSets,
    cache: HashMap<String, Rc<FieldSet>>,
}

impl SparseFieldSetCache {
    pub fn new(requested: SparseFieldSets) -> Self {
        SparseFieldSetCache {
            requested,
            cache: HashMap::new(),
        }
    }

    pub fn cached_types(&self) -> usize {
        self.cache.len()
    }

    fn compute(&self, shape: &ResourceShape) -> FieldSet {
        let Some(names) = self.requested.get(&shape.name) else {
            return FieldSet::all(shape);
        };
        FieldSet {
            attributes: shape
                .attributes
                .iter()
                .filter(|a| names.contains(&a.name))
                .map(|a| a.name.clone())
                .collect(),
            relationships: shape
                .relationships
                .iter()
                .filter(|r| names.contains(&r.name))
                .map(|r| r.name.clone())
                .collect(),
        }
    }
}

impl FieldSelector for SparseFieldSetCache {
    fn selected_fields(&mut self, shape: &ResourceShape, _scope: &RequestScope) -> Rc<FieldSet> {
        if let Some(fields) = self.cache.get(&shape.name) {
            return Rc::clone(fields);
        }
        let fields = Rc::new(self.compute(shape));
        self.cache.insert(shape.name.clone(), Rc::clone(&fields));
        fields
    }

    fn reset(&mut self) {
        self.cache.clear();
    }
}
