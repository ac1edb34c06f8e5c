//! Resource types and instances.

pub mod directory;
pub mod resource;
pub mod shape;

pub use directory::{ResourceDirectory, ResourceGraph, SchemaError};
pub use resource::{Identity, RelationshipValue, Resource, ResourceKey};
pub use shape::{
    AttrDef, AttrType, Cardinality, CoercionError, IdentityKind, RelationshipDef, ResourceShape,
};
