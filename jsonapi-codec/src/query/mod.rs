//! Query-string inputs that shape a response: include paths and sparse fieldsets.

pub mod fieldsets;
pub mod include;

pub use fieldsets::{FieldSelector, FieldSet, SparseFieldSetCache, SparseFieldSets};
pub use include::{IncludeElement, IncludeExpression, IncludeParseError};
