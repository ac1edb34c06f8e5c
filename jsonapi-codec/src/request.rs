//! Request scope
//!
//! Everything the converters need to know about the request being served: which kind of
//! endpoint was hit, for which type and relationship, which write operation is in
//! progress and what was asked to be included. Inside an atomic batch the scope is
//! re-pointed at each operation in turn.

use crate::query::IncludeExpression;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EndpointKind {
    /// `/articles` or `/articles/1`
    #[default]
    Primary,
    /// `/articles/1/author`
    Secondary,
    /// `/articles/1/relationships/author`
    Relationship,
    /// `/operations`
    AtomicOperations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperationKind {
    CreateResource,
    UpdateResource,
    DeleteResource,
    SetRelationship,
    AddToRelationship,
    RemoveFromRelationship,
}

impl WriteOperationKind {
    pub fn targets_relationship(self) -> bool {
        matches!(
            self,
            WriteOperationKind::SetRelationship
                | WriteOperationKind::AddToRelationship
                | WriteOperationKind::RemoveFromRelationship
        )
    }

    /// Whether a successful operation of this kind answers with resource data.
    pub fn returns_resource(self) -> bool {
        matches!(
            self,
            WriteOperationKind::CreateResource | WriteOperationKind::UpdateResource
        )
    }
}

impl fmt::Display for WriteOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteOperationKind::CreateResource => "create resource",
            WriteOperationKind::UpdateResource => "update resource",
            WriteOperationKind::DeleteResource => "delete resource",
            WriteOperationKind::SetRelationship => "set relationship",
            WriteOperationKind::AddToRelationship => "add to relationship",
            WriteOperationKind::RemoveFromRelationship => "remove from relationship",
        };
        f.write_str(name)
    }
}

/// What a single operation does, independent of its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub kind: WriteOperationKind,
    pub primary_type: String,
    pub relationship: Option<String>,
}

/// Per-request state shared by the converters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestScope {
    pub kind: EndpointKind,
    pub primary_type: Option<String>,
    pub relationship: Option<String>,
    pub write_operation: Option<WriteOperationKind>,
    /// `None` renders no `included` member at all; an empty expression renders `[]`.
    pub include: Option<IncludeExpression>,
    pub request_path: Option<String>,
    /// Index of the atomic operation currently being converted.
    pub operation_index: Option<usize>,
}

impl RequestScope {
    pub fn primary(type_name: impl Into<String>) -> Self {
        RequestScope {
            kind: EndpointKind::Primary,
            primary_type: Some(type_name.into()),
            ..RequestScope::default()
        }
    }

    pub fn secondary(type_name: impl Into<String>) -> Self {
        RequestScope {
            kind: EndpointKind::Secondary,
            ..RequestScope::primary(type_name)
        }
    }

    pub fn relationship(type_name: impl Into<String>, relationship: impl Into<String>) -> Self {
        RequestScope {
            kind: EndpointKind::Relationship,
            primary_type: Some(type_name.into()),
            relationship: Some(relationship.into()),
            ..RequestScope::default()
        }
    }

    pub fn atomic_operations() -> Self {
        RequestScope {
            kind: EndpointKind::AtomicOperations,
            ..RequestScope::default()
        }
    }

    pub fn with_include(mut self, include: IncludeExpression) -> Self {
        self.include = Some(include);
        self
    }

    pub fn with_write_operation(mut self, operation: WriteOperationKind) -> Self {
        self.write_operation = Some(operation);
        self
    }

    pub fn with_request_path(mut self, path: impl Into<String>) -> Self {
        self.request_path = Some(path.into());
        self
    }

    /// True when the body being converted is relationship data rather than resources.
    pub fn targets_relationship(&self) -> bool {
        self.kind == EndpointKind::Relationship
            || self
                .write_operation
                .is_some_and(WriteOperationKind::targets_relationship)
    }

    pub fn uses_atomic_extension(&self) -> bool {
        self.kind == EndpointKind::AtomicOperations
    }

    /// Point the scope at one operation of a batch.
    pub fn apply_operation(&mut self, descriptor: &OperationDescriptor, index: usize) {
        self.primary_type = Some(descriptor.primary_type.clone());
        self.relationship = descriptor.relationship.clone();
        self.write_operation = Some(descriptor.kind);
        self.operation_index = Some(index);
    }
}
