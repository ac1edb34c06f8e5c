//! Parsed atomic operations.

use crate::error::SourcePointer;
use crate::reader::TargetedFields;
use crate::request::{OperationDescriptor, WriteOperationKind};
use crate::resources::{RelationshipValue, Resource};

/// Where the primary resource of an operation was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryLocation {
    /// `data` of an add or update.
    Data,
    /// `ref` of a remove or a relationship operation.
    Ref,
}

/// One validated entry of an `atomic:operations` batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Position in the batch, zero-based.
    pub index: usize,
    pub kind: WriteOperationKind,
    /// The resource the operation acts on. For relationship operations only the targeted
    /// relationship is assigned.
    pub resource: Resource,
    /// Targeted relationship of a relationship operation.
    pub relationship: Option<String>,
    /// Fields assigned by the request, for partial updates.
    pub targeted: TargetedFields,
    pub primary_location: PrimaryLocation,
}

impl Operation {
    pub fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor {
            kind: self.kind,
            primary_type: self.resource.type_name.clone(),
            relationship: self.relationship.clone(),
        }
    }

    /// Local ID that this operation introduces, if any.
    pub fn defined_local_id(&self) -> Option<&str> {
        match self.kind {
            WriteOperationKind::CreateResource => self.resource.lid.as_deref(),
            _ => None,
        }
    }

    pub fn pointer(&self) -> SourcePointer {
        SourcePointer::operation(self.index)
    }

    /// Pointer to the object holding the primary resource's identity.
    pub fn primary_pointer(&self) -> SourcePointer {
        match self.primary_location {
            PrimaryLocation::Data => self.pointer().field("data"),
            PrimaryLocation::Ref => self.pointer().field("ref"),
        }
    }

    fn relationship_pointer(&self, name: &str) -> SourcePointer {
        if self.relationship.is_some() {
            self.pointer().field("data")
        } else {
            self.pointer()
                .field("data")
                .field("relationships")
                .field(name)
                .field("data")
        }
    }

    /// Visit every resource whose identity this operation consumes: the primary resource
    /// (unless the operation creates it), then related resources in relationship order.
    pub fn visit_references<E>(
        &self,
        mut visit: impl FnMut(&Resource, SourcePointer) -> Result<(), E>,
    ) -> Result<(), E> {
        if self.kind != WriteOperationKind::CreateResource {
            visit(&self.resource, self.primary_pointer())?;
        }
        for (name, value) in &self.resource.relationships {
            let base = self.relationship_pointer(name);
            let to_many = matches!(value, RelationshipValue::ToMany(_));
            for (position, related) in value.iter().enumerate() {
                let pointer = if to_many {
                    base.element(position)
                } else {
                    base.clone()
                };
                visit(related, pointer)?;
            }
        }
        Ok(())
    }

    /// Mutable counterpart of [`Operation::visit_references`].
    pub fn visit_references_mut<E>(
        &mut self,
        mut visit: impl FnMut(&mut Resource, SourcePointer) -> Result<(), E>,
    ) -> Result<(), E> {
        if self.kind != WriteOperationKind::CreateResource {
            let pointer = self.primary_pointer();
            visit(&mut self.resource, pointer)?;
        }
        let names: Vec<String> = self.resource.relationships.keys().cloned().collect();
        for name in names {
            let base = self.relationship_pointer(&name);
            let Some(value) = self.resource.relationships.get_mut(&name) else {
                continue;
            };
            let to_many = matches!(value, RelationshipValue::ToMany(_));
            for (position, related) in value.iter_mut().enumerate() {
                let pointer = if to_many {
                    base.element(position)
                } else {
                    base.clone()
                };
                visit(related, pointer)?;
            }
        }
        Ok(())
    }
}
