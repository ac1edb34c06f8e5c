//! In-memory operation handler used by `jsonapi operations --execute`.
//!
//! Nothing is persisted: creates are echoed back with a freshly minted identity of the
//! kind the resource type declares, updates are echoed as-is, and everything else
//! returns no resource. This is enough to see how local IDs resolve across a batch and
//! what the `atomic:results` document looks like.

use jsonapi_codec::{
    IdentityKind, Operation, OperationHandler, Resource, ResourceDirectory, WriteOperationKind,
};
use std::convert::Infallible;
use uuid::Uuid;

pub struct DryRunStore<'a> {
    directory: &'a dyn ResourceDirectory,
    next_id: u128,
}

impl<'a> DryRunStore<'a> {
    pub fn new(directory: &'a dyn ResourceDirectory) -> Self {
        DryRunStore {
            directory,
            next_id: 0,
        }
    }

    fn mint_id(&mut self, type_name: &str) -> String {
        self.next_id += 1;
        let kind = self
            .directory
            .resolve(type_name)
            .map(|shape| shape.identity)
            .unwrap_or_default();
        match kind {
            IdentityKind::Guid => Uuid::from_u128(self.next_id).to_string(),
            IdentityKind::Integer | IdentityKind::String => self.next_id.to_string(),
        }
    }
}

impl OperationHandler for DryRunStore<'_> {
    type Error = Infallible;

    fn begin(&mut self) -> Result<(), Infallible> {
        tracing::debug!("dry run: begin");
        Ok(())
    }

    fn process(&mut self, operation: &Operation) -> Result<Option<Resource>, Infallible> {
        tracing::info!(
            index = operation.index,
            kind = %operation.kind,
            resource = %operation.resource.type_name,
            "dry run: applying operation"
        );
        match operation.kind {
            WriteOperationKind::CreateResource => {
                let mut stored = operation.resource.clone();
                if stored.id.is_none() {
                    stored.id = Some(self.mint_id(&stored.type_name));
                }
                Ok(Some(stored))
            }
            WriteOperationKind::UpdateResource => Ok(Some(operation.resource.clone())),
            _ => Ok(None),
        }
    }

    fn commit(&mut self) -> Result<(), Infallible> {
        tracing::debug!("dry run: commit");
        Ok(())
    }
}
