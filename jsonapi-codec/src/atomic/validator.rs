//! Up-front local-ID validation.
//!
//! Runs the whole batch through a fresh [`LocalIdTracker`], assigning a placeholder
//! wherever a real run would assign a server-generated identity. A batch that passes can
//! only fail on local IDs at run time if a handler does not return an identity.

use super::local_ids::LocalIdTracker;
use super::operation::Operation;
use crate::error::CodecError;

pub struct LocalIdValidator;

impl LocalIdValidator {
    pub fn validate(operations: &[Operation]) -> Result<(), CodecError> {
        let mut tracker = LocalIdTracker::new();
        for operation in operations {
            let defined = operation.defined_local_id();
            if let Some(lid) = defined {
                tracker.declare(
                    lid,
                    &operation.resource.type_name,
                    operation.index,
                    &operation.primary_pointer().field("lid"),
                )?;
            }

            operation.visit_references(|resource, pointer| -> Result<(), CodecError> {
                if resource.id.is_some() {
                    return Ok(());
                }
                if let Some(lid) = &resource.lid {
                    tracker.get_value(
                        lid,
                        &resource.type_name,
                        operation.index,
                        &pointer.field("lid"),
                    )?;
                }
                Ok(())
            })?;

            if let Some(lid) = defined {
                tracker.assign(
                    lid,
                    &operation.resource.type_name,
                    format!("placeholder-{}", operation.index),
                )?;
            }
        }
        Ok(())
    }
}
