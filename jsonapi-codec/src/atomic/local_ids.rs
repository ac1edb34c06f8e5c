//! Local-ID bookkeeping for one atomic batch.
//!
//! Each local ID moves through two states:
//!
//!     declare ──► pending ──assign──► resolved
//!
//! A local ID belongs to exactly one resource type, is declared once, and cannot be read
//! by the operation that declares it.

use crate::error::{CodecError, ErrorKind, SourcePointer};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LocalIdEntry {
    type_name: String,
    defined_by: usize,
    server_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LocalIdTracker {
    entries: HashMap<String, LocalIdEntry>,
}

impl LocalIdTracker {
    pub fn new() -> Self {
        LocalIdTracker::default()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn is_declared(&self, lid: &str) -> bool {
        self.entries.contains_key(lid)
    }

    /// Declare a local ID introduced by operation `index`. `pointer` locates the `lid`.
    pub fn declare(
        &mut self,
        lid: &str,
        type_name: &str,
        index: usize,
        pointer: &SourcePointer,
    ) -> Result<(), CodecError> {
        if self.entries.contains_key(lid) {
            return Err(CodecError::new(
                ErrorKind::DuplicateLocalId,
                format!("Another local ID with the name '{lid}' is already defined."),
            )
            .at(pointer)
            .in_operation(index));
        }
        tracing::trace!(lid, resource = type_name, index, "declared local ID");
        self.entries.insert(
            lid.to_string(),
            LocalIdEntry {
                type_name: type_name.to_string(),
                defined_by: index,
                server_id: None,
            },
        );
        Ok(())
    }

    /// Record the server-generated identity of a declared local ID.
    pub fn assign(
        &mut self,
        lid: &str,
        type_name: &str,
        server_id: impl Into<String>,
    ) -> Result<(), CodecError> {
        let Some(entry) = self.entries.get_mut(lid) else {
            return Err(CodecError::new(
                ErrorKind::UnassignedLocalId,
                format!("Local ID '{lid}' is not declared."),
            ));
        };
        if entry.type_name != type_name {
            return Err(incompatible(lid, &entry.type_name, type_name));
        }
        entry.server_id = Some(server_id.into());
        Ok(())
    }

    /// Server identity for a local ID consumed by operation `index` as type `type_name`.
    pub fn get_value(
        &self,
        lid: &str,
        type_name: &str,
        index: usize,
        pointer: &SourcePointer,
    ) -> Result<&str, CodecError> {
        let Some(entry) = self.entries.get(lid) else {
            return Err(CodecError::new(
                ErrorKind::UnassignedLocalId,
                format!("Local ID '{lid}' is used before it is defined."),
            )
            .at(pointer)
            .in_operation(index));
        };
        if entry.type_name != type_name {
            return Err(incompatible(lid, &entry.type_name, type_name)
                .at(pointer)
                .in_operation(index));
        }
        match &entry.server_id {
            Some(value) => Ok(value),
            None if entry.defined_by == index => Err(CodecError::new(
                ErrorKind::CannotDefineAndConsumeInSameOperation,
                format!("Local ID '{lid}' cannot be both defined and used within the same operation."),
            )
            .at(pointer)
            .in_operation(index)),
            None => Err(CodecError::new(
                ErrorKind::LocalIdNotYetAvailable,
                format!(
                    "Operation {} did not produce a server-generated ID for local ID '{lid}'.",
                    entry.defined_by
                ),
            )
            .at(pointer)
            .in_operation(index)),
        }
    }
}

fn incompatible(lid: &str, defined: &str, used: &str) -> CodecError {
    CodecError::new(
        ErrorKind::IncompatibleLocalIdType,
        format!("Local ID '{lid}' belongs to resource type '{defined}' instead of '{used}'."),
    )
}
