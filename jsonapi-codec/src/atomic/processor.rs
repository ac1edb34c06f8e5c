//! Running a batch against host business logic.

use super::local_ids::LocalIdTracker;
use super::operation::Operation;
use super::reader::OperationsReader;
use super::validator::LocalIdValidator;
use crate::document::{Document, ErrorObject, ErrorSource};
use crate::error::{CodecError, SourcePointer};
use crate::links::LinkBuilder;
use crate::options::CodecOptions;
use crate::query::FieldSelector;
use crate::request::RequestScope;
use crate::resources::{Resource, ResourceDirectory};
use crate::response::{OperationContainer, ResponseAdapter};
use thiserror::Error;

/// Host business logic for atomic operations.
///
/// `begin` runs before the first operation, `commit` after the last. `rollback` runs
/// instead of `commit` when anything in the batch fails.
pub trait OperationHandler {
    type Error: std::error::Error + 'static;

    fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Apply one operation. Local IDs the operation consumes have already been replaced
    /// by server identities. Creates and updates return the stored resource.
    fn process(&mut self, operation: &Operation) -> Result<Option<Resource>, Self::Error>;

    fn commit(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ProcessError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("operation {index} failed: {source}")]
    Handler {
        index: usize,
        #[source]
        source: E,
    },
    #[error("transaction failed: {0}")]
    Transaction(#[source] E),
}

impl<E: std::error::Error + 'static> ProcessError<E> {
    /// Index of the operation that failed, when the failure belongs to one.
    pub fn operation_index(&self) -> Option<usize> {
        match self {
            ProcessError::Codec(err) => err.operation_index,
            ProcessError::Handler { index, .. } => Some(*index),
            ProcessError::Transaction(_) => None,
        }
    }

    pub fn to_error_object(&self) -> ErrorObject {
        match self {
            ProcessError::Codec(err) => err.to_error_object(),
            ProcessError::Handler { index, source } => ErrorObject {
                status: Some("500".to_string()),
                title: Some("An unhandled error occurred while processing an operation.".to_string()),
                detail: Some(source.to_string()),
                source: Some(ErrorSource {
                    pointer: Some(SourcePointer::operation(*index).to_string()),
                    ..ErrorSource::default()
                }),
                ..ErrorObject::default()
            },
            ProcessError::Transaction(source) => ErrorObject {
                status: Some("500".to_string()),
                title: Some("Failed to complete the transaction.".to_string()),
                detail: Some(source.to_string()),
                ..ErrorObject::default()
            },
        }
    }

    pub fn into_document(self) -> Document {
        Document {
            errors: Some(vec![self.to_error_object()]),
            ..Document::default()
        }
    }
}

/// Drives an atomic batch: structural read, local-ID validation, then one handler call
/// per operation inside a begin/commit bracket.
pub struct OperationsProcessor<'a> {
    directory: &'a dyn ResourceDirectory,
    options: &'a CodecOptions,
    selector: &'a mut dyn FieldSelector,
    links: &'a dyn LinkBuilder,
}

impl<'a> OperationsProcessor<'a> {
    pub fn new(
        directory: &'a dyn ResourceDirectory,
        options: &'a CodecOptions,
        selector: &'a mut dyn FieldSelector,
        links: &'a dyn LinkBuilder,
    ) -> Self {
        OperationsProcessor {
            directory,
            options,
            selector,
            links,
        }
    }

    /// Read an `atomic:operations` body and process it.
    pub fn process_text<H: OperationHandler>(
        &mut self,
        text: &str,
        handler: &mut H,
    ) -> Result<Document, ProcessError<H::Error>> {
        let operations = OperationsReader::new(self.directory, self.options).read_batch(text)?;
        self.process(operations, handler)
    }

    pub fn process<H: OperationHandler>(
        &mut self,
        operations: Vec<Operation>,
        handler: &mut H,
    ) -> Result<Document, ProcessError<H::Error>> {
        if let Err(err) = LocalIdValidator::validate(&operations) {
            tracing::warn!(index = ?err.operation_index, %err, "rejecting batch with invalid local IDs");
            return Err(err.into());
        }

        handler.begin().map_err(ProcessError::Transaction)?;
        let outcome = self
            .run(operations, handler)
            .and_then(|document| match handler.commit() {
                Ok(()) => Ok(document),
                Err(err) => Err(ProcessError::Transaction(err)),
            });

        if let Err(err) = &outcome {
            tracing::warn!(index = ?err.operation_index(), %err, "rolling back atomic batch");
            if let Err(rollback) = handler.rollback() {
                tracing::warn!(%rollback, "rollback failed");
            }
        }
        outcome
    }

    fn run<H: OperationHandler>(
        &mut self,
        operations: Vec<Operation>,
        handler: &mut H,
    ) -> Result<Document, ProcessError<H::Error>> {
        let mut tracker = LocalIdTracker::new();
        let mut adapter = ResponseAdapter::new(
            self.directory,
            &mut *self.selector,
            self.links,
            self.options,
            RequestScope::atomic_operations(),
        );
        let mut results = Vec::with_capacity(operations.len());

        for mut operation in operations {
            let index = operation.index;
            let defined = operation
                .defined_local_id()
                .map(|lid| (lid.to_string(), operation.resource.type_name.clone()));
            if let Some((lid, type_name)) = &defined {
                tracker.declare(
                    lid,
                    type_name,
                    index,
                    &operation.primary_pointer().field("lid"),
                )?;
            }

            operation.visit_references_mut(|resource, pointer| -> Result<(), CodecError> {
                if resource.id.is_some() {
                    return Ok(());
                }
                if let Some(lid) = &resource.lid {
                    let value =
                        tracker.get_value(lid, &resource.type_name, index, &pointer.field("lid"))?;
                    resource.id = Some(value.to_string());
                }
                Ok(())
            })?;

            tracing::trace!(index, kind = %operation.kind, "processing operation");
            let returned = handler
                .process(&operation)
                .map_err(|source| ProcessError::Handler { index, source })?;

            if let Some((lid, type_name)) = &defined {
                if let Some(id) = returned.as_ref().and_then(|r| r.id.as_deref()) {
                    tracker
                        .assign(lid, type_name, id)
                        .map_err(|err| err.in_operation(index))?;
                }
            }

            let container = OperationContainer {
                descriptor: operation.descriptor(),
                resource: returned,
            };
            let result = adapter
                .convert_operation_entry(index, &container)
                .map_err(|err| err.in_operation(index))?;
            results.push(result);
        }

        Ok(adapter.finish_operations(results))
    }
}
