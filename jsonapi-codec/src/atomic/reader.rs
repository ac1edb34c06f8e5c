//! Structural pass over an `atomic:operations` request.
//!
//! Every operation is checked and converted before any local ID is resolved or any
//! business logic runs, so a malformed batch is rejected as a whole.

use super::operation::{Operation, PrimaryLocation};
use crate::document::{
    AtomicOperationCode, AtomicOperationObject, AtomicReference, Data, Document,
    ResourceIdentifierObject, ResourceObject,
};
use crate::error::{CodecError, ErrorKind, SourcePointer};
use crate::options::CodecOptions;
use crate::reader::hooks::{FieldHook, TargetedField, TargetedFields};
use crate::reader::identity::{check_format, check_presence, IdentityContext};
use crate::reader::resource::{parse_relationship_data, parse_resource, Direction, ParseContext};
use crate::request::WriteOperationKind;
use crate::resources::{RelationshipDef, Resource, ResourceDirectory, ResourceShape};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub struct OperationsReader<'a> {
    directory: &'a dyn ResourceDirectory,
    options: &'a CodecOptions,
}

/// A validated `ref` member.
struct Reference<'s> {
    resource: Resource,
    shape: &'s ResourceShape,
    relationship: Option<&'s RelationshipDef>,
}

impl<'a> OperationsReader<'a> {
    pub fn new(directory: &'a dyn ResourceDirectory, options: &'a CodecOptions) -> Self {
        OperationsReader { directory, options }
    }

    fn context(&self) -> ParseContext<'a> {
        ParseContext {
            directory: self.directory,
            options: self.options,
            direction: Direction::Request,
            in_batch: true,
        }
    }

    /// Parse and read a batch from JSON text.
    ///
    /// Operations are decoded one at a time, so a badly shaped operation is reported
    /// with its index and the member that failed to decode.
    pub fn read_batch(&self, text: &str) -> Result<Vec<Operation>, CodecError> {
        let mut body: Value = serde_json::from_str(text).map_err(malformed)?;
        let entries = body
            .as_object_mut()
            .and_then(|members| members.remove("atomic:operations"));
        let mut document: Document = serde_json::from_value(body).map_err(malformed)?;
        document.operations = match entries {
            None | Some(Value::Null) => None,
            Some(Value::Array(entries)) => Some(
                entries
                    .into_iter()
                    .enumerate()
                    .map(|(index, entry)| decode_operation(index, entry))
                    .collect::<Result<_, _>>()?,
            ),
            Some(_) => {
                return Err(CodecError::new(
                    ErrorKind::MalformedBody,
                    "Expected 'atomic:operations' to be an array.",
                )
                .at(&SourcePointer::root().field("atomic:operations")))
            }
        };
        self.read_document(&document)
    }

    pub fn read_document(&self, document: &Document) -> Result<Vec<Operation>, CodecError> {
        let batch_pointer = SourcePointer::root().field("atomic:operations");
        let operations = match &document.operations {
            Some(operations) if !operations.is_empty() => operations,
            _ => {
                return Err(CodecError::new(
                    ErrorKind::EmptyOperationsBatch,
                    "Expected at least one operation in 'atomic:operations'.",
                )
                .at(&batch_pointer))
            }
        };
        if let Some(limit) = self.options.max_operations_per_request {
            if operations.len() > limit {
                tracing::warn!(count = operations.len(), limit, "rejecting oversized batch");
                return Err(CodecError::new(
                    ErrorKind::TooManyOperations,
                    format!(
                        "The number of operations in this request ({}) is higher than the maximum of {limit}.",
                        operations.len()
                    ),
                )
                .at(&batch_pointer));
            }
        }

        let parsed = operations
            .iter()
            .enumerate()
            .map(|(index, operation)| self.read_operation(index, operation))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(operations = parsed.len(), "read atomic operations batch");
        Ok(parsed)
    }

    fn read_operation(
        &self,
        index: usize,
        object: &AtomicOperationObject,
    ) -> Result<Operation, CodecError> {
        let pointer = SourcePointer::operation(index);
        if object.href.is_some() {
            return Err(CodecError::new(
                ErrorKind::HrefNotSupported,
                "Use 'ref' to identify the target of an operation.",
            )
            .at(&pointer.field("href")));
        }
        let Some(code) = object.op else {
            return Err(
                CodecError::new(ErrorKind::MissingElement, "Expected 'op' element.").at(&pointer),
            );
        };
        tracing::trace!(index, op = %code, "reading operation");

        let reference = object
            .reference
            .as_ref()
            .map(|reference| self.read_reference(code, reference, &pointer.field("ref")))
            .transpose()?;

        match (code, reference) {
            (AtomicOperationCode::Remove, None) => Err(CodecError::new(
                ErrorKind::MissingElement,
                "Expected 'ref' element.",
            )
            .at(&pointer)),
            (
                _,
                Some(Reference {
                    resource,
                    relationship: Some(relationship),
                    ..
                }),
            ) => {
                let kind = match code {
                    AtomicOperationCode::Add => WriteOperationKind::AddToRelationship,
                    AtomicOperationCode::Update => WriteOperationKind::SetRelationship,
                    AtomicOperationCode::Remove => WriteOperationKind::RemoveFromRelationship,
                };
                self.read_relationship_operation(index, kind, resource, relationship, object)
            }
            (AtomicOperationCode::Add, Some(_)) => Err(CodecError::new(
                ErrorKind::MissingElement,
                "Expected 'relationship' element in 'ref' element.",
            )
            .at(&pointer.field("ref").field("relationship"))),
            (AtomicOperationCode::Remove, Some(reference)) => Ok(Operation {
                index,
                kind: WriteOperationKind::DeleteResource,
                resource: reference.resource,
                relationship: None,
                targeted: TargetedFields::new(),
                primary_location: PrimaryLocation::Ref,
            }),
            (AtomicOperationCode::Add, None) => self.read_resource_operation(
                index,
                WriteOperationKind::CreateResource,
                None,
                object,
            ),
            (AtomicOperationCode::Update, reference) => self.read_resource_operation(
                index,
                WriteOperationKind::UpdateResource,
                reference,
                object,
            ),
        }
    }

    fn read_reference(
        &self,
        code: AtomicOperationCode,
        reference: &AtomicReference,
        pointer: &SourcePointer,
    ) -> Result<Reference<'a>, CodecError> {
        let context = self.context();
        let Some(type_name) = reference.type_name.as_deref() else {
            return Err(CodecError::new(
                ErrorKind::MissingType,
                "Expected 'type' element in 'ref' element.",
            )
            .at(pointer));
        };
        check_presence(
            IdentityContext::Existing { in_batch: true },
            reference.id.as_deref(),
            reference.lid.as_deref(),
            self.options,
            pointer,
        )?;
        let shape = context.resolve_known_type(type_name, pointer)?;
        check_format(shape, reference.id.as_deref(), pointer)?;

        let relationship = match reference.relationship.as_deref() {
            None => None,
            Some(name) => {
                let relationship_pointer = pointer.field("relationship");
                let Some(definition) = shape.relationship(name) else {
                    return Err(CodecError::new(
                        ErrorKind::UnknownRelationship,
                        format!(
                            "Relationship '{name}' does not exist on resource type '{}'.",
                            shape.name
                        ),
                    )
                    .at(&relationship_pointer));
                };
                if code != AtomicOperationCode::Update && !definition.is_to_many() {
                    return Err(CodecError::new(
                        ErrorKind::ToOneRelationshipNotAllowed,
                        format!(
                            "Relationship '{name}' is a to-one relationship and cannot be targeted by '{code}'."
                        ),
                    )
                    .at(&relationship_pointer));
                }
                Some(definition)
            }
        };

        let mut resource = Resource::new(shape.name.clone());
        resource.id = reference.id.clone();
        resource.lid = reference.lid.clone();
        Ok(Reference {
            resource,
            shape,
            relationship,
        })
    }

    fn read_resource_operation(
        &self,
        index: usize,
        kind: WriteOperationKind,
        reference: Option<Reference<'a>>,
        object: &AtomicOperationObject,
    ) -> Result<Operation, CodecError> {
        let pointer = SourcePointer::operation(index);
        let data_pointer = pointer.field("data");
        let data = match &object.data {
            Data::Single(data) => data,
            Data::Many(_) => {
                return Err(CodecError::new(
                    ErrorKind::ExpectedSingleElement,
                    "Expected single data element for create/update resource operation.",
                )
                .at(&data_pointer))
            }
            Data::Absent | Data::Null => {
                return Err(CodecError::new(
                    ErrorKind::MissingElement,
                    "Expected 'data' element.",
                )
                .at(&pointer))
            }
        };

        let identity = match kind {
            WriteOperationKind::CreateResource => IdentityContext::Create { in_batch: true },
            _ => IdentityContext::Existing { in_batch: true },
        };
        let expected_type = reference.as_ref().map(|r| r.shape.name.as_str());
        let mut targeted = TargetedFields::new();
        let resource = parse_resource(
            &self.context(),
            data,
            identity,
            expected_type,
            &data_pointer,
            &mut targeted,
        )?;

        if let Some(reference) = &reference {
            if reference.resource.id != resource.id {
                return Err(CodecError::new(
                    ErrorKind::ResourceIdMismatch,
                    format!(
                        "Expected resource ID '{}' in 'data.id', instead of '{}'.",
                        reference.resource.id.as_deref().unwrap_or_default(),
                        resource.id.as_deref().unwrap_or_default()
                    ),
                )
                .at(&data_pointer.field("id")));
            }
            if reference.resource.lid != resource.lid {
                return Err(CodecError::new(
                    ErrorKind::ResourceIdMismatch,
                    format!(
                        "Expected resource local ID '{}' in 'data.lid', instead of '{}'.",
                        reference.resource.lid.as_deref().unwrap_or_default(),
                        resource.lid.as_deref().unwrap_or_default()
                    ),
                )
                .at(&data_pointer.field("lid")));
            }
        }

        Ok(Operation {
            index,
            kind,
            resource,
            relationship: None,
            targeted,
            primary_location: PrimaryLocation::Data,
        })
    }

    fn read_relationship_operation(
        &self,
        index: usize,
        kind: WriteOperationKind,
        mut resource: Resource,
        relationship: &RelationshipDef,
        object: &AtomicOperationObject,
    ) -> Result<Operation, CodecError> {
        let pointer = SourcePointer::operation(index);
        if object.data.is_absent() {
            return Err(
                CodecError::new(ErrorKind::MissingElement, "Expected 'data' element.")
                    .at(&pointer),
            );
        }
        let data: Data<ResourceIdentifierObject> = object.data.clone().map(Into::into);
        let value = parse_relationship_data(
            &self.context(),
            relationship,
            &data,
            &pointer.field("data"),
        )?;
        resource
            .relationships
            .insert(relationship.name.clone(), value);

        let mut targeted = TargetedFields::new();
        targeted.field_processed(&resource, TargetedField::Relationship(relationship));
        Ok(Operation {
            index,
            kind,
            resource,
            relationship: Some(relationship.name.clone()),
            targeted,
            primary_location: PrimaryLocation::Ref,
        })
    }
}

fn malformed(err: serde_json::Error) -> CodecError {
    tracing::debug!(%err, "rejecting malformed request body");
    CodecError::new(ErrorKind::MalformedBody, err.to_string())
}

fn decode_operation(index: usize, entry: Value) -> Result<AtomicOperationObject, CodecError> {
    match serde_json::from_value(entry.clone()) {
        Ok(operation) => Ok(operation),
        Err(err) => {
            let pointer = malformed_operation_pointer(&entry, index);
            tracing::debug!(index, %err, pointer = %pointer, "rejecting malformed operation");
            Err(CodecError::new(ErrorKind::MalformedBody, err.to_string())
                .at(&pointer)
                .in_operation(index))
        }
    }
}

/// Innermost member of an operation that keeps it from decoding.
fn malformed_operation_pointer(entry: &Value, index: usize) -> SourcePointer {
    let pointer = SourcePointer::operation(index);
    let Some(member) = offending_member::<AtomicOperationObject>(entry) else {
        return pointer;
    };
    let pointer = pointer.field(member);
    match (member, entry.get(member)) {
        ("ref", Some(reference)) => narrow::<AtomicReference>(reference, pointer),
        ("data", Some(Value::Array(elements))) => elements
            .iter()
            .enumerate()
            .find(|(_, element)| {
                serde_json::from_value::<ResourceObject>((*element).clone()).is_err()
            })
            .map(|(position, element)| {
                narrow::<ResourceObject>(element, pointer.element(position))
            })
            .unwrap_or(pointer),
        ("data", Some(data)) => narrow::<ResourceObject>(data, pointer),
        _ => pointer,
    }
}

fn narrow<T: DeserializeOwned>(value: &Value, pointer: SourcePointer) -> SourcePointer {
    match offending_member::<T>(value) {
        Some(member) => pointer.field(member),
        None => pointer,
    }
}

/// The member whose removal lets `value` decode as `T`.
fn offending_member<T: DeserializeOwned>(value: &Value) -> Option<&str> {
    let members = value.as_object()?;
    members
        .keys()
        .find(|name| {
            let mut rest = members.clone();
            rest.remove(name.as_str());
            serde_json::from_value::<T>(Value::Object(rest)).is_ok()
        })
        .map(String::as_str)
}
