//! Error types for codec operations
//!
//! Every failure the codec reports is a [`CodecError`]: an [`ErrorKind`] that fixes the
//! title and HTTP status, a human readable detail, and (when the failure can be located)
//! a JSON pointer into the request body plus the index of the offending atomic operation.
//! Errors render into wire [`ErrorObject`]s so hosts can answer with a protocol error
//! document without further mapping.

use crate::document::{Data, Document, ErrorObject, ErrorSource};
use std::fmt;
use thiserror::Error;

/// Classification of a codec failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The body is not valid JSON or does not have the shape of a document
    MalformedBody,
    /// A resource object or identifier lacks its `type` member
    MissingType,
    /// The `type` member names a type the directory does not know
    UnknownResourceType,
    /// A `lid` member was used outside an atomic operations batch
    LocalIdNotSupportedHere,
    /// An array was found where a single element was expected
    ExpectedSingleElement,
    /// A single element (or null) was found where an array was expected
    ExpectedDataArray,
    /// A related resource type cannot be assigned to the relationship's type
    IncompatibleRelatedType,
    /// The request tries to change a read-only attribute
    ReadOnlyAttribute,
    /// An attribute value cannot be converted to the attribute's type
    AttributeTypeMismatch,
    /// An attribute key that the resource type does not declare
    UnknownAttribute,
    /// A relationship name that the resource type does not declare
    UnknownRelationship,
    /// Neither `id` nor `lid` was provided where one is required
    MissingIdentity,
    /// Both `id` and `lid` were provided
    IdAndLidConflict,
    /// A create request carries an `id` while client-generated ids are disabled
    ClientGeneratedIdNotAllowed,
    /// A mandatory member such as `op`, `ref` or `data` is missing
    MissingElement,
    /// An add/remove relationship operation targets a to-one relationship
    ToOneRelationshipNotAllowed,
    /// The resource type in the body conflicts with the endpoint or `ref`
    ResourceTypeMismatch,
    /// The resource identity in `data` conflicts with the one in `ref`
    ResourceIdMismatch,
    /// An atomic operation uses the unsupported `href` member
    HrefNotSupported,
    /// The `atomic:operations` array is missing or empty
    EmptyOperationsBatch,
    /// The batch holds more operations than allowed
    TooManyOperations,
    /// An `id` does not convert to the resource's identity type
    IdentityFormatError,
    /// A local ID is defined twice in the same batch
    DuplicateLocalId,
    /// A local ID is referenced before any operation defined it
    UnassignedLocalId,
    /// A local ID is referenced with a different type than it was defined with
    IncompatibleLocalIdType,
    /// A local ID is referenced but its defining operation produced no identity
    LocalIdNotYetAvailable,
    /// A local ID is referenced by the same operation that defines it
    CannotDefineAndConsumeInSameOperation,
    /// The outbound converter was handed a payload it cannot represent
    UnsupportedPayloadShape,
    /// The wire document could not be written as JSON
    SerializationFailed,
}

impl ErrorKind {
    /// Short, stable summary used as the error object's `title`.
    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::MalformedBody => "Failed to deserialize request body.",
            ErrorKind::MissingType => "The 'type' element is required.",
            ErrorKind::UnknownResourceType => "Unknown resource type found.",
            ErrorKind::LocalIdNotSupportedHere => {
                "The 'lid' element is not supported at this endpoint."
            }
            ErrorKind::ExpectedSingleElement => "Expected a single data element.",
            ErrorKind::ExpectedDataArray => "Expected an array of data elements.",
            ErrorKind::IncompatibleRelatedType => "Incompatible resource type found.",
            ErrorKind::ReadOnlyAttribute => "Attribute is read-only.",
            ErrorKind::AttributeTypeMismatch => "Incompatible attribute value found.",
            ErrorKind::UnknownAttribute => "Unknown attribute found.",
            ErrorKind::UnknownRelationship => "Unknown relationship found.",
            ErrorKind::MissingIdentity => "The 'id' or 'lid' element is required.",
            ErrorKind::IdAndLidConflict => "The 'id' and 'lid' element are mutually exclusive.",
            ErrorKind::ClientGeneratedIdNotAllowed => {
                "The use of client-generated IDs is disabled."
            }
            ErrorKind::MissingElement => "A required element is missing.",
            ErrorKind::ToOneRelationshipNotAllowed => {
                "Only to-many relationships can be targeted through this operation."
            }
            ErrorKind::ResourceTypeMismatch => "Conflicting resource type.",
            ErrorKind::ResourceIdMismatch => "Conflicting resource identity.",
            ErrorKind::HrefNotSupported => "The 'href' element is not supported.",
            ErrorKind::EmptyOperationsBatch => "No operations found.",
            ErrorKind::TooManyOperations => "Too many operations in request.",
            ErrorKind::IdentityFormatError => "Incompatible 'id' value found.",
            ErrorKind::DuplicateLocalId => {
                "Another local ID with the same name is already defined at this point."
            }
            ErrorKind::UnassignedLocalId => "Local ID is not defined at this point.",
            ErrorKind::IncompatibleLocalIdType => "Incompatible type in local ID usage.",
            ErrorKind::LocalIdNotYetAvailable => {
                "Server-generated value for local ID is not available at this point."
            }
            ErrorKind::CannotDefineAndConsumeInSameOperation => {
                "Local ID cannot be both defined and used within the same operation."
            }
            ErrorKind::UnsupportedPayloadShape => "Unsupported response payload.",
            ErrorKind::SerializationFailed => "Failed to serialize response body.",
        }
    }

    /// HTTP status code a host should answer with.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::MalformedBody => 400,
            ErrorKind::IncompatibleRelatedType | ErrorKind::ResourceTypeMismatch => 409,
            ErrorKind::TooManyOperations => 413,
            ErrorKind::UnsupportedPayloadShape | ErrorKind::SerializationFailed => 500,
            _ => 422,
        }
    }

    /// Internal errors are programming defects in the host, not bad requests.
    pub fn is_internal(self) -> bool {
        self.status() >= 500
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A located codec failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {}", .kind.title(), .detail)]
pub struct CodecError {
    pub kind: ErrorKind,
    pub detail: String,
    /// JSON pointer into the request body, e.g. `/data/relationships/author/data`.
    pub pointer: Option<String>,
    /// Zero-based index of the atomic operation that caused the failure.
    pub operation_index: Option<usize>,
}

impl CodecError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        CodecError {
            kind,
            detail: detail.into(),
            pointer: None,
            operation_index: None,
        }
    }

    /// Locate the error. Pointers rooted in an atomic operation also record its index.
    pub fn at(mut self, pointer: &SourcePointer) -> Self {
        if !pointer.is_root() {
            self.pointer = Some(pointer.to_string());
        }
        if let Some(index) = pointer.operation_index() {
            self.operation_index = Some(index);
        }
        self
    }

    pub fn in_operation(mut self, index: usize) -> Self {
        self.operation_index = Some(index);
        self
    }

    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject {
            status: Some(self.kind.status().to_string()),
            title: Some(self.kind.title().to_string()),
            detail: Some(self.detail.clone()),
            source: self.pointer.as_ref().map(|pointer| ErrorSource {
                pointer: Some(pointer.clone()),
                ..ErrorSource::default()
            }),
            ..ErrorObject::default()
        }
    }

    /// Wrap the error in a top-level error document.
    pub fn into_document(self) -> Document {
        Document {
            data: Data::Absent,
            errors: Some(vec![self.to_error_object()]),
            ..Document::default()
        }
    }
}

/// Builder for JSON pointers into a request body
///
/// Array positions attach to the preceding segment the way the atomic operations
/// extension spells them: `/atomic:operations[1]/data/relationships/tags/data[0]/lid`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePointer {
    text: String,
    operation_index: Option<usize>,
}

impl SourcePointer {
    /// The whole document.
    pub fn root() -> Self {
        SourcePointer::default()
    }

    /// The operation at `index` inside `atomic:operations`.
    pub fn operation(index: usize) -> Self {
        SourcePointer {
            text: format!("/atomic:operations[{index}]"),
            operation_index: Some(index),
        }
    }

    pub fn field(&self, name: &str) -> Self {
        SourcePointer {
            text: format!("{}/{name}", self.text),
            operation_index: self.operation_index,
        }
    }

    pub fn element(&self, index: usize) -> Self {
        SourcePointer {
            text: format!("{}[{index}]", self.text),
            operation_index: self.operation_index,
        }
    }

    pub fn is_root(&self) -> bool {
        self.text.is_empty()
    }

    pub fn operation_index(&self) -> Option<usize> {
        self.operation_index
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for SourcePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
