//! Document wire model.
//!
//! Plain data shapes that both converters read and write. Nothing in here knows about
//! resource types or request scopes; validation happens in [`crate::reader`] and
//! [`crate::atomic`], shaping in [`crate::response`].

pub mod atomic;
pub mod data;
pub mod nodes;

pub use atomic::{AtomicOperationCode, AtomicOperationObject, AtomicReference, AtomicResultObject};
pub use data::Data;
pub use nodes::*;

use crate::error::{CodecError, ErrorKind};

/// Parse JSON text into the generic document shape.
pub fn parse_document(text: &str) -> Result<Document, CodecError> {
    serde_json::from_str(text).map_err(|err| {
        tracing::debug!(%err, "rejecting malformed request body");
        CodecError::new(ErrorKind::MalformedBody, err.to_string())
    })
}

/// Serialize a document as compact JSON.
pub fn encode(document: &Document) -> Result<String, CodecError> {
    serde_json::to_string(document)
        .map_err(|err| CodecError::new(ErrorKind::SerializationFailed, err.to_string()))
}

/// Serialize a document as indented JSON.
pub fn encode_pretty(document: &Document) -> Result<String, CodecError> {
    serde_json::to_string_pretty(document)
        .map_err(|err| CodecError::new(ErrorKind::SerializationFailed, err.to_string()))
}
