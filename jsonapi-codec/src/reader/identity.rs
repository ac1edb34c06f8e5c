//! Identity rules for resource objects and identifiers.

use crate::error::{CodecError, ErrorKind, SourcePointer};
use crate::options::CodecOptions;
use crate::resources::ResourceShape;

/// Where an `id`/`lid` pair is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IdentityContext {
    /// A resource that is about to be created.
    Create { in_batch: bool },
    /// A resource that must already exist, including relationship identifiers.
    Existing { in_batch: bool },
    /// A request body whose write operation is not known.
    Unspecified { in_batch: bool },
    /// A resource in a server response.
    Response,
}

impl IdentityContext {
    fn allows_lid(self) -> bool {
        match self {
            IdentityContext::Create { in_batch }
            | IdentityContext::Existing { in_batch }
            | IdentityContext::Unspecified { in_batch } => in_batch,
            IdentityContext::Response => true,
        }
    }
}

/// Check which of `id` and `lid` are present.
pub(crate) fn check_presence(
    context: IdentityContext,
    id: Option<&str>,
    lid: Option<&str>,
    options: &CodecOptions,
    pointer: &SourcePointer,
) -> Result<(), CodecError> {
    if lid.is_some() && !context.allows_lid() {
        return Err(CodecError::new(
            ErrorKind::LocalIdNotSupportedHere,
            "Local IDs can only be used in atomic:operations requests.",
        )
        .at(&pointer.field("lid")));
    }
    if id.is_some() && lid.is_some() {
        return Err(CodecError::new(
            ErrorKind::IdAndLidConflict,
            "Expected either 'id' or 'lid', not both.",
        )
        .at(pointer));
    }
    match context {
        IdentityContext::Create { .. } => {
            if id.is_some() && !options.allow_client_generated_ids {
                return Err(CodecError::new(
                    ErrorKind::ClientGeneratedIdNotAllowed,
                    "Client-generated IDs are not allowed for this resource type.",
                )
                .at(&pointer.field("id")));
            }
        }
        IdentityContext::Existing { in_batch } if id.is_none() && lid.is_none() => {
            let detail = if in_batch {
                "Expected 'id' or 'lid' element."
            } else {
                "Expected 'id' element."
            };
            return Err(CodecError::new(ErrorKind::MissingIdentity, detail).at(pointer));
        }
        IdentityContext::Response if id.is_none() && lid.is_none() => {
            return Err(
                CodecError::new(ErrorKind::MissingIdentity, "Expected 'id' element.").at(pointer),
            );
        }
        _ => {}
    }
    Ok(())
}

/// Check that an `id` converts to the identity kind of its type.
pub(crate) fn check_format(
    shape: &ResourceShape,
    id: Option<&str>,
    pointer: &SourcePointer,
) -> Result<(), CodecError> {
    let Some(id) = id else {
        return Ok(());
    };
    shape.identity.validate(id).map_err(|detail| {
        CodecError::new(ErrorKind::IdentityFormatError, detail).at(&pointer.field("id"))
    })
}
