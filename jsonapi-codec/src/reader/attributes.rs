//! Attribute assignment.

use super::hooks::{FieldHook, TargetedField};
use super::resource::{Direction, ParseContext};
use crate::document::Attributes;
use crate::error::{CodecError, ErrorKind, SourcePointer};
use crate::resources::{Resource, ResourceShape};

pub(crate) fn parse_attributes<H: FieldHook + ?Sized>(
    context: &ParseContext<'_>,
    shape: &ResourceShape,
    attributes: &Attributes,
    resource: &mut Resource,
    pointer: &SourcePointer,
    hook: &mut H,
) -> Result<(), CodecError> {
    for (name, value) in attributes {
        let attribute_pointer = pointer.field("attributes").field(name);
        let Some(definition) = shape.attribute(name).filter(|def| def.name != "id") else {
            if context.options.allow_unknown_fields {
                continue;
            }
            return Err(CodecError::new(
                ErrorKind::UnknownAttribute,
                format!(
                    "Attribute '{name}' does not exist on resource type '{}'.",
                    shape.name
                ),
            )
            .at(&attribute_pointer));
        };

        if definition.read_only && context.direction == Direction::Request {
            return Err(CodecError::new(
                ErrorKind::ReadOnlyAttribute,
                format!(
                    "Attribute '{name}' on resource type '{}' is read-only.",
                    shape.name
                ),
            )
            .at(&attribute_pointer));
        }

        let coerced = definition
            .coerce(value, context.options.allow_unknown_fields)
            .map_err(|err| {
                let nested = err
                    .path
                    .iter()
                    .fold(attribute_pointer.clone(), |p, segment| p.field(segment));
                CodecError::new(
                    ErrorKind::AttributeTypeMismatch,
                    format!(
                        "Failed to convert attribute '{name}' to type '{}'. {}",
                        definition.attr_type.name(),
                        err.message
                    ),
                )
                .at(&nested)
            })?;

        resource.attributes.insert(name.clone(), coerced);
        hook.field_processed(resource, TargetedField::Attribute(definition));
    }
    Ok(())
}
