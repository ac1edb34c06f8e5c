//! The shared resource parsing pipeline.
//!
//! Server request bodies, client responses and atomic operations all turn resource
//! objects into [`Resource`]s through the functions in this module. What differs between
//! them is captured by [`ParseContext`] (direction, batch membership) and by the
//! [`FieldHook`] passed in.

use super::attributes::parse_attributes;
use super::hooks::{FieldHook, TargetedField};
use super::identity::{check_format, check_presence, IdentityContext};
use crate::document::{Data, Relationships, ResourceIdentifierObject, ResourceObject};
use crate::error::{CodecError, ErrorKind, SourcePointer};
use crate::options::CodecOptions;
use crate::resources::{
    Cardinality, RelationshipDef, RelationshipValue, Resource, ResourceDirectory, ResourceShape,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Request,
    Response,
}

#[derive(Clone, Copy)]
pub(crate) struct ParseContext<'a> {
    pub directory: &'a dyn ResourceDirectory,
    pub options: &'a CodecOptions,
    pub direction: Direction,
    pub in_batch: bool,
}

impl<'a> ParseContext<'a> {
    /// Identity rules for identifiers inside relationship data.
    fn identifier_context(&self) -> IdentityContext {
        match self.direction {
            Direction::Request => IdentityContext::Existing {
                in_batch: self.in_batch,
            },
            Direction::Response => IdentityContext::Response,
        }
    }

    pub(crate) fn resolve_type(
        &self,
        type_name: Option<&str>,
        pointer: &SourcePointer,
    ) -> Result<&'a ResourceShape, CodecError> {
        let Some(type_name) = type_name else {
            return Err(CodecError::new(
                ErrorKind::MissingType,
                "Expected 'type' element in 'data' element.",
            )
            .at(pointer));
        };
        self.resolve_known_type(type_name, pointer)
    }

    pub(crate) fn resolve_known_type(
        &self,
        type_name: &str,
        pointer: &SourcePointer,
    ) -> Result<&'a ResourceShape, CodecError> {
        self.directory.resolve(type_name).ok_or_else(|| {
            CodecError::new(
                ErrorKind::UnknownResourceType,
                format!("Resource type '{type_name}' does not exist."),
            )
            .at(&pointer.field("type"))
        })
    }
}

/// Parse one resource object.
///
/// `expected_type` is the type the endpoint or operation dictates; the object's type must
/// be assignable to it.
pub(crate) fn parse_resource<H: FieldHook + ?Sized>(
    context: &ParseContext<'_>,
    object: &ResourceObject,
    identity: IdentityContext,
    expected_type: Option<&str>,
    pointer: &SourcePointer,
    hook: &mut H,
) -> Result<Resource, CodecError> {
    let shape = context.resolve_type(object.type_name.as_deref(), pointer)?;

    if let Some(expected) = expected_type {
        if !context.directory.is_assignable(expected, &shape.name) {
            return Err(CodecError::new(
                ErrorKind::ResourceTypeMismatch,
                format!(
                    "Type '{}' is incompatible with type '{expected}'.",
                    shape.name
                ),
            )
            .at(&pointer.field("type")));
        }
    }
    tracing::trace!(resource = %shape.name, pointer = %pointer, "parsing resource object");

    let mut resource = Resource::new(shape.name.clone());
    resource.id = object.id.clone();
    resource.lid = object.lid.clone();
    if let Some(meta) = &object.meta {
        resource.meta = meta.clone();
    }

    if let Some(attributes) = &object.attributes {
        parse_attributes(context, shape, attributes, &mut resource, pointer, hook)?;
    }
    if let Some(relationships) = &object.relationships {
        parse_relationships(context, shape, relationships, &mut resource, pointer, hook)?;
    }

    check_presence(
        identity,
        object.id.as_deref(),
        object.lid.as_deref(),
        context.options,
        pointer,
    )?;
    check_format(shape, object.id.as_deref(), pointer)?;
    Ok(resource)
}

fn parse_relationships<H: FieldHook + ?Sized>(
    context: &ParseContext<'_>,
    shape: &ResourceShape,
    relationships: &Relationships,
    resource: &mut Resource,
    pointer: &SourcePointer,
    hook: &mut H,
) -> Result<(), CodecError> {
    for (name, relationship) in relationships {
        let relationship_pointer = pointer.field("relationships").field(name);
        let Some(definition) = shape.relationship(name) else {
            if context.options.allow_unknown_fields {
                continue;
            }
            return Err(CodecError::new(
                ErrorKind::UnknownRelationship,
                format!(
                    "Relationship '{name}' does not exist on resource type '{}'.",
                    shape.name
                ),
            )
            .at(&relationship_pointer));
        };

        // Linkage-free relationship objects (links or meta only) leave the value unassigned.
        if relationship.data.is_absent() {
            continue;
        }

        let value = parse_relationship_data(
            context,
            definition,
            &relationship.data,
            &relationship_pointer.field("data"),
        )?;
        resource.relationships.insert(name.clone(), value);
        hook.field_processed(resource, TargetedField::Relationship(definition));
    }
    Ok(())
}

/// Parse the `data` of a relationship against its declared cardinality.
pub(crate) fn parse_relationship_data(
    context: &ParseContext<'_>,
    definition: &RelationshipDef,
    data: &Data<ResourceIdentifierObject>,
    pointer: &SourcePointer,
) -> Result<RelationshipValue, CodecError> {
    match (definition.cardinality, data) {
        (_, Data::Absent) => Err(CodecError::new(
            ErrorKind::MissingElement,
            "Expected 'data' element.",
        )
        .at(pointer)),
        (Cardinality::ToOne, Data::Null) => Ok(RelationshipValue::ToOne(None)),
        (Cardinality::ToOne, Data::Single(identifier)) => {
            let related = parse_identifier(context, definition, identifier, pointer)?;
            Ok(RelationshipValue::ToOne(Some(Box::new(related))))
        }
        (Cardinality::ToOne, Data::Many(_)) => Err(CodecError::new(
            ErrorKind::ExpectedSingleElement,
            format!(
                "Expected single data element for to-one relationship '{}'.",
                definition.name
            ),
        )
        .at(pointer)),
        (Cardinality::ToMany, Data::Many(identifiers)) => identifiers
            .iter()
            .enumerate()
            .map(|(index, identifier)| {
                parse_identifier(context, definition, identifier, &pointer.element(index))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(RelationshipValue::ToMany),
        (Cardinality::ToMany, Data::Null | Data::Single(_)) => Err(CodecError::new(
            ErrorKind::ExpectedDataArray,
            format!(
                "Expected data[] element for to-many relationship '{}'.",
                definition.name
            ),
        )
        .at(pointer)),
    }
}

fn parse_identifier(
    context: &ParseContext<'_>,
    definition: &RelationshipDef,
    identifier: &ResourceIdentifierObject,
    pointer: &SourcePointer,
) -> Result<Resource, CodecError> {
    let Some(type_name) = identifier.type_name.as_deref() else {
        return Err(CodecError::new(
            ErrorKind::MissingType,
            format!(
                "Expected 'type' element in 'data' element of relationship '{}'.",
                definition.name
            ),
        )
        .at(pointer));
    };
    check_presence(
        context.identifier_context(),
        identifier.id.as_deref(),
        identifier.lid.as_deref(),
        context.options,
        pointer,
    )?;
    let shape = context.resolve_known_type(type_name, pointer)?;
    if !context
        .directory
        .is_assignable(&definition.related_type, &shape.name)
    {
        return Err(CodecError::new(
            ErrorKind::IncompatibleRelatedType,
            format!(
                "Type '{}' is incompatible with type '{}' of relationship '{}'.",
                shape.name, definition.related_type, definition.name
            ),
        )
        .at(&pointer.field("type")));
    }
    check_format(shape, identifier.id.as_deref(), pointer)?;

    let mut related = Resource::new(shape.name.clone());
    related.id = identifier.id.clone();
    related.lid = identifier.lid.clone();
    Ok(related)
}
