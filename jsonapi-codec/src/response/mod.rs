//! Outbound conversion
//!
//! [`ResponseAdapter`] turns a [`ResponsePayload`] into a wire [`Document`]. Per resource
//! it asks the [`FieldSelector`] what to render, the [`LinkBuilder`] how to link it, and
//! walks the scope's include expression alongside the relationship values to build the
//! flattened `included` member.
//!
//! Primary resources are converted before any included resource, so values rendered for
//! a primary resource are never replaced by values reached through an include path.
//! Among included resources the first path to reach a resource wins; later paths only
//! fill relationships that the first path left without `data`.

mod included;

use crate::document::{
    AtomicResultObject, Data, Document, ErrorObject, JsonApiObject, Meta, RelationshipObject,
    ResourceIdentifierObject, ResourceObject, ATOMIC_EXTENSION, JSONAPI_VERSION,
};
use crate::error::{CodecError, ErrorKind};
use crate::links::LinkBuilder;
use crate::options::{CodecOptions, ValueHandling};
use crate::query::{FieldSelector, IncludeElement};
use crate::request::{EndpointKind, OperationDescriptor, RequestScope};
use crate::resources::{Cardinality, RelationshipValue, Resource, ResourceDirectory};
use included::IncludedSet;
use std::collections::BTreeMap;

/// What a request handler answers with.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// No primary data (`"data": null`).
    Null,
    Single(Resource),
    /// Resources of one type.
    Many(Vec<Resource>),
    /// Results of an atomic batch, in operation order.
    Operations(Vec<OperationContainer>),
    Errors(Vec<ErrorObject>),
}

/// Outcome of one atomic operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationContainer {
    pub descriptor: OperationDescriptor,
    /// The stored resource, for operations that return one.
    pub resource: Option<Resource>,
}

type Pending<'r, 'i> = Vec<(&'r Resource, &'i [IncludeElement])>;

fn unsupported(detail: impl Into<String>) -> CodecError {
    CodecError::new(ErrorKind::UnsupportedPayloadShape, detail)
}

/// Converts response payloads into documents for one request.
pub struct ResponseAdapter<'a> {
    directory: &'a dyn ResourceDirectory,
    selector: &'a mut dyn FieldSelector,
    links: &'a dyn LinkBuilder,
    options: &'a CodecOptions,
    scope: RequestScope,
    meta: Option<Meta>,
}

impl<'a> ResponseAdapter<'a> {
    pub fn new(
        directory: &'a dyn ResourceDirectory,
        selector: &'a mut dyn FieldSelector,
        links: &'a dyn LinkBuilder,
        options: &'a CodecOptions,
        scope: RequestScope,
    ) -> Self {
        ResponseAdapter {
            directory,
            selector,
            links,
            options,
            scope,
            meta: None,
        }
    }

    /// Top-level `meta` for the produced document.
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }

    pub fn convert(&mut self, payload: &ResponsePayload) -> Result<Document, CodecError> {
        self.selector.reset();
        let document = match payload {
            ResponsePayload::Null => self.resource_document(&[], false)?,
            ResponsePayload::Single(resource) => {
                self.resource_document(std::slice::from_ref(resource), false)?
            }
            ResponsePayload::Many(resources) => {
                if let Some(first) = resources.first() {
                    if let Some(other) = resources.iter().find(|r| r.type_name != first.type_name)
                    {
                        return Err(unsupported(format!(
                            "Expected resources of type '{}' only, found '{}'.",
                            first.type_name, other.type_name
                        )));
                    }
                }
                self.resource_document(resources, true)?
            }
            ResponsePayload::Operations(containers) => {
                if containers.is_empty() {
                    return Err(unsupported("Expected at least one operation result."));
                }
                let mut results = Vec::with_capacity(containers.len());
                for (index, container) in containers.iter().enumerate() {
                    results.push(self.convert_operation_entry(index, container)?);
                }
                self.finish_operations(results)
            }
            ResponsePayload::Errors(errors) => {
                if errors.is_empty() {
                    return Err(unsupported("Expected at least one error object."));
                }
                Document {
                    jsonapi: self.jsonapi_object(),
                    errors: Some(errors.clone()),
                    meta: self.meta.clone(),
                    ..Document::default()
                }
            }
        };
        tracing::debug!(
            included = document.included.as_ref().map_or(0, Vec::len),
            "converted response payload"
        );
        Ok(document)
    }

    /// Convert the result of one atomic operation and reset the field selector.
    pub fn convert_operation_entry(
        &mut self,
        index: usize,
        container: &OperationContainer,
    ) -> Result<AtomicResultObject, CodecError> {
        self.scope.apply_operation(&container.descriptor, index);
        let data = match &container.resource {
            Some(resource) if container.descriptor.kind.returns_resource() => {
                let mut set = IncludedSet::new();
                let mut pending = Vec::new();
                let (position, _) = set.reserve_primary(resource.key());
                let object = self.build_object(resource, &[], &mut pending)?;
                set.place_primary(position, object);
                let (mut primary, _) = set.into_parts();
                Data::Single(primary.remove(0))
            }
            _ => Data::Null,
        };
        tracing::trace!(index, operation = %container.descriptor.kind, "converted operation result");
        self.selector.reset();
        Ok(AtomicResultObject { data, meta: None })
    }

    /// Wrap converted operation results in an `atomic:results` document.
    pub fn finish_operations(&self, results: Vec<AtomicResultObject>) -> Document {
        Document {
            jsonapi: self.jsonapi_object(),
            links: self.links.top_level_links(&self.scope),
            results: Some(results),
            meta: self.meta.clone(),
            ..Document::default()
        }
    }

    fn jsonapi_object(&self) -> Option<JsonApiObject> {
        if !self.options.include_jsonapi_version {
            return None;
        }
        Some(JsonApiObject {
            version: Some(JSONAPI_VERSION.to_string()),
            ext: self
                .scope
                .uses_atomic_extension()
                .then(|| vec![ATOMIC_EXTENSION.to_string()]),
            ..JsonApiObject::default()
        })
    }

    fn resource_document(
        &mut self,
        resources: &[Resource],
        many: bool,
    ) -> Result<Document, CodecError> {
        // Cloned so that include nodes can be borrowed while `self` is mutated.
        let include = self.scope.include.clone();
        let top: &[IncludeElement] = include
            .as_ref()
            .map(|e| e.elements())
            .unwrap_or_default();

        let mut set = IncludedSet::new();
        let mut positions = Vec::with_capacity(resources.len());
        for resource in resources {
            positions.push(set.reserve_primary(resource.key()));
        }

        let mut pending = Vec::new();
        for (resource, (position, _)) in resources.iter().zip(&positions) {
            let object = self.build_object(resource, top, &mut pending)?;
            set.place_primary(*position, object);
        }
        for (resource, children) in pending {
            self.visit_included(resource, children, &mut set)?;
        }

        let (primary, included) = set.into_parts();
        let data = if many {
            Data::Many(primary)
        } else {
            primary.into_iter().next().map_or(Data::Null, Data::Single)
        };
        Ok(Document {
            jsonapi: self.jsonapi_object(),
            links: self.links.top_level_links(&self.scope),
            data,
            included: include.as_ref().map(|_| included),
            meta: self.meta.clone(),
            ..Document::default()
        })
    }

    /// Place a related resource into the set, then descend into its included relationships.
    fn visit_included<'r, 'i>(
        &mut self,
        resource: &'r Resource,
        include: &'i [IncludeElement],
        set: &mut IncludedSet,
    ) -> Result<(), CodecError> {
        let mut pending = Vec::new();
        let object = self.build_object(resource, include, &mut pending)?;
        set.place(resource.key(), object);
        for (related, children) in pending {
            self.visit_included(related, children, set)?;
        }
        Ok(())
    }

    /// Build the resource object for one resource. Related resources that must be rendered
    /// into `included` are pushed onto `pending` together with their include subtree.
    fn build_object<'r, 'i>(
        &mut self,
        resource: &'r Resource,
        include: &'i [IncludeElement],
        pending: &mut Pending<'r, 'i>,
    ) -> Result<ResourceObject, CodecError> {
        let shape = self.directory.resolve_resource(resource).ok_or_else(|| {
            unsupported(format!(
                "Resource type '{}' is not registered.",
                resource.type_name
            ))
        })?;
        let relationship_endpoint = self.scope.kind == EndpointKind::Relationship;
        let fields = if relationship_endpoint {
            Default::default()
        } else {
            self.selector.selected_fields(shape, &self.scope)
        };
        tracing::trace!(resource = %resource.type_name, id = ?resource.id, "converting resource");

        let mut attributes = BTreeMap::new();
        for attribute in &shape.attributes {
            if attribute.name == "id" || !fields.contains_attribute(&attribute.name) {
                continue;
            }
            let value = resource
                .attributes
                .get(&attribute.name)
                .cloned()
                .unwrap_or_else(|| attribute.unset_value());
            if value.is_null() && self.options.null_values == ValueHandling::Omit {
                continue;
            }
            if self.options.default_values == ValueHandling::Omit
                && attribute.attr_type.is_default(&value)
            {
                continue;
            }
            attributes.insert(attribute.name.clone(), value);
        }

        let mut relationships = BTreeMap::new();
        for relationship in &shape.relationships {
            if !fields.contains_relationship(&relationship.name) {
                continue;
            }
            let links = self.links.relationship_links(shape, relationship, resource);
            let data = match include.iter().find(|e| e.relationship == relationship.name) {
                None => Data::Absent,
                Some(element) => {
                    let value = resource.related(&relationship.name);
                    match (relationship.cardinality, value) {
                        (Cardinality::ToOne, None) => Data::Null,
                        (Cardinality::ToMany, None) => Data::Many(Vec::new()),
                        (Cardinality::ToOne, Some(RelationshipValue::ToOne(related))) => {
                            match related {
                                Some(related) => {
                                    let identifier = identifier_of(related)?;
                                    pending.push((&**related, element.children.as_slice()));
                                    Data::Single(identifier)
                                }
                                None => Data::Null,
                            }
                        }
                        (Cardinality::ToMany, Some(RelationshipValue::ToMany(related))) => {
                            let mut identifiers = Vec::with_capacity(related.len());
                            for item in related {
                                identifiers.push(identifier_of(item)?);
                                pending.push((item, element.children.as_slice()));
                            }
                            Data::Many(identifiers)
                        }
                        _ => {
                            return Err(unsupported(format!(
                                "Value of relationship '{}' on type '{}' does not match its cardinality.",
                                relationship.name, shape.name
                            )))
                        }
                    }
                }
            };
            if links.is_some() || data.is_assigned() {
                relationships.insert(
                    relationship.name.clone(),
                    RelationshipObject {
                        links,
                        data,
                        meta: None,
                    },
                );
            }
        }

        Ok(ResourceObject {
            type_name: Some(resource.type_name.clone()),
            id: resource.id.clone(),
            lid: if resource.id.is_none() {
                resource.lid.clone()
            } else {
                None
            },
            attributes: (!attributes.is_empty()).then_some(attributes),
            relationships: (!relationships.is_empty()).then_some(relationships),
            links: if relationship_endpoint {
                None
            } else {
                self.links.resource_links(shape, resource.id.as_deref())
            },
            meta: (!resource.meta.is_empty()).then(|| resource.meta.clone()),
        })
    }
}

fn identifier_of(resource: &Resource) -> Result<ResourceIdentifierObject, CodecError> {
    if resource.id.is_none() && resource.lid.is_none() {
        return Err(unsupported(format!(
            "Related resource of type '{}' has no identity.",
            resource.type_name
        )));
    }
    Ok(ResourceIdentifierObject {
        type_name: Some(resource.type_name.clone()),
        id: resource.id.clone(),
        lid: if resource.id.is_none() {
            resource.lid.clone()
        } else {
            None
        },
        meta: None,
    })
}
