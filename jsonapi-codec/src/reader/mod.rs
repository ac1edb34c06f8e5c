//! Inbound conversion
//!
//! [`DocumentReader`] parses request bodies (server side) and response documents (client
//! side) into [`Resource`]s. Both sides run the same pipeline in [`resource`]; they differ
//! in the [`FieldHook`] they carry:
//!
//!     ServerReader = DocumentReader<TargetedFields>   records assigned fields
//!     ClientReader = DocumentReader<NoTracking>       records nothing
//!
//! Every failure is a [`CodecError`] located by a pointer into the body, e.g.
//! `/data/relationships/tags/data[1]/type`.

mod attributes;
pub mod hooks;
pub(crate) mod identity;
pub(crate) mod resource;

pub use hooks::{FieldHook, NoTracking, TargetedField, TargetedFields};

use crate::document::{
    parse_document, Data, Document, ErrorObject, Meta, ResourceIdentifierObject,
};
use crate::error::{CodecError, ErrorKind, SourcePointer};
use crate::options::CodecOptions;
use crate::request::{EndpointKind, RequestScope, WriteOperationKind};
use crate::resources::{RelationshipValue, Resource, ResourceDirectory, ResourceKey};
use identity::IdentityContext;
use resource::{parse_relationship_data, parse_resource, Direction, ParseContext};
use std::collections::{HashMap, HashSet};

/// A parsed request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `data` was absent or null.
    Empty,
    Resource(Resource),
    /// Resources in document order, duplicates removed (first occurrence wins).
    Resources(Vec<Resource>),
    /// Body of a relationship endpoint.
    Relationship(RelationshipValue),
}

/// A parsed response document with included resources linked into the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseBody {
    pub data: Data<Resource>,
    pub errors: Vec<ErrorObject>,
    pub meta: Meta,
}

pub struct DocumentReader<'a, H: FieldHook> {
    directory: &'a dyn ResourceDirectory,
    options: &'a CodecOptions,
    scope: RequestScope,
    hook: H,
}

pub type ServerReader<'a> = DocumentReader<'a, TargetedFields>;
pub type ClientReader<'a> = DocumentReader<'a, NoTracking>;

impl<'a> DocumentReader<'a, TargetedFields> {
    pub fn server(
        directory: &'a dyn ResourceDirectory,
        options: &'a CodecOptions,
        scope: RequestScope,
    ) -> Self {
        DocumentReader::new(directory, options, scope, TargetedFields::new())
    }
}

impl<'a> DocumentReader<'a, NoTracking> {
    pub fn client(directory: &'a dyn ResourceDirectory, options: &'a CodecOptions) -> Self {
        DocumentReader::new(directory, options, RequestScope::default(), NoTracking)
    }
}

impl<'a, H: FieldHook> DocumentReader<'a, H> {
    pub fn new(
        directory: &'a dyn ResourceDirectory,
        options: &'a CodecOptions,
        scope: RequestScope,
        hook: H,
    ) -> Self {
        DocumentReader {
            directory,
            options,
            scope,
            hook,
        }
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    pub fn into_hook(self) -> H {
        self.hook
    }

    fn context(&self, direction: Direction) -> ParseContext<'a> {
        ParseContext {
            directory: self.directory,
            options: self.options,
            direction,
            in_batch: false,
        }
    }

    /// Parse a request body for the endpoint described by the scope.
    pub fn read_body(&mut self, text: &str) -> Result<RequestBody, CodecError> {
        let document = parse_document(text)?;
        if self.scope.kind == EndpointKind::Relationship {
            return self.read_relationship_body(document);
        }

        let context = self.context(Direction::Request);
        let identity = match self.scope.write_operation {
            Some(WriteOperationKind::CreateResource) => IdentityContext::Create { in_batch: false },
            Some(_) => IdentityContext::Existing { in_batch: false },
            None => IdentityContext::Unspecified { in_batch: false },
        };
        let expected_type = match self.scope.kind {
            EndpointKind::Primary => self.scope.primary_type.clone(),
            _ => None,
        };
        let data_pointer = SourcePointer::root().field("data");

        let body = match &document.data {
            Data::Absent | Data::Null => RequestBody::Empty,
            Data::Single(object) => RequestBody::Resource(parse_resource(
                &context,
                object,
                identity,
                expected_type.as_deref(),
                &data_pointer,
                &mut self.hook,
            )?),
            Data::Many(objects) => {
                let mut seen = HashSet::new();
                let mut resources = Vec::with_capacity(objects.len());
                for (index, object) in objects.iter().enumerate() {
                    let resource = parse_resource(
                        &context,
                        object,
                        identity,
                        expected_type.as_deref(),
                        &data_pointer.element(index),
                        &mut self.hook,
                    )?;
                    match resource.key() {
                        Some(key) if !seen.insert(key.clone()) => {
                            tracing::debug!(index, "dropping duplicate resource in request body");
                        }
                        _ => resources.push(resource),
                    }
                }
                RequestBody::Resources(resources)
            }
        };
        tracing::debug!(endpoint = ?self.scope.kind, "read request body");
        Ok(body)
    }

    fn read_relationship_body(&mut self, document: Document) -> Result<RequestBody, CodecError> {
        let context = self.context(Direction::Request);
        let (Some(type_name), Some(name)) = (
            self.scope.primary_type.as_deref(),
            self.scope.relationship.as_deref(),
        ) else {
            return Err(CodecError::new(
                ErrorKind::UnknownRelationship,
                "The request does not target a relationship.",
            ));
        };
        let shape = context.resolve_known_type(type_name, &SourcePointer::root())?;
        let Some(definition) = shape.relationship(name) else {
            return Err(CodecError::new(
                ErrorKind::UnknownRelationship,
                format!("Relationship '{name}' does not exist on resource type '{type_name}'."),
            ));
        };

        let data: Data<ResourceIdentifierObject> = document.data.map(Into::into);
        let value = parse_relationship_data(
            &context,
            definition,
            &data,
            &SourcePointer::root().field("data"),
        )?;
        self.hook.field_processed(
            &Resource::new(type_name),
            TargetedField::Relationship(definition),
        );
        Ok(RequestBody::Relationship(value))
    }

    /// Parse a response document into a navigable graph.
    ///
    /// Relationship values first hold identity-only resources; those that appear in
    /// `included` (or as primary data) are replaced by the full resource. A resource that
    /// is already being expanded higher up the graph stays a shell, so cycles terminate.
    pub fn read_response(&mut self, text: &str) -> Result<ResponseBody, CodecError> {
        let document = parse_document(text)?;
        let context = self.context(Direction::Response);

        let data_pointer = SourcePointer::root().field("data");
        let data = match &document.data {
            Data::Absent => Data::Absent,
            Data::Null => Data::Null,
            Data::Single(object) => Data::Single(parse_resource(
                &context,
                object,
                IdentityContext::Response,
                None,
                &data_pointer,
                &mut self.hook,
            )?),
            Data::Many(objects) => Data::Many(
                objects
                    .iter()
                    .enumerate()
                    .map(|(index, object)| {
                        parse_resource(
                            &context,
                            object,
                            IdentityContext::Response,
                            None,
                            &data_pointer.element(index),
                            &mut self.hook,
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let mut pool: HashMap<ResourceKey, Resource> = HashMap::new();
        let included_pointer = SourcePointer::root().field("included");
        for (index, object) in document.included.iter().flatten().enumerate() {
            let resource = parse_resource(
                &context,
                object,
                IdentityContext::Response,
                None,
                &included_pointer.element(index),
                &mut self.hook,
            )?;
            if let Some(key) = resource.key() {
                pool.entry(key).or_insert(resource);
            }
        }
        for resource in data.iter() {
            if let Some(key) = resource.key() {
                pool.entry(key).or_insert_with(|| resource.clone());
            }
        }

        let data = data.map(|mut resource| {
            link_related(&mut resource, &pool, &mut Vec::new());
            resource
        });
        tracing::debug!(included = pool.len(), "read response document");

        Ok(ResponseBody {
            data,
            errors: document.errors.unwrap_or_default(),
            meta: document.meta.unwrap_or_default(),
        })
    }
}

fn link_related(
    resource: &mut Resource,
    pool: &HashMap<ResourceKey, Resource>,
    visiting: &mut Vec<ResourceKey>,
) {
    let key = resource.key();
    if let Some(key) = &key {
        visiting.push(key.clone());
    }
    for value in resource.relationships.values_mut() {
        for related in value.iter_mut() {
            let Some(related_key) = related.key() else {
                continue;
            };
            if visiting.contains(&related_key) {
                continue;
            }
            if let Some(full) = pool.get(&related_key) {
                *related = full.clone();
                link_related(related, pool, visiting);
            }
        }
    }
    if key.is_some() {
        visiting.pop();
    }
}
