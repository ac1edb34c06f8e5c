//! Server-side request bodies.

use crate::common::{options, GRAPH};
use jsonapi_codec::{
    CodecOptions, RelationshipValue, RequestBody, RequestScope, Resource, ServerReader,
    WriteOperationKind,
};
use serde_json::json;

fn create_scope(type_name: &str) -> RequestScope {
    RequestScope::primary(type_name).with_write_operation(WriteOperationKind::CreateResource)
}

fn single(body: RequestBody) -> Resource {
    match body {
        RequestBody::Resource(resource) => resource,
        other => panic!("expected a single resource, got {other:?}"),
    }
}

#[test]
fn test_create_records_targeted_fields() {
    let options = options();
    let mut reader = ServerReader::server(&*GRAPH, &options, create_scope("articles"));
    let body = reader
        .read_body(
            r#"{
                "data": {
                    "type": "articles",
                    "attributes": { "title": "Hello", "views": 2 },
                    "relationships": {
                        "author": { "data": { "type": "people", "id": "p1" } },
                        "comments": { "links": { "related": "/articles/1/comments" } }
                    }
                }
            }"#,
        )
        .unwrap();

    let resource = single(body);
    assert_eq!(resource.type_name, "articles");
    assert_eq!(resource.id, None);
    assert_eq!(resource.attributes["title"], json!("Hello"));
    assert_eq!(
        resource.related("author"),
        Some(&RelationshipValue::ToOne(Some(Box::new(
            Resource::new("people").with_id("p1")
        ))))
    );
    // A relationship object without `data` stays unassigned.
    assert_eq!(resource.related("comments"), None);

    let targeted = reader.into_hook();
    assert_eq!(
        targeted.attributes.iter().collect::<Vec<_>>(),
        vec!["title", "views"]
    );
    assert_eq!(
        targeted.relationships.iter().collect::<Vec<_>>(),
        vec!["author"]
    );
}

#[test]
fn test_update_with_whole_float_for_integer() {
    let options = options();
    let scope =
        RequestScope::primary("articles").with_write_operation(WriteOperationKind::UpdateResource);
    let mut reader = ServerReader::server(&*GRAPH, &options, scope);
    let body = reader
        .read_body(r#"{ "data": { "type": "articles", "id": "7", "attributes": { "views": 3.0 } } }"#)
        .unwrap();

    let resource = single(body);
    assert_eq!(resource.id.as_deref(), Some("7"));
    assert_eq!(resource.attributes["views"], json!(3));
}

#[test]
fn test_derived_type_accepted_at_base_endpoint() {
    let options = options();
    let mut reader = ServerReader::server(&*GRAPH, &options, create_scope("people"));
    let body = reader
        .read_body(r#"{ "data": { "type": "editors", "attributes": { "name": "Ada" } } }"#)
        .unwrap();

    let resource = single(body);
    assert_eq!(resource.type_name, "editors");
}

#[test]
fn test_derived_type_accepted_in_relationship() {
    let options = options();
    let mut reader = ServerReader::server(&*GRAPH, &options, create_scope("articles"));
    let body = reader
        .read_body(
            r#"{ "data": { "type": "articles", "relationships": {
                "reviewer": { "data": { "type": "editors", "id": "e1" } }
            } } }"#,
        )
        .unwrap();

    let resource = single(body);
    let reviewer = resource.related("reviewer").unwrap().iter().next().unwrap();
    assert_eq!(reviewer.type_name, "editors");
}

#[test]
fn test_client_generated_id_when_allowed() {
    let options = CodecOptions {
        allow_client_generated_ids: true,
        ..CodecOptions::default()
    };
    let mut reader = ServerReader::server(&*GRAPH, &options, create_scope("tags"));
    let body = reader
        .read_body(r#"{ "data": { "type": "tags", "id": "rust", "attributes": { "label": "Rust" } } }"#)
        .unwrap();

    assert_eq!(
        body,
        RequestBody::Resource(
            Resource::new("tags")
                .with_id("rust")
                .with_attribute("label", json!("Rust"))
        )
    );
}

#[test]
fn test_duplicates_in_collection_body_are_dropped() {
    let options = options();
    let mut reader = ServerReader::server(&*GRAPH, &options, RequestScope::primary("tags"));
    let body = reader
        .read_body(
            r#"{ "data": [
                { "type": "tags", "id": "t1", "attributes": { "label": "first" } },
                { "type": "tags", "id": "t2" },
                { "type": "tags", "id": "t1", "attributes": { "label": "second" } }
            ] }"#,
        )
        .unwrap();

    let resources = match body {
        RequestBody::Resources(resources) => resources,
        other => panic!("expected a resource collection, got {other:?}"),
    };
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0].attributes["label"], json!("first"));
    assert_eq!(resources[1].id.as_deref(), Some("t2"));
}

#[test]
fn test_empty_body() {
    let options = options();
    let mut reader = ServerReader::server(&*GRAPH, &options, RequestScope::primary("tags"));

    assert_eq!(reader.read_body(r#"{ "data": null }"#).unwrap(), RequestBody::Empty);
    assert_eq!(reader.read_body("{}").unwrap(), RequestBody::Empty);
}

#[test]
fn test_relationship_endpoint_body() {
    let options = options();
    let scope = RequestScope::relationship("articles", "tags")
        .with_write_operation(WriteOperationKind::AddToRelationship);
    let mut reader = ServerReader::server(&*GRAPH, &options, scope);
    let body = reader
        .read_body(r#"{ "data": [{ "type": "tags", "id": "t1" }, { "type": "tags", "id": "t2" }] }"#)
        .unwrap();

    assert_eq!(
        body,
        RequestBody::Relationship(RelationshipValue::ToMany(vec![
            Resource::new("tags").with_id("t1"),
            Resource::new("tags").with_id("t2"),
        ]))
    );
    assert!(reader.hook().relationships.contains("tags"));
}

#[test]
fn test_clearing_to_one_relationship() {
    let options = options();
    let scope = RequestScope::relationship("articles", "author")
        .with_write_operation(WriteOperationKind::SetRelationship);
    let mut reader = ServerReader::server(&*GRAPH, &options, scope);
    let body = reader.read_body(r#"{ "data": null }"#).unwrap();

    assert_eq!(body, RequestBody::Relationship(RelationshipValue::ToOne(None)));
}
