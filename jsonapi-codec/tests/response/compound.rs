//! Compound documents: primary data, relationship linkage and the `included` member.

use crate::common::{include, options, render};
use insta::assert_snapshot;
use jsonapi_codec::{
    encode_pretty, CodecOptions, Data, ErrorKind, NoLinks, RequestScope, Resource,
    ResponseAdapter, ResponsePayload, SparseFieldSetCache, SparseFieldSets, ValueHandling,
};
use serde_json::json;

fn article(id: &str) -> Resource {
    Resource::new("articles")
        .with_id(id)
        .with_attribute("title", json!("Hello"))
        .with_attribute("views", json!(3))
}

fn person(id: &str, name: &str) -> Resource {
    Resource::new("people")
        .with_id(id)
        .with_attribute("name", json!(name))
}

#[test]
fn test_compound_document_snapshot() {
    let options = CodecOptions {
        null_values: ValueHandling::Omit,
        ..CodecOptions::default()
    };
    let payload = ResponsePayload::Single(
        article("1").with_to_one("author", Some(person("p1", "Ada"))),
    );
    let document = render(
        &payload,
        RequestScope::primary("articles").with_include(include("author")),
        &options,
    );

    assert_snapshot!(encode_pretty(&document).unwrap(), @r###"
    {
      "data": {
        "type": "articles",
        "id": "1",
        "attributes": {
          "title": "Hello",
          "views": 3
        },
        "relationships": {
          "author": {
            "data": {
              "type": "people",
              "id": "p1"
            }
          }
        }
      },
      "included": [
        {
          "type": "people",
          "id": "p1",
          "attributes": {
            "name": "Ada"
          }
        }
      ]
    }
    "###);
}

#[test]
fn test_included_member_absent_without_include_expression() {
    let payload = ResponsePayload::Single(
        article("1").with_to_one("author", Some(person("p1", "Ada"))),
    );
    let document = render(&payload, RequestScope::primary("articles"), &options());

    assert!(document.included.is_none());
    let primary = document.data.as_single().unwrap();
    assert!(primary.relationships.is_none());
}

#[test]
fn test_included_member_present_but_empty() {
    let payload = ResponsePayload::Single(article("1"));
    let scope = RequestScope::primary("articles").with_include(include("author"));
    let document = render(&payload, scope, &options());

    assert_eq!(document.included, Some(vec![]));
}

#[test]
fn test_unassigned_relationship_renders_null_or_empty() {
    let payload = ResponsePayload::Single(article("1"));
    let scope = RequestScope::primary("articles").with_include(include("author,tags"));
    let document = render(&payload, scope, &options());

    let relationships = document
        .data
        .as_single()
        .and_then(|object| object.relationships.clone())
        .unwrap();
    assert_eq!(relationships["author"].data, Data::Null);
    assert_eq!(relationships["tags"].data, Data::Many(vec![]));
    assert!(!relationships.contains_key("comments"));
}

#[test]
fn test_explicit_null_relationship_is_kept() {
    let payload = ResponsePayload::Single(article("1").with_to_one("author", None));
    let scope = RequestScope::primary("articles").with_include(include("author"));
    let value = serde_json::to_value(render(&payload, scope, &options())).unwrap();

    assert_eq!(value["data"]["relationships"]["author"], json!({ "data": null }));
    assert_eq!(value["included"], json!([]));
}

#[test]
fn test_same_resource_through_two_paths_is_merged() {
    // The same person is reached as author (with a manager) and as reviewer (with their
    // articles). The single included copy carries linkage from both paths.
    let author = person("p1", "Ada").with_to_one("manager", Some(person("p2", "Grace")));
    let reviewer = person("p1", "Ada").with_to_many("articles", vec![article("7")]);
    let payload = ResponsePayload::Single(
        article("1")
            .with_to_one("author", Some(author))
            .with_to_one("reviewer", Some(reviewer)),
    );
    let scope = RequestScope::primary("articles")
        .with_include(include("author.manager,reviewer.articles"));
    let value = serde_json::to_value(render(&payload, scope, &options())).unwrap();

    let included = value["included"].as_array().unwrap();
    let keys: Vec<(String, String)> = included
        .iter()
        .map(|object| {
            (
                object["type"].as_str().unwrap().to_string(),
                object["id"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        keys,
        vec![
            ("people".to_string(), "p1".to_string()),
            ("people".to_string(), "p2".to_string()),
            ("articles".to_string(), "7".to_string()),
        ]
    );

    let ada = &included[0];
    assert_eq!(
        ada["relationships"]["manager"]["data"],
        json!({ "type": "people", "id": "p2" })
    );
    assert_eq!(
        ada["relationships"]["articles"]["data"],
        json!([{ "type": "articles", "id": "7" }])
    );
}

#[test]
fn test_primary_resource_is_not_repeated_in_included() {
    let author = person("p1", "Ada").with_to_many("articles", vec![article("1").shell()]);
    let payload = ResponsePayload::Single(article("1").with_to_one("author", Some(author)));
    let scope = RequestScope::primary("articles").with_include(include("author.articles"));
    let document = render(&payload, scope, &options());

    let included = document.included.unwrap();
    assert_eq!(included.len(), 1);
    assert_eq!(included[0].id.as_deref(), Some("p1"));

    // The shell reached through the include path does not overwrite primary attributes.
    let primary = document.data.as_single().unwrap();
    let attributes = primary.attributes.as_ref().unwrap();
    assert_eq!(attributes["title"], json!("Hello"));
}

#[test]
fn test_duplicate_primary_resources_collapse() {
    let payload = ResponsePayload::Many(vec![article("1"), article("2"), article("1")]);
    let document = render(&payload, RequestScope::primary("articles"), &options());

    let ids: Vec<_> = document
        .data
        .iter()
        .map(|object| object.id.clone().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[test]
fn test_empty_collection_renders_empty_array() {
    let payload = ResponsePayload::Many(vec![]);
    let value =
        serde_json::to_value(render(&payload, RequestScope::primary("articles"), &options()))
            .unwrap();

    assert_eq!(value, json!({ "data": [] }));
}

#[test]
fn test_null_payload_renders_null_data() {
    let value = serde_json::to_value(render(
        &ResponsePayload::Null,
        RequestScope::secondary("people"),
        &options(),
    ))
    .unwrap();

    assert_eq!(value, json!({ "data": null }));
}

#[test]
fn test_relationship_endpoint_renders_identifiers_only() {
    let payload = ResponsePayload::Many(vec![
        Resource::new("tags").with_id("t1").with_attribute("label", json!("rust")),
        Resource::new("tags").with_id("t2"),
    ]);
    let value = serde_json::to_value(render(
        &payload,
        RequestScope::relationship("articles", "tags"),
        &options(),
    ))
    .unwrap();

    assert_eq!(
        value,
        json!({ "data": [{ "type": "tags", "id": "t1" }, { "type": "tags", "id": "t2" }] })
    );
}

#[test]
fn test_local_id_rendered_only_without_id() {
    let payload = ResponsePayload::Many(vec![
        Resource::new("tags").with_lid("new-tag"),
        Resource::new("tags").with_id("t1").with_lid("old-tag"),
    ]);
    let document = render(&payload, RequestScope::primary("tags"), &options());

    let objects = document.data.as_slice();
    assert_eq!(objects[0].lid.as_deref(), Some("new-tag"));
    assert_eq!(objects[0].id, None);
    assert_eq!(objects[1].id.as_deref(), Some("t1"));
    assert_eq!(objects[1].lid, None);
}

#[test]
fn test_mixed_types_in_collection_are_rejected() {
    let payload = ResponsePayload::Many(vec![article("1"), person("p1", "Ada")]);
    let mut selector = SparseFieldSetCache::new(SparseFieldSets::new());
    let options = options();
    let mut adapter = ResponseAdapter::new(
        &*crate::common::GRAPH,
        &mut selector,
        &NoLinks,
        &options,
        RequestScope::primary("articles"),
    );

    let err = adapter.convert(&payload).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedPayloadShape);
}

#[test]
fn test_cardinality_mismatch_is_rejected() {
    let payload = ResponsePayload::Single(
        article("1").with_to_many("author", vec![person("p1", "Ada")]),
    );
    let mut selector = SparseFieldSetCache::new(SparseFieldSets::new());
    let options = options();
    let mut adapter = ResponseAdapter::new(
        &*crate::common::GRAPH,
        &mut selector,
        &NoLinks,
        &options,
        RequestScope::primary("articles").with_include(include("author")),
    );

    let err = adapter.convert(&payload).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedPayloadShape);
}

#[test]
fn test_error_payload_renders_errors_member() {
    let error = jsonapi_codec::CodecError::new(ErrorKind::MissingType, "Expected 'type' element.");
    let payload = ResponsePayload::Errors(vec![error.to_error_object()]);
    let value =
        serde_json::to_value(render(&payload, RequestScope::default(), &options())).unwrap();

    assert!(value.get("data").is_none());
    assert_eq!(value["errors"][0]["status"], json!("422"));
    assert_eq!(value["errors"][0]["detail"], json!("Expected 'type' element."));
}
