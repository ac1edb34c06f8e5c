//! Attribute value handling, the `jsonapi` object, links and meta.

use crate::common::{options, render, GRAPH};
use jsonapi_codec::{
    CodecOptions, NoLinks, PathLinkBuilder, RequestScope, Resource, ResponseAdapter,
    ResponsePayload, SparseFieldSetCache, SparseFieldSets, ValueHandling,
};
use serde_json::{json, Value};

fn quiet_article() -> Resource {
    Resource::new("articles")
        .with_id("1")
        .with_attribute("title", json!("Hello"))
        .with_attribute("views", json!(0))
        .with_attribute("published", json!(false))
}

fn attributes_of(options: &CodecOptions) -> Value {
    let document = render(
        &ResponsePayload::Single(quiet_article()),
        RequestScope::primary("articles"),
        options,
    );
    serde_json::to_value(document).unwrap()["data"]["attributes"].clone()
}

#[test]
fn test_all_values_included_by_default() {
    assert_eq!(
        attributes_of(&options()),
        json!({ "title": "Hello", "body": null, "views": 0, "published": false })
    );
}

#[test]
fn test_null_values_omitted() {
    let options = CodecOptions {
        null_values: ValueHandling::Omit,
        ..CodecOptions::default()
    };
    assert_eq!(
        attributes_of(&options),
        json!({ "title": "Hello", "views": 0, "published": false })
    );
}

#[test]
fn test_default_values_omitted() {
    let options = CodecOptions {
        default_values: ValueHandling::Omit,
        ..CodecOptions::default()
    };
    assert_eq!(attributes_of(&options), json!({ "title": "Hello" }));
}

#[test]
fn test_jsonapi_object_emitted_when_enabled() {
    let options = CodecOptions {
        include_jsonapi_version: true,
        ..CodecOptions::default()
    };
    let document = render(
        &ResponsePayload::Single(quiet_article()),
        RequestScope::primary("articles"),
        &options,
    );

    let jsonapi = document.jsonapi.unwrap();
    assert_eq!(jsonapi.version.as_deref(), Some("1.1"));
    assert_eq!(jsonapi.ext, None);
}

#[test]
fn test_links_rendered_from_base_url() {
    let mut selector = SparseFieldSetCache::new(SparseFieldSets::new());
    let links = PathLinkBuilder::new("https://api.example.com");
    let options = options();
    let mut adapter = ResponseAdapter::new(
        &*GRAPH,
        &mut selector,
        &links,
        &options,
        RequestScope::primary("articles").with_request_path("/articles/1"),
    );
    let document = adapter
        .convert(&ResponsePayload::Single(quiet_article()))
        .unwrap();
    let value = serde_json::to_value(document).unwrap();

    assert_eq!(
        value["links"],
        json!({ "self": "https://api.example.com/articles/1" })
    );
    assert_eq!(
        value["data"]["links"],
        json!({ "self": "https://api.example.com/articles/1" })
    );
    // Relationships carry links even when their data is not rendered.
    assert_eq!(
        value["data"]["relationships"]["author"],
        json!({
            "links": {
                "self": "https://api.example.com/articles/1/relationships/author",
                "related": "https://api.example.com/articles/1/author"
            }
        })
    );
}

#[test]
fn test_resource_and_top_level_meta() {
    let mut selector = SparseFieldSetCache::new(SparseFieldSets::new());
    let options = options();
    let meta = [("total".to_string(), json!(1))].into_iter().collect();
    let mut adapter = ResponseAdapter::new(
        &*GRAPH,
        &mut selector,
        &NoLinks,
        &options,
        RequestScope::primary("tags"),
    )
    .with_meta(meta);
    let payload = ResponsePayload::Many(vec![Resource::new("tags")
        .with_id("t1")
        .with_meta("pinned", json!(true))]);
    let value = serde_json::to_value(adapter.convert(&payload).unwrap()).unwrap();

    assert_eq!(value["meta"], json!({ "total": 1 }));
    assert_eq!(value["data"][0]["meta"], json!({ "pinned": true }));
}

#[test]
fn test_unset_non_nullable_attribute_renders_empty_value() {
    let article = Resource::new("articles").with_id("1");
    let document = render(
        &ResponsePayload::Single(article),
        RequestScope::primary("articles"),
        &options(),
    );
    let value = serde_json::to_value(document).unwrap();
    assert_eq!(value["data"]["attributes"]["views"], json!(0));
    assert_eq!(value["data"]["attributes"]["title"], json!(null));
}
