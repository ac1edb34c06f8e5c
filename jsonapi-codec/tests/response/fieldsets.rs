//! Sparse fieldsets and the field selector seam.

use crate::common::{include, options, render_with_fields, GRAPH};
use jsonapi_codec::{
    FieldSelector, FieldSet, NoLinks, RequestScope, Resource, ResourceShape, ResponseAdapter,
    ResponsePayload, SparseFieldSets,
};
use proptest::prelude::*;
use serde_json::json;
use std::rc::Rc;

fn full_article() -> Resource {
    Resource::new("articles")
        .with_id("1")
        .with_attribute("title", json!("Hello"))
        .with_attribute("body", json!("World"))
        .with_attribute("views", json!(12))
        .with_attribute("published", json!(true))
        .with_to_one(
            "author",
            Some(Resource::new("people").with_id("p1").with_attribute("name", json!("Ada"))),
        )
}

#[test]
fn test_fieldset_limits_attributes_and_relationships() {
    let fields = SparseFieldSets::new().with("articles", ["title", "author"]);
    let scope = RequestScope::primary("articles").with_include(include("author"));
    let document = render_with_fields(
        &ResponsePayload::Single(full_article()),
        scope,
        &options(),
        fields,
    );

    let primary = document.data.as_single().unwrap();
    let attributes = primary.attributes.as_ref().unwrap();
    assert_eq!(attributes.keys().collect::<Vec<_>>(), vec!["title"]);
    let relationships = primary.relationships.as_ref().unwrap();
    assert!(relationships.contains_key("author"));

    // Types without a requested fieldset render every field.
    let included = document.included.unwrap();
    let person = included[0].attributes.as_ref().unwrap();
    assert!(person.contains_key("name"));
    assert!(person.contains_key("karma"));
}

#[test]
fn test_excluded_relationship_is_not_followed() {
    let fields = SparseFieldSets::new().with("articles", ["title"]);
    let scope = RequestScope::primary("articles").with_include(include("author"));
    let document = render_with_fields(
        &ResponsePayload::Single(full_article()),
        scope,
        &options(),
        fields,
    );

    let primary = document.data.as_single().unwrap();
    assert!(primary.relationships.is_none());
    assert_eq!(document.included, Some(vec![]));
}

#[test]
fn test_fieldsets_parsed_from_query_pairs() {
    let fields =
        SparseFieldSets::parse_query([("fields[articles]", "views"), ("include", "author")]);
    let document = render_with_fields(
        &ResponsePayload::Single(full_article()),
        RequestScope::primary("articles"),
        &options(),
        fields,
    );

    let value = serde_json::to_value(&document).unwrap();
    assert_eq!(value["data"]["attributes"], json!({ "views": 12 }));
}

/// Selector that counts how often it computes a field set and how often it is reset.
#[derive(Default)]
struct CountingSelector {
    computed: usize,
    resets: usize,
    cache: Option<Rc<FieldSet>>,
}

impl FieldSelector for CountingSelector {
    fn selected_fields(&mut self, shape: &ResourceShape, _scope: &RequestScope) -> Rc<FieldSet> {
        if let Some(fields) = &self.cache {
            return Rc::clone(fields);
        }
        self.computed += 1;
        let fields = Rc::new(FieldSet::all(shape));
        self.cache = Some(Rc::clone(&fields));
        fields
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.cache = None;
    }
}

#[test]
fn test_selector_is_reset_per_conversion() {
    let mut selector = CountingSelector::default();
    let options = options();
    let payload = ResponsePayload::Many(vec![
        Resource::new("tags").with_id("t1"),
        Resource::new("tags").with_id("t2"),
    ]);

    {
        let mut adapter = ResponseAdapter::new(
            &*GRAPH,
            &mut selector,
            &NoLinks,
            &options,
            RequestScope::primary("tags"),
        );
        adapter.convert(&payload).unwrap();
        adapter.convert(&payload).unwrap();
    }

    assert_eq!(selector.resets, 2);
    assert_eq!(selector.computed, 2);
}

fn article_fields() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(
        vec!["title", "body", "views", "published", "author", "tags"],
        0..=6,
    )
}

proptest! {
    #[test]
    fn fieldset_conversion_is_idempotent(names in article_fields()) {
        let payload = ResponsePayload::Single(full_article());
        let scope = RequestScope::primary("articles").with_include(include("author"));
        let first = render_with_fields(
            &payload,
            scope.clone(),
            &options(),
            SparseFieldSets::new().with("articles", names.clone()),
        );
        let second = render_with_fields(
            &payload,
            scope,
            &options(),
            SparseFieldSets::new().with("articles", names.clone()),
        );
        prop_assert_eq!(&first, &second);

        let primary = first.data.as_single().unwrap();
        for name in primary.attributes.iter().flat_map(|a| a.keys()) {
            prop_assert!(names.contains(&name.as_str()));
        }
        for name in primary.relationships.iter().flat_map(|r| r.keys()) {
            prop_assert!(names.contains(&name.as_str()));
        }
    }
}
