//! Structural reading of `atomic:operations` bodies.

use crate::common::{options, GRAPH};
use jsonapi_codec::atomic::PrimaryLocation;
use jsonapi_codec::{
    CodecError, CodecOptions, ErrorKind, Operation, OperationsReader, RelationshipValue,
    Resource, WriteOperationKind,
};
use serde_json::{json, Value};

fn read(body: Value) -> Result<Vec<Operation>, CodecError> {
    let options = options();
    OperationsReader::new(&*GRAPH, &options).read_batch(&body.to_string())
}

fn read_error(body: Value) -> CodecError {
    read(body).expect_err("batch should be rejected")
}

fn batch(operations: Value) -> Value {
    json!({ "atomic:operations": operations })
}

#[test]
fn test_reads_every_operation_kind() {
    let operations = read(batch(json!([
        { "op": "add", "data": { "type": "people", "lid": "p1", "attributes": { "name": "Ada" } } },
        { "op": "update", "data": { "type": "people", "lid": "p1", "attributes": { "name": "Ada L." } } },
        { "op": "update", "ref": { "type": "articles", "id": "1", "relationship": "author" },
          "data": { "type": "people", "lid": "p1" } },
        { "op": "add", "ref": { "type": "articles", "id": "1", "relationship": "tags" },
          "data": [{ "type": "tags", "id": "t1" }] },
        { "op": "remove", "ref": { "type": "articles", "id": "1", "relationship": "tags" },
          "data": [{ "type": "tags", "id": "t2" }] },
        { "op": "remove", "ref": { "type": "comments", "id": "4" } }
    ])))
    .unwrap();

    let kinds: Vec<_> = operations.iter().map(|op| op.kind).collect();
    assert_eq!(
        kinds,
        vec![
            WriteOperationKind::CreateResource,
            WriteOperationKind::UpdateResource,
            WriteOperationKind::SetRelationship,
            WriteOperationKind::AddToRelationship,
            WriteOperationKind::RemoveFromRelationship,
            WriteOperationKind::DeleteResource,
        ]
    );
    assert_eq!(
        operations.iter().map(|op| op.index).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4, 5]
    );

    assert_eq!(operations[0].resource.lid.as_deref(), Some("p1"));
    assert_eq!(operations[0].primary_location, PrimaryLocation::Data);
    assert!(operations[1].targeted.attributes.contains("name"));

    let set_author = &operations[2];
    assert_eq!(set_author.relationship.as_deref(), Some("author"));
    assert_eq!(set_author.primary_location, PrimaryLocation::Ref);
    assert_eq!(
        set_author.resource.related("author"),
        Some(&RelationshipValue::ToOne(Some(Box::new(
            Resource::new("people").with_lid("p1")
        ))))
    );
    assert!(set_author.targeted.relationships.contains("author"));

    assert_eq!(
        operations[5].resource,
        Resource::new("comments").with_id("4")
    );
}

#[test]
fn test_missing_operations_member() {
    let err = read_error(json!({ "data": null }));
    assert_eq!(err.kind, ErrorKind::EmptyOperationsBatch);
    assert_eq!(err.pointer.as_deref(), Some("/atomic:operations"));

    let err = read_error(batch(json!([])));
    assert_eq!(err.kind, ErrorKind::EmptyOperationsBatch);
}

#[test]
fn test_too_many_operations() {
    let operations: Vec<Value> = (0..11)
        .map(|_| json!({ "op": "remove", "ref": { "type": "tags", "id": "t1" } }))
        .collect();
    let err = read_error(batch(Value::Array(operations.clone())));
    assert_eq!(err.kind, ErrorKind::TooManyOperations);
    assert_eq!(err.kind.status(), 413);

    let unlimited = CodecOptions {
        max_operations_per_request: None,
        ..CodecOptions::default()
    };
    let body = batch(Value::Array(operations)).to_string();
    let parsed = OperationsReader::new(&*GRAPH, &unlimited)
        .read_batch(&body)
        .unwrap();
    assert_eq!(parsed.len(), 11);
}

#[test]
fn test_unknown_op_code_is_malformed() {
    let err = read_error(batch(json!([{ "op": "merge" }])));
    assert_eq!(err.kind, ErrorKind::MalformedBody);
    assert_eq!(err.pointer.as_deref(), Some("/atomic:operations[0]/op"));
}

#[test]
fn test_badly_typed_member_reports_its_operation() {
    let err = read_error(batch(json!([
        { "op": "add", "data": { "type": "tags", "attributes": { "name": "rust" } } },
        { "op": "add", "data": { "type": "tags", "attributes": 3 } }
    ])));
    assert_eq!(err.kind, ErrorKind::MalformedBody);
    assert_eq!(err.operation_index, Some(1));
    assert_eq!(
        err.pointer.as_deref(),
        Some("/atomic:operations[1]/data/attributes")
    );

    let err = read_error(batch(json!([
        { "op": "remove", "ref": { "type": "tags", "id": 7 } }
    ])));
    assert_eq!(err.operation_index, Some(0));
    assert_eq!(err.pointer.as_deref(), Some("/atomic:operations[0]/ref/id"));
}

#[test]
fn test_operations_member_must_be_an_array() {
    let err = read_error(json!({ "atomic:operations": { "op": "add" } }));
    assert_eq!(err.kind, ErrorKind::MalformedBody);
    assert_eq!(err.pointer.as_deref(), Some("/atomic:operations"));
}

#[test]
fn test_operation_shape_errors() {
    let cases = [
        (
            json!({ "op": "add", "href": "/articles", "data": { "type": "articles" } }),
            ErrorKind::HrefNotSupported,
            "/atomic:operations[1]/href",
        ),
        (
            json!({ "data": { "type": "articles" } }),
            ErrorKind::MissingElement,
            "/atomic:operations[1]",
        ),
        (
            json!({ "op": "remove" }),
            ErrorKind::MissingElement,
            "/atomic:operations[1]",
        ),
        (
            json!({ "op": "add", "ref": { "type": "articles", "id": "1" }, "data": [] }),
            ErrorKind::MissingElement,
            "/atomic:operations[1]/ref/relationship",
        ),
        (
            json!({ "op": "add" }),
            ErrorKind::MissingElement,
            "/atomic:operations[1]",
        ),
        (
            json!({ "op": "update", "data": [{ "type": "articles", "id": "1" }] }),
            ErrorKind::ExpectedSingleElement,
            "/atomic:operations[1]/data",
        ),
        (
            json!({ "op": "remove", "ref": { "id": "1" } }),
            ErrorKind::MissingType,
            "/atomic:operations[1]/ref",
        ),
        (
            json!({ "op": "remove", "ref": { "type": "moons", "id": "1" } }),
            ErrorKind::UnknownResourceType,
            "/atomic:operations[1]/ref/type",
        ),
        (
            json!({ "op": "remove", "ref": { "type": "articles" } }),
            ErrorKind::MissingIdentity,
            "/atomic:operations[1]/ref",
        ),
        (
            json!({ "op": "remove", "ref": { "type": "articles", "id": "x" } }),
            ErrorKind::IdentityFormatError,
            "/atomic:operations[1]/ref/id",
        ),
        (
            json!({ "op": "update", "ref": { "type": "articles", "id": "1", "relationship": "editor" },
                    "data": null }),
            ErrorKind::UnknownRelationship,
            "/atomic:operations[1]/ref/relationship",
        ),
        (
            json!({ "op": "add", "ref": { "type": "articles", "id": "1", "relationship": "author" },
                    "data": { "type": "people", "id": "p1" } }),
            ErrorKind::ToOneRelationshipNotAllowed,
            "/atomic:operations[1]/ref/relationship",
        ),
        (
            json!({ "op": "update", "ref": { "type": "articles", "id": "1", "relationship": "tags" },
                    "data": { "type": "tags", "id": "t1" } }),
            ErrorKind::ExpectedDataArray,
            "/atomic:operations[1]/data",
        ),
        (
            json!({ "op": "update", "ref": { "type": "articles", "id": "1", "relationship": "tags" } }),
            ErrorKind::MissingElement,
            "/atomic:operations[1]",
        ),
        (
            json!({ "op": "update", "ref": { "type": "articles", "id": "1" },
                    "data": { "type": "articles", "id": "2" } }),
            ErrorKind::ResourceIdMismatch,
            "/atomic:operations[1]/data/id",
        ),
        (
            json!({ "op": "update", "ref": { "type": "people", "id": "p1" },
                    "data": { "type": "tags", "id": "p1" } }),
            ErrorKind::ResourceTypeMismatch,
            "/atomic:operations[1]/data/type",
        ),
        (
            json!({ "op": "add", "data": { "type": "articles", "id": "5" } }),
            ErrorKind::ClientGeneratedIdNotAllowed,
            "/atomic:operations[1]/data/id",
        ),
        (
            json!({ "op": "update", "data": { "type": "articles", "id": "5", "lid": "a5" } }),
            ErrorKind::IdAndLidConflict,
            "/atomic:operations[1]/data",
        ),
    ];

    for (operation, kind, pointer) in cases {
        // The failing operation sits behind a valid one so that indexes are exercised.
        let body = batch(json!([
            { "op": "remove", "ref": { "type": "tags", "id": "t1" } },
            operation
        ]));
        let err = read_error(body.clone());
        assert_eq!(err.kind, kind, "unexpected error for {body}: {err}");
        assert_eq!(err.pointer.as_deref(), Some(pointer), "pointer for {body}");
        assert_eq!(err.operation_index, Some(1), "index for {body}");
    }
}

#[test]
fn test_local_ids_allowed_in_batch_relationships() {
    let operations = read(batch(json!([
        { "op": "add", "data": { "type": "articles", "lid": "a1", "relationships": {
            "tags": { "data": [{ "type": "tags", "lid": "t-new" }, { "type": "tags", "id": "t1" }] }
        } } }
    ])))
    .unwrap();

    let tags: Vec<&Resource> = operations[0]
        .resource
        .related("tags")
        .unwrap()
        .iter()
        .collect();
    assert_eq!(tags[0].lid.as_deref(), Some("t-new"));
    assert_eq!(tags[1].id.as_deref(), Some("t1"));
}
