//! Running batches through `OperationsProcessor` against an in-memory handler.

use crate::common::{options, GRAPH};
use insta::assert_snapshot;
use jsonapi_codec::{
    encode_pretty, CodecOptions, Document, ErrorKind, NoLinks, Operation, OperationHandler,
    OperationsProcessor, ProcessError, Resource, SparseFieldSetCache, SparseFieldSets,
    ValueHandling, WriteOperationKind,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("store rejected operation: {0}")]
struct StoreError(String);

/// Records every call and hands out sequential identities.
#[derive(Default)]
struct RecordingStore {
    next_id: u32,
    log: Vec<String>,
    fail_on: Option<WriteOperationKind>,
    skip_identity: bool,
}

impl RecordingStore {
    fn describe(resource: &Resource) -> String {
        format!(
            "{}:{}",
            resource.type_name,
            resource.id.as_deref().unwrap_or("?")
        )
    }
}

impl OperationHandler for RecordingStore {
    type Error = StoreError;

    fn begin(&mut self) -> Result<(), StoreError> {
        self.log.push("begin".to_string());
        Ok(())
    }

    fn process(&mut self, operation: &Operation) -> Result<Option<Resource>, StoreError> {
        if self.fail_on == Some(operation.kind) {
            return Err(StoreError(format!("{} is disabled", operation.kind)));
        }

        let mut entry = format!("{} {}", operation.kind, Self::describe(&operation.resource));
        for (name, value) in &operation.resource.relationships {
            let related: Vec<String> = value.iter().map(Self::describe).collect();
            entry.push_str(&format!(" {name}=[{}]", related.join(",")));
        }
        self.log.push(entry);

        match operation.kind {
            WriteOperationKind::CreateResource => {
                let mut stored = operation.resource.clone();
                if !self.skip_identity {
                    self.next_id += 1;
                    stored.id = Some(self.next_id.to_string());
                }
                Ok(Some(stored))
            }
            WriteOperationKind::UpdateResource => Ok(Some(operation.resource.clone())),
            _ => Ok(None),
        }
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.log.push("commit".to_string());
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.log.push("rollback".to_string());
        Ok(())
    }
}

fn run(
    options: &CodecOptions,
    store: &mut RecordingStore,
    operations: Value,
) -> Result<Document, ProcessError<StoreError>> {
    let mut selector = SparseFieldSetCache::new(SparseFieldSets::new());
    let mut processor = OperationsProcessor::new(&*GRAPH, options, &mut selector, &NoLinks);
    let body = json!({ "atomic:operations": operations }).to_string();
    processor.process_text(&body, store)
}

fn lifecycle() -> Value {
    json!([
        { "op": "add", "data": { "type": "people", "lid": "p1", "attributes": { "name": "Ada" } } },
        { "op": "add", "data": { "type": "articles", "lid": "a1",
          "attributes": { "title": "Notes", "views": 1 },
          "relationships": { "author": { "data": { "type": "people", "lid": "p1" } } } } },
        { "op": "add", "ref": { "type": "articles", "lid": "a1", "relationship": "tags" },
          "data": [{ "type": "tags", "id": "t1" }] },
        { "op": "remove", "ref": { "type": "people", "lid": "p1" } }
    ])
}

#[test]
fn test_local_ids_are_replaced_by_server_identities() {
    let mut store = RecordingStore::default();
    run(&options(), &mut store, lifecycle()).unwrap();

    assert_eq!(
        store.log,
        vec![
            "begin",
            "create resource people:?",
            "create resource articles:? author=[people:1]",
            "add to relationship articles:2 tags=[tags:t1]",
            "delete resource people:1",
            "commit",
        ]
    );
}

#[test]
fn test_results_document() {
    let options = CodecOptions {
        include_jsonapi_version: true,
        null_values: ValueHandling::Omit,
        ..CodecOptions::default()
    };
    let mut store = RecordingStore::default();
    let document = run(&options, &mut store, lifecycle()).unwrap();

    assert_snapshot!(encode_pretty(&document).unwrap(), @r###"
    {
      "jsonapi": {
        "version": "1.1",
        "ext": [
          "https://jsonapi.org/ext/atomic"
        ]
      },
      "atomic:results": [
        {
          "data": {
            "type": "people",
            "id": "1",
            "attributes": {
              "name": "Ada"
            }
          }
        },
        {
          "data": {
            "type": "articles",
            "id": "2",
            "attributes": {
              "title": "Notes",
              "views": 1
            }
          }
        },
        {
          "data": null
        },
        {
          "data": null
        }
      ]
    }
    "###);
}

#[test]
fn test_handler_failure_rolls_back() {
    let mut store = RecordingStore {
        fail_on: Some(WriteOperationKind::AddToRelationship),
        ..RecordingStore::default()
    };
    let err = run(&options(), &mut store, lifecycle()).unwrap_err();

    assert!(matches!(err, ProcessError::Handler { index: 2, .. }));
    assert_eq!(err.operation_index(), Some(2));
    assert_eq!(store.log.first().map(String::as_str), Some("begin"));
    assert_eq!(store.log.last().map(String::as_str), Some("rollback"));
    assert!(!store.log.iter().any(|entry| entry == "commit"));

    let value = serde_json::to_value(err.into_document()).unwrap();
    assert_eq!(value["errors"][0]["status"], json!("500"));
    assert_eq!(
        value["errors"][0]["source"]["pointer"],
        json!("/atomic:operations[2]")
    );
    assert_eq!(
        value["errors"][0]["detail"],
        json!("store rejected operation: add to relationship is disabled")
    );
}

#[test]
fn test_invalid_local_ids_never_reach_the_handler() {
    let mut store = RecordingStore::default();
    let err = run(
        &options(),
        &mut store,
        json!([
            { "op": "add", "data": { "type": "people", "lid": "p1" } },
            { "op": "add", "data": { "type": "people", "lid": "p1" } }
        ]),
    )
    .unwrap_err();

    let err = match err {
        ProcessError::Codec(err) => err,
        other => panic!("expected a codec error, got {other:?}"),
    };
    assert_eq!(err.kind, ErrorKind::DuplicateLocalId);
    assert!(store.log.is_empty());
}

#[test]
fn test_structural_errors_never_reach_the_handler() {
    let mut store = RecordingStore::default();
    let err = run(
        &options(),
        &mut store,
        json!([
            { "op": "add", "data": { "type": "people", "lid": "p1" } },
            { "op": "update", "ref": { "type": "articles", "id": "1", "relationship": "tags" } }
        ]),
    )
    .unwrap_err();

    assert_eq!(err.operation_index(), Some(1));
    assert!(store.log.is_empty());
}

#[test]
fn test_missing_server_identity_fails_at_run_time() {
    let mut store = RecordingStore {
        skip_identity: true,
        ..RecordingStore::default()
    };
    let err = run(&options(), &mut store, lifecycle()).unwrap_err();

    let err = match err {
        ProcessError::Codec(err) => err,
        other => panic!("expected a codec error, got {other:?}"),
    };
    assert_eq!(err.kind, ErrorKind::LocalIdNotYetAvailable);
    assert_eq!(err.operation_index, Some(1));
    assert_eq!(
        err.pointer.as_deref(),
        Some("/atomic:operations[1]/data/relationships/author/data/lid")
    );
    assert_eq!(store.log.last().map(String::as_str), Some("rollback"));
}
