//! JSON views of parsed request bodies and operation batches, for printing.

use jsonapi_codec::{Operation, RequestBody, TargetedFields};
use serde_json::{json, Value};

pub fn request_body(
    body: &RequestBody,
    targeted: &TargetedFields,
) -> Result<Value, serde_json::Error> {
    let data = match body {
        RequestBody::Empty => Value::Null,
        RequestBody::Resource(resource) => serde_json::to_value(resource)?,
        RequestBody::Resources(resources) => serde_json::to_value(resources)?,
        RequestBody::Relationship(value) => serde_json::to_value(value)?,
    };
    Ok(json!({
        "data": data,
        "targeted": targeted_fields(targeted),
    }))
}

pub fn operations(operations: &[Operation]) -> Result<Value, serde_json::Error> {
    let mut entries = Vec::with_capacity(operations.len());
    for operation in operations {
        entries.push(json!({
            "index": operation.index,
            "op": operation.kind.to_string(),
            "relationship": operation.relationship,
            "resource": serde_json::to_value(&operation.resource)?,
            "targeted": targeted_fields(&operation.targeted),
        }));
    }
    Ok(Value::Array(entries))
}

fn targeted_fields(targeted: &TargetedFields) -> Value {
    json!({
        "attributes": targeted.attributes,
        "relationships": targeted.relationships,
    })
}
