//! Registered shapes of resource types.
//!
//! A [`ResourceShape`] is what the codec knows about a resource type: its public name,
//! how its identity is spelled, its attributes in declaration order and its relationships.
//! Shapes are plain serde data so they can be declared in code or loaded from a schema file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// How the `id` of a resource type converts from its wire string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    #[default]
    String,
    Integer,
    Guid,
}

impl IdentityKind {
    /// Check that `value` converts to this identity kind.
    pub fn validate(self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            return Err("Resource ID must not be empty.".to_string());
        }
        match self {
            IdentityKind::String => Ok(()),
            IdentityKind::Integer => value
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| format!("Failed to convert ID '{value}' to type 'Integer'.")),
            IdentityKind::Guid => uuid::Uuid::parse_str(value)
                .map(|_| ())
                .map_err(|_| format!("Failed to convert ID '{value}' to type 'Guid'.")),
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKind::String => write!(f, "string"),
            IdentityKind::Integer => write!(f, "integer"),
            IdentityKind::Guid => write!(f, "guid"),
        }
    }
}

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AttrType {
    String,
    Integer,
    Number,
    Boolean,
    /// A compound value whose members are attributes themselves.
    Object {
        #[serde(default)]
        attributes: Vec<AttrDef>,
    },
    Array {
        items: Box<AttrType>,
    },
    Any,
}

/// Why a value could not be converted to an attribute type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    /// Member path below the attribute, outermost first; empty for the attribute itself.
    pub path: Vec<String>,
    pub message: String,
}

impl CoercionError {
    fn new(message: impl Into<String>) -> Self {
        CoercionError {
            path: Vec::new(),
            message: message.into(),
        }
    }

    fn within(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} (at '{}')", self.message, self.path.join("."))
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl AttrType {
    pub fn name(&self) -> &'static str {
        match self {
            AttrType::String => "string",
            AttrType::Integer => "integer",
            AttrType::Number => "number",
            AttrType::Boolean => "boolean",
            AttrType::Object { .. } => "object",
            AttrType::Array { .. } => "array",
            AttrType::Any => "any",
        }
    }

    /// Convert a non-null wire value to this type.
    ///
    /// Integers accept whole floating point numbers (`3.0`); numbers accept integers.
    pub fn coerce(&self, value: &Value, allow_unknown: bool) -> Result<Value, CoercionError> {
        let mismatch = || {
            CoercionError::new(format!(
                "Expected a value of type '{}' instead of '{}'.",
                self.name(),
                describe(value)
            ))
        };

        match (self, value) {
            (AttrType::Any, _) => Ok(value.clone()),
            (AttrType::String, Value::String(_)) | (AttrType::Boolean, Value::Bool(_)) => {
                Ok(value.clone())
            }
            (AttrType::Integer, Value::Number(number)) => {
                if number.is_i64() || number.is_u64() {
                    Ok(value.clone())
                } else {
                    match number.as_f64() {
                        Some(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
                            Ok(Value::from(float as i64))
                        }
                        _ => Err(mismatch()),
                    }
                }
            }
            (AttrType::Number, Value::Number(_)) => Ok(value.clone()),
            (AttrType::Object { attributes }, Value::Object(members)) => {
                let mut coerced = Map::new();
                for (key, member) in members {
                    match attributes.iter().find(|def| &def.name == key) {
                        Some(def) => {
                            let converted = def
                                .coerce(member, allow_unknown)
                                .map_err(|err| err.within(key.clone()))?;
                            coerced.insert(key.clone(), converted);
                        }
                        None if allow_unknown => {}
                        None => {
                            return Err(CoercionError::new(format!(
                                "Unknown member '{key}' in value of type 'object'."
                            )))
                        }
                    }
                }
                Ok(Value::Object(coerced))
            }
            (AttrType::Array { items }, Value::Array(elements)) => elements
                .iter()
                .enumerate()
                .map(|(index, element)| {
                    if element.is_null() {
                        return Ok(Value::Null);
                    }
                    items
                        .coerce(element, allow_unknown)
                        .map_err(|err| err.within(index.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Err(mismatch()),
        }
    }

    /// True for the value a freshly constructed instance would hold: `null`, `0`, `0.0`
    /// or `false`.
    pub fn is_default(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (AttrType::Integer | AttrType::Number, Value::Number(number)) => {
                number.as_f64() == Some(0.0)
            }
            (AttrType::Boolean, Value::Bool(flag)) => !flag,
            _ => false,
        }
    }

    /// Empty value of this type, for attributes that may not be null.
    pub fn empty_value(&self) -> Value {
        match self {
            AttrType::String => Value::String(String::new()),
            AttrType::Integer => Value::from(0),
            AttrType::Number => Value::from(0.0),
            AttrType::Boolean => Value::Bool(false),
            AttrType::Object { .. } => Value::Object(Map::new()),
            AttrType::Array { .. } => Value::Array(Vec::new()),
            AttrType::Any => Value::Null,
        }
    }
}

fn default_nullable() -> bool {
    true
}

/// A named attribute of a resource type (or a member of a compound attribute).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttrDef {
    pub name: String,
    #[serde(flatten)]
    pub attr_type: AttrType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub read_only: bool,
}

impl AttrDef {
    pub fn new(name: impl Into<String>, attr_type: AttrType) -> Self {
        AttrDef {
            name: name.into(),
            attr_type,
            nullable: true,
            read_only: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// What an attribute the resource never assigned renders as.
    pub fn unset_value(&self) -> Value {
        if self.nullable {
            Value::Null
        } else {
            self.attr_type.empty_value()
        }
    }

    /// Convert a wire value, honoring nullability.
    pub fn coerce(&self, value: &Value, allow_unknown: bool) -> Result<Value, CoercionError> {
        if value.is_null() {
            return if self.nullable {
                Ok(Value::Null)
            } else {
                Err(CoercionError::new(format!(
                    "Attribute '{}' does not accept null.",
                    self.name
                )))
            };
        }
        self.attr_type.coerce(value, allow_unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// A named relationship of a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDef {
    pub name: String,
    pub cardinality: Cardinality,
    /// Declared right-hand type; derived types are assignable as well.
    pub related_type: String,
}

impl RelationshipDef {
    pub fn to_one(name: impl Into<String>, related_type: impl Into<String>) -> Self {
        RelationshipDef {
            name: name.into(),
            cardinality: Cardinality::ToOne,
            related_type: related_type.into(),
        }
    }

    pub fn to_many(name: impl Into<String>, related_type: impl Into<String>) -> Self {
        RelationshipDef {
            name: name.into(),
            cardinality: Cardinality::ToMany,
            related_type: related_type.into(),
        }
    }

    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::ToMany
    }
}

/// Registered shape of a resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceShape {
    /// Public type name as it appears in `type` members.
    pub name: String,
    #[serde(default)]
    pub identity: IdentityKind,
    #[serde(default)]
    pub attributes: Vec<AttrDef>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDef>,
    /// Parent type for assignment compatibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
}

impl ResourceShape {
    pub fn new(name: impl Into<String>) -> Self {
        ResourceShape {
            name: name.into(),
            identity: IdentityKind::String,
            attributes: Vec::new(),
            relationships: Vec::new(),
            base_type: None,
        }
    }

    pub fn with_identity(mut self, identity: IdentityKind) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_attribute(mut self, attribute: AttrDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipDef) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrDef> {
        self.attributes.iter().find(|def| def.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|def| def.name == name)
    }
}
