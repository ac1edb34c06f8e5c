//! The tri-state `data` member.
//!
//! JSON:API distinguishes a missing `data` member from `"data": null`: on a relationship
//! the first means "linkage not rendered", the second "empty to-one". Both must survive a
//! round trip, so `data` is modelled as a sum type instead of `Option<Option<_>>`.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Contents of a `data` member
#[derive(Debug, Clone, PartialEq)]
pub enum Data<T> {
    /// The member is not present.
    Absent,
    /// `"data": null`
    Null,
    /// `"data": { ... }`
    Single(T),
    /// `"data": [ ... ]`, possibly empty
    Many(Vec<T>),
}

impl<T> Default for Data<T> {
    fn default() -> Self {
        Data::Absent
    }
}

impl<T> Data<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Data::Absent)
    }

    /// Anything but [`Data::Absent`], including null and empty arrays.
    pub fn is_assigned(&self) -> bool {
        !self.is_absent()
    }

    pub fn as_single(&self) -> Option<&T> {
        match self {
            Data::Single(item) => Some(item),
            _ => None,
        }
    }

    /// The contained elements, empty for absent and null.
    pub fn as_slice(&self) -> &[T] {
        match self {
            Data::Single(item) => std::slice::from_ref(item),
            Data::Many(items) => items,
            Data::Absent | Data::Null => &[],
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Data<U> {
        match self {
            Data::Absent => Data::Absent,
            Data::Null => Data::Null,
            Data::Single(item) => Data::Single(f(item)),
            Data::Many(items) => Data::Many(items.into_iter().map(f).collect()),
        }
    }
}

impl<T: Serialize> Serialize for Data<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Data::Absent | Data::Null => serializer.serialize_none(),
            Data::Single(item) => item.serialize(serializer),
            Data::Many(items) => items.serialize(serializer),
        }
    }
}

// Absent is produced by `#[serde(default)]` on the containing field; whenever this impl
// runs the member was present.
impl<'de, T: DeserializeOwned> Deserialize<'de> for Data<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Data::Null),
            Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<T>, _>>()
                .map(Data::Many)
                .map_err(D::Error::custom),
            other => serde_json::from_value(other)
                .map(Data::Single)
                .map_err(D::Error::custom),
        }
    }
}
