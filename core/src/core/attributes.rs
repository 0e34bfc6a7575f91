// stepflow/src/core/attributes.rs

//! Loosely-typed key/value storage shared by `Configuration` and `Context`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{event, Level};

/// A string-keyed bag of JSON values.
///
/// Reading a key that was never written yields `None`; writing an unknown key
/// creates it. There is no ordering between keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
  values: HashMap<String, Value>,
}

impl AttributeStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  /// Reads `key` and deserializes it into `T`. Absent keys and values that
  /// do not fit `T` both give `None`.
  pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    self
      .values
      .get(key)
      .and_then(|value| serde_json::from_value(value.clone()).ok())
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    self.values.insert(key.into(), value.into());
  }

  pub fn remove(&mut self, key: &str) -> Option<Value> {
    self.values.remove(key)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  /// Copies every pair of `other` into `self`, overwriting keys present in both.
  pub fn merge(&mut self, other: impl Into<AttributeStore>) {
    self.values.extend(other.into().values);
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.values.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v))
  }

  /// Snapshot of the attributes as a JSON object.
  pub fn to_value(&self) -> Value {
    Value::Object(self.values.clone().into_iter().collect())
  }
}

impl From<Map<String, Value>> for AttributeStore {
  fn from(map: Map<String, Value>) -> Self {
    Self {
      values: map.into_iter().collect(),
    }
  }
}

/// Objects contribute their entries and `null` gives an empty store. Any other
/// JSON value has no keys to offer and is dropped.
impl From<Value> for AttributeStore {
  fn from(value: Value) -> Self {
    match value {
      Value::Object(map) => map.into(),
      Value::Null => Self::default(),
      other => {
        event!(Level::WARN, value = %other, "Ignoring non-object value used as attributes.");
        Self::default()
      }
    }
  }
}

impl From<&AttributeStore> for AttributeStore {
  fn from(store: &AttributeStore) -> Self {
    store.clone()
  }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AttributeStore {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self {
      values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
  }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for AttributeStore {
  fn from(pairs: [(K, V); N]) -> Self {
    pairs.into_iter().collect()
  }
}
