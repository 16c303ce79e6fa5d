//! Structured context fields.

use std::sync::Arc;

use serde_json::{Map, Value};

/// A key/value pair attached to log records.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: Value,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for Field {
    fn from((key, value): (K, V)) -> Self {
        Field::new(key, value)
    }
}

/// Immutable, cheaply cloned list of context fields.
///
/// Extending produces a new list; the original is never touched, so children
/// derived from one parent cannot see each other's fields.
#[derive(Debug, Clone, Default)]
pub struct Fields(Arc<[Field]>);

impl Fields {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.0.iter()
    }

    /// New list with `extra` appended. A key already present is replaced in place.
    pub fn extend<I>(&self, extra: I) -> Fields
    where
        I: IntoIterator<Item = Field>,
    {
        let mut fields: Vec<Field> = self.0.to_vec();
        for field in extra {
            match fields.iter_mut().find(|f| f.key == field.key) {
                Some(existing) => existing.value = field.value,
                None => fields.push(field),
            }
        }
        Fields(fields.into())
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|f| (f.key.clone(), f.value.clone()))
            .collect()
    }
}

impl FromIterator<Field> for Fields {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Fields::default().extend(iter)
    }
}
