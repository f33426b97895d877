//! Label sets and label-mutation operations shared by every leaf in the
//! object model: users, dependencies, clusters, contexts, components.

use std::collections::BTreeMap;

/// An immutable-by-convention bag of string labels, ordered for determinism.
///
/// Resolution must be byte-identical across runs, so labels are
/// kept in a `BTreeMap` rather than a `HashMap`: iteration order is always
/// the sorted key order, never hash-bucket order.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabelSet {
    labels: BTreeMap<String, String>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.labels.remove(key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Returns a new `LabelSet` with `other`'s entries overlaid on top of
    /// `self`'s (later wins), used to seed a dependency's working label set
    /// from `user labels ∪ dependency labels`.
    pub fn union(&self, other: &LabelSet) -> LabelSet {
        let mut merged = self.labels.clone();
        for (k, v) in &other.labels {
            merged.insert(k.clone(), v.clone());
        }
        LabelSet { labels: merged }
    }
}

/// A single label mutation: set a key to a value, or remove it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LabelOp {
    Set { key: String, value: String },
    Remove { key: String },
}

/// An ordered list of [`LabelOp`]s, applied in sequence. Used for
/// component-level, service-level, and context-level `change-labels` blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabelOperations(pub Vec<LabelOp>);

impl LabelOperations {
    pub fn apply(&self, labels: &mut LabelSet) {
        for op in &self.0 {
            match op {
                LabelOp::Set { key, value } => labels.set(key.clone(), value.clone()),
                LabelOp::Remove { key } => labels.remove(key),
            }
        }
    }
}
