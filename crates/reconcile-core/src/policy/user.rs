//! Users: the identity a [`Dependency`](super::dependency::Dependency) is
//! declared on behalf of. User labels feed rule and context criteria
//! alongside dependency and cluster labels.

use crate::labels::LabelSet;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub labels: LabelSet,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            labels: LabelSet::new(),
        }
    }
}
