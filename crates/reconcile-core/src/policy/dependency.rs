//! Dependencies: a user's declared request for a contract, the root of
//! every resolve-pass expansion.

use crate::labels::LabelSet;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dependency {
    pub name: String,
    pub user_id: String,
    pub contract: String,
    pub labels: LabelSet,
}

impl Dependency {
    pub fn new(
        name: impl Into<String>,
        user_id: impl Into<String>,
        contract: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            user_id: user_id.into(),
            contract: contract.into(),
            labels: LabelSet::new(),
        }
    }
}
