//! [`ComponentInstance`]: one node of a resolved dependency graph, carrying
//! the rendered parameters the applier needs plus the actual-state
//! timestamps the applier is the sole writer of.

use std::collections::{BTreeMap, BTreeSet};

use crate::labels::LabelSet;
use crate::resolve::key::ComponentInstanceKey;
use crate::template::ParameterTree;
use crate::time::Timestamp;

#[derive(Clone, Debug)]
pub struct ComponentInstance {
    pub key: ComponentInstanceKey,
    pub labels: LabelSet,
    pub params: ParameterTree,
    /// `Some(code_type)` for a component backed by a registered code
    /// plugin; `None` for a service's root instance, which the applier
    /// routes to the cluster plugin instead.
    pub code_type: Option<String>,
    /// Names of the [`Dependency`](crate::policy::Dependency) objects whose
    /// resolution passes through this instance. An instance with multiple
    /// consumers is created once and shared.
    pub dependency_names: BTreeSet<String>,
    /// Set once, by the applier, the first time this instance is created.
    /// `None` until then.
    pub created_at: Option<Timestamp>,
    /// Bumped by the applier on every `Update` action. Attach/Detach never
    /// advance it.
    pub updated_at: Option<Timestamp>,
    /// Endpoint-type → URL, populated post-deploy by the cluster/code
    /// plugin's `endpoints()` call during `ClustersPostProcess`. Empty
    /// until then.
    pub endpoint_urls: BTreeMap<String, String>,
}

impl ComponentInstance {
    pub fn new(key: ComponentInstanceKey, labels: LabelSet, params: ParameterTree) -> Self {
        Self {
            key,
            labels,
            params,
            code_type: None,
            dependency_names: BTreeSet::new(),
            created_at: None,
            updated_at: None,
            endpoint_urls: BTreeMap::new(),
        }
    }

    pub fn with_code_type(mut self, code_type: impl Into<String>) -> Self {
        self.code_type = Some(code_type.into());
        self
    }
}
