//! Clusters: the deployment targets a component instance is placed into.
//! `cluster_type` selects which registered [`ClusterPlugin`](crate::apply::plugin::ClusterPlugin)
//! handles actions against it.

use crate::labels::LabelSet;
use crate::template::ParameterTree;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Cluster {
    pub name: String,
    pub cluster_type: String,
    pub labels: LabelSet,
    pub config: ParameterTree,
}

impl Cluster {
    pub fn new(name: impl Into<String>, cluster_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cluster_type: cluster_type.into(),
            labels: LabelSet::new(),
            config: ParameterTree::Null,
        }
    }
}
