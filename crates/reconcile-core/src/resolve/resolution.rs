//! [`PolicyResolution`]: the full output of one resolve pass, handed
//! immutably to the diff engine and, once diffed, to the applier. Only the
//! applier mutates it afterward, and only the `created_at`/`updated_at`
//! fields of its instances — never membership.

use std::collections::BTreeMap;

use crate::resolve::instance::ComponentInstance;
use crate::resolve::key::ComponentInstanceKey;

pub type ComponentInstanceMap = BTreeMap<ComponentInstanceKey, ComponentInstance>;
pub type ComponentProcessingOrder = Vec<ComponentInstanceKey>;
pub type DependencyInstanceMap = BTreeMap<String, ComponentInstanceKey>;

#[derive(Clone, Debug, Default)]
pub struct PolicyResolution {
    pub component_instances: ComponentInstanceMap,
    /// Every key in `component_instances`, topologically ordered so that a
    /// component never precedes any instance it depends on.
    pub component_processing_order: ComponentProcessingOrder,
    /// Dependency name -> the root instance key it resolved to.
    pub dependency_instances: DependencyInstanceMap,
}

impl PolicyResolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance(&self, key: &ComponentInstanceKey) -> Option<&ComponentInstance> {
        self.component_instances.get(key)
    }

    pub fn instance_mut(&mut self, key: &ComponentInstanceKey) -> Option<&mut ComponentInstance> {
        self.component_instances.get_mut(key)
    }
}
