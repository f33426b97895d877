//! [`ComponentInstanceKey`]: the compound identity of a resolved component
//! instance, stable across resolve passes so the diff engine can recognize
//! "the same instance" even when its parameters changed.

use std::fmt;

/// Either the service's own root instance, or one of its named components.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum ComponentKeySegment {
    Root,
    Component(String),
}

impl fmt::Display for ComponentKeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKeySegment::Root => write!(f, "root"),
            ComponentKeySegment::Component(name) => write!(f, "{name}"),
        }
    }
}

/// `(cluster, contract, context, allocation-suffix, service-path,
/// component-or-root)`. Two resolve passes produce equal keys for "the
/// same" instance iff every field is equal — this is exactly the identity
/// the diff engine keys its before/after comparison on.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ComponentInstanceKey {
    pub cluster: Option<String>,
    pub contract: String,
    pub context: String,
    pub allocation: Vec<String>,
    pub service_path: Vec<String>,
    pub component: ComponentKeySegment,
}

impl ComponentInstanceKey {
    pub fn root(
        cluster: Option<String>,
        contract: impl Into<String>,
        context: impl Into<String>,
        allocation: Vec<String>,
        service_path: Vec<String>,
    ) -> Self {
        Self {
            cluster,
            contract: contract.into(),
            context: context.into(),
            allocation,
            service_path,
            component: ComponentKeySegment::Root,
        }
    }

    /// Derives the key for one of this instance's own components, keeping
    /// everything but the component segment identical.
    pub fn for_component(&self, component_name: impl Into<String>) -> Self {
        Self {
            component: ComponentKeySegment::Component(component_name.into()),
            ..self.clone()
        }
    }

    /// Whether this key names the service's root instance rather than one
    /// of its components.
    pub fn is_root(&self) -> bool {
        matches!(self.component, ComponentKeySegment::Root)
    }

    /// The key of the service root this instance belongs to. Identical to
    /// `self` when `self` already is a root; for a component, it's the same
    /// identity with the component segment replaced by `Root`.
    pub fn parent_service_key(&self) -> Self {
        Self {
            component: ComponentKeySegment::Root,
            ..self.clone()
        }
    }

    /// A stable, human-readable rendering used in logs and event messages.
    pub fn canonical(&self) -> String {
        format!(
            "{}#{}#{}#{}#{}#{}",
            self.cluster.as_deref().unwrap_or("-"),
            self.contract,
            self.context,
            self.allocation.join("."),
            self.service_path.join("/"),
            self.component,
        )
    }
}

impl fmt::Display for ComponentInstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}
