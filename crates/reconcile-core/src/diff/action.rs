//! [`DiffAction`]: the verbs the applier executes, decided by comparing two
//! [`PolicyResolution`](crate::resolve::PolicyResolution)s.

use std::fmt;

use crate::resolve::key::ComponentInstanceKey;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffAction {
    /// The instance exists in `next` but not in `prev`.
    Create(ComponentInstanceKey),
    /// The instance exists in both, and its rendered parameters or labels
    /// changed.
    Update(ComponentInstanceKey),
    /// The instance existed in `prev` but no longer exists in `next`.
    Delete(ComponentInstanceKey),
    /// A dependency started resolving through an instance that already
    /// existed for other dependencies.
    Attach {
        key: ComponentInstanceKey,
        dependency_name: String,
    },
    /// A dependency stopped resolving through an instance that other
    /// dependencies still use.
    Detach {
        key: ComponentInstanceKey,
        dependency_name: String,
    },
    /// Runs once, after every other action, giving cluster plugins a
    /// chance to reconcile anything that only makes sense in aggregate
    ///.
    ClustersPostProcess,
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffAction::Create(key) => write!(f, "create {key}"),
            DiffAction::Update(key) => write!(f, "update {key}"),
            DiffAction::Delete(key) => write!(f, "delete {key}"),
            DiffAction::Attach { key, dependency_name } => {
                write!(f, "attach {dependency_name} to {key}")
            }
            DiffAction::Detach { key, dependency_name } => {
                write!(f, "detach {dependency_name} from {key}")
            }
            DiffAction::ClustersPostProcess => write!(f, "clusters post-process"),
        }
    }
}
