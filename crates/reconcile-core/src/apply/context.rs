//! [`ApplyContext`]: everything a plugin call needs to act on one
//! component instance, bundled into a single borrow so a plugin never has
//! to reach back into the resolution or the policy itself.

use crate::policy::Cluster;
use crate::resolve::{ComponentInstance, ComponentInstanceKey};
use crate::time::Deadline;

pub struct ApplyContext<'a> {
    pub key: &'a ComponentInstanceKey,
    pub instance: &'a ComponentInstance,
    pub cluster: &'a Cluster,
    /// The point in time by which the plugin must return, one way or
    /// another. The applier does not enforce this — honoring it is the
    /// plugin's contract.
    pub deadline: Deadline,
}
