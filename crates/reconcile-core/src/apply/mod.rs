//! The applier: turns a [`DiffAction`](crate::diff::DiffAction) list into
//! calls against registered cluster/code plugins.

pub mod applier;
pub mod context;
pub mod plugin;
pub mod state;

pub use applier::{Applier, ApplyOutcome};
pub use context::ApplyContext;
pub use plugin::{ClusterPlugin, CodePlugin, PluginRegistry};
pub use state::{NoOpStateUpdater, StateUpdater};
