//! Policy reconciliation core: resolver, diff engine, and applier for a
//! service-delivery control plane.
//!
//! A reconcile pass has three stages, run in order:
//!
//! 1. [`resolve`] walks every declared [`policy::Dependency`] through its
//!    contract, context, and service component graph, producing a
//!    [`resolve::PolicyResolution`] describing what *should* exist.
//! 2. [`diff`] compares two resolutions (the previous pass's desired state
//!    against the new one) and produces an ordered list of actions.
//! 3. [`apply`] executes those actions against registered cluster/code
//!    plugins, mutating the resolution's actual-state timestamps as it
//!    goes.
//!
//! Everything underneath is built leaves-first: [`labels`] and
//! [`expression`] have no dependencies on the rest of the crate;
//! [`template`] depends only on `labels`; [`policy`] depends on
//! `labels`/`expression`/`template`; `resolve`/`diff`/`apply` depend on
//! `policy` and each other in that order.

pub mod apply;
pub mod config;
pub mod diff;
pub mod error;
pub mod event;
pub mod expression;
pub mod labels;
pub mod policy;
pub mod progress;
pub mod resolve;
pub mod template;
pub mod time;

pub use config::ReconcileConfig;
pub use error::{ErrorCategory, ReconcileError, Result};
pub use policy::Policy;
