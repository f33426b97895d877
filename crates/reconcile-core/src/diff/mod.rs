//! The diff engine: compares two resolutions and produces the ordered
//! [`DiffAction`] list the applier executes.

pub mod action;
pub mod engine;

pub use action::DiffAction;
pub use engine::diff;
