//! Declarative backend actions: confirm/form/execute plumbing.

pub mod executor;
pub mod registry;
