//! Collaborator ports consumed by the ledgers
//!
//! The ledgers own accounting state only. Moving tokens and telling the
//! approval workflow about new loans are delegated to these traits.

pub mod memory;
pub mod notifier;
pub mod token;
