//! Core value types for the ledger engine

pub mod account;
pub mod amount;
pub mod time;
