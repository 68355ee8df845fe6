//! # KLedger Common
//!
//! Shared types, errors, and collaborator ports for the KLedger loan and stake engine.
//!
//! ## Core Types
//!
//! - [`Amount`]: fixed-point token amount (sub-units of an 18-decimal asset)
//! - [`AccountId`] / [`AssetId`]: opaque participant and token identifiers
//! - [`Timestamp`] / [`Clock`]: injected time source
//!
//! ## Ports
//!
//! - [`ports::token`]: fungible-asset transfers the ledgers depend on
//! - [`ports::notifier`]: outbound "loan requested" notifications
//! - [`ports::memory`]: in-memory token service for tests and local runs
//!
//! ## Access
//!
//! - [`access`]: role checks for approver, operator and admin actions

pub mod access;
pub mod error;
pub mod ports;
pub mod types;

// Re-export commonly used types at crate root
pub use access::{AccessControl, AccessError, Role};
pub use error::{ErrorKind, LedgerError, LoanError, Result, StakeError};
pub use ports::{
    memory::InMemoryTokenService,
    notifier::{ApprovalNotifier, ChannelNotifier, LoanRequested, NoopNotifier, NotifyError},
    token::{TokenTransferPort, TransferError},
};
pub use types::{
    account::{AccountId, AssetId},
    amount::{Amount, ArithmeticError},
    time::{Clock, ClockError, ManualClock, SystemClock, Timestamp},
};

/// KLedger version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decimal places of every asset in the token economy
pub const DEFAULT_DECIMALS: u32 = 18;

/// Seconds in one day
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Length of one stake accrual period (30 days) in seconds
pub const SECONDS_PER_MONTH: u64 = 30 * SECONDS_PER_DAY;

/// Denominator of every percentage parameter
pub const PERCENT: u128 = 100;
