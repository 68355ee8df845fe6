//! # KLedger Engine
//!
//! Collateralized loans and interest-bearing stakes over an external token
//! service.
//!
//! ## Loans
//!
//! ```text
//! NoLoan --request_borrow--> Requested --approve_borrow--> Approved
//!    ^                          |                             |
//!    +-------cancel_borrow------+                             |
//!    +--repay (from either state)-----------------------------+
//!    +--liquidate (after grace period, from either state)-----+
//! ```
//!
//! ## Stakes
//!
//! ```text
//! interest = principal * monthly_rate * elapsed / (100 * 30 days)
//! ```
//!
//! Interest is recomputed on every read; nothing accrues in the background.

pub mod book;
pub mod config;
pub mod loan;
pub mod rate;
pub mod service;
pub mod stake;

pub use config::{AssetSettings, LedgerConfig};
pub use loan::{
    LoanAssets, LoanLedger, LoanOutcome, LoanRecord, LoanSettlement, LoanStatus, OriginationMode,
};
pub use rate::{
    CollateralPreview, CollateralPrice, PrincipalPreview, RateModel, RateParameters, SharedRates,
};
pub use service::{
    BalanceView, BorrowPreviewView, LedgerService, LoanView, StakePreviewView, StakeView,
};
pub use stake::{StakeLedger, StakePayout, StakePosition, StakeRecord};
