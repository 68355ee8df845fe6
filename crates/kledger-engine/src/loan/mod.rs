//! Loan records and receipts
//!
//! A borrower moves through `NoLoan -> Requested -> Approved` and back to
//! `NoLoan` through cancellation, repayment or liquidation. Terminal states are
//! not stored: the record is reset to zero principal and reused.

pub mod ledger;

use kledger_common::{AccountId, Amount, ArithmeticError, Timestamp};
use serde::{Deserialize, Serialize};

pub use ledger::{LoanAssets, LoanLedger};

/// Which preview formula sets the terms at origination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginationMode {
    /// Terms from the requested repayment-asset amount
    #[default]
    PrincipalAsset,
    /// Terms from the borrower's collateral-asset holding
    CollateralAsset,
}

/// Live state of a borrower's record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    NoLoan,
    Requested,
    Approved,
}

/// How a loan left the books
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanOutcome {
    Cancelled,
    Repaid,
    Liquidated,
}

/// One borrower's loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub borrower: AccountId,
    /// Repayment-asset amount borrowed; zero means no active loan
    pub principal: Amount,
    /// Collateral-asset amount held in escrow
    pub collateral_amount: Amount,
    /// Owed on top of principal, frozen at origination
    pub interest_amount: Amount,
    pub start_timestamp: Timestamp,
    pub is_approved: bool,
}

impl LoanRecord {
    /// Zero-valued record for a borrower without a loan
    pub fn empty(borrower: AccountId) -> Self {
        Self {
            borrower,
            principal: Amount::ZERO,
            collateral_amount: Amount::ZERO,
            interest_amount: Amount::ZERO,
            start_timestamp: Timestamp::EPOCH,
            is_approved: false,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !self.principal.is_zero()
    }

    pub fn status(&self) -> LoanStatus {
        match (self.is_active(), self.is_approved) {
            (false, _) => LoanStatus::NoLoan,
            (true, false) => LoanStatus::Requested,
            (true, true) => LoanStatus::Approved,
        }
    }

    /// Principal plus frozen interest
    pub fn total_due(&self) -> Result<Amount, ArithmeticError> {
        self.principal.checked_add(self.interest_amount)
    }

    /// Return to `NoLoan`
    pub fn reset(&mut self) {
        *self = Self::empty(self.borrower.clone());
    }
}

/// Receipt for a terminal loan transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSettlement {
    pub borrower: AccountId,
    pub outcome: LoanOutcome,
    /// Repayment asset collected from the borrower
    pub amount_collected: Amount,
    /// Collateral returned to the borrower
    pub collateral_released: Amount,
    /// Collateral kept by the ledger
    pub collateral_seized: Amount,
    pub settled_at: Timestamp,
}
