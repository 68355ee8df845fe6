//! Stake records and receipts
//!
//! Interest is never stored. A record keeps only what accrual needs (amount
//! and start time); every read recomputes interest against the current time.

pub mod ledger;

use kledger_common::{AccountId, Amount, Timestamp};
use serde::{Deserialize, Serialize};

pub use ledger::StakeLedger;

/// One investor's deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    pub investor: AccountId,
    /// Zero means no active position
    pub amount: Amount,
    pub start_timestamp: Timestamp,
}

impl StakeRecord {
    pub fn empty(investor: AccountId) -> Self {
        Self {
            investor,
            amount: Amount::ZERO,
            start_timestamp: Timestamp::EPOCH,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !self.amount.is_zero()
    }

    pub fn reset(&mut self) {
        *self = Self::empty(self.investor.clone());
    }
}

/// A stake as seen at `as_of`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePosition {
    pub investor: AccountId,
    pub amount: Amount,
    pub start_timestamp: Timestamp,
    pub accumulated_interest: Amount,
    pub as_of: Timestamp,
}

/// Receipt for a withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePayout {
    pub investor: AccountId,
    pub principal: Amount,
    pub interest: Amount,
    /// Principal plus interest, as transferred
    pub total: Amount,
    pub paid_at: Timestamp,
}
