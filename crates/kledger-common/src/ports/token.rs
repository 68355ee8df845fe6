//! Fungible-asset transfer port
//!
//! The ledger holds custody of escrowed assets through this port. Every call is
//! atomic-or-failed from the ledger's point of view: an `Err` means no balance
//! moved.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{
    account::{AccountId, AssetId},
    amount::Amount,
};

/// Token service failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Insufficient {asset} balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        asset: AssetId,
        account: AccountId,
        required: Amount,
        available: Amount,
    },

    #[error("Transfer of {asset} from {account} not authorized: required {required}, approved {approved}")]
    AllowanceExceeded {
        asset: AssetId,
        account: AccountId,
        required: Amount,
        approved: Amount,
    },

    #[error("Token service unreachable: {0}")]
    Transport(String),
}

/// Moves fungible balances between ledger custody and participants
#[async_trait]
pub trait TokenTransferPort: Send + Sync {
    /// Move `amount` of `asset` from `from` into ledger custody
    async fn escrow(&self, asset: &AssetId, from: &AccountId, amount: Amount)
        -> Result<(), TransferError>;

    /// Move `amount` of `asset` from ledger custody to `to`
    async fn release(&self, asset: &AssetId, to: &AccountId, amount: Amount)
        -> Result<(), TransferError>;

    /// Current balance of `who` in `asset`
    async fn balance_of(&self, asset: &AssetId, who: &AccountId) -> Result<Amount, TransferError>;
}
