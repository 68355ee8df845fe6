//! In-memory token service
//!
//! A self-contained [`TokenTransferPort`] used by tests, benches and local runs.
//! Key characteristics:
//! - One balance per (asset, account) pair
//! - A single custody account holds everything the ledger escrows
//! - Escrow consumes an allowance the owner granted beforehand (`approve`)
//! - Can be switched offline to produce transport failures

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::token::{TokenTransferPort, TransferError};
use crate::types::{
    account::{AccountId, AssetId},
    amount::Amount,
};

type BalanceKey = (AssetId, AccountId);

/// Fungible balances kept in process memory
#[derive(Debug)]
pub struct InMemoryTokenService {
    /// Account holding escrowed funds and lending liquidity
    custody: AccountId,
    balances: Mutex<HashMap<BalanceKey, Amount>>,
    allowances: Mutex<HashMap<BalanceKey, Amount>>,
    /// When false, escrow skips the allowance check
    require_allowance: bool,
    offline: AtomicBool,
}

impl InMemoryTokenService {
    /// Create a service whose escrow requires a prior `approve`
    pub fn new(custody: AccountId) -> Self {
        Self {
            custody,
            balances: Mutex::new(HashMap::new()),
            allowances: Mutex::new(HashMap::new()),
            require_allowance: true,
            offline: AtomicBool::new(false),
        }
    }

    /// Create a service that lets the ledger escrow without allowances
    pub fn without_allowances(custody: AccountId) -> Self {
        Self {
            require_allowance: false,
            ..Self::new(custody)
        }
    }

    pub fn custody(&self) -> &AccountId {
        &self.custody
    }

    /// Credit freshly issued tokens
    pub fn mint(&self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let mut balances = self.balances.lock();
        let entry = balances
            .entry((asset.clone(), to.clone()))
            .or_insert(Amount::ZERO);
        *entry = entry
            .checked_add(amount)
            .map_err(|e| TransferError::Transport(format!("mint rejected: {e}")))?;
        Ok(())
    }

    /// Fund the custody account (lending liquidity, stake interest reserve)
    pub fn fund_custody(&self, asset: &AssetId, amount: Amount) -> Result<(), TransferError> {
        let custody = self.custody.clone();
        self.mint(asset, &custody, amount)
    }

    /// Allow the ledger to escrow up to `amount` of `owner`'s `asset`
    pub fn approve(&self, asset: &AssetId, owner: &AccountId, amount: Amount) {
        self.allowances
            .lock()
            .insert((asset.clone(), owner.clone()), amount);
    }

    pub fn allowance(&self, asset: &AssetId, owner: &AccountId) -> Amount {
        self.allowances
            .lock()
            .get(&(asset.clone(), owner.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn balance(&self, asset: &AssetId, who: &AccountId) -> Amount {
        self.balances
            .lock()
            .get(&(asset.clone(), who.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn custody_balance(&self, asset: &AssetId) -> Amount {
        self.balance(asset, &self.custody)
    }

    /// Simulate the remote service going away (or coming back)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), TransferError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransferError::Transport("token service offline".to_string()));
        }
        Ok(())
    }

    /// Move a balance between two accounts under one lock
    fn transfer(
        balances: &mut HashMap<BalanceKey, Amount>,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let from_key = (asset.clone(), from.clone());
        let available = balances.get(&from_key).copied().unwrap_or(Amount::ZERO);

        let remaining = available
            .checked_sub(amount)
            .map_err(|_| TransferError::InsufficientBalance {
                asset: asset.clone(),
                account: from.clone(),
                required: amount,
                available,
            })?;

        let to_key = (asset.clone(), to.clone());
        let credited = balances
            .get(&to_key)
            .copied()
            .unwrap_or(Amount::ZERO)
            .checked_add(amount)
            .map_err(|e| TransferError::Transport(format!("credit rejected: {e}")))?;

        balances.insert(from_key, remaining);
        balances.insert(to_key, credited);
        Ok(())
    }
}

#[async_trait]
impl TokenTransferPort for InMemoryTokenService {
    async fn escrow(
        &self,
        asset: &AssetId,
        from: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.ensure_online()?;
        if amount.is_zero() {
            return Ok(());
        }

        let mut allowances = self.allowances.lock();
        let allowance_key = (asset.clone(), from.clone());
        let approved = allowances
            .get(&allowance_key)
            .copied()
            .unwrap_or(Amount::ZERO);

        if self.require_allowance && approved < amount {
            return Err(TransferError::AllowanceExceeded {
                asset: asset.clone(),
                account: from.clone(),
                required: amount,
                approved,
            });
        }

        Self::transfer(&mut self.balances.lock(), asset, from, &self.custody, amount)?;

        if self.require_allowance {
            // approved >= amount was checked above
            allowances.insert(allowance_key, Amount::new(approved.raw() - amount.raw()));
        }

        debug!(asset = %asset, from = %from, amount = %amount, "Escrowed");
        Ok(())
    }

    async fn release(
        &self,
        asset: &AssetId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.ensure_online()?;
        if amount.is_zero() {
            return Ok(());
        }

        Self::transfer(&mut self.balances.lock(), asset, &self.custody, to, amount)?;

        debug!(asset = %asset, to = %to, amount = %amount, "Released");
        Ok(())
    }

    async fn balance_of(&self, asset: &AssetId, who: &AccountId) -> Result<Amount, TransferError> {
        self.ensure_online()?;
        Ok(self.balance(asset, who))
    }
}
