//! Shared harness for the ledger integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use kledger_common::{
    AccountId, Amount, AssetId, InMemoryTokenService, ManualClock, NoopNotifier, Timestamp,
    TokenTransferPort, TransferError,
};
use kledger_engine::{LedgerConfig, LedgerService, OriginationMode};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

pub const START: i64 = 1_700_000_000;

/// Whole tokens at 18 decimals
pub fn tokens(whole: u128) -> Amount {
    Amount::from_whole(whole, 18).unwrap()
}

pub fn flym() -> AssetId {
    "FLYM".into()
}

pub fn usdt() -> AssetId {
    "USDT".into()
}

pub fn alice() -> AccountId {
    "alice".into()
}

pub fn controller() -> AccountId {
    "controller".into()
}

pub fn owner() -> AccountId {
    "owner".into()
}

/// In-memory token service whose releases can be made to fail per asset
pub struct FlakyTokens {
    inner: InMemoryTokenService,
    failing_releases: Mutex<HashSet<AssetId>>,
}

impl FlakyTokens {
    pub fn new(inner: InMemoryTokenService) -> Self {
        Self {
            inner,
            failing_releases: Mutex::new(HashSet::new()),
        }
    }

    pub fn inner(&self) -> &InMemoryTokenService {
        &self.inner
    }

    pub fn fail_releases_of(&self, asset: AssetId) {
        self.failing_releases.lock().insert(asset);
    }

    pub fn heal(&self) {
        self.failing_releases.lock().clear();
    }
}

#[async_trait]
impl TokenTransferPort for FlakyTokens {
    async fn escrow(
        &self,
        asset: &AssetId,
        from: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.inner.escrow(asset, from, amount).await
    }

    async fn release(
        &self,
        asset: &AssetId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if self.failing_releases.lock().contains(asset) {
            return Err(TransferError::Transport(format!("{asset} release rejected")));
        }
        self.inner.release(asset, to, amount).await
    }

    async fn balance_of(&self, asset: &AssetId, who: &AccountId) -> Result<Amount, TransferError> {
        self.inner.balance_of(asset, who).await
    }
}

pub struct Harness {
    pub service: LedgerService,
    pub tokens: Arc<FlakyTokens>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(
            LedgerConfig::default(),
            InMemoryTokenService::without_allowances("klender".into()),
        )
    }

    pub fn collateral_mode() -> Self {
        let config = LedgerConfig {
            origination: OriginationMode::CollateralAsset,
            ..LedgerConfig::default()
        };
        Self::with_config(
            config,
            InMemoryTokenService::without_allowances("klender".into()),
        )
    }

    pub fn with_config(config: LedgerConfig, inner: InMemoryTokenService) -> Self {
        let port = Arc::new(FlakyTokens::new(inner));
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(START)));
        let service =
            LedgerService::new(config, port.clone(), clock.clone(), Arc::new(NoopNotifier))
                .unwrap();

        port.inner().fund_custody(&usdt(), tokens(100_000)).unwrap();

        Self {
            service,
            tokens: port,
            clock,
        }
    }

    pub fn mint(&self, asset: &AssetId, to: &AccountId, amount: Amount) {
        self.tokens.inner().mint(asset, to, amount).unwrap();
    }

    pub fn balance(&self, asset: &AssetId, who: &AccountId) -> Amount {
        self.tokens.inner().balance(asset, who)
    }

    pub fn custody(&self, asset: &AssetId) -> Amount {
        self.tokens.inner().custody_balance(asset)
    }
}
