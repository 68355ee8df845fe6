//! Stake ledger - interest-bearing deposits
//!
//! Accrual is computed on demand from the stored amount and start time, so
//! there is no background job and nothing to catch up after a restart.

use kledger_common::{
    AccessControl, AccountId, Amount, AssetId, Clock, LedgerError, Result, Role, StakeError,
    Timestamp, TokenTransferPort,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{StakePayout, StakePosition, StakeRecord};
use crate::book::RecordBook;
use crate::rate::{RateModel, RateParameters, SharedRates};

/// Owns every investor's stake record
pub struct StakeLedger {
    asset: AssetId,
    access: AccessControl,
    rates: SharedRates,
    tokens: Arc<dyn TokenTransferPort>,
    clock: Arc<dyn Clock>,
    stakes: RecordBook<StakeRecord>,
}

impl StakeLedger {
    pub fn new(
        asset: AssetId,
        rates: RateModel,
        access: AccessControl,
        tokens: Arc<dyn TokenTransferPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            asset,
            access,
            rates: Arc::new(RwLock::new(rates)),
            tokens,
            clock,
            stakes: RecordBook::new(),
        }
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    /// Read and update rate parameters through `rates` instead of a private copy
    pub fn with_shared_rates(mut self, rates: SharedRates) -> Self {
        self.rates = rates;
        self
    }

    pub fn shared_rates(&self) -> SharedRates {
        Arc::clone(&self.rates)
    }

    fn rates(&self) -> RateModel {
        *self.rates.read()
    }

    /// Monthly stake rate in percent
    pub fn interest_rate(&self) -> u32 {
        self.rates().params().stake_monthly_interest_rate
    }

    pub fn rate_parameters(&self) -> RateParameters {
        *self.rates().params()
    }

    /// Replace the rate parameters (admin only)
    ///
    /// Applies to open stakes too: their interest is recomputed at the new
    /// rate over the whole holding period.
    #[instrument(skip_all, fields(caller = %caller))]
    pub fn set_rate_parameters(&self, caller: &AccountId, params: RateParameters) -> Result<()> {
        self.access.check(Role::Admin, caller)?;
        let model = RateModel::new(params)?;
        *self.rates.write() = model;
        info!(?params, "Stake rate parameters updated");
        Ok(())
    }

    fn position(rates: &RateModel, record: &StakeRecord, now: Timestamp) -> Result<StakePosition> {
        let accumulated_interest = if record.is_active() {
            let elapsed = now.seconds_since(record.start_timestamp)?;
            rates.monthly_stake_interest(record.amount, elapsed)?
        } else {
            Amount::ZERO
        };

        Ok(StakePosition {
            investor: record.investor.clone(),
            amount: record.amount,
            start_timestamp: record.start_timestamp,
            accumulated_interest,
            as_of: now,
        })
    }

    /// Deposit `amount` of the stake asset
    #[instrument(skip_all, fields(investor = %investor, amount = %amount))]
    pub async fn stake(&self, investor: &AccountId, amount: Amount) -> Result<StakePosition> {
        if amount.is_zero() {
            return Err(StakeError::InvalidAmount.into());
        }
        let now = self.clock.now()?;

        let mut stake = self
            .stakes
            .lock(investor, || StakeRecord::empty(investor.clone()))
            .await;
        if stake.is_active() {
            return Err(StakeError::AlreadyStaked {
                investor: investor.clone(),
            }
            .into());
        }

        self.tokens.escrow(&self.asset, investor, amount).await?;

        *stake = StakeRecord {
            investor: investor.clone(),
            amount,
            start_timestamp: now,
        };

        info!("Stake opened");
        Self::position(&self.rates(), &stake, now)
    }

    /// Current position with interest accrued up to now
    pub async fn get_stake(&self, investor: &AccountId) -> Result<StakePosition> {
        let now = self.clock.now()?;
        let record = self
            .stakes
            .snapshot(investor)
            .await
            .unwrap_or_else(|| StakeRecord::empty(investor.clone()));

        Self::position(&self.rates(), &record, now)
    }

    /// Withdraw principal plus accrued interest
    #[instrument(skip_all, fields(investor = %investor))]
    pub async fn unstake(&self, investor: &AccountId) -> Result<StakePayout> {
        let now = self.clock.now()?;
        let rates = self.rates();

        let mut stake = self.stakes.lock_existing(investor).await.ok_or_else(|| {
            LedgerError::from(StakeError::NoActiveStake {
                investor: investor.clone(),
            })
        })?;
        if !stake.is_active() {
            return Err(StakeError::NoActiveStake {
                investor: investor.clone(),
            }
            .into());
        }

        let position = Self::position(&rates, &stake, now)?;
        let total = position.amount.checked_add(position.accumulated_interest)?;

        self.tokens.release(&self.asset, investor, total).await?;

        let payout = StakePayout {
            investor: investor.clone(),
            principal: position.amount,
            interest: position.accumulated_interest,
            total,
            paid_at: now,
        };
        stake.reset();

        info!(
            principal = %payout.principal,
            interest = %payout.interest,
            "Stake withdrawn"
        );
        Ok(payout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kledger_common::{ErrorKind, InMemoryTokenService, LedgerError, ManualClock};

    struct Fixture {
        ledger: StakeLedger,
        tokens: Arc<InMemoryTokenService>,
        clock: Arc<ManualClock>,
    }

    fn usdt() -> AssetId {
        "USDT".into()
    }

    fn investor() -> AccountId {
        "investor".into()
    }

    fn fixture() -> Fixture {
        let tokens = Arc::new(InMemoryTokenService::without_allowances("kinvest".into()));
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1_700_000_000)));
        let ledger = StakeLedger::new(
            usdt(),
            RateModel::default(),
            AccessControl::new("controller".into(), "owner".into(), "owner".into()),
            tokens.clone(),
            clock.clone(),
        );
        tokens.mint(&usdt(), &investor(), Amount::new(100)).unwrap();
        tokens.fund_custody(&usdt(), Amount::new(100)).unwrap();

        Fixture {
            ledger,
            tokens,
            clock,
        }
    }

    #[tokio::test]
    async fn test_stake_starts_without_interest() {
        let f = fixture();
        let position = f.ledger.stake(&investor(), Amount::new(100)).await.unwrap();

        assert_eq!(position.amount, Amount::new(100));
        assert_eq!(position.accumulated_interest, Amount::ZERO);
        assert_eq!(f.tokens.custody_balance(&usdt()), Amount::new(200));
    }

    #[tokio::test]
    async fn test_double_stake_rejected() {
        let f = fixture();
        f.ledger.stake(&investor(), Amount::new(50)).await.unwrap();

        let err = f
            .ledger
            .stake(&investor(), Amount::new(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stake(StakeError::AlreadyStaked { .. })
        ));
    }

    #[tokio::test]
    async fn test_unstake_without_position() {
        let f = fixture();
        let err = f.ledger.unstake(&investor()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[tokio::test]
    async fn test_unstake_unknown_investor_is_not_recorded() {
        let f = fixture();
        let err = f.ledger.unstake(&"stranger".into()).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stake(StakeError::NoActiveStake { .. })
        ));
        assert!(f.ledger.stakes.is_empty());
    }

    #[tokio::test]
    async fn test_interest_rate_exposed() {
        let f = fixture();
        assert_eq!(f.ledger.interest_rate(), 5);

        f.ledger
            .set_rate_parameters(
                &"owner".into(),
                RateParameters {
                    stake_monthly_interest_rate: 8,
                    ..RateParameters::default()
                },
            )
            .unwrap();
        assert_eq!(f.ledger.interest_rate(), 8);
    }

    #[tokio::test]
    async fn test_clock_rewind_is_a_dependency_failure() {
        let f = fixture();
        f.ledger.stake(&investor(), Amount::new(100)).await.unwrap();
        f.clock.set(Timestamp::from_secs(1_600_000_000));

        let err = f.ledger.get_stake(&investor()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dependency);
        let err = f.ledger.unstake(&investor()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dependency);

        f.clock.set(Timestamp::from_secs(1_700_000_000));
        assert_eq!(
            f.ledger.get_stake(&investor()).await.unwrap().amount,
            Amount::new(100)
        );
    }
}
