//! Ledger service facade
//!
//! Wires both ledgers to one token service, clock and configuration, and
//! presents their state in display units (`"1.5"` rather than
//! `1500000000000000000`) for an outer API layer.

use kledger_common::{
    AccountId, Amount, ApprovalNotifier, Clock, Result, Timestamp, TokenTransferPort,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::LedgerConfig;
use crate::loan::{LoanAssets, LoanLedger, LoanRecord, LoanStatus};
use crate::rate::{RateModel, RateParameters};
use crate::stake::{StakeLedger, StakePosition};

/// Borrow preview for a collateral holding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowPreviewView {
    pub interest: String,
    pub max_borrow: String,
}

/// A borrower's loan in display units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanView {
    pub borrower: AccountId,
    pub principal: String,
    pub collateral_amount: String,
    pub interest_amount: String,
    /// RFC 3339; absent without an active loan
    pub start_timestamp: Option<String>,
    pub is_approved: bool,
    pub status: LoanStatus,
}

/// An investor's stake in display units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeView {
    pub investor: AccountId,
    pub principal: String,
    pub accumulated_interest: String,
    pub start_timestamp: Option<String>,
}

/// Wallet balances of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceView {
    pub account: AccountId,
    pub collateral_balance: String,
    pub principal_balance: String,
}

/// Current stake terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePreviewView {
    /// Percent per 30 days
    pub interest_rate: u32,
}

/// Loan and stake ledgers behind one configuration
pub struct LedgerService {
    config: LedgerConfig,
    tokens: Arc<dyn TokenTransferPort>,
    loans: Arc<LoanLedger>,
    stakes: Arc<StakeLedger>,
}

impl LedgerService {
    pub fn new(
        config: LedgerConfig,
        tokens: Arc<dyn TokenTransferPort>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn ApprovalNotifier>,
    ) -> Result<Self> {
        config.validate()?;
        let rates = RateModel::new(config.rates)?;

        let loans = LoanLedger::new(
            LoanAssets {
                collateral: config.assets.collateral.clone(),
                principal: config.assets.principal.clone(),
            },
            rates,
            config.roles.clone(),
            tokens.clone(),
            clock.clone(),
            notifier,
        )
        .with_origination_mode(config.origination);

        let stakes = StakeLedger::new(
            config.assets.stake.clone(),
            rates,
            config.roles.clone(),
            tokens.clone(),
            clock,
        )
        .with_shared_rates(loans.shared_rates());

        info!(
            collateral = %config.assets.collateral,
            principal = %config.assets.principal,
            stake = %config.assets.stake,
            origination = ?config.origination,
            "Ledger service ready"
        );

        Ok(Self {
            config,
            tokens,
            loans: Arc::new(loans),
            stakes: Arc::new(stakes),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn loan_ledger(&self) -> &Arc<LoanLedger> {
        &self.loans
    }

    pub fn stake_ledger(&self) -> &Arc<StakeLedger> {
        &self.stakes
    }

    /// Rate parameters shared by both ledgers
    pub fn rate_parameters(&self) -> RateParameters {
        self.loans.rate_parameters()
    }

    /// Replace the rate parameters of both ledgers (admin only)
    pub fn set_rate_parameters(&self, caller: &AccountId, params: RateParameters) -> Result<()> {
        self.loans.set_rate_parameters(caller, params)
    }

    fn display(&self, amount: Amount) -> Result<String> {
        Ok(amount.to_units(self.config.decimals)?.to_string())
    }

    fn parse(&self, value: &str) -> Result<Amount> {
        Ok(Amount::parse_units(value, self.config.decimals)?)
    }

    fn since(active: bool, at: Timestamp) -> Option<String> {
        active.then(|| at.to_string())
    }

    /// Largest loan and its interest for a display-unit collateral holding
    pub fn borrow_preview(&self, collateral: &str) -> Result<BorrowPreviewView> {
        let preview = self
            .loans
            .simulate_from_collateral_asset(self.parse(collateral)?)?;
        Ok(BorrowPreviewView {
            interest: self.display(preview.interest)?,
            max_borrow: self.display(preview.max_borrow)?,
        })
    }

    /// Request a loan of a display-unit amount
    #[instrument(skip_all, fields(borrower = %borrower, amount = %amount))]
    pub async fn borrow(&self, borrower: &AccountId, amount: &str) -> Result<LoanView> {
        let amount = self.parse(amount)?;
        let record = self.loans.request_borrow(borrower, amount).await?;
        self.loan_to_view(&record)
    }

    /// Stake a display-unit amount
    #[instrument(skip_all, fields(investor = %investor, amount = %amount))]
    pub async fn stake(&self, investor: &AccountId, amount: &str) -> Result<StakeView> {
        let amount = self.parse(amount)?;
        let position = self.stakes.stake(investor, amount).await?;
        self.stake_to_view(&position)
    }

    pub async fn loan_view(&self, borrower: &AccountId) -> Result<LoanView> {
        let record = self.loans.get_loan(borrower).await;
        self.loan_to_view(&record)
    }

    pub async fn stake_view(&self, investor: &AccountId) -> Result<StakeView> {
        let position = self.stakes.get_stake(investor).await?;
        self.stake_to_view(&position)
    }

    /// Collateral-asset and repayment-asset wallet balances
    pub async fn balances(&self, account: &AccountId) -> Result<BalanceView> {
        let collateral = self
            .tokens
            .balance_of(&self.config.assets.collateral, account)
            .await?;
        let principal = self
            .tokens
            .balance_of(&self.config.assets.principal, account)
            .await?;

        Ok(BalanceView {
            account: account.clone(),
            collateral_balance: self.display(collateral)?,
            principal_balance: self.display(principal)?,
        })
    }

    pub fn stake_preview(&self) -> StakePreviewView {
        StakePreviewView {
            interest_rate: self.stakes.interest_rate(),
        }
    }

    fn loan_to_view(&self, record: &LoanRecord) -> Result<LoanView> {
        Ok(LoanView {
            borrower: record.borrower.clone(),
            principal: self.display(record.principal)?,
            collateral_amount: self.display(record.collateral_amount)?,
            interest_amount: self.display(record.interest_amount)?,
            start_timestamp: Self::since(record.is_active(), record.start_timestamp),
            is_approved: record.is_approved,
            status: record.status(),
        })
    }

    fn stake_to_view(&self, position: &StakePosition) -> Result<StakeView> {
        Ok(StakeView {
            investor: position.investor.clone(),
            principal: self.display(position.amount)?,
            accumulated_interest: self.display(position.accumulated_interest)?,
            start_timestamp: Self::since(!position.amount.is_zero(), position.start_timestamp),
        })
    }
}
