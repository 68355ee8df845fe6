//! Loan ledger - collateralized borrowing with two-phase approval
//!
//! Every state-changing operation follows the same shape:
//! 1. Role check (approve, liquidate) and a single clock read
//! 2. Lock the borrower's record and check the state-machine precondition
//! 3. Move tokens through the [`TokenTransferPort`]
//! 4. Write the record back only after every transfer succeeded
//!
//! A failed transfer therefore leaves the record exactly as it was.

use kledger_common::{
    AccessControl, AccountId, Amount, ApprovalNotifier, AssetId, Clock, LedgerError, LoanError,
    LoanRequested, Result, Role, TokenTransferPort, TransferError,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, instrument, warn};

use super::{LoanOutcome, LoanRecord, LoanSettlement, LoanStatus, OriginationMode};
use crate::book::RecordBook;
use crate::rate::{
    CollateralPreview, PrincipalPreview, RateModel, RateParameters, SharedRates,
};

/// Assets a loan moves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanAssets {
    /// Locked by the borrower
    pub collateral: AssetId,
    /// Borrowed and repaid
    pub principal: AssetId,
}

/// Terms fixed at origination
#[derive(Debug, Clone, Copy)]
struct OriginationTerms {
    interest: Amount,
    collateral: Amount,
}

/// Owns every borrower's loan record
pub struct LoanLedger {
    assets: LoanAssets,
    mode: OriginationMode,
    access: AccessControl,
    rates: SharedRates,
    tokens: Arc<dyn TokenTransferPort>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn ApprovalNotifier>,
    loans: RecordBook<LoanRecord>,
}

impl LoanLedger {
    pub fn new(
        assets: LoanAssets,
        rates: RateModel,
        access: AccessControl,
        tokens: Arc<dyn TokenTransferPort>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn ApprovalNotifier>,
    ) -> Self {
        Self {
            assets,
            mode: OriginationMode::default(),
            access,
            rates: Arc::new(RwLock::new(rates)),
            tokens,
            clock,
            notifier,
            loans: RecordBook::new(),
        }
    }

    /// Choose which preview sets origination terms
    pub fn with_origination_mode(mut self, mode: OriginationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn assets(&self) -> &LoanAssets {
        &self.assets
    }

    pub fn origination_mode(&self) -> OriginationMode {
        self.mode
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

    pub fn rate_parameters(&self) -> RateParameters {
        *self.rates().params()
    }

    /// Replace the rate parameters (admin only)
    ///
    /// Loans already on the books keep the interest and collateral frozen at
    /// their origination.
    #[instrument(skip_all, fields(caller = %caller))]
    pub fn set_rate_parameters(&self, caller: &AccountId, params: RateParameters) -> Result<()> {
        self.access.check(Role::Admin, caller)?;
        let model = RateModel::new(params)?;
        *self.rates.write() = model;
        info!(?params, "Loan rate parameters updated");
        Ok(())
    }

    /// Preview terms for borrowing `amount` of the repayment asset
    pub fn simulate_from_principal_asset(&self, amount: Amount) -> Result<PrincipalPreview> {
        Ok(self.rates().simulate_from_principal_asset(amount)?)
    }

    /// Preview the largest loan `collateral` can secure
    pub fn simulate_from_collateral_asset(&self, collateral: Amount) -> Result<CollateralPreview> {
        Ok(self.rates().simulate_from_collateral_asset(collateral)?)
    }

    /// Compute the terms the borrower's request commits to
    async fn origination_terms(
        &self,
        rates: &RateModel,
        borrower: &AccountId,
        amount: Amount,
    ) -> Result<OriginationTerms> {
        let balance = self
            .tokens
            .balance_of(&self.assets.collateral, borrower)
            .await?;

        let terms = match self.mode {
            OriginationMode::PrincipalAsset => {
                let preview = rates.simulate_from_principal_asset(amount)?;
                OriginationTerms {
                    interest: preview.interest,
                    collateral: preview.required_collateral,
                }
            }
            OriginationMode::CollateralAsset => {
                let preview = rates.simulate_from_collateral_asset(balance)?;
                let collateral = rates.collateral_for_borrow(amount)?;
                if amount > preview.max_borrow {
                    return Err(LoanError::InsufficientCollateral {
                        required: collateral,
                        available: balance,
                    }
                    .into());
                }
                OriginationTerms {
                    interest: rates.simple_interest(amount)?,
                    collateral,
                }
            }
        };

        if terms.collateral.is_zero() {
            return Err(LoanError::BelowMinimum { amount }.into());
        }
        if terms.collateral > balance {
            return Err(LoanError::InsufficientCollateral {
                required: terms.collateral,
                available: balance,
            }
            .into());
        }

        Ok(terms)
    }

    /// Lock a borrower's record without creating one
    async fn lock_loan(&self, borrower: &AccountId) -> Result<OwnedMutexGuard<LoanRecord>> {
        self.loans.lock_existing(borrower).await.ok_or_else(|| {
            LedgerError::from(LoanError::NoActiveLoan {
                borrower: borrower.clone(),
            })
        })
    }

    /// Open a loan request and escrow its collateral
    #[instrument(skip_all, fields(borrower = %borrower, amount = %amount))]
    pub async fn request_borrow(&self, borrower: &AccountId, amount: Amount) -> Result<LoanRecord> {
        if amount.is_zero() {
            return Err(LoanError::InvalidAmount.into());
        }
        let now = self.clock.now()?;
        let rates = self.rates();

        let mut loan = self
            .loans
            .lock(borrower, || LoanRecord::empty(borrower.clone()))
            .await;
        if loan.is_active() {
            return Err(LoanError::AlreadyActive {
                borrower: borrower.clone(),
            }
            .into());
        }

        let terms = self
            .origination_terms(&rates, borrower, amount)
            .await
            .map_err(|e| {
                if matches!(e, LedgerError::Arithmetic(_)) {
                    error!(error = %e, "Origination terms overflowed");
                }
                e
            })?;

        self.tokens
            .escrow(&self.assets.collateral, borrower, terms.collateral)
            .await?;

        *loan = LoanRecord {
            borrower: borrower.clone(),
            principal: amount,
            collateral_amount: terms.collateral,
            interest_amount: terms.interest,
            start_timestamp: now,
            is_approved: false,
        };
        let snapshot = loan.clone();
        drop(loan);

        info!(
            collateral = %snapshot.collateral_amount,
            interest = %snapshot.interest_amount,
            "Loan requested"
        );
        self.notify_requested(&snapshot).await;

        Ok(snapshot)
    }

    async fn notify_requested(&self, loan: &LoanRecord) {
        let event = LoanRequested::new(
            loan.borrower.clone(),
            loan.principal,
            loan.collateral_amount,
            loan.interest_amount,
            loan.start_timestamp,
        );
        let event_id = event.event_id;

        match self.notifier.loan_requested(event).await {
            Ok(()) => debug!(%event_id, "Approval workflow notified"),
            Err(e) => warn!(%event_id, error = %e, "Approval notification not delivered"),
        }
    }

    /// Approve a requested loan and disburse its principal (approver only)
    #[instrument(skip_all, fields(caller = %caller, borrower = %borrower))]
    pub async fn approve_borrow(&self, caller: &AccountId, borrower: &AccountId) -> Result<LoanRecord> {
        self.access.check(Role::Approver, caller)?;

        let mut loan = self.lock_loan(borrower).await?;
        match loan.status() {
            LoanStatus::NoLoan => {
                return Err(LoanError::NoActiveLoan {
                    borrower: borrower.clone(),
                }
                .into())
            }
            LoanStatus::Approved => {
                return Err(LoanError::AlreadyApproved {
                    borrower: borrower.clone(),
                }
                .into())
            }
            LoanStatus::Requested => {}
        }

        self.tokens
            .release(&self.assets.principal, borrower, loan.principal)
            .await?;
        loan.is_approved = true;

        info!(principal = %loan.principal, "Loan approved and disbursed");
        Ok(loan.clone())
    }

    /// Withdraw an unapproved request and return its collateral
    #[instrument(skip_all, fields(borrower = %borrower))]
    pub async fn cancel_borrow(&self, borrower: &AccountId) -> Result<LoanSettlement> {
        let now = self.clock.now()?;

        let mut loan = self.lock_loan(borrower).await?;
        match loan.status() {
            LoanStatus::NoLoan => {
                return Err(LoanError::NoActiveLoan {
                    borrower: borrower.clone(),
                }
                .into())
            }
            LoanStatus::Approved => {
                return Err(LoanError::AlreadyApproved {
                    borrower: borrower.clone(),
                }
                .into())
            }
            LoanStatus::Requested => {}
        }

        self.tokens
            .release(&self.assets.collateral, borrower, loan.collateral_amount)
            .await?;

        let settlement = LoanSettlement {
            borrower: borrower.clone(),
            outcome: LoanOutcome::Cancelled,
            amount_collected: Amount::ZERO,
            collateral_released: loan.collateral_amount,
            collateral_seized: Amount::ZERO,
            settled_at: now,
        };
        loan.reset();

        info!(collateral = %settlement.collateral_released, "Loan request cancelled");
        Ok(settlement)
    }

    /// Collect principal plus interest and return the collateral
    #[instrument(skip_all, fields(borrower = %borrower))]
    pub async fn repay(&self, borrower: &AccountId) -> Result<LoanSettlement> {
        let now = self.clock.now()?;

        let mut loan = self.lock_loan(borrower).await?;
        if !loan.is_active() {
            return Err(LoanError::NoActiveLoan {
                borrower: borrower.clone(),
            }
            .into());
        }

        let due = loan.total_due()?;
        self.tokens
            .escrow(&self.assets.principal, borrower, due)
            .await?;

        if let Err(cause) = self
            .tokens
            .release(&self.assets.collateral, borrower, loan.collateral_amount)
            .await
        {
            self.refund_repayment(borrower, due, &cause).await?;
            return Err(cause.into());
        }

        let settlement = LoanSettlement {
            borrower: borrower.clone(),
            outcome: LoanOutcome::Repaid,
            amount_collected: due,
            collateral_released: loan.collateral_amount,
            collateral_seized: Amount::ZERO,
            settled_at: now,
        };
        loan.reset();

        info!(
            collected = %settlement.amount_collected,
            collateral = %settlement.collateral_released,
            "Loan repaid"
        );
        Ok(settlement)
    }

    /// Undo the repayment escrow after the collateral could not be returned
    async fn refund_repayment(
        &self,
        borrower: &AccountId,
        due: Amount,
        cause: &TransferError,
    ) -> Result<()> {
        warn!(borrower = %borrower, error = %cause, "Collateral release failed, refunding repayment");

        self.tokens
            .release(&self.assets.principal, borrower, due)
            .await
            .map_err(|refund| {
                error!(
                    borrower = %borrower,
                    due = %due,
                    cause = %cause,
                    error = %refund,
                    "Repayment refund failed"
                );
                LedgerError::Unreconciled {
                    operation: "repay",
                    account: borrower.clone(),
                    detail: format!(
                        "collected {due} {} but collateral release failed ({cause}) and refund failed ({refund})",
                        self.assets.principal
                    ),
                }
            })
    }

    /// Seize the collateral of a loan past its grace period (operator only)
    #[instrument(skip_all, fields(caller = %caller, borrower = %borrower))]
    pub async fn liquidate(&self, caller: &AccountId, borrower: &AccountId) -> Result<LoanSettlement> {
        self.access.check(Role::Operator, caller)?;
        let now = self.clock.now()?;
        let rates = self.rates();

        let mut loan = self.lock_loan(borrower).await?;
        if !loan.is_active() {
            return Err(LoanError::NoActiveLoan {
                borrower: borrower.clone(),
            }
            .into());
        }

        let remaining_secs = rates.grace_period_remaining(loan.start_timestamp, now)?;
        if remaining_secs > 0 {
            return Err(LoanError::GracePeriodNotElapsed { remaining_secs }.into());
        }

        let settlement = LoanSettlement {
            borrower: borrower.clone(),
            outcome: LoanOutcome::Liquidated,
            amount_collected: Amount::ZERO,
            collateral_released: Amount::ZERO,
            collateral_seized: loan.collateral_amount,
            settled_at: now,
        };
        let was_approved = loan.is_approved;
        loan.reset();

        info!(
            seized = %settlement.collateral_seized,
            was_approved,
            "Loan liquidated"
        );
        Ok(settlement)
    }

    /// Current loan of `borrower`, zero-valued when there is none
    pub async fn get_loan(&self, borrower: &AccountId) -> LoanRecord {
        self.loans
            .snapshot(borrower)
            .await
            .unwrap_or_else(|| LoanRecord::empty(borrower.clone()))
    }
}
