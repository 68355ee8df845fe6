//! Rate model - interest, collateral and accrual math
//!
//! Pure functions over a [`RateParameters`] snapshot. Nothing here touches a
//! record or a collaborator, so the same code serves borrower-facing previews
//! and the terms committed at origination.
//!
//! All percentages are whole percents (`collateral_ratio = 5` means 5%). Every
//! formula multiplies before it divides and floors once at the end.

use kledger_common::{
    Amount, ArithmeticError, ClockError, LedgerError, Timestamp, PERCENT, SECONDS_PER_DAY,
    SECONDS_PER_MONTH,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default borrow interest (percent of principal, charged once)
pub const DEFAULT_BORROW_INTEREST_RATE: u32 = 15;

/// Default collateral ratio (percent)
pub const DEFAULT_COLLATERAL_RATIO: u32 = 5;

/// Default stake interest (percent per 30-day period)
pub const DEFAULT_STAKE_MONTHLY_INTEREST_RATE: u32 = 5;

/// Default grace period before an unpaid loan can be liquidated
pub const DEFAULT_GRACE_PERIOD_DAYS: u32 = 90;

/// Price of the collateral asset in repayment-asset units
///
/// `principal_units` of the repayment asset are worth `collateral_units` of
/// the collateral asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPrice {
    pub principal_units: u128,
    pub collateral_units: u128,
}

impl CollateralPrice {
    /// Both assets trade one to one
    pub const PAR: CollateralPrice = CollateralPrice {
        principal_units: 1,
        collateral_units: 1,
    };
}

impl Default for CollateralPrice {
    fn default() -> Self {
        Self::PAR
    }
}

/// Global rate configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateParameters {
    pub borrow_interest_rate: u32,
    pub collateral_ratio: u32,
    pub stake_monthly_interest_rate: u32,
    pub grace_period_days: u32,
    #[serde(default)]
    pub collateral_price: CollateralPrice,
}

impl Default for RateParameters {
    fn default() -> Self {
        Self {
            borrow_interest_rate: DEFAULT_BORROW_INTEREST_RATE,
            collateral_ratio: DEFAULT_COLLATERAL_RATIO,
            stake_monthly_interest_rate: DEFAULT_STAKE_MONTHLY_INTEREST_RATE,
            grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
            collateral_price: CollateralPrice::PAR,
        }
    }
}

impl RateParameters {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.collateral_ratio == 0 {
            return Err(LedgerError::Config(
                "collateral_ratio must be positive".to_string(),
            ));
        }
        if self.collateral_price.principal_units == 0 || self.collateral_price.collateral_units == 0
        {
            return Err(LedgerError::Config(
                "collateral_price components must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn grace_period_secs(&self) -> u64 {
        u64::from(self.grace_period_days) * SECONDS_PER_DAY
    }
}

/// Terms previewed from a requested repayment-asset amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalPreview {
    pub interest: Amount,
    pub required_collateral: Amount,
}

/// Terms previewed from a collateral-asset holding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPreview {
    pub max_borrow: Amount,
    pub interest: Amount,
}

/// Rate model shared by every ledger of one deployment
pub type SharedRates = Arc<RwLock<RateModel>>;

/// Interest and collateral calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateModel {
    params: RateParameters,
}

impl RateModel {
    pub fn new(params: RateParameters) -> Result<Self, LedgerError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &RateParameters {
        &self.params
    }

    fn interest_rate(&self) -> u128 {
        u128::from(self.params.borrow_interest_rate)
    }

    fn collateral_ratio(&self) -> u128 {
        u128::from(self.params.collateral_ratio)
    }

    /// `collateral_ratio * (borrow_interest_rate + 100)`
    fn collateral_denominator(&self) -> u128 {
        self.collateral_ratio() * (self.interest_rate() + PERCENT)
    }

    /// Collateral-asset amount locked for borrowing `amount`
    ///
    /// `amount * collateral_ratio / 100` repayment units, converted at the
    /// collateral price.
    pub fn required_collateral(&self, amount: Amount) -> Result<Amount, ArithmeticError> {
        let value = amount.mul_div(self.collateral_ratio(), PERCENT)?;
        self.convert_principal_to_collateral(value)
    }

    /// `amount * borrow_interest_rate / 100`
    pub fn simple_interest(&self, amount: Amount) -> Result<Amount, ArithmeticError> {
        amount.mul_div(self.interest_rate(), PERCENT)
    }

    /// Interest quoted by the repayment-asset preview
    ///
    /// `amount * borrow_interest_rate * (100 + collateral_ratio) / 1000`. With the
    /// default parameters this is 157.5% of the amount, far above
    /// [`simple_interest`](Self::simple_interest). Both forms are kept as is.
    pub fn principal_preview_interest(&self, amount: Amount) -> Result<Amount, ArithmeticError> {
        let factor = self.interest_rate() * (PERCENT + self.collateral_ratio());
        amount.mul_div(factor, 10 * PERCENT)
    }

    /// Preview terms for borrowing `amount` of the repayment asset
    pub fn simulate_from_principal_asset(
        &self,
        amount: Amount,
    ) -> Result<PrincipalPreview, ArithmeticError> {
        Ok(PrincipalPreview {
            interest: self.principal_preview_interest(amount)?,
            required_collateral: self.required_collateral(amount)?,
        })
    }

    pub fn convert_collateral_to_principal(
        &self,
        collateral: Amount,
    ) -> Result<Amount, ArithmeticError> {
        let price = self.params.collateral_price;
        collateral.mul_div(price.principal_units, price.collateral_units)
    }

    pub fn convert_principal_to_collateral(
        &self,
        principal: Amount,
    ) -> Result<Amount, ArithmeticError> {
        let price = self.params.collateral_price;
        principal.mul_div(price.collateral_units, price.principal_units)
    }

    /// Preview the largest loan `collateral` can secure
    pub fn simulate_from_collateral_asset(
        &self,
        collateral: Amount,
    ) -> Result<CollateralPreview, ArithmeticError> {
        let value = self.convert_collateral_to_principal(collateral)?;
        let max_borrow = value.mul_div(PERCENT * PERCENT, self.collateral_denominator())?;
        Ok(CollateralPreview {
            max_borrow,
            interest: self.simple_interest(max_borrow)?,
        })
    }

    /// Collateral escrowed for `amount` under the collateral-asset terms
    ///
    /// Never exceeds the holding that previewed `amount` as its `max_borrow`.
    pub fn collateral_for_borrow(&self, amount: Amount) -> Result<Amount, ArithmeticError> {
        let value = amount.mul_div(self.collateral_denominator(), PERCENT * PERCENT)?;
        self.convert_principal_to_collateral(value)
    }

    /// Stake interest prorated over `elapsed_secs`
    pub fn monthly_stake_interest(
        &self,
        principal: Amount,
        elapsed_secs: u64,
    ) -> Result<Amount, ArithmeticError> {
        if elapsed_secs == 0 {
            return Ok(Amount::ZERO);
        }
        let numerator = u128::from(self.params.stake_monthly_interest_rate)
            .checked_mul(u128::from(elapsed_secs))
            .ok_or(ArithmeticError::Overflow)?;
        principal.mul_div(numerator, PERCENT * u128::from(SECONDS_PER_MONTH))
    }

    /// Seconds left before a loan started at `start` becomes liquidatable
    pub fn grace_period_remaining(&self, start: Timestamp, now: Timestamp) -> Result<u64, ClockError> {
        let elapsed = now.seconds_since(start)?;
        Ok(self.params.grace_period_secs().saturating_sub(elapsed))
    }
}
