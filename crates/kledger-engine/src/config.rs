//! Ledger configuration
//!
//! Defaults reproduce the production deployment. `load()` reads an optional
//! `.env` file and then `KLEDGER_*` environment variables on top of them.

use kledger_common::{AccessControl, AccountId, AssetId, LedgerError, Result, DEFAULT_DECIMALS};
use serde::{Deserialize, Serialize};

use crate::loan::OriginationMode;
use crate::rate::{CollateralPrice, RateParameters};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "KLEDGER_";

/// Largest scale `rust_decimal` can represent
const MAX_DECIMALS: u32 = 28;

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub assets: AssetSettings,
    pub rates: RateParameters,
    pub roles: AccessControl,
    pub origination: OriginationMode,
    /// Decimal places used for display amounts
    pub decimals: u32,
}

/// Token identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSettings {
    /// Locked by borrowers
    pub collateral: AssetId,
    /// Lent out and repaid
    pub principal: AssetId,
    /// Deposited by investors
    pub stake: AssetId,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            collateral: AssetId::from("FLYM"),
            principal: AssetId::from("USDT"),
            stake: AssetId::from("USDT"),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            assets: AssetSettings::default(),
            rates: RateParameters::default(),
            roles: AccessControl::new(
                AccountId::from("controller"),
                AccountId::from("owner"),
                AccountId::from("owner"),
            ),
            origination: OriginationMode::default(),
            decimals: DEFAULT_DECIMALS,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from `.env` and the process environment
    pub fn load() -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key/value source, starting at the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        // Assets
        if let Some(v) = var("COLLATERAL_ASSET") {
            cfg.assets.collateral = AssetId::new(v);
        }
        if let Some(v) = var("PRINCIPAL_ASSET") {
            cfg.assets.principal = AssetId::new(v);
        }
        if let Some(v) = var("STAKE_ASSET") {
            cfg.assets.stake = AssetId::new(v);
        }
        if let Some(v) = var("DECIMALS") {
            cfg.decimals = parse("DECIMALS", &v)?;
        }

        // Rates
        if let Some(v) = var("BORROW_INTEREST_RATE") {
            cfg.rates.borrow_interest_rate = parse("BORROW_INTEREST_RATE", &v)?;
        }
        if let Some(v) = var("COLLATERAL_RATIO") {
            cfg.rates.collateral_ratio = parse("COLLATERAL_RATIO", &v)?;
        }
        if let Some(v) = var("STAKE_MONTHLY_INTEREST_RATE") {
            cfg.rates.stake_monthly_interest_rate = parse("STAKE_MONTHLY_INTEREST_RATE", &v)?;
        }
        if let Some(v) = var("GRACE_PERIOD_DAYS") {
            cfg.rates.grace_period_days = parse("GRACE_PERIOD_DAYS", &v)?;
        }
        if let Some(v) = var("COLLATERAL_PRICE") {
            cfg.rates.collateral_price = parse_price(&v)?;
        }

        // Roles
        if let Some(v) = var("APPROVER") {
            cfg.roles.approver = AccountId::new(v);
        }
        if let Some(v) = var("OPERATOR") {
            cfg.roles.operator = AccountId::new(v);
        }
        if let Some(v) = var("ADMIN") {
            cfg.roles.admin = AccountId::new(v);
        }

        if let Some(v) = var("ORIGINATION_MODE") {
            cfg.origination = match v.trim() {
                "principal_asset" => OriginationMode::PrincipalAsset,
                "collateral_asset" => OriginationMode::CollateralAsset,
                other => {
                    return Err(LedgerError::Config(format!(
                        "{ENV_PREFIX}ORIGINATION_MODE: unknown mode {other:?}"
                    )))
                }
            };
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.rates.validate()?;

        if self.decimals > MAX_DECIMALS {
            return Err(LedgerError::Config(format!(
                "decimals must be at most {MAX_DECIMALS}, got {}",
                self.decimals
            )));
        }
        for (role, account) in [
            ("approver", &self.roles.approver),
            ("operator", &self.roles.operator),
            ("admin", &self.roles.admin),
        ] {
            if account.is_empty() {
                return Err(LedgerError::Config(format!("{role} account is empty")));
            }
        }
        Ok(())
    }
}

fn parse<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| LedgerError::Config(format!("{ENV_PREFIX}{name}: {e}")))
}

/// `"3/2"` means 3 repayment units per 2 collateral units; `"2"` means 2/1
fn parse_price(value: &str) -> Result<CollateralPrice> {
    let (principal, collateral) = value.split_once('/').unwrap_or((value, "1"));
    Ok(CollateralPrice {
        principal_units: parse("COLLATERAL_PRICE", principal)?,
        collateral_units: parse("COLLATERAL_PRICE", collateral)?,
    })
}
