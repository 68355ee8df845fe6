//! Error types for the ledger engine
//!
//! Provides a unified error type, the domain-specific variants behind it, and
//! the coarse [`ErrorKind`] callers use to decide what to do with a failure.

use thiserror::Error;

use crate::access::AccessError;
use crate::ports::{notifier::NotifyError, token::TransferError};
use crate::types::{
    account::AccountId,
    amount::{Amount, ArithmeticError},
    time::ClockError,
};

/// Result type alias using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Unified error type for ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    // Loan preconditions
    #[error("Loan error: {0}")]
    Loan(#[from] LoanError),

    // Stake preconditions
    #[error("Stake error: {0}")]
    Stake(#[from] StakeError),

    // Role checks
    #[error("Access denied: {0}")]
    Access(#[from] AccessError),

    // Collaborator failures
    #[error("Token transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    // Logic defects
    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    /// A transfer succeeded, a later one failed, and the compensating transfer
    /// failed too. Funds need manual reconciliation.
    #[error("Unreconciled {operation} for {account}: {detail}")]
    Unreconciled {
        operation: &'static str,
        account: AccountId,
        detail: String,
    },

    #[error("Invariant violated: {0}")]
    Invariant(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Expected business condition (no active loan, grace period running, ...)
    Precondition,
    /// Caller lacks the required role
    Authorization,
    /// Token service or clock failed; ledger state is unchanged
    Dependency,
    /// Logic defect; should be unreachable
    Invariant,
    Configuration,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Loan(_) | LedgerError::Stake(_) => ErrorKind::Precondition,
            LedgerError::Access(_) => ErrorKind::Authorization,
            LedgerError::Transfer(_) | LedgerError::Clock(_) | LedgerError::Notify(_) => {
                ErrorKind::Dependency
            }
            LedgerError::Arithmetic(
                ArithmeticError::Parse(_)
                | ArithmeticError::Negative
                | ArithmeticError::TooPrecise { .. },
            ) => ErrorKind::Precondition,
            LedgerError::Arithmetic(_)
            | LedgerError::Unreconciled { .. }
            | LedgerError::Invariant(_) => ErrorKind::Invariant,
            LedgerError::Config(_) => ErrorKind::Configuration,
        }
    }

    /// Dependency failures leave state untouched and can be retried as-is
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Dependency
    }
}

/// Loan state-machine preconditions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoanError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("{borrower} already has an active loan")]
    AlreadyActive { borrower: AccountId },

    #[error("{borrower} has no active loan")]
    NoActiveLoan { borrower: AccountId },

    #[error("Loan for {borrower} is already approved")]
    AlreadyApproved { borrower: AccountId },

    #[error("Grace period not elapsed: {remaining_secs}s remaining")]
    GracePeriodNotElapsed { remaining_secs: u64 },

    #[error("Insufficient collateral: required {required}, available {available}")]
    InsufficientCollateral { required: Amount, available: Amount },

    #[error("Amount {amount} is too small to collateralize")]
    BelowMinimum { amount: Amount },
}

/// Stake state-machine preconditions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StakeError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("{investor} already has an active stake")]
    AlreadyStaked { investor: AccountId },

    #[error("{investor} has no active stake")]
    NoActiveStake { investor: AccountId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;

    #[test]
    fn test_error_display() {
        let err = LedgerError::Loan(LoanError::AlreadyActive {
            borrower: "0xabc".into(),
        });
        assert!(err.to_string().contains("0xabc"));
    }

    #[test]
    fn test_error_kinds() {
        let precondition: LedgerError = StakeError::InvalidAmount.into();
        assert_eq!(precondition.kind(), ErrorKind::Precondition);
        assert!(!precondition.is_retryable());

        let auth: LedgerError = AccessError::Unauthorized {
            role: Role::Operator,
            caller: "eve".into(),
        }
        .into();
        assert_eq!(auth.kind(), ErrorKind::Authorization);

        let transport: LedgerError = TransferError::Transport("down".into()).into();
        assert_eq!(transport.kind(), ErrorKind::Dependency);
        assert!(transport.is_retryable());

        let overflow: LedgerError = ArithmeticError::Overflow.into();
        assert_eq!(overflow.kind(), ErrorKind::Invariant);

        let bad_input: LedgerError = ArithmeticError::Parse("abc".into()).into();
        assert_eq!(bad_input.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_grace_period_message() {
        let err = LoanError::GracePeriodNotElapsed {
            remaining_secs: 86_400,
        };
        assert!(err.to_string().contains("86400s"));
    }
}
