//! Outbound approval notifications
//!
//! Every loan request produces one [`LoanRequested`] event for the external
//! approval workflow, which later calls back into approve or cancel. Delivery
//! is fire-and-forget: the ledger logs failures and moves on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::types::{account::AccountId, amount::Amount, time::Timestamp};

/// Notification delivery failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification channel closed")]
    Closed,

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// A loan is waiting for review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequested {
    /// Unique event ID
    pub event_id: Uuid,
    pub borrower: AccountId,
    /// Requested amount of the repayment asset
    pub principal: Amount,
    /// Collateral escrowed for the request
    pub collateral: Amount,
    /// Interest frozen at origination
    pub interest: Amount,
    pub requested_at: Timestamp,
}

impl LoanRequested {
    pub fn new(
        borrower: AccountId,
        principal: Amount,
        collateral: Amount,
        interest: Amount,
        requested_at: Timestamp,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            borrower,
            principal,
            collateral,
            interest,
            requested_at,
        }
    }
}

/// Receiver side of the approval workflow
#[async_trait]
pub trait ApprovalNotifier: Send + Sync {
    async fn loan_requested(&self, event: LoanRequested) -> Result<(), NotifyError>;
}

/// Forwards events into an in-process channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<LoanRequested>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LoanRequested>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ApprovalNotifier for ChannelNotifier {
    async fn loan_requested(&self, event: LoanRequested) -> Result<(), NotifyError> {
        self.tx.send(event).map_err(|_| NotifyError::Closed)
    }
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl ApprovalNotifier for NoopNotifier {
    async fn loan_requested(&self, _event: LoanRequested) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> LoanRequested {
        LoanRequested::new(
            "borrower".into(),
            Amount::new(100),
            Amount::new(5),
            Amount::new(157),
            Timestamp::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_channel_delivers_event() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let sent = event();
        notifier.loan_requested(sent.clone()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn test_closed_channel_reports_error() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        assert_eq!(
            notifier.loan_requested(event()).await,
            Err(NotifyError::Closed)
        );
    }

    #[test]
    fn test_event_ids_are_unique() {
        assert_ne!(event().event_id, event().event_id);
    }
}
