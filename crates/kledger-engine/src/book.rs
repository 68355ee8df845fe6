//! Keyed record storage with per-key serialization
//!
//! Each account's record sits behind its own async mutex. State-changing
//! operations hold that lock from their precondition check until the record is
//! written back, so two operations on the same account can never both observe
//! the pre-state. Different accounts never contend.
//!
//! Only opening operations create records. Records are kept after a reset:
//! removing a cell while another task waits on it would split the key in two.

use dashmap::DashMap;
use kledger_common::AccountId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One record per account
#[derive(Debug)]
pub struct RecordBook<R> {
    records: DashMap<AccountId, Arc<Mutex<R>>>,
}

impl<R> Default for RecordBook<R> {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl<R> RecordBook<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the record for `key`, creating it with `init` on first use
    pub async fn lock(&self, key: &AccountId, init: impl FnOnce() -> R) -> OwnedMutexGuard<R> {
        // The map shard guard must be released before awaiting the record lock.
        let cell = Arc::clone(
            self.records
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(init())))
                .value(),
        );
        cell.lock_owned().await
    }

    /// Lock the record for `key` only if one was ever created
    ///
    /// Unknown keys are not inserted.
    pub async fn lock_existing(&self, key: &AccountId) -> Option<OwnedMutexGuard<R>> {
        let cell = self.records.get(key).map(|cell| Arc::clone(cell.value()))?;
        Some(cell.lock_owned().await)
    }

    /// Copy of the record for `key`, waiting for any in-flight write
    pub async fn snapshot(&self, key: &AccountId) -> Option<R>
    where
        R: Clone,
    {
        let cell = self.records.get(key).map(|cell| Arc::clone(cell.value()))?;
        let record = cell.lock().await;
        Some(record.clone())
    }

    /// Number of accounts that ever held a record
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lock_creates_record() {
        let book: RecordBook<u32> = RecordBook::new();
        let key = AccountId::from("alice");

        assert!(book.snapshot(&key).await.is_none());
        {
            let mut record = book.lock(&key, || 7).await;
            *record += 1;
        }
        assert_eq!(book.snapshot(&key).await, Some(8));
        assert_eq!(book.len(), 1);
    }

    #[tokio::test]
    async fn test_lock_existing_skips_unknown_keys() {
        let book: RecordBook<u32> = RecordBook::new();
        let key = AccountId::from("alice");

        assert!(book.lock_existing(&key).await.is_none());
        assert!(book.is_empty());

        drop(book.lock(&key, || 3).await);
        let record = book.lock_existing(&key).await.unwrap();
        assert_eq!(*record, 3);
        assert_eq!(book.len(), 1);
    }

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let book: Arc<RecordBook<Vec<u32>>> = Arc::new(RecordBook::new());
        let key = AccountId::from("alice");

        let mut first = book.lock(&key, Vec::new).await;

        let contender = {
            let book = Arc::clone(&book);
            let key = key.clone();
            tokio::spawn(async move {
                let mut record = book.lock(&key, Vec::new).await;
                record.push(2);
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        first.push(1);
        drop(first);

        contender.await.unwrap();
        assert_eq!(book.snapshot(&key).await, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_different_keys_do_not_contend() {
        let book: RecordBook<u32> = RecordBook::new();
        let _alice = book.lock(&"alice".into(), || 1).await;
        let bob = book.lock(&"bob".into(), || 2).await;
        assert_eq!(*bob, 2);
    }
}
