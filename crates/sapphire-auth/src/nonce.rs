//! Replay-protection nonce store.
//!
//! [`NonceStore`] partitions seen nonces by account identifier. Each account
//! bucket lives in one `DashMap` shard, so the check-and-record of a nonce is
//! performed under that shard's write lock and two concurrent requests
//! carrying the same nonce for the same account cannot both pass.
//!
//! Every entry carries an expiry time. Entries past their expiry are dropped
//! lazily whenever their bucket is touched, or eagerly via
//! [`NonceStore::purge_expired`].

use std::collections::HashMap;

use dashmap::DashMap;

/// Thread-safe, per-account set of seen nonces.
///
/// # Examples
///
/// ```
/// use sapphire_auth::NonceStore;
///
/// let store = NonceStore::new();
/// assert!(!store.seen_before("acct", "n-1", i64::MAX, 0));
/// assert!(store.seen_before("acct", "n-1", i64::MAX, 0));
/// assert!(!store.seen_before("other", "n-1", i64::MAX, 0));
/// ```
#[derive(Debug, Default)]
pub struct NonceStore {
    buckets: DashMap<String, HashMap<String, i64>>,
}

impl NonceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Atomically check whether `nonce` is live for `account_id`, recording it
    /// if not.
    ///
    /// Returns `true` when the nonce was already recorded and has not expired
    /// by `now_millis`. Otherwise the nonce is recorded with
    /// `expires_at_millis` and `false` is returned.
    pub fn seen_before(
        &self,
        account_id: &str,
        nonce: &str,
        expires_at_millis: i64,
        now_millis: i64,
    ) -> bool {
        let mut bucket = self.buckets.entry(account_id.to_owned()).or_default();
        bucket.retain(|_, expires_at| *expires_at > now_millis);

        if bucket.contains_key(nonce) {
            return true;
        }
        bucket.insert(nonce.to_owned(), expires_at_millis);
        false
    }

    /// Drop every entry that has expired by `now_millis`, along with buckets
    /// left empty. Returns the number of nonces removed.
    pub fn purge_expired(&self, now_millis: i64) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|_, expires_at| *expires_at > now_millis);
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        removed
    }

    /// Forget every recorded nonce.
    ///
    /// Meant for tests and operator tooling; exposing it to request handlers
    /// disables replay protection.
    pub fn reset(&self) {
        self.buckets.clear();
    }

    /// Total number of recorded nonces across all accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len()).sum()
    }

    /// Whether no nonce is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of accounts with a bucket.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_should_record_nonce_on_first_sight() {
        let store = NonceStore::new();

        assert!(store.is_empty());
        assert!(!store.seen_before("a", "n", i64::MAX, 0));
        assert_eq!(store.len(), 1);
        assert!(store.seen_before("a", "n", i64::MAX, 0));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_should_scope_nonces_per_account() {
        let store = NonceStore::new();

        assert!(!store.seen_before("a", "n", i64::MAX, 0));
        assert!(!store.seen_before("b", "n", i64::MAX, 0));
        assert_eq!(store.account_count(), 2);
    }

    #[test]
    fn test_should_forget_nonce_after_expiry() {
        let store = NonceStore::new();

        assert!(!store.seen_before("a", "n", 1_000, 0));
        assert!(store.seen_before("a", "n", 1_000, 999));
        assert!(!store.seen_before("a", "n", 2_000, 1_000));
    }

    #[test]
    fn test_should_purge_expired_entries_and_empty_buckets() {
        let store = NonceStore::new();
        let _ = store.seen_before("a", "old", 100, 0);
        let _ = store.seen_before("b", "old", 100, 0);
        let _ = store.seen_before("b", "new", 500, 0);

        assert_eq!(store.purge_expired(100), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.account_count(), 1);
    }

    #[test]
    fn test_should_reset_all_state() {
        let store = NonceStore::new();
        let _ = store.seen_before("a", "n", i64::MAX, 0);
        let _ = store.seen_before("b", "n", i64::MAX, 0);

        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.account_count(), 0);
        assert!(!store.seen_before("a", "n", i64::MAX, 0));
    }

    #[test]
    fn test_should_admit_concurrent_nonce_exactly_once() {
        let store = Arc::new(NonceStore::new());

        let fresh: usize = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || usize::from(!store.seen_before("a", "shared", i64::MAX, 0)))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .sum();

        assert_eq!(fresh, 1);
    }
}
