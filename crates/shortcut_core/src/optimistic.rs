//! crates/shortcut_core/src/optimistic.rs
//!
//! The optimistic-update abstraction shared by every screen that shows like/save
//! flags.
//!
//! A toggle flips the local flag immediately, then the remote call decides whether
//! it stays or is reverted. Toggles of the same flag are sequence-numbered and only
//! the settlement of the most recently issued toggle may touch local state, so the
//! outcome never depends on the order in which responses arrive. A failed toggle
//! falls back to the last value the backend accepted, not to the optimistic value
//! of an earlier toggle that may itself fail. Each table is
//! owned by one screen through a `CancellationToken`; once the screen is gone, late
//! settlements are dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::{Article, InteractionKind, InteractionRecord};

type FlagKey = (String, InteractionKind);

#[derive(Debug, Default)]
struct FlagTable {
    values: HashMap<FlagKey, bool>,
    /// Highest sequence number handed out per flag.
    issued: HashMap<FlagKey, u64>,
    /// Highest sequence number settled per flag.
    settled: HashMap<FlagKey, u64>,
    /// Last value the backend accepted, with the sequence number that wrote it.
    confirmed: HashMap<FlagKey, (u64, bool)>,
    /// Sequence number of the latest toggle, once it has failed.
    reverted: HashMap<FlagKey, u64>,
}

impl FlagTable {
    fn has_pending(&self, key: &FlagKey) -> bool {
        self.issued.get(key).copied().unwrap_or(0) > self.settled.get(key).copied().unwrap_or(0)
    }

    fn confirmed_value(&self, key: &FlagKey) -> bool {
        self.confirmed.get(key).map(|&(_, value)| value).unwrap_or(false)
    }
}

/// A toggle that has been applied locally and awaits the remote verdict.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingToggle {
    pub article_id: String,
    pub kind: InteractionKind,
    pub previous: bool,
    pub new_value: bool,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The remote call succeeded; the optimistic value stands.
    Confirmed,
    /// The remote call failed; the flag was put back to this value.
    Reverted(bool),
    /// A newer toggle of the same flag was issued; this result was ignored.
    Superseded,
    /// The owning screen is gone; nothing was touched.
    Detached,
}

#[derive(Debug)]
pub struct OptimisticFlags {
    table: Mutex<FlagTable>,
    token: CancellationToken,
}

impl OptimisticFlags {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            table: Mutex::new(FlagTable::default()),
            token,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_detached(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Loads flags for `articles` from a freshly fetched record. Flags with a toggle
    /// still in flight keep their optimistic value.
    pub fn seed(&self, record: &InteractionRecord, articles: &[Article]) {
        let mut table = self.table();
        for article in articles {
            for kind in [InteractionKind::Like, InteractionKind::Save] {
                let key = (article.id.clone(), kind);
                if table.has_pending(&key) {
                    continue;
                }
                let value = record.flag(&article.id, kind);
                let seq = table.issued.get(&key).copied().unwrap_or(0);
                table.confirmed.insert(key.clone(), (seq, value));
                table.values.insert(key, value);
            }
        }
    }

    pub fn get(&self, article_id: &str, kind: InteractionKind) -> bool {
        self.table()
            .values
            .get(&(article_id.to_string(), kind))
            .copied()
            .unwrap_or(false)
    }

    /// Flips the flag locally and hands back the pending toggle to settle.
    pub fn begin(&self, article_id: &str, kind: InteractionKind) -> PendingToggle {
        let mut table = self.table();
        let key = (article_id.to_string(), kind);

        let previous = table.values.get(&key).copied().unwrap_or(false);
        let new_value = !previous;
        table.values.insert(key.clone(), new_value);
        table.confirmed.entry(key.clone()).or_insert((0, previous));

        let seq = table.issued.get(&key).copied().unwrap_or(0) + 1;
        table.issued.insert(key, seq);

        PendingToggle {
            article_id: article_id.to_string(),
            kind,
            previous,
            new_value,
            seq,
        }
    }

    /// Applies the remote verdict for `pending`.
    pub fn settle(&self, pending: PendingToggle, succeeded: bool) -> Settlement {
        if self.token.is_cancelled() {
            debug!(article_id = %pending.article_id, kind = %pending.kind, "Screen gone; dropping settlement.");
            return Settlement::Detached;
        }

        let mut table = self.table();
        let key = (pending.article_id, pending.kind);

        let settled = table.settled.entry(key.clone()).or_insert(0);
        *settled = (*settled).max(pending.seq);

        if succeeded {
            let newer = table
                .confirmed
                .get(&key)
                .map_or(true, |&(seq, _)| pending.seq >= seq);
            if newer {
                table.confirmed.insert(key.clone(), (pending.seq, pending.new_value));
            }
        }

        let latest = table.issued.get(&key).copied().unwrap_or(0);
        if pending.seq < latest {
            // The latest toggle already failed; an older success moves its fallback.
            if succeeded && table.reverted.get(&key) == Some(&latest) {
                let value = table.confirmed_value(&key);
                table.values.insert(key, value);
            }
            return Settlement::Superseded;
        }
        if succeeded {
            return Settlement::Confirmed;
        }
        let value = table.confirmed_value(&key);
        table.values.insert(key.clone(), value);
        table.reverted.insert(key, pending.seq);
        Settlement::Reverted(value)
    }

    /// Runs a full toggle: local flip, remote call with the new value, settlement.
    pub async fn run<F, Fut>(&self, article_id: &str, kind: InteractionKind, remote: F) -> Settlement
    where
        F: FnOnce(bool) -> Fut,
        Fut: Future<Output = bool>,
    {
        let pending = self.begin(article_id, kind);
        let succeeded = remote(pending.new_value).await;
        self.settle(pending, succeeded)
    }

    fn table(&self) -> MutexGuard<'_, FlagTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const LIKE: InteractionKind = InteractionKind::Like;

    fn flags() -> OptimisticFlags {
        OptimisticFlags::new(CancellationToken::new())
    }

    #[test]
    fn begin_flips_immediately() {
        let flags = flags();
        let pending = flags.begin("a", LIKE);
        assert!(pending.new_value);
        assert!(!pending.previous);
        assert!(flags.get("a", LIKE));
        assert_eq!(flags.settle(pending, true), Settlement::Confirmed);
        assert!(flags.get("a", LIKE));
    }

    #[test]
    fn failure_reverts() {
        let flags = flags();
        let pending = flags.begin("a", LIKE);
        assert_eq!(flags.settle(pending, false), Settlement::Reverted(false));
        assert!(!flags.get("a", LIKE));
    }

    #[tokio::test]
    async fn double_toggle_returns_to_original_with_alternating_calls() {
        let flags = flags();
        let sent = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let sent = sent.clone();
            let outcome = flags
                .run("a", LIKE, |value| async move {
                    sent.lock().unwrap().push(value);
                    true
                })
                .await;
            assert_eq!(outcome, Settlement::Confirmed);
        }

        assert!(!flags.get("a", LIKE));
        assert_eq!(*sent.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn last_attempted_toggle_wins_when_it_fails() {
        for first_settles_first in [true, false] {
            let flags = flags();
            let first = flags.begin("a", LIKE);
            let second = flags.begin("a", LIKE);
            assert!(!flags.get("a", LIKE));

            if first_settles_first {
                assert_eq!(flags.settle(first, true), Settlement::Superseded);
                assert_eq!(flags.settle(second, false), Settlement::Reverted(true));
            } else {
                // Nothing accepted yet when the newer call fails.
                assert_eq!(flags.settle(second, false), Settlement::Reverted(false));
                assert_eq!(flags.settle(first, true), Settlement::Superseded);
            }
            assert!(flags.get("a", LIKE));
        }
    }

    #[test]
    fn both_overlapping_failures_fall_back_to_the_accepted_value() {
        for second_settles_first in [true, false] {
            let flags = flags();
            let first = flags.begin("a", LIKE);
            let second = flags.begin("a", LIKE);

            if second_settles_first {
                assert_eq!(flags.settle(second, false), Settlement::Reverted(false));
                assert_eq!(flags.settle(first, false), Settlement::Superseded);
            } else {
                assert_eq!(flags.settle(first, false), Settlement::Superseded);
                assert_eq!(flags.settle(second, false), Settlement::Reverted(false));
            }
            assert!(!flags.get("a", LIKE));
        }
    }

    #[test]
    fn failure_falls_back_to_the_seeded_value() {
        let flags = flags();
        let article = crate::normalize::normalize_article(
            crate::ports::RawDocument {
                id: "a".into(),
                data: serde_json::json!({}),
            },
            chrono::Utc::now(),
        );
        let mut record = InteractionRecord::default();
        record.set_flag("a", LIKE, true);
        flags.seed(&record, std::slice::from_ref(&article));

        let first = flags.begin("a", LIKE);
        let second = flags.begin("a", LIKE);
        assert!(flags.get("a", LIKE));
        assert_eq!(flags.settle(first, false), Settlement::Superseded);
        assert_eq!(flags.settle(second, false), Settlement::Reverted(true));
        assert!(flags.get("a", LIKE));
    }

    #[test]
    fn stale_failure_does_not_clobber_newer_toggle() {
        let flags = flags();
        let first = flags.begin("a", LIKE);
        let second = flags.begin("a", LIKE);
        assert_eq!(flags.settle(second, true), Settlement::Confirmed);
        assert_eq!(flags.settle(first, false), Settlement::Superseded);
        assert!(!flags.get("a", LIKE));
    }

    #[test]
    fn detached_table_ignores_settlements() {
        let flags = flags();
        let pending = flags.begin("a", LIKE);
        flags.token().cancel();
        assert_eq!(flags.settle(pending, false), Settlement::Detached);
        assert!(flags.get("a", LIKE));
    }

    #[test]
    fn seeding_skips_flags_in_flight() {
        let flags = flags();
        let article = crate::normalize::normalize_article(
            crate::ports::RawDocument {
                id: "a".into(),
                data: serde_json::json!({}),
            },
            chrono::Utc::now(),
        );
        let mut record = InteractionRecord::default();
        record.set_flag("a", InteractionKind::Save, true);

        let pending = flags.begin("a", LIKE);
        flags.seed(&record, std::slice::from_ref(&article));
        assert!(flags.get("a", LIKE));
        assert!(flags.get("a", InteractionKind::Save));

        flags.settle(pending, true);
        flags.seed(&record, std::slice::from_ref(&article));
        assert!(!flags.get("a", LIKE));
    }

    #[tokio::test]
    async fn run_calls_remote_once_per_toggle() {
        let flags = flags();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        flags
            .run("a", InteractionKind::Save, |_| async move {
                c.fetch_add(1, Ordering::SeqCst);
                false
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!flags.get("a", InteractionKind::Save));
    }
}
