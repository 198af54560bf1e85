//! # Access Ledger
//!
//! Append-only, time-windowed log of accesses per tracked token.
//!
//! ## Data Structures
//!
//! - `per_token`: per-token `VecDeque` behind its own lock, under an outer
//!   map lock taken only briefly to fetch or create the deque handle
//! - `global_recent`: flat deque of `(token, timestamp)` pairs feeding the
//!   cross-token entanglement heuristic
//!
//! ## Invariants Enforced
//!
//! - INVARIANT-3: per-token records are appended under the token's lock and
//!   never reordered, so insertion order equals timestamp order
//! - Lazy pruning on `record()` keeps amortized cost O(1); a periodic
//!   compaction pass (`prune`) covers idle tokens

use parking_lot::{Mutex, RwLock};
use shared_types::{AccessRecord, AccessorId, TimestampMicros, TokenId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

type TokenLog = Arc<RwLock<VecDeque<AccessRecord>>>;

/// Append-only access log with bounded retention.
///
/// Supports many concurrent writers plus one periodic pruner without losing
/// or duplicating entries; contention is per token.
#[derive(Debug)]
pub struct AccessLedger {
    /// Records older than this are discarded.
    retention_micros: u64,
    per_token: RwLock<HashMap<TokenId, TokenLog>>,
    global_recent: Mutex<VecDeque<(TokenId, TimestampMicros)>>,
}

impl AccessLedger {
    /// Create a ledger with the given retention window.
    pub fn new(retention_micros: u64) -> Self {
        Self {
            retention_micros,
            per_token: RwLock::new(HashMap::new()),
            global_recent: Mutex::new(VecDeque::new()),
        }
    }

    /// Append one access and lazily prune expired records for that token.
    pub fn record(
        &self,
        token_id: TokenId,
        accessor_id: AccessorId,
        value: Option<u64>,
        now: TimestampMicros,
    ) -> AccessRecord {
        let record = AccessRecord {
            token_id,
            accessor_id,
            value,
            timestamp: now,
        };

        let log = self.log_handle(token_id);
        {
            let mut log = log.write();
            log.push_back(record.clone());
            let cutoff = now.saturating_sub(self.retention_micros);
            while log.front().is_some_and(|r| r.timestamp < cutoff) {
                log.pop_front();
            }
        }

        {
            let mut recent = self.global_recent.lock();
            recent.push_back((token_id, now));
            // The cross-token index only feeds millisecond-scale windows;
            // one second of history is plenty.
            let cutoff = now.saturating_sub(shared_types::MICROS_PER_SEC);
            while recent.front().is_some_and(|(_, t)| *t < cutoff) {
                recent.pop_front();
            }
        }

        record
    }

    /// Records for `token_id` within `window_micros` of `now`, newest-last.
    ///
    /// Returns a snapshot; callers never observe partial writes.
    pub fn recent(
        &self,
        token_id: TokenId,
        window_micros: u64,
        now: TimestampMicros,
    ) -> Vec<AccessRecord> {
        let Some(log) = self.per_token.read().get(&token_id).cloned() else {
            return Vec::new();
        };
        let cutoff = now.saturating_sub(window_micros);
        let log = log.read();
        log.iter()
            .filter(|r| r.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// Number of distinct tokens with at least one access since `since`.
    pub fn distinct_tokens_since(&self, since: TimestampMicros) -> usize {
        let recent = self.global_recent.lock();
        let mut seen: HashSet<TokenId> = HashSet::new();
        for (token, timestamp) in recent.iter().rev() {
            if *timestamp < since {
                break;
            }
            seen.insert(*token);
        }
        seen.len()
    }

    /// Full compaction pass for the periodic pruner. Covers tokens that
    /// stopped receiving traffic and would never self-prune.
    pub fn prune(&self, now: TimestampMicros) {
        let cutoff = now.saturating_sub(self.retention_micros);
        let logs: Vec<TokenLog> = self.per_token.read().values().cloned().collect();
        for log in logs {
            let mut log = log.write();
            while log.front().is_some_and(|r| r.timestamp < cutoff) {
                log.pop_front();
            }
        }
        // A strong count above one means a writer fetched this handle and
        // has not pushed yet; dropping the entry now would orphan that
        // record. Leave it for the next pass.
        self.per_token
            .write()
            .retain(|_, log| Arc::strong_count(log) > 1 || !log.read().is_empty());
    }

    /// Total records currently retained, across all tokens.
    pub fn len(&self) -> usize {
        self.per_token
            .read()
            .values()
            .map(|log| log.read().len())
            .sum()
    }

    /// True when no records are retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn log_handle(&self, token_id: TokenId) -> TokenLog {
        if let Some(log) = self.per_token.read().get(&token_id) {
            return log.clone();
        }
        self.per_token
            .write()
            .entry(token_id)
            .or_insert_with(|| Arc::new(RwLock::new(VecDeque::new())))
            .clone()
    }
}
