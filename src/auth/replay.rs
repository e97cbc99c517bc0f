// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Replay guard for signed requests.
//!
//! A signed request is keyed by `keccak256(principal ++ signing message)`,
//! so identical requests from one principal with one timestamp collide no
//! matter how the signature bytes are encoded. A key is remembered until its
//! timestamp leaves the skew window, after which the timestamp check rejects
//! it anyway.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use alloy::primitives::{keccak256, B256};
use lru::LruCache;

use crate::types::Address;

/// Default number of recently seen requests kept.
pub const DEFAULT_REPLAY_CAPACITY: usize = 100_000;

/// In-process set of recently accepted signed requests.
pub struct ReplayGuard {
    seen: Mutex<LruCache<B256, i64>>,
}

impl ReplayGuard {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            seen: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Record a request; returns `false` when it was already seen.
    ///
    /// Entries older than `max_skew_secs` before `now` are dropped first.
    pub fn check_and_record(
        &self,
        principal: &Address,
        message: &str,
        timestamp: i64,
        max_skew_secs: i64,
        now: i64,
    ) -> bool {
        let key = request_key(principal, message);
        let Ok(mut seen) = self.seen.lock() else {
            return false;
        };

        // Least recently inserted first; stop at the first live entry.
        while let Some((_, ts)) = seen.peek_lru() {
            if now.abs_diff(*ts) <= max_skew_secs.unsigned_abs() {
                break;
            }
            seen.pop_lru();
        }

        if seen.contains(&key) {
            return false;
        }
        seen.put(key, timestamp);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_CAPACITY)
    }
}

fn request_key(principal: &Address, message: &str) -> B256 {
    let mut preimage = Vec::with_capacity(20 + message.len());
    preimage.extend_from_slice(principal.as_slice());
    preimage.extend_from_slice(message.as_bytes());
    keccak256(preimage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const ALICE: Address = address!("0x0000000000000000000000000000000000a11ce0");
    const BOB: Address = address!("0x0000000000000000000000000000000000000b0b");

    #[test]
    fn second_identical_request_is_rejected() {
        let guard = ReplayGuard::default();
        assert!(guard.check_and_record(&ALICE, "POST\n/v1/token/mint\n100\n0x00", 100, 60, 100));
        assert!(!guard.check_and_record(&ALICE, "POST\n/v1/token/mint\n100\n0x00", 100, 60, 101));

        // Same message from another principal is a different request.
        assert!(guard.check_and_record(&BOB, "POST\n/v1/token/mint\n100\n0x00", 100, 60, 101));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn expired_entries_are_pruned() {
        let guard = ReplayGuard::default();
        assert!(guard.check_and_record(&ALICE, "a", 100, 60, 100));
        assert!(guard.check_and_record(&ALICE, "b", 150, 60, 150));

        // At 200 the entry stamped 100 is outside the window.
        assert!(guard.check_and_record(&BOB, "c", 200, 60, 200));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn zero_capacity_still_tracks_one_entry() {
        let guard = ReplayGuard::new(0);
        assert!(guard.check_and_record(&ALICE, "a", 100, 60, 100));
        assert!(!guard.check_and_record(&ALICE, "a", 100, 60, 100));
    }
}
