//! Per-user observation counters backing the approved-user shortcut.
//!
//! Counters live in a concurrent map so the check pipeline can bump them
//! while holding the corpus lock in shared mode. Concurrent same-user checks
//! may lose an increment, which delays approval but can never falsely
//! approve.

use std::io::{BufRead, BufReader, Read};

use anyhow::{Context, Result};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub(crate) struct ApprovedUsers {
    counts: DashMap<String, usize>,
}

impl ApprovedUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observation count for a user, zero when never seen.
    pub fn count(&self, user_id: &str) -> usize {
        self.counts.get(user_id).map(|c| *c).unwrap_or(0)
    }

    /// Record one more ham observation for a user.
    pub fn increment(&self, user_id: &str) {
        *self.counts.entry(user_id.to_string()).or_insert(0) += 1;
    }

    /// Mark a user approved by setting its count past the window. The `+1`
    /// covers a window size of zero.
    pub fn approve(&self, user_id: &str, first_messages_count: usize) {
        self.counts
            .insert(user_id.to_string(), first_messages_count + 1);
    }

    pub fn remove(&self, user_id: &str) {
        self.counts.remove(user_id);
    }

    /// Replace the whole registry from a reader with one user id per line,
    /// each initialized past the window. Returns the number of ids loaded.
    pub fn load(&self, reader: impl Read, first_messages_count: usize) -> Result<usize> {
        self.counts.clear();
        let mut count = 0;
        for line in BufReader::new(reader).lines() {
            let line = line.context("failed to read approved users")?;
            let user_id = line.trim_end_matches('\r');
            if user_id.is_empty() {
                continue;
            }
            self.counts
                .insert(user_id.to_string(), first_messages_count + 1);
            count += 1;
        }
        Ok(count)
    }

    /// Snapshot of the known user ids, order unspecified.
    pub fn snapshot(&self) -> Vec<String> {
        self.counts.iter().map(|e| e.key().clone()).collect()
    }

    pub fn clear(&self) {
        self.counts.clear();
    }
}
