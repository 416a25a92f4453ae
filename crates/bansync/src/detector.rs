//! Burst ("mass event") detection.
//!
//! Each (origin node, action) pair owns an ordered list of recent
//! `(user, timestamp)` entries. On every observation the list is pruned to
//! the sliding window, the new entry is appended, and once the list reaches
//! the threshold it is emptied and handed back as a [`MassBatch`]. A list
//! therefore never holds more than `threshold - 1` entries between calls.

use bansync_core::{Action, ActionEvent, MassBatch, NodeId, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    user: UserId,
    timestamp: DateTime<Utc>,
}

/// Per-(node, action) sliding-window burst detector.
#[derive(Debug)]
pub struct MassDetector {
    threshold: usize,
    window_ms: i64,
    windows: DashMap<(NodeId, Action), Vec<WindowEntry>>,
}

impl MassDetector {
    /// Create a detector that fires on `threshold` events within `window`.
    pub fn new(threshold: usize, window: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
            windows: DashMap::new(),
        }
    }

    /// Record an event and report whether it completes a burst.
    ///
    /// The prune/append/flush sequence runs under the entry's shard lock, so
    /// concurrent observers of the same pair cannot interleave inside it.
    pub fn observe(&self, event: &ActionEvent) -> Option<MassBatch> {
        let user_ids = self.observe_raw(
            event.origin_node_id,
            event.action,
            event.user_id,
            event.timestamp,
        )?;

        Some(MassBatch {
            user_ids,
            origin_node_id: event.origin_node_id,
            origin_node_name: event.origin_node_name.clone(),
            action: event.action,
        })
    }

    /// Core of [`observe`](Self::observe): returns the flushed user ids.
    pub fn observe_raw(
        &self,
        origin: NodeId,
        action: Action,
        user: UserId,
        timestamp: DateTime<Utc>,
    ) -> Option<Vec<UserId>> {
        let mut entries = self.windows.entry((origin, action)).or_default();

        let window_ms = self.window_ms;
        entries.retain(|e| {
            timestamp.signed_duration_since(e.timestamp).num_milliseconds() < window_ms
        });
        entries.push(WindowEntry { user, timestamp });

        if entries.len() >= self.threshold {
            let flushed = std::mem::take(&mut *entries);
            Some(flushed.into_iter().map(|e| e.user).collect())
        } else {
            None
        }
    }

    /// Entries currently pending for a pair
    pub fn pending(&self, origin: NodeId, action: Action) -> usize {
        self.windows.get(&(origin, action)).map_or(0, |e| e.len())
    }
}
