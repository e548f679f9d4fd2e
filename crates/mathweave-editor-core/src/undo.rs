//! Undo/redo management for math fields.
//!
//! Provides:
//! - `UndoManager` trait for anything that can undo/redo itself
//! - `SnapshotHistory` - bounded, debounced snapshot stack over a string value

use std::time::Duration;

use mathweave_common::EditorConfig;
use web_time::Instant;

/// Trait for managing undo/redo operations.
///
/// Implementations must actually perform the undo/redo (write the restored
/// value back), not just move a cursor. `MathField` is the implementation used
/// by the editor.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if successful.
    fn undo(&mut self) -> bool;

    /// Perform redo. Returns true if successful.
    fn redo(&mut self) -> bool;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// Limits applied to a [`SnapshotHistory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of snapshots kept. Oldest are evicted first.
    pub cap: usize,
    /// Minimum wall-clock gap between two non-forced pushes.
    pub debounce: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            cap: 200,
            debounce: Duration::from_millis(250),
        }
    }
}

impl From<&EditorConfig> for HistoryConfig {
    fn from(config: &EditorConfig) -> Self {
        Self {
            cap: config.history_cap.max(1),
            debounce: Duration::from_millis(config.debounce_ms),
        }
    }
}

/// Ordered snapshots of one field's value plus a cursor into them.
///
/// Entries after the cursor are the redo branch; they are dropped as soon as a
/// new snapshot is accepted.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    entries: Vec<String>,
    /// `None` only while `entries` is empty.
    cursor: Option<usize>,
    last_push: Option<Instant>,
    config: HistoryConfig,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl SnapshotHistory {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            last_push: None,
            config,
        }
    }

    /// Record `value` now. See [`push_snapshot_at`](Self::push_snapshot_at).
    pub fn push_snapshot(&mut self, value: &str, force: bool) -> bool {
        self.push_snapshot_at(value, force, Instant::now())
    }

    /// Record `value` as of `now`.
    ///
    /// Unless `force` is set, the push is skipped when the previous push was
    /// less than the debounce interval ago, or when `value` equals the entry
    /// under the cursor. Returns whether a snapshot was appended.
    pub fn push_snapshot_at(&mut self, value: &str, force: bool, now: Instant) -> bool {
        if !force {
            if let Some(last) = self.last_push
                && now.saturating_duration_since(last) < self.config.debounce
            {
                return false;
            }
            if self.current().unwrap_or("") == value {
                return false;
            }
        }

        // Drop the redo branch.
        if let Some(cursor) = self.cursor {
            self.entries.truncate(cursor + 1);
        }

        self.entries.push(value.to_owned());
        self.last_push = Some(now);

        let cap = self.config.cap.max(1);
        if self.entries.len() > cap {
            let drop = self.entries.len() - cap;
            self.entries.drain(..drop);
            tracing::trace!(target: "mathweave::history", evicted = drop, "history cap reached");
        }
        self.cursor = Some(self.entries.len() - 1);
        true
    }

    /// Step back one snapshot and return it, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&str> {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                Some(&self.entries[cursor - 1])
            }
            _ => None,
        }
    }

    /// Step forward one snapshot and return it, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&str> {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.entries.len() => {
                self.cursor = Some(cursor + 1);
                Some(&self.entries[cursor + 1])
            }
            _ => None,
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.entries.len())
    }

    /// Snapshot under the cursor.
    pub fn current(&self) -> Option<&str> {
        self.cursor.map(|c| self.entries[c].as_str())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.last_push = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(300);

    /// Push a sequence of values spaced past the debounce window.
    fn spaced(history: &mut SnapshotHistory, start: Instant, values: &[&str]) -> Instant {
        let mut now = start;
        for v in values {
            now += STEP;
            assert!(history.push_snapshot_at(v, false, now), "push {v:?} rejected");
        }
        now
    }

    #[test]
    fn test_forced_seed_always_lands() {
        let mut history = SnapshotHistory::default();
        let now = Instant::now();
        assert!(history.push_snapshot_at("", true, now));
        // same value, same instant: still accepted when forced
        assert!(history.push_snapshot_at("", true, now));
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), Some(1));
    }

    #[test]
    fn test_dedup_within_window() {
        let mut history = SnapshotHistory::default();
        let t0 = Instant::now();
        history.push_snapshot_at("x", true, t0);
        for i in 1..10 {
            let now = t0 + Duration::from_millis(i * 10);
            assert!(!history.push_snapshot_at("x", false, now));
        }
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_debounce_blocks_fast_changes() {
        let mut history = SnapshotHistory::default();
        let t0 = Instant::now();
        history.push_snapshot_at("", true, t0);
        assert!(!history.push_snapshot_at("a", false, t0 + Duration::from_millis(100)));
        assert!(history.push_snapshot_at("ab", false, t0 + Duration::from_millis(260)));
        assert_eq!(history.entries(), &["".to_string(), "ab".to_string()]);
    }

    #[test]
    fn test_unchanged_value_is_skipped_after_window() {
        let mut history = SnapshotHistory::default();
        let t0 = Instant::now();
        history.push_snapshot_at("a", true, t0);
        assert!(!history.push_snapshot_at("a", false, t0 + STEP));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = SnapshotHistory::default();
        let t0 = Instant::now();
        history.push_snapshot_at("", true, t0);
        spaced(&mut history, t0, &["a", "ab", "abc"]);

        let before = history.current().unwrap().to_owned();
        assert_eq!(history.undo(), Some("ab"));
        assert_eq!(history.redo(), Some(before.as_str()));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_boundaries_are_noops() {
        let mut history = SnapshotHistory::default();
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), None);
        assert_eq!(history.cursor(), None);

        history.push_snapshot_at("only", true, Instant::now());
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), None);
        assert_eq!(history.cursor(), Some(0));
    }

    #[test]
    fn test_push_after_undo_drops_redo_branch() {
        let mut history = SnapshotHistory::default();
        let t0 = Instant::now();
        history.push_snapshot_at("", true, t0);
        let t = spaced(&mut history, t0, &["a", "ab", "abc"]);

        history.undo();
        history.undo();
        assert_eq!(history.current(), Some("a"));

        assert!(history.push_snapshot_at("az", false, t + STEP));
        assert_eq!(history.entries(), &["", "a", "az"].map(String::from));
        assert!(!history.can_redo());
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn test_cap_evicts_oldest_and_keeps_cursor_on_latest() {
        let mut history = SnapshotHistory::new(HistoryConfig {
            cap: 3,
            debounce: Duration::from_millis(250),
        });
        let t0 = Instant::now();
        history.push_snapshot_at("0", true, t0);
        spaced(&mut history, t0, &["1", "2", "3", "4"]);

        assert_eq!(history.len(), 3);
        assert_eq!(history.entries(), &["2", "3", "4"].map(String::from));
        assert_eq!(history.current(), Some("4"));

        assert_eq!(history.undo(), Some("3"));
        assert_eq!(history.undo(), Some("2"));
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn test_config_from_editor_config() {
        let editor = EditorConfig {
            history_cap: 5,
            debounce_ms: 0,
            ..Default::default()
        };
        let config = HistoryConfig::from(&editor);
        assert_eq!(config.cap, 5);
        assert_eq!(config.debounce, Duration::ZERO);
    }
}
