use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::stage::Stage;

const NAV_SCHEMA_VERSION: u32 = 1;
/// Decode-side guard against corrupt persisted data; live histories are
/// unbounded because the history-length invariant is exact.
const MAX_HISTORY_ENTRIES: usize = 256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("malformed navigation snapshot: {0}")]
    Malformed(String),

    #[error("snapshot schema version {found} is newer than supported {max}")]
    FutureSchema { found: u32, max: u32 },

    #[error("unknown snapshot schema version: {0}")]
    UnknownSchema(u32),

    #[error("corrupted navigation snapshot: {reason}")]
    Corrupted { reason: &'static str },

    #[error("history too long: {count} entries, max {max}")]
    HistoryTooLong { count: usize, max: usize },
}

/// Persisted form of [`NavigationState`]. Field names are the stored JSON
/// schema and must stay stable.
#[derive(Serialize, Deserialize, Debug)]
struct NavSnapshot {
    version: u32,
    #[serde(rename = "currentStage")]
    current: Stage,
    history: Vec<Stage>,
}

/// Current stage plus the ordered path taken to reach it.
///
/// Invariants: the history is never empty, its last element equals
/// `current`, and no two consecutive entries are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    current: Stage,
    history: Vec<Stage>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            current: Stage::Categories,
            history: vec![Stage::Categories],
        }
    }
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn depth(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.history.len() > 1
    }

    /// Forward transition. Returns false without touching state when the
    /// target equals the current stage, so rapid repeated requests cannot
    /// stack duplicate history entries.
    pub fn advance(&mut self, stage: Stage) -> bool {
        if stage == self.current {
            debug!(stage = %stage, "stage unchanged, ignoring transition");
            return false;
        }
        debug!(from = %self.current, to = %stage, "stage transition");
        self.history.push(stage);
        self.current = stage;
        true
    }

    /// Pops one history entry and returns the stage that became current.
    /// Returns `None` (no state change) when already at the first entry.
    pub fn go_back(&mut self) -> Option<Stage> {
        if self.history.len() <= 1 {
            debug!("back navigation at history root, ignoring");
            return None;
        }
        self.history.pop();
        self.current = self.history.last().copied().unwrap_or(Stage::Categories);
        debug!(to = %self.current, "back navigation");
        Some(self.current)
    }

    pub fn reset(&mut self) {
        debug!("navigation reset");
        self.current = Stage::Categories;
        self.history = vec![Stage::Categories];
    }

    pub fn encode(&self) -> Result<String, SnapshotError> {
        let snapshot = NavSnapshot {
            version: NAV_SCHEMA_VERSION,
            current: self.current,
            history: self.history.clone(),
        };
        serde_json::to_string(&snapshot).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }

    pub fn decode(raw: &str) -> Result<Self, SnapshotError> {
        let snapshot: NavSnapshot =
            serde_json::from_str(raw).map_err(|e| SnapshotError::Malformed(e.to_string()))?;

        if snapshot.version > NAV_SCHEMA_VERSION {
            return Err(SnapshotError::FutureSchema {
                found: snapshot.version,
                max: NAV_SCHEMA_VERSION,
            });
        }
        if snapshot.version != NAV_SCHEMA_VERSION {
            return Err(SnapshotError::UnknownSchema(snapshot.version));
        }
        if snapshot.history.is_empty() {
            return Err(SnapshotError::Corrupted {
                reason: "empty history",
            });
        }
        if snapshot.history.len() > MAX_HISTORY_ENTRIES {
            return Err(SnapshotError::HistoryTooLong {
                count: snapshot.history.len(),
                max: MAX_HISTORY_ENTRIES,
            });
        }
        if snapshot.history.last() != Some(&snapshot.current) {
            return Err(SnapshotError::Corrupted {
                reason: "history does not end at current stage",
            });
        }
        if snapshot.history.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(SnapshotError::Corrupted {
                reason: "duplicate consecutive history entries",
            });
        }

        Ok(Self {
            current: snapshot.current,
            history: snapshot.history,
        })
    }
}
