use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::CaseId;
use crate::stage::Stage;

const MEMORY_SCHEMA_VERSION: u32 = 1;
const MAX_TRACKED_CASES: usize = 512;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("malformed stage memory: {0}")]
    Malformed(String),

    #[error("stage memory schema version {found} is newer than supported {max}")]
    FutureSchema { found: u32, max: u32 },

    #[error("unknown stage memory schema version: {0}")]
    UnknownSchema(u32),

    #[error("corrupted stage memory: {reason}")]
    Corrupted { reason: &'static str },

    #[error("too many tracked cases: {count}, max {max}")]
    TooManyEntries { count: usize, max: usize },
}

/// Persisted form: one JSON object under one store key. Keys are raw case
/// ids, values stage names.
#[derive(Serialize, Deserialize, Debug)]
struct MemorySnapshot {
    version: u32,
    stages: BTreeMap<String, Stage>,
}

/// Last case-stage visited per case, so re-entering a case resumes where
/// the user left off. Only stages in the case subset are ever recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageMemory {
    entries: BTreeMap<CaseId, Stage>,
}

impl StageMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records the stage for a case. Returns false without touching state
    /// when the stage is outside the case subset or already recorded.
    pub fn record(&mut self, case_id: &CaseId, stage: Stage) -> bool {
        if !stage.is_case_stage() {
            debug!(case = %case_id, stage = %stage, "refusing to record top-level stage");
            return false;
        }
        if self.entries.get(case_id) == Some(&stage) {
            return false;
        }
        self.entries.insert(case_id.clone(), stage);
        debug!(case = %case_id, stage = %stage, "recorded last visited stage");
        true
    }

    pub fn last_stage(&self, case_id: &CaseId) -> Option<Stage> {
        self.entries.get(case_id).copied()
    }

    /// Stage to land on when entering a case: the remembered one, or the
    /// start of the case flow.
    pub fn resume_stage(&self, case_id: &CaseId) -> Stage {
        self.last_stage(case_id)
            .unwrap_or_else(Stage::first_case_stage)
    }

    /// Removes the entry for a case, reporting whether one existed.
    pub fn clear(&mut self, case_id: &CaseId) -> bool {
        self.entries.remove(case_id).is_some()
    }

    pub fn encode(&self) -> Result<String, MemoryError> {
        let snapshot = MemorySnapshot {
            version: MEMORY_SCHEMA_VERSION,
            stages: self
                .entries
                .iter()
                .map(|(case, stage)| (case.as_str().to_owned(), *stage))
                .collect(),
        };
        serde_json::to_string(&snapshot).map_err(|e| MemoryError::Malformed(e.to_string()))
    }

    pub fn decode(raw: &str) -> Result<Self, MemoryError> {
        let snapshot: MemorySnapshot =
            serde_json::from_str(raw).map_err(|e| MemoryError::Malformed(e.to_string()))?;

        if snapshot.version > MEMORY_SCHEMA_VERSION {
            return Err(MemoryError::FutureSchema {
                found: snapshot.version,
                max: MEMORY_SCHEMA_VERSION,
            });
        }
        if snapshot.version != MEMORY_SCHEMA_VERSION {
            return Err(MemoryError::UnknownSchema(snapshot.version));
        }
        if snapshot.stages.len() > MAX_TRACKED_CASES {
            return Err(MemoryError::TooManyEntries {
                count: snapshot.stages.len(),
                max: MAX_TRACKED_CASES,
            });
        }

        let mut entries = BTreeMap::new();
        for (raw_case, stage) in snapshot.stages {
            if raw_case.trim().is_empty() {
                return Err(MemoryError::Corrupted {
                    reason: "blank case id",
                });
            }
            if !stage.is_case_stage() {
                return Err(MemoryError::Corrupted {
                    reason: "top-level stage recorded for a case",
                });
            }
            entries.insert(CaseId::new(raw_case), stage);
        }

        Ok(Self { entries })
    }
}
