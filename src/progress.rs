use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::CaseId;
use crate::stage::{Stage, CASE_STAGES};

const PROGRESS_SCHEMA_VERSION: u32 = 1;
const DIAGNOSIS_POINTS: u32 = 50;
const TREATMENT_POINTS: u32 = 50;
pub const MAX_SCORE: u32 = DIAGNOSIS_POINTS + TREATMENT_POINTS;

/// Prefix of every per-case progress key. [`crate::model::MAX_ID_LENGTH`]
/// reserves room for it, so a prefixed key never exceeds the store's cap.
pub const STORAGE_KEY_PREFIX: &str = "progress_";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error("malformed progress record: {0}")]
    Malformed(String),

    #[error("progress schema version {found} is newer than supported {max}")]
    FutureSchema { found: u32, max: u32 },

    #[error("unknown progress schema version: {0}")]
    UnknownSchema(u32),

    #[error("corrupted progress record: {reason}")]
    Corrupted { reason: &'static str },
}

#[derive(Serialize, Deserialize, Debug)]
struct ProgressSnapshot {
    version: u32,
    #[serde(flatten)]
    record: CaseProgress,
}

/// Per-case walkthrough record: which stages are done, what the user chose,
/// and the derived score. Created on the first completion or selection,
/// mutated from then on, never destroyed except by an explicit case restart.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaseProgress {
    pub completed: bool,
    pub current_stage: Stage,
    pub stages_completed: Vec<Stage>,
    #[serde(rename = "lastUpdated")]
    pub last_updated_ms: u64,
    pub score: Option<u32>,
    pub diagnosis_selected: Option<String>,
    pub treatment_selected: Option<String>,
}

impl CaseProgress {
    pub fn started(stage: Stage, now_ms: u64) -> Self {
        Self {
            completed: false,
            current_stage: stage,
            stages_completed: Vec::new(),
            last_updated_ms: now_ms,
            score: None,
            diagnosis_selected: None,
            treatment_selected: None,
        }
    }

    /// Marks a case stage as done, appending it at most once. The completion
    /// flag flips when every stage of the case flow has been done.
    pub fn complete_stage(&mut self, stage: Stage, now_ms: u64) -> bool {
        if !stage.is_case_stage() {
            return false;
        }
        if self.stages_completed.contains(&stage) {
            return false;
        }
        self.stages_completed.push(stage);
        self.completed = CASE_STAGES.iter().all(|s| self.stages_completed.contains(s));
        self.last_updated_ms = now_ms;
        debug!(stage = %stage, completed = self.completed, "stage completed");
        true
    }

    /// Tracks where the user currently is inside the case flow.
    pub fn set_current_stage(&mut self, stage: Stage, now_ms: u64) -> bool {
        if !stage.is_case_stage() || self.current_stage == stage {
            return false;
        }
        self.current_stage = stage;
        self.last_updated_ms = now_ms;
        true
    }

    pub fn record_diagnosis(&mut self, option_id: impl Into<String>, now_ms: u64) {
        self.diagnosis_selected = Some(option_id.into());
        self.last_updated_ms = now_ms;
    }

    pub fn record_treatment(&mut self, option_id: impl Into<String>, now_ms: u64) {
        self.treatment_selected = Some(option_id.into());
        self.last_updated_ms = now_ms;
    }

    pub fn set_score(&mut self, score: u32, now_ms: u64) {
        self.score = Some(score.min(MAX_SCORE));
        self.last_updated_ms = now_ms;
    }

    /// Share of the 7-stage case flow that is done, in whole percent.
    pub fn percent_complete(&self) -> u8 {
        let done = self
            .stages_completed
            .iter()
            .filter(|s| s.is_case_stage())
            .count();
        ((done * 100) / CASE_STAGES.len()) as u8
    }

    pub fn encode(&self) -> Result<String, ProgressError> {
        let snapshot = ProgressSnapshot {
            version: PROGRESS_SCHEMA_VERSION,
            record: self.clone(),
        };
        serde_json::to_string(&snapshot).map_err(|e| ProgressError::Malformed(e.to_string()))
    }

    pub fn decode(raw: &str) -> Result<Self, ProgressError> {
        let snapshot: ProgressSnapshot =
            serde_json::from_str(raw).map_err(|e| ProgressError::Malformed(e.to_string()))?;

        if snapshot.version > PROGRESS_SCHEMA_VERSION {
            return Err(ProgressError::FutureSchema {
                found: snapshot.version,
                max: PROGRESS_SCHEMA_VERSION,
            });
        }
        if snapshot.version != PROGRESS_SCHEMA_VERSION {
            return Err(ProgressError::UnknownSchema(snapshot.version));
        }

        let record = snapshot.record;
        if !record.current_stage.is_case_stage() {
            return Err(ProgressError::Corrupted {
                reason: "current stage outside the case flow",
            });
        }
        if record.stages_completed.iter().any(|s| !s.is_case_stage()) {
            return Err(ProgressError::Corrupted {
                reason: "completed stage outside the case flow",
            });
        }
        let mut seen = Vec::with_capacity(record.stages_completed.len());
        for stage in &record.stages_completed {
            if seen.contains(stage) {
                return Err(ProgressError::Corrupted {
                    reason: "duplicate completed stage",
                });
            }
            seen.push(*stage);
        }
        if record.score.is_some_and(|s| s > MAX_SCORE) {
            return Err(ProgressError::Corrupted {
                reason: "score out of range",
            });
        }

        Ok(record)
    }
}

/// Store key for one case's progress record.
pub fn storage_key(case_id: &CaseId) -> String {
    format!("{STORAGE_KEY_PREFIX}{}", case_id.as_str())
}

/// Score derived from the user's choices, given their correctness flags.
pub fn score_for(diagnosis_correct: Option<bool>, treatment_recommended: Option<bool>) -> u32 {
    let mut score = 0;
    if diagnosis_correct == Some(true) {
        score += DIAGNOSIS_POINTS;
    }
    if treatment_recommended == Some(true) {
        score += TREATMENT_POINTS;
    }
    score
}
