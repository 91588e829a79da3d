use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the case walkthrough, or one of the two top-level screens.
///
/// The serialized names are the persisted wire format — changing them
/// invalidates every stored navigation snapshot and stage-memory entry.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Categories,
    Cases,
    PatientNotes,
    PatientStories,
    Consultation,
    Diagnosis,
    Treatment,
    Results,
    ExpertComment,
}

/// Every stage, top-level screens first.
pub const ALL_STAGES: [Stage; 9] = [
    Stage::Categories,
    Stage::Cases,
    Stage::PatientNotes,
    Stage::PatientStories,
    Stage::Consultation,
    Stage::Diagnosis,
    Stage::Treatment,
    Stage::Results,
    Stage::ExpertComment,
];

/// The fixed linear sequence a case is worked through, in order.
pub const CASE_STAGES: [Stage; 7] = [
    Stage::PatientNotes,
    Stage::PatientStories,
    Stage::Consultation,
    Stage::Diagnosis,
    Stage::Treatment,
    Stage::Results,
    Stage::ExpertComment,
];

impl Stage {
    /// Entry point when a case is opened for the first time.
    pub const fn first_case_stage() -> Self {
        Stage::PatientNotes
    }

    pub const fn is_case_stage(self) -> bool {
        !matches!(self, Stage::Categories | Stage::Cases)
    }

    /// Successor within the case flow. `None` for the top-level screens
    /// and for the final stage.
    pub fn next_case_stage(self) -> Option<Stage> {
        let pos = CASE_STAGES.iter().position(|s| *s == self)?;
        CASE_STAGES.get(pos + 1).copied()
    }

    /// Zero-based position within the case flow, if any.
    pub fn case_flow_index(self) -> Option<usize> {
        CASE_STAGES.iter().position(|s| *s == self)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Categories => "categories",
            Stage::Cases => "cases",
            Stage::PatientNotes => "patient-notes",
            Stage::PatientStories => "patient-stories",
            Stage::Consultation => "consultation",
            Stage::Diagnosis => "diagnosis",
            Stage::Treatment => "treatment",
            Stage::Results => "results",
            Stage::ExpertComment => "expert-comment",
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Categories
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
