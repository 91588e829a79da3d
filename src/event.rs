use serde::{Deserialize, Serialize};

use crate::capabilities::SourceResult;
use crate::host::HostDescriptor;
use crate::model::{CaseId, CategoryId};
use crate::stage::Stage;

// Events either come from the shell (user input, host callbacks) or carry
// resolved effect results back into `update`. Large payloads stay behind
// Vec or Box so the enum itself stays small.

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Lifecycle
    Started,
    HostDetected {
        descriptor: HostDescriptor,
    },
    /// Batched restore read, aligned with the session key order.
    SessionLoaded {
        values: Vec<Option<String>>,
    },

    // Catalog
    CategoriesLoaded(SourceResult),
    CategorySelected(CategoryId),
    CasesLoaded {
        category_id: CategoryId,
        result: SourceResult,
    },
    CaseSelected(CaseId),
    CaseDetailLoaded {
        case_id: CaseId,
        result: SourceResult,
    },
    ProgressLoaded {
        case_id: CaseId,
        raw: Option<String>,
    },

    // Navigation
    StageRequested(Stage),
    AdvanceRequested,
    BackRequested,

    // Host chrome callbacks
    MainButtonPressed,
    BackButtonPressed,

    // Case interactions
    DiagnosisChosen {
        option_id: String,
    },
    TreatmentChosen {
        option_id: String,
    },

    // Session maintenance
    SessionReset,
    CaseRestarted {
        case_id: CaseId,
    },
}
