//! Projection of the [`Model`](crate::model::Model) into the serializable
//! view model the shell renders. The mapping is total: every stage produces
//! a screen, with `Loading` standing in whenever required data has not
//! arrived yet.

use serde::{Deserialize, Serialize};

use crate::catalog::{CaseDetail, CaseSummary, Category, ExpertCommentary, PatientNote, PatientStory};
use crate::host::HostDescriptor;
use crate::model::{Model, StartupPhase};
use crate::progress::{CaseProgress, MAX_SCORE};
use crate::stage::Stage;

pub const BUTTON_CONTINUE: &str = "Continue";
pub const BUTTON_CONFIRM_DIAGNOSIS: &str = "Confirm diagnosis";
pub const BUTTON_CONFIRM_TREATMENT: &str = "Confirm treatment";
pub const BUTTON_FINISH_CASE: &str = "Finish case";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MainButtonView {
    pub visible: bool,
    pub text: String,
    pub enabled: bool,
}

impl MainButtonView {
    fn hidden() -> Self {
        Self::default()
    }

    fn shown(text: &str, enabled: bool) -> Self {
        Self {
            visible: true,
            text: text.to_string(),
            enabled,
        }
    }
}

/// What the host chrome should currently show. `update` pushes the same
/// state to the host that the view model reports, so the two can never
/// disagree.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChromeView {
    pub main_button: MainButtonView,
    pub back_button_visible: bool,
    /// Simulated hosts render a fallback button set in the page itself.
    pub show_dev_controls: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProgressView {
    pub percent: u8,
    pub completed: bool,
    pub score: Option<u32>,
    pub max_score: u32,
}

impl ProgressView {
    fn from_record(record: &CaseProgress) -> Self {
        Self {
            percent: record.percent_complete(),
            completed: record.completed,
            score: record.score,
            max_score: MAX_SCORE,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosisOptionView {
    pub id: String,
    pub name: String,
    pub selected: bool,
    /// Revealed only after the user confirmed a choice.
    pub is_correct: Option<bool>,
    pub explanation: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TreatmentOptionView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub selected: bool,
    /// Revealed only after the user confirmed a choice.
    pub is_recommended: Option<bool>,
    pub outcomes: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Screen {
    Loading,
    Categories {
        categories: Vec<Category>,
        loaded: bool,
    },
    Cases {
        category: Category,
        cases: Vec<CaseSummary>,
    },
    PatientNotes {
        case_title: String,
        patient_name: String,
        patient_age: u8,
        notes: Vec<PatientNote>,
    },
    PatientStories {
        case_title: String,
        stories: Vec<PatientStory>,
    },
    Consultation {
        case_title: String,
        patient_name: String,
        chat_id: Option<String>,
    },
    Diagnosis {
        case_title: String,
        options: Vec<DiagnosisOptionView>,
        choice_confirmed: bool,
    },
    Treatment {
        case_title: String,
        options: Vec<TreatmentOptionView>,
        choice_confirmed: bool,
    },
    Results {
        case_title: String,
        score: Option<u32>,
        max_score: u32,
        percent_complete: u8,
        diagnosis_correct: Option<bool>,
        treatment_recommended: Option<bool>,
    },
    ExpertComment {
        case_title: String,
        commentary: ExpertCommentary,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub screen: Screen,
    pub chrome: ChromeView,
    pub progress: Option<ProgressView>,
    pub host: Option<HostDescriptor>,
}

/// Builds the full view model for the current state.
pub fn build(model: &Model) -> ViewModel {
    ViewModel {
        screen: screen_for(model),
        chrome: chrome_for(model),
        progress: model.current_progress().map(ProgressView::from_record),
        host: model.host.clone(),
    }
}

fn screen_for(model: &Model) -> Screen {
    if model.phase != StartupPhase::Ready {
        return Screen::Loading;
    }

    match model.navigation.current() {
        Stage::Categories => categories_screen(model),
        Stage::Cases => match model
            .selection
            .category_id
            .as_ref()
            .and_then(|id| model.catalog.category(id))
        {
            Some(category) => Screen::Cases {
                category: category.clone(),
                cases: model
                    .selection
                    .category_id
                    .as_ref()
                    .and_then(|id| model.catalog.cases_for(id))
                    .map(<[CaseSummary]>::to_vec)
                    .unwrap_or_default(),
            },
            // Cases screen with no selected category falls back to the
            // category list.
            None => categories_screen(model),
        },
        stage => match model.current_detail() {
            Some(detail) => case_screen(stage, detail, model.current_progress()),
            None => Screen::Loading,
        },
    }
}

fn categories_screen(model: &Model) -> Screen {
    Screen::Categories {
        categories: model.catalog.categories.clone(),
        loaded: model.catalog.categories_loaded,
    }
}

fn case_screen(stage: Stage, detail: &CaseDetail, progress: Option<&CaseProgress>) -> Screen {
    match stage {
        Stage::PatientNotes => Screen::PatientNotes {
            case_title: detail.title.clone(),
            patient_name: detail.patient_name.clone(),
            patient_age: detail.patient_age,
            notes: detail.patient_notes.clone(),
        },
        Stage::PatientStories => Screen::PatientStories {
            case_title: detail.title.clone(),
            stories: detail.patient_stories.clone(),
        },
        Stage::Consultation => Screen::Consultation {
            case_title: detail.title.clone(),
            patient_name: detail.patient_name.clone(),
            chat_id: detail.consultation_chat_id.clone(),
        },
        Stage::Diagnosis => {
            let chosen = progress.and_then(|p| p.diagnosis_selected.as_deref());
            Screen::Diagnosis {
                case_title: detail.title.clone(),
                options: detail
                    .diagnosis_options
                    .iter()
                    .map(|option| DiagnosisOptionView {
                        id: option.id.clone(),
                        name: option.name.clone(),
                        selected: chosen == Some(option.id.as_str()),
                        is_correct: chosen.map(|_| option.is_correct),
                        explanation: chosen.map(|_| option.explanation.clone()),
                    })
                    .collect(),
                choice_confirmed: chosen.is_some(),
            }
        }
        Stage::Treatment => {
            let chosen = progress.and_then(|p| p.treatment_selected.as_deref());
            Screen::Treatment {
                case_title: detail.title.clone(),
                options: detail
                    .treatment_options
                    .iter()
                    .map(|option| TreatmentOptionView {
                        id: option.id.clone(),
                        name: option.name.clone(),
                        description: option.description.clone(),
                        selected: chosen == Some(option.id.as_str()),
                        is_recommended: chosen.map(|_| option.is_recommended),
                        outcomes: chosen.map(|_| option.outcomes.clone()),
                    })
                    .collect(),
                choice_confirmed: chosen.is_some(),
            }
        }
        Stage::Results => Screen::Results {
            case_title: detail.title.clone(),
            score: progress.and_then(|p| p.score),
            max_score: MAX_SCORE,
            percent_complete: progress.map(CaseProgress::percent_complete).unwrap_or(0),
            diagnosis_correct: progress
                .and_then(|p| p.diagnosis_selected.as_deref())
                .and_then(|id| detail.diagnosis_option(id))
                .map(|option| option.is_correct),
            treatment_recommended: progress
                .and_then(|p| p.treatment_selected.as_deref())
                .and_then(|id| detail.treatment_option(id))
                .map(|option| option.is_recommended),
        },
        Stage::ExpertComment => Screen::ExpertComment {
            case_title: detail.title.clone(),
            commentary: detail.expert_commentary.clone(),
        },
        // Top-level stages are handled before this function is reached.
        Stage::Categories | Stage::Cases => Screen::Loading,
    }
}

/// Chrome for the current state; also used by `update` to drive the host.
pub fn chrome_for(model: &Model) -> ChromeView {
    let current = model.navigation.current();
    let main_button = if model.phase != StartupPhase::Ready
        || !current.is_case_stage()
        || model.current_detail().is_none()
    {
        MainButtonView::hidden()
    } else {
        match current {
            Stage::Categories | Stage::Cases => MainButtonView::hidden(),
            Stage::PatientNotes | Stage::PatientStories | Stage::Consultation => {
                MainButtonView::shown(BUTTON_CONTINUE, true)
            }
            Stage::Diagnosis => MainButtonView::shown(
                BUTTON_CONFIRM_DIAGNOSIS,
                model
                    .current_progress()
                    .is_some_and(|p| p.diagnosis_selected.is_some()),
            ),
            Stage::Treatment => MainButtonView::shown(
                BUTTON_CONFIRM_TREATMENT,
                model
                    .current_progress()
                    .is_some_and(|p| p.treatment_selected.is_some()),
            ),
            Stage::Results => MainButtonView::shown(BUTTON_CONTINUE, true),
            Stage::ExpertComment => MainButtonView::shown(BUTTON_FINISH_CASE, true),
        }
    };

    ChromeView {
        main_button,
        back_button_visible: model.phase == StartupPhase::Ready && model.navigation.can_go_back(),
        show_dev_controls: model.is_simulated_host(),
    }
}
