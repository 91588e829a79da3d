// lib.rs - psytrainer-core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod capabilities;
pub mod catalog;
pub mod event;
pub mod host;
pub mod model;
pub mod navigation;
pub mod progress;
pub mod stage;
pub mod stage_memory;
pub mod view;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use crux_core::App as CruxApp;
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

/// Store keys of the persisted session. The names are shared with earlier
/// releases; changing them orphans every user's saved state.
pub const NAVIGATION_STATE_KEY: &str = "psychiatric_trainer_navigation_state";
pub const CASES_STAGES_KEY: &str = "psychiatric_trainer_cases_stages";
pub const CURRENT_CASE_KEY: &str = "psychiatric_trainer_current_case_id";
pub const CURRENT_CATEGORY_KEY: &str = "psychiatric_trainer_current_category_id";

/// Batched restore read, in the order `Event::SessionLoaded` expects.
pub const SESSION_KEYS: [&str; 4] = [
    NAVIGATION_STATE_KEY,
    CASES_STAGES_KEY,
    CURRENT_CASE_KEY,
    CURRENT_CATEGORY_KEY,
];

#[must_use]
pub fn get_current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub mod app {
    use tracing::{debug, warn};

    use crate::capabilities::{
        Capabilities, ImpactStyle, NotificationKind, SourceOutput, SourceResult,
    };
    use crate::event::Event;
    use crate::model::{CaseId, CategoryId, Model, StartupPhase};
    use crate::navigation::NavigationState;
    use crate::progress::{self, score_for, CaseProgress};
    use crate::stage::Stage;
    use crate::stage_memory::StageMemory;
    use crate::view::{self, ViewModel};
    use crate::{get_current_time_ms, CURRENT_CASE_KEY, CURRENT_CATEGORY_KEY};
    use crate::{CASES_STAGES_KEY, NAVIGATION_STATE_KEY, SESSION_KEYS};

    #[derive(Default)]
    pub struct App;

    impl App {
        fn persist_navigation(model: &Model, caps: &Capabilities) {
            match model.navigation.encode() {
                Ok(raw) => caps.store.save(NAVIGATION_STATE_KEY, raw),
                Err(error) => warn!(%error, "navigation snapshot not persisted"),
            }
        }

        fn persist_stage_memory(model: &Model, caps: &Capabilities) {
            match model.stage_memory.encode() {
                Ok(raw) => caps.store.save(CASES_STAGES_KEY, raw),
                Err(error) => warn!(%error, "stage memory not persisted"),
            }
        }

        fn persist_progress(model: &Model, caps: &Capabilities, case_id: &CaseId) {
            let Some(record) = model.progress.get(case_id) else {
                return;
            };
            match record.encode() {
                Ok(raw) => caps.store.save(progress::storage_key(case_id), raw),
                Err(error) => warn!(%error, case = %case_id, "progress record not persisted"),
            }
        }

        /// Mirrors the host chrome to what the view model reports.
        fn sync_chrome(model: &Model, caps: &Capabilities) {
            let chrome = view::chrome_for(model);
            caps.chrome.main_button(
                chrome.main_button.visible,
                chrome.main_button.text,
                chrome.main_button.enabled,
            );
            caps.chrome.back_button(chrome.back_button_visible);
        }

        /// Stage to fall back to when a transition cannot be honored.
        fn safe_default(model: &Model) -> Stage {
            if model.selection.category_id.is_some() {
                Stage::Cases
            } else {
                Stage::Categories
            }
        }

        /// The one forward-transition path. Persists the navigation
        /// snapshot, records per-case stage memory, and keeps the host
        /// chrome in step. A case stage requested with no case selected is
        /// redirected to the top-level screens.
        fn advance_to(model: &mut Model, caps: &Capabilities, stage: Stage) {
            let stage = if stage.is_case_stage() && model.selection.case_id.is_none() {
                warn!(requested = %stage, "case stage requested with no case selected");
                Stage::Categories
            } else {
                stage
            };

            if !model.navigation.advance(stage) {
                return;
            }
            Self::persist_navigation(model, caps);

            if stage.is_case_stage() {
                if let Some(case_id) = model.selection.case_id.clone() {
                    if model.stage_memory.record(&case_id, stage) {
                        Self::persist_stage_memory(model, caps);
                    }
                    let now = get_current_time_ms();
                    if let Some(record) = model.progress.get_mut(&case_id) {
                        if record.set_current_stage(stage, now) {
                            Self::persist_progress(model, caps, &case_id);
                        }
                    }
                }
            }

            caps.chrome.impact(ImpactStyle::Light);
            Self::sync_chrome(model, caps);
            caps.render.render();
        }

        fn handle_back(model: &mut Model, caps: &Capabilities) {
            if model.navigation.go_back().is_none() {
                return;
            }
            // Per-case memory is deliberately not rewritten here: re-entry
            // resumes at the furthest stage reached.
            Self::persist_navigation(model, caps);
            caps.chrome.impact(ImpactStyle::Light);
            Self::sync_chrome(model, caps);
            caps.render.render();
        }

        /// Main-button press: completes the current stage and moves the
        /// walkthrough forward.
        fn handle_advance(model: &mut Model, caps: &Capabilities) {
            let current = model.navigation.current();
            if !current.is_case_stage() {
                debug!(stage = %current, "advance ignored outside the case flow");
                return;
            }
            let Some(case_id) = model.selection.case_id.clone() else {
                Self::advance_to(model, caps, Stage::Categories);
                return;
            };

            let now = get_current_time_ms();
            let record = model
                .progress
                .entry(case_id.clone())
                .or_insert_with(|| CaseProgress::started(current, now));

            // The confirm stages are guarded even though the button is
            // disabled until a choice exists.
            match current {
                Stage::Diagnosis if record.diagnosis_selected.is_none() => {
                    debug!("diagnosis confirm without a selection ignored");
                    return;
                }
                Stage::Treatment if record.treatment_selected.is_none() => {
                    debug!("treatment confirm without a selection ignored");
                    return;
                }
                _ => {}
            }

            record.complete_stage(current, now);

            if current == Stage::Treatment {
                let diagnosis_id = record.diagnosis_selected.clone();
                let treatment_id = record.treatment_selected.clone();
                if let Some(detail) = model.selection.detail(&case_id) {
                    let score = score_for(
                        diagnosis_id
                            .as_deref()
                            .and_then(|id| detail.diagnosis_option(id))
                            .map(|o| o.is_correct),
                        treatment_id
                            .as_deref()
                            .and_then(|id| detail.treatment_option(id))
                            .map(|o| o.is_recommended),
                    );
                    if let Some(record) = model.progress.get_mut(&case_id) {
                        record.set_score(score, now);
                    }
                }
            }

            let case_completed = model
                .progress
                .get(&case_id)
                .is_some_and(|record| record.completed);
            Self::persist_progress(model, caps, &case_id);

            match current.next_case_stage() {
                Some(next) => Self::advance_to(model, caps, next),
                None => {
                    // Finish case: back to the case list.
                    if case_completed {
                        caps.chrome.notification(NotificationKind::Success);
                    }
                    Self::advance_to(model, caps, Stage::Cases);
                }
            }
        }

        /// Opens a case, resuming at the last stage visited within it.
        fn enter_case(model: &mut Model, caps: &Capabilities, case_id: &CaseId) {
            let resume = model.stage_memory.resume_stage(case_id);
            debug!(case = %case_id, stage = %resume, "entering case");
            Self::advance_to(model, caps, resume);
        }

        fn request_detail(model: &mut Model, caps: &Capabilities, case_id: &CaseId) {
            if model.selection.has_detail(case_id) {
                return;
            }
            model.case_loading = true;
            let requested = case_id.clone();
            caps.source
                .detail(case_id.clone(), move |result| Event::CaseDetailLoaded {
                    case_id: requested.clone(),
                    result,
                });
        }

        fn request_progress(model: &Model, caps: &Capabilities, case_id: &CaseId) {
            if model.progress.contains_key(case_id) {
                return;
            }
            let requested = case_id.clone();
            caps.store
                .load(progress::storage_key(case_id), move |raw| {
                    Event::ProgressLoaded {
                        case_id: requested.clone(),
                        raw,
                    }
                });
        }

        fn request_cases(model: &Model, caps: &Capabilities, category_id: &CategoryId) {
            if model.catalog.cases_for(category_id).is_some() {
                return;
            }
            let requested = category_id.clone();
            caps.source
                .cases(category_id.clone(), move |result| Event::CasesLoaded {
                    category_id: requested.clone(),
                    result,
                });
        }

        /// Adopts persisted session state, reconciling the navigation
        /// snapshot against the selected case: the case id wins, and the
        /// stage is re-derived from per-case memory when they disagree.
        fn restore_session(model: &mut Model, caps: &Capabilities, values: Vec<Option<String>>) {
            if values.len() != SESSION_KEYS.len() {
                warn!(
                    got = values.len(),
                    expected = SESSION_KEYS.len(),
                    "session read misaligned, starting fresh"
                );
            }
            let mut values = values.into_iter();
            let nav_raw = values.next().flatten();
            let memory_raw = values.next().flatten();
            let case_raw = values.next().flatten();
            let category_raw = values.next().flatten();

            if let Some(raw) = memory_raw {
                match StageMemory::decode(&raw) {
                    Ok(memory) => model.stage_memory = memory,
                    Err(error) => warn!(%error, "discarding persisted stage memory"),
                }
            }
            if let Some(raw) = category_raw {
                match CategoryId::parse(raw) {
                    Ok(id) => {
                        model.selection.select_category(id);
                    }
                    Err(error) => warn!(%error, "discarding persisted category id"),
                }
            }
            if let Some(raw) = case_raw {
                match CaseId::parse(raw) {
                    Ok(id) => {
                        model.selection.select_case(id);
                    }
                    Err(error) => warn!(%error, "discarding persisted case id"),
                }
            }

            let mut restored = false;
            if let Some(raw) = nav_raw {
                match NavigationState::decode(&raw) {
                    Ok(navigation) => {
                        if navigation.current().is_case_stage()
                            && model.selection.case_id.is_none()
                        {
                            warn!("snapshot resumes a case stage with no case id, starting fresh");
                        } else {
                            model.navigation = navigation;
                            restored = true;
                        }
                    }
                    Err(error) => warn!(%error, "discarding persisted navigation"),
                }
            }
            debug!(restored, stage = %model.navigation.current(), "session restore complete");

            model.phase = StartupPhase::Ready;

            if restored {
                if let Some(category_id) = model.selection.category_id.clone() {
                    Self::request_cases(model, caps, &category_id);
                }
                if let Some(case_id) = model.selection.case_id.clone() {
                    if model.navigation.current().is_case_stage() {
                        let resume = model.stage_memory.resume_stage(&case_id);
                        if model.navigation.advance(resume) {
                            Self::persist_navigation(model, caps);
                        }
                        Self::request_detail(model, caps, &case_id);
                    }
                    Self::request_progress(model, caps, &case_id);
                }
            }

            Self::sync_chrome(model, caps);
            caps.render.render();
        }

        fn handle_categories_loaded(model: &mut Model, result: SourceResult) {
            match result {
                Ok(SourceOutput::Categories(categories)) => {
                    debug!(count = categories.len(), "categories loaded");
                    model.catalog.set_categories(categories);
                }
                Ok(other) => {
                    warn!(?other, "unexpected payload for a categories request");
                }
                Err(error) => {
                    warn!(%error, "category list unavailable");
                    model.catalog.set_categories(Vec::new());
                }
            }
        }

        fn handle_cases_loaded(model: &mut Model, category_id: CategoryId, result: SourceResult) {
            match result {
                Ok(SourceOutput::Cases(cases)) => {
                    debug!(category = %category_id, count = cases.len(), "case list loaded");
                    model.catalog.insert_cases(category_id, cases);
                }
                Ok(other) => {
                    warn!(?other, "unexpected payload for a case list request");
                }
                Err(error) => {
                    warn!(%error, category = %category_id, "case list unavailable");
                    model.catalog.insert_cases(category_id, Vec::new());
                }
            }
        }

        fn handle_detail_loaded(
            model: &mut Model,
            caps: &Capabilities,
            case_id: &CaseId,
            result: SourceResult,
        ) {
            model.case_loading = false;
            match result {
                Ok(SourceOutput::Detail(detail)) => {
                    if detail.id != *case_id {
                        warn!(requested = %case_id, got = %detail.id, "mismatched case detail ignored");
                        return;
                    }
                    model.selection.insert_detail(*detail);
                }
                Ok(other) => {
                    warn!(?other, "unexpected payload for a case detail request");
                }
                Err(error) => {
                    warn!(%error, case = %case_id, "case detail unavailable");
                    caps.chrome.notification(NotificationKind::Error);
                    let fallback = Self::safe_default(model);
                    Self::advance_to(model, caps, fallback);
                }
            }
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            match event {
                Event::Started => {
                    model.phase = StartupPhase::Restoring;
                    caps.chrome.ready();
                    caps.source.categories(Event::CategoriesLoaded);
                    caps.store.load_batch(
                        SESSION_KEYS.iter().map(ToString::to_string).collect(),
                        |values| Event::SessionLoaded { values },
                    );
                    caps.render.render();
                }

                Event::HostDetected { descriptor } => {
                    debug!(mode = ?descriptor.mode, platform = %descriptor.platform, "host detected");
                    model.host = Some(descriptor);
                    caps.render.render();
                }

                Event::SessionLoaded { values } => {
                    Self::restore_session(model, caps, values);
                }

                Event::CategoriesLoaded(result) => {
                    Self::handle_categories_loaded(model, result);
                    caps.render.render();
                }

                Event::CategorySelected(category_id) => {
                    if category_id.is_blank() {
                        warn!("blank category id ignored");
                        return;
                    }
                    model.selection.select_category(category_id.clone());
                    caps.store.save(CURRENT_CATEGORY_KEY, category_id.as_str());
                    Self::request_cases(model, caps, &category_id);
                    caps.chrome.selection_changed();
                    Self::advance_to(model, caps, Stage::Cases);
                    caps.render.render();
                }

                Event::CasesLoaded {
                    category_id,
                    result,
                } => {
                    Self::handle_cases_loaded(model, category_id, result);
                    caps.render.render();
                }

                Event::CaseSelected(case_id) => {
                    if case_id.is_blank() {
                        warn!("blank case id ignored");
                        return;
                    }
                    model.selection.select_case(case_id.clone());
                    caps.store.save(CURRENT_CASE_KEY, case_id.as_str());
                    Self::request_detail(model, caps, &case_id);
                    Self::request_progress(model, caps, &case_id);
                    caps.chrome.selection_changed();
                    Self::enter_case(model, caps, &case_id);
                    caps.render.render();
                }

                Event::CaseDetailLoaded { case_id, result } => {
                    Self::handle_detail_loaded(model, caps, &case_id, result);
                    Self::sync_chrome(model, caps);
                    caps.render.render();
                }

                Event::ProgressLoaded { case_id, raw } => {
                    if let Some(raw) = raw {
                        match CaseProgress::decode(&raw) {
                            // A record built up since the read was issued
                            // wins over the persisted one.
                            Ok(record) => {
                                model.progress.entry(case_id).or_insert(record);
                            }
                            Err(error) => {
                                warn!(%error, case = %case_id, "discarding persisted progress");
                            }
                        }
                    }
                    Self::sync_chrome(model, caps);
                    caps.render.render();
                }

                Event::StageRequested(stage) => {
                    Self::advance_to(model, caps, stage);
                }

                Event::AdvanceRequested | Event::MainButtonPressed => {
                    Self::handle_advance(model, caps);
                }

                Event::BackRequested | Event::BackButtonPressed => {
                    Self::handle_back(model, caps);
                }

                Event::DiagnosisChosen { option_id } => {
                    let Some(case_id) = model.selection.case_id.clone() else {
                        warn!("diagnosis chosen with no case selected");
                        return;
                    };
                    if model
                        .selection
                        .detail(&case_id)
                        .is_some_and(|detail| detail.diagnosis_option(&option_id).is_none())
                    {
                        warn!(option = %option_id, "unknown diagnosis option ignored");
                        return;
                    }
                    let now = get_current_time_ms();
                    model
                        .progress
                        .entry(case_id.clone())
                        .or_insert_with(|| CaseProgress::started(Stage::Diagnosis, now))
                        .record_diagnosis(option_id, now);
                    Self::persist_progress(model, caps, &case_id);
                    caps.chrome.selection_changed();
                    Self::sync_chrome(model, caps);
                    caps.render.render();
                }

                Event::TreatmentChosen { option_id } => {
                    let Some(case_id) = model.selection.case_id.clone() else {
                        warn!("treatment chosen with no case selected");
                        return;
                    };
                    if model
                        .selection
                        .detail(&case_id)
                        .is_some_and(|detail| detail.treatment_option(&option_id).is_none())
                    {
                        warn!(option = %option_id, "unknown treatment option ignored");
                        return;
                    }
                    let now = get_current_time_ms();
                    model
                        .progress
                        .entry(case_id.clone())
                        .or_insert_with(|| CaseProgress::started(Stage::Treatment, now))
                        .record_treatment(option_id, now);
                    Self::persist_progress(model, caps, &case_id);
                    caps.chrome.selection_changed();
                    Self::sync_chrome(model, caps);
                    caps.render.render();
                }

                Event::SessionReset => {
                    debug!("session reset");
                    model.navigation.reset();
                    model.selection.reset();
                    model.case_loading = false;
                    Self::persist_navigation(model, caps);
                    caps.store.remove(CURRENT_CASE_KEY);
                    caps.store.remove(CURRENT_CATEGORY_KEY);
                    // Stage memory and progress records survive a reset.
                    Self::sync_chrome(model, caps);
                    caps.render.render();
                }

                Event::CaseRestarted { case_id } => {
                    if case_id.is_blank() {
                        warn!("blank case id ignored");
                        return;
                    }
                    debug!(case = %case_id, "case restarted");
                    if model.stage_memory.clear(&case_id) {
                        Self::persist_stage_memory(model, caps);
                    }
                    model.progress.remove(&case_id);
                    caps.store.remove(progress::storage_key(&case_id));
                    model.selection.select_case(case_id.clone());
                    caps.store.save(CURRENT_CASE_KEY, case_id.as_str());
                    Self::request_detail(model, caps, &case_id);
                    Self::advance_to(model, caps, Stage::PatientNotes);
                    caps.render.render();
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            view::build(model)
        }
    }
}
