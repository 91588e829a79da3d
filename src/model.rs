use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::capabilities::MAX_KEY_LENGTH;
use crate::catalog::{CaseDetail, CaseSummary, Category};
use crate::host::{HostDescriptor, HostMode};
use crate::navigation::NavigationState;
use crate::progress::{CaseProgress, STORAGE_KEY_PREFIX};
use crate::stage_memory::StageMemory;

/// Ids become store keys, sometimes prefixed (per-case progress records),
/// so the cap leaves room for the longest prefix within the key limit.
pub const MAX_ID_LENGTH: usize = MAX_KEY_LENGTH - STORAGE_KEY_PREFIX.len();
/// Loaded case details kept in memory at once.
pub const CASE_CACHE_CAPACITY: usize = 16;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("{label} is empty")]
    Empty { label: &'static str },

    #[error("{label} too long: {len} chars, max {max}")]
    TooLong {
        label: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{label} contains control characters")]
    InvalidChars { label: &'static str },
}

fn validate_id(raw: &str, label: &'static str) -> Result<(), IdError> {
    if raw.trim().is_empty() {
        return Err(IdError::Empty { label });
    }
    if raw.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong {
            label,
            len: raw.len(),
            max: MAX_ID_LENGTH,
        });
    }
    if raw.chars().any(char::is_control) {
        return Err(IdError::InvalidChars { label });
    }
    Ok(())
}

macro_rules! typed_id {
    ($name:ident, $label:literal) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Construction boundary for ids arriving from outside the core.
            pub fn parse(s: impl Into<String>) -> Result<Self, IdError> {
                let s = s.into();
                validate_id(&s, $label)?;
                Ok(Self(s))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(CaseId, "case id");
typed_id!(CategoryId, "category id");

/// Where the core is in its startup sequence. This is the only
/// representation of "no stage yet": [`crate::stage::Stage`] has no unset
/// variant, so an uninitialized stage can never leak into history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupPhase {
    #[default]
    Booting,
    Restoring,
    Ready,
}

/// Reference data fetched from the case-data provider.
#[derive(Debug, Default)]
pub struct CatalogState {
    pub categories: Vec<Category>,
    pub categories_loaded: bool,
    cases: HashMap<CategoryId, Vec<CaseSummary>>,
}

impl CatalogState {
    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
        self.categories_loaded = true;
    }

    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| &c.id == id)
    }

    pub fn insert_cases(&mut self, category_id: CategoryId, cases: Vec<CaseSummary>) {
        self.cases.insert(category_id, cases);
    }

    pub fn cases_for(&self, category_id: &CategoryId) -> Option<&[CaseSummary]> {
        self.cases.get(category_id).map(Vec::as_slice)
    }
}

/// Currently selected category/case plus the bounded cache of loaded
/// case details.
pub struct SelectionState {
    pub category_id: Option<CategoryId>,
    pub case_id: Option<CaseId>,
    details: LruCache<CaseId, CaseDetail>,
}

impl Default for SelectionState {
    fn default() -> Self {
        let capacity = NonZeroUsize::new(CASE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            category_id: None,
            case_id: None,
            details: LruCache::new(capacity),
        }
    }
}

impl fmt::Debug for SelectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionState")
            .field("category_id", &self.category_id)
            .field("case_id", &self.case_id)
            .field("cached_details", &self.details.len())
            .finish()
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the selection actually changed.
    pub fn select_category(&mut self, id: CategoryId) -> bool {
        if self.category_id.as_ref() == Some(&id) {
            return false;
        }
        self.category_id = Some(id);
        true
    }

    /// Returns whether the selection actually changed. Marks the detail as
    /// recently used when it is already cached.
    pub fn select_case(&mut self, id: CaseId) -> bool {
        let changed = self.case_id.as_ref() != Some(&id);
        self.details.get(&id);
        self.case_id = Some(id);
        changed
    }

    /// The only mutator that adds to the detail cache.
    pub fn insert_detail(&mut self, detail: CaseDetail) {
        self.details.put(detail.id.clone(), detail);
    }

    pub fn detail(&self, id: &CaseId) -> Option<&CaseDetail> {
        self.details.peek(id)
    }

    pub fn has_detail(&self, id: &CaseId) -> bool {
        self.details.contains(id)
    }

    pub fn current_detail(&self) -> Option<&CaseDetail> {
        self.case_id.as_ref().and_then(|id| self.details.peek(id))
    }

    pub fn cached_details(&self) -> usize {
        self.details.len()
    }

    /// Full reset: clears both identifiers and the detail cache.
    pub fn reset(&mut self) {
        self.category_id = None;
        self.case_id = None;
        self.details.clear();
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub phase: StartupPhase,
    pub navigation: NavigationState,
    pub stage_memory: StageMemory,
    pub selection: SelectionState,
    pub progress: HashMap<CaseId, CaseProgress>,
    pub catalog: CatalogState,
    pub host: Option<HostDescriptor>,
    pub case_loading: bool,
}

impl Model {
    pub fn current_detail(&self) -> Option<&CaseDetail> {
        self.selection.current_detail()
    }

    pub fn current_progress(&self) -> Option<&CaseProgress> {
        self.selection
            .case_id
            .as_ref()
            .and_then(|id| self.progress.get(id))
    }

    pub fn is_simulated_host(&self) -> bool {
        self.host
            .as_ref()
            .is_some_and(|h| h.mode == HostMode::Simulated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ExpertCommentary;

    fn make_detail(id: &str) -> CaseDetail {
        CaseDetail {
            id: CaseId::new(id),
            category_id: CategoryId::new("mood-disorders"),
            title: format!("Case {id}"),
            patient_name: "Anna".into(),
            patient_age: 29,
            full_description: String::new(),
            patient_notes: Vec::new(),
            patient_stories: Vec::new(),
            consultation_chat_id: None,
            diagnosis_options: Vec::new(),
            treatment_options: Vec::new(),
            expert_commentary: ExpertCommentary {
                title: String::new(),
                basic_content: String::new(),
                extended_content: String::new(),
                video_url: None,
            },
        }
    }

    #[test]
    fn id_parse_validates() {
        assert!(CaseId::parse("postpartum-depression").is_ok());
        assert!(matches!(
            CaseId::parse(""),
            Err(IdError::Empty { .. })
        ));
        assert!(matches!(
            CaseId::parse("   "),
            Err(IdError::Empty { .. })
        ));
        assert!(matches!(
            CaseId::parse("a".repeat(MAX_ID_LENGTH + 1)),
            Err(IdError::TooLong { .. })
        ));
        assert!(matches!(
            CaseId::parse("bad\u{0}id"),
            Err(IdError::InvalidChars { .. })
        ));
    }

    #[test]
    fn blank_detection() {
        assert!(CaseId::new("").is_blank());
        assert!(CaseId::new("  ").is_blank());
        assert!(!CaseId::new("ppd").is_blank());
    }

    #[test]
    fn typed_ids_are_not_interchangeable() {
        let case = CaseId::new("abc");
        let category = CategoryId::new("abc");
        // Mixing these types is a compile error; this test documents the intent.
        assert_eq!(case.as_str(), category.as_str());
    }

    #[test]
    fn selection_tracks_changes() {
        let mut selection = SelectionState::new();

        assert!(selection.select_category(CategoryId::new("mood-disorders")));
        assert!(!selection.select_category(CategoryId::new("mood-disorders")));
        assert!(selection.select_category(CategoryId::new("anxiety")));

        assert!(selection.select_case(CaseId::new("ppd")));
        assert!(!selection.select_case(CaseId::new("ppd")));
    }

    #[test]
    fn detail_cache_is_bounded() {
        let mut selection = SelectionState::new();
        for i in 0..=CASE_CACHE_CAPACITY {
            selection.insert_detail(make_detail(&format!("case-{i}")));
        }

        assert_eq!(selection.cached_details(), CASE_CACHE_CAPACITY);
        assert!(!selection.has_detail(&CaseId::new("case-0")));
        assert!(selection.has_detail(&CaseId::new(format!("case-{CASE_CACHE_CAPACITY}"))));
    }

    #[test]
    fn selecting_a_case_refreshes_its_cache_slot() {
        let mut selection = SelectionState::new();
        selection.insert_detail(make_detail("old"));
        for i in 1..CASE_CACHE_CAPACITY {
            selection.insert_detail(make_detail(&format!("case-{i}")));
        }

        // "old" is the least recently used entry; selecting it should keep
        // it alive past the next insertion.
        selection.select_case(CaseId::new("old"));
        selection.insert_detail(make_detail("overflow"));

        assert!(selection.has_detail(&CaseId::new("old")));
        assert!(!selection.has_detail(&CaseId::new("case-1")));
    }

    #[test]
    fn reset_clears_ids_and_cache() {
        let mut selection = SelectionState::new();
        selection.select_category(CategoryId::new("mood-disorders"));
        selection.select_case(CaseId::new("ppd"));
        selection.insert_detail(make_detail("ppd"));

        selection.reset();

        assert_eq!(selection.category_id, None);
        assert_eq!(selection.case_id, None);
        assert_eq!(selection.cached_details(), 0);
    }

    #[test]
    fn catalog_lookup() {
        let mut catalog = CatalogState::default();
        assert!(!catalog.categories_loaded);

        catalog.set_categories(vec![Category {
            id: CategoryId::new("mood-disorders"),
            name: "Mood Disorders".into(),
            description: String::new(),
            icon_url: None,
            background_url: None,
            is_available: true,
            coming_soon: false,
        }]);
        catalog.insert_cases(
            CategoryId::new("mood-disorders"),
            vec![CaseSummary {
                id: CaseId::new("ppd"),
                category_id: CategoryId::new("mood-disorders"),
                title: "Postpartum depression".into(),
                patient_name: "Anna".into(),
                patient_age: 29,
                short_description: String::new(),
                is_available: true,
            }],
        );

        assert!(catalog.categories_loaded);
        assert!(catalog.category(&CategoryId::new("mood-disorders")).is_some());
        assert_eq!(
            catalog
                .cases_for(&CategoryId::new("mood-disorders"))
                .map(<[CaseSummary]>::len),
            Some(1)
        );
        assert!(catalog.cases_for(&CategoryId::new("anxiety")).is_none());
    }

    #[test]
    fn model_progress_follows_selection() {
        let mut model = Model::default();
        assert!(model.current_progress().is_none());

        let case = CaseId::new("ppd");
        model.selection.select_case(case.clone());
        model.progress.insert(
            case,
            crate::progress::CaseProgress::started(crate::stage::Stage::PatientNotes, 1),
        );

        assert!(model.current_progress().is_some());
    }
}
