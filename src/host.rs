//! Host environment adapter. The core is written against one [`HostBridge`]
//! trait; shells hand over a real bridge when the app runs inside Telegram
//! and we fall back to [`SimulatedHost`] everywhere else (plain browser
//! tabs, native test harnesses). Detection happens once at startup and the
//! chosen bridge never changes for the lifetime of the session.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capabilities::{
    ChromeOperation, SourceError, SourceOperation, SourceOutput, SourceResult, StoreError,
    StoreOperation, StoreOutput, StoreResult, StoreTier, MAX_KEY_LENGTH, MAX_VALUE_BYTES,
};
use crate::catalog::{CaseDetail, CaseSummary, Category};
use crate::model::{CaseId, CategoryId};

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HostMode {
    Real,
    Simulated,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostDescriptor {
    pub mode: HostMode,
    pub platform: String,
    pub color_scheme: ColorScheme,
}

impl HostDescriptor {
    pub fn simulated() -> Self {
        Self {
            mode: HostMode::Simulated,
            platform: "web".to_string(),
            color_scheme: ColorScheme::Light,
        }
    }
}

/// What a shell must provide for the core to run against a host. Real
/// bridges wrap the Telegram WebApp object; [`SimulatedHost`] backs the
/// same surface with in-memory state.
#[async_trait]
pub trait HostBridge: Send {
    fn descriptor(&self) -> HostDescriptor;

    fn apply_chrome(&mut self, operation: &ChromeOperation);

    async fn store_get(&mut self, tier: StoreTier, key: &str)
        -> Result<Option<String>, StoreError>;

    async fn store_get_batch(
        &mut self,
        tier: StoreTier,
        keys: &[String],
    ) -> Result<Vec<Option<String>>, StoreError>;

    async fn store_set(&mut self, tier: StoreTier, key: &str, value: &str)
        -> Result<(), StoreError>;

    async fn store_remove(&mut self, tier: StoreTier, key: &str) -> Result<(), StoreError>;
}

/// Picks the bridge for this session. Runs once at startup; `real` is
/// `Some` only when the shell found a live Telegram WebApp environment.
pub fn detect(real: Option<Box<dyn HostBridge>>) -> Box<dyn HostBridge> {
    match real {
        Some(bridge) => {
            debug!(platform = %bridge.descriptor().platform, "real host bridge attached");
            bridge
        }
        None => {
            debug!("no host environment detected, using simulated host");
            Box::new(SimulatedHost::new())
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MainButtonState {
    pub visible: bool,
    pub text: String,
    pub enabled: bool,
}

/// In-memory stand-in for the Telegram host. The device tier behaves like
/// localStorage; the cloud tier mimics CloudStorage, including its size
/// caps and an availability switch for exercising degraded sessions. Chrome
/// operations are recorded instead of rendered.
pub struct SimulatedHost {
    descriptor: HostDescriptor,
    device: HashMap<String, String>,
    cloud: HashMap<String, String>,
    cloud_available: bool,
    pub ready_signaled: bool,
    pub main_button: MainButtonState,
    pub back_button_visible: bool,
    pub haptics: Vec<String>,
    categories: Vec<Category>,
    cases: HashMap<CategoryId, Vec<CaseSummary>>,
    details: HashMap<CaseId, CaseDetail>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self {
            descriptor: HostDescriptor::simulated(),
            device: HashMap::new(),
            cloud: HashMap::new(),
            cloud_available: true,
            ready_signaled: false,
            main_button: MainButtonState::default(),
            back_button_visible: false,
            haptics: Vec::new(),
            categories: Vec::new(),
            cases: HashMap::new(),
            details: HashMap::new(),
        }
    }

    pub fn with_unavailable_cloud() -> Self {
        let mut host = Self::new();
        host.cloud_available = false;
        host
    }

    pub fn set_cloud_available(&mut self, available: bool) {
        self.cloud_available = available;
    }

    pub fn seed_device(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.device.insert(key.into(), value.into());
    }

    pub fn seed_cloud(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.cloud.insert(key.into(), value.into());
    }

    pub fn device_value(&self, key: &str) -> Option<&str> {
        self.device.get(key).map(String::as_str)
    }

    pub fn cloud_value(&self, key: &str) -> Option<&str> {
        self.cloud.get(key).map(String::as_str)
    }

    pub fn seed_catalog(
        &mut self,
        categories: Vec<Category>,
        cases: Vec<(CategoryId, Vec<CaseSummary>)>,
        details: Vec<CaseDetail>,
    ) {
        self.categories = categories;
        for (category, list) in cases {
            self.cases.insert(category, list);
        }
        for detail in details {
            self.details.insert(detail.id.clone(), detail);
        }
    }

    /// Resolves a storage effect the way the real bridge would, against the
    /// in-memory tiers.
    pub fn dispatch_store(&mut self, operation: &StoreOperation) -> StoreResult {
        match operation {
            StoreOperation::Get { tier, key } => Ok(StoreOutput::Value(self.get(*tier, key)?)),
            StoreOperation::GetBatch { tier, keys } => {
                let mut values = Vec::with_capacity(keys.len());
                for key in keys {
                    values.push(self.get(*tier, key)?);
                }
                Ok(StoreOutput::Values(values))
            }
            StoreOperation::Set { tier, key, value } => {
                self.set(*tier, key, value)?;
                Ok(StoreOutput::Done)
            }
            StoreOperation::Remove { tier, key } => {
                self.remove(*tier, key)?;
                Ok(StoreOutput::Done)
            }
        }
    }

    /// Resolves a content effect against the seeded catalog.
    pub fn dispatch_source(&mut self, operation: &SourceOperation) -> SourceResult {
        match operation {
            SourceOperation::Categories => Ok(SourceOutput::Categories(self.categories.clone())),
            SourceOperation::Cases { category_id } => {
                let cases = self.cases.get(category_id).cloned().unwrap_or_default();
                Ok(SourceOutput::Cases(cases))
            }
            SourceOperation::Detail { case_id } => match self.details.get(case_id) {
                Some(detail) => Ok(SourceOutput::Detail(Box::new(detail.clone()))),
                None => Err(SourceError::NotFound {
                    resource: format!("case {case_id}"),
                }),
            },
        }
    }

    /// Records a chrome effect so tests can assert on what the host was
    /// told to show.
    pub fn dispatch_chrome(&mut self, operation: &ChromeOperation) {
        match operation {
            ChromeOperation::Ready => self.ready_signaled = true,
            ChromeOperation::MainButton {
                visible,
                text,
                enabled,
            } => {
                self.main_button = MainButtonState {
                    visible: *visible,
                    text: text.clone(),
                    enabled: *enabled,
                };
            }
            ChromeOperation::BackButton { visible } => self.back_button_visible = *visible,
            ChromeOperation::HapticImpact { style } => {
                self.haptics.push(format!("impact:{style}"));
            }
            ChromeOperation::HapticNotification { kind } => {
                self.haptics.push(format!("notification:{kind}"));
            }
            ChromeOperation::HapticSelection => self.haptics.push("selection".to_string()),
        }
    }

    fn get(&self, tier: StoreTier, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.tier_map(tier)?.get(key).cloned())
    }

    fn set(&mut self, tier: StoreTier, key: &str, value: &str) -> Result<(), StoreError> {
        if tier == StoreTier::Cloud {
            if key.len() > MAX_KEY_LENGTH {
                return Err(StoreError::InvalidKey {
                    reason: "too long".into(),
                });
            }
            if value.len() > MAX_VALUE_BYTES {
                return Err(StoreError::ValueTooLarge {
                    size: value.len(),
                    max: MAX_VALUE_BYTES,
                });
            }
        }
        self.tier_map_mut(tier)?
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, tier: StoreTier, key: &str) -> Result<(), StoreError> {
        self.tier_map_mut(tier)?.remove(key);
        Ok(())
    }

    fn tier_map(&self, tier: StoreTier) -> Result<&HashMap<String, String>, StoreError> {
        match tier {
            StoreTier::Device => Ok(&self.device),
            StoreTier::Cloud if self.cloud_available => Ok(&self.cloud),
            StoreTier::Cloud => Err(StoreError::Unavailable {
                tier: StoreTier::Cloud,
            }),
        }
    }

    fn tier_map_mut(&mut self, tier: StoreTier) -> Result<&mut HashMap<String, String>, StoreError> {
        match tier {
            StoreTier::Device => Ok(&mut self.device),
            StoreTier::Cloud if self.cloud_available => Ok(&mut self.cloud),
            StoreTier::Cloud => Err(StoreError::Unavailable {
                tier: StoreTier::Cloud,
            }),
        }
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostBridge for SimulatedHost {
    fn descriptor(&self) -> HostDescriptor {
        self.descriptor.clone()
    }

    fn apply_chrome(&mut self, operation: &ChromeOperation) {
        self.dispatch_chrome(operation);
    }

    async fn store_get(
        &mut self,
        tier: StoreTier,
        key: &str,
    ) -> Result<Option<String>, StoreError> {
        self.get(tier, key)
    }

    async fn store_get_batch(
        &mut self,
        tier: StoreTier,
        keys: &[String],
    ) -> Result<Vec<Option<String>>, StoreError> {
        keys.iter().map(|key| self.get(tier, key)).collect()
    }

    async fn store_set(
        &mut self,
        tier: StoreTier,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.set(tier, key, value)
    }

    async fn store_remove(&mut self, tier: StoreTier, key: &str) -> Result<(), StoreError> {
        self.remove(tier, key)
    }
}
