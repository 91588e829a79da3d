//! Tiered key-value storage capability. The device tier is always present
//! and authoritative for reads; the cloud tier syncs across devices and is
//! strictly best effort. Callers never see storage failures: reads degrade
//! to `None`, writes degrade to warnings.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Telegram CloudStorage caps keys at 128 chars and values at 4096 bytes;
/// the device tier follows the same bounds to keep the tiers mirrorable.
pub const MAX_KEY_LENGTH: usize = 128;
pub const MAX_VALUE_BYTES: usize = 4096;

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreTier {
    Device,
    Cloud,
}

impl fmt::Display for StoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreTier::Device => "device",
            StoreTier::Cloud => "cloud",
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum StoreOperation {
    Get {
        tier: StoreTier,
        key: String,
    },
    GetBatch {
        tier: StoreTier,
        keys: Vec<String>,
    },
    Set {
        tier: StoreTier,
        key: String,
        value: String,
    },
    Remove {
        tier: StoreTier,
        key: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum StoreOutput {
    /// Response to `Get`. `None` means the key is absent.
    Value(Option<String>),
    /// Response to `GetBatch`, aligned with the requested key order.
    Values(Vec<Option<String>>),
    /// Response to `Set` / `Remove`.
    Done,
}

#[derive(Error, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage tier {tier} unavailable")]
    Unavailable { tier: StoreTier },

    #[error("storage backend error: {message}")]
    Backend { message: String },

    #[error("value too large: {size} bytes, max {max}")]
    ValueTooLarge { size: usize, max: usize },

    #[error("invalid key: {reason}")]
    InvalidKey { reason: String },
}

impl StoreError {
    /// Whether retrying the same operation later could succeed. Shells may
    /// use this to requeue cloud mirrors.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable { .. } | StoreError::Backend { .. }
        )
    }
}

pub type StoreResult = Result<StoreOutput, StoreError>;

impl Operation for StoreOperation {
    type Output = StoreResult;
}

pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.trim().is_empty() {
        return Err(StoreError::InvalidKey {
            reason: "empty".into(),
        });
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(StoreError::InvalidKey {
            reason: "too long".into(),
        });
    }
    if key.chars().any(char::is_control) {
        return Err(StoreError::InvalidKey {
            reason: "control characters".into(),
        });
    }
    Ok(())
}

pub struct Store<Ev> {
    context: CapabilityContext<StoreOperation, Ev>,
}

impl<Ev> Capability<Ev> for Store<Ev> {
    type Operation = StoreOperation;
    type MappedSelf<MappedEv> = Store<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Store::new(self.context.map_event(f))
    }
}

impl<Ev> Store<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<StoreOperation, Ev>) -> Self {
        Self { context }
    }

    /// Reads one key through both tiers: device first, then cloud with a
    /// best-effort write-back into the device tier on a hit. Delivers
    /// `None` for absent keys and for every failure path.
    pub fn load<F>(&self, key: impl Into<String>, make_event: F)
    where
        F: Fn(Option<String>) -> Ev + Send + Sync + 'static,
    {
        let context = self.context.clone();
        let key = key.into();
        self.context.spawn(async move {
            if let Err(error) = validate_key(&key) {
                warn!(%error, key, "refusing storage read");
                context.update_app(make_event(None));
                return;
            }
            let value = read_tiered(&context, &key).await;
            context.update_app(make_event(value));
        });
    }

    /// Batch form of [`Store::load`]; the result is aligned with the
    /// requested key order.
    pub fn load_batch<F>(&self, keys: Vec<String>, make_event: F)
    where
        F: Fn(Vec<Option<String>>) -> Ev + Send + Sync + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let values = read_tiered_batch(&context, &keys).await;
            context.update_app(make_event(values));
        });
    }

    /// Fire-and-forget write: device tier first, then a best-effort cloud
    /// mirror. Values over the cloud cap skip the mirror.
    pub fn save(&self, key: impl Into<String>, value: impl Into<String>) {
        let context = self.context.clone();
        let key = key.into();
        let value = value.into();
        self.context.spawn(async move {
            if let Err(error) = validate_key(&key) {
                warn!(%error, key, "refusing storage write");
                return;
            }
            write_one(&context, StoreTier::Device, &key, &value).await;

            if value.len() > MAX_VALUE_BYTES {
                warn!(
                    key,
                    size = value.len(),
                    max = MAX_VALUE_BYTES,
                    "value exceeds cloud cap, skipping mirror"
                );
                return;
            }
            write_one(&context, StoreTier::Cloud, &key, &value).await;
        });
    }

    /// Fire-and-forget removal from both tiers.
    pub fn remove(&self, key: impl Into<String>) {
        let context = self.context.clone();
        let key = key.into();
        self.context.spawn(async move {
            if let Err(error) = validate_key(&key) {
                warn!(%error, key, "refusing storage removal");
                return;
            }
            for tier in [StoreTier::Device, StoreTier::Cloud] {
                let request = StoreOperation::Remove {
                    tier,
                    key: key.clone(),
                };
                match context.request_from_shell(request).await {
                    Ok(_) => {}
                    Err(error) => warn!(%error, %tier, key, "storage removal failed"),
                }
            }
        });
    }
}

async fn read_one<Ev: 'static>(
    context: &CapabilityContext<StoreOperation, Ev>,
    tier: StoreTier,
    key: &str,
) -> Option<String> {
    let request = StoreOperation::Get {
        tier,
        key: key.to_owned(),
    };
    match context.request_from_shell(request).await {
        Ok(StoreOutput::Value(value)) => value,
        Ok(other) => {
            warn!(?other, %tier, key, "unexpected storage response");
            None
        }
        Err(error) => {
            warn!(%error, %tier, key, "storage read failed");
            None
        }
    }
}

async fn write_one<Ev: 'static>(
    context: &CapabilityContext<StoreOperation, Ev>,
    tier: StoreTier,
    key: &str,
    value: &str,
) {
    let request = StoreOperation::Set {
        tier,
        key: key.to_owned(),
        value: value.to_owned(),
    };
    match context.request_from_shell(request).await {
        Ok(_) => {}
        Err(error) => warn!(%error, %tier, key, "storage write failed"),
    }
}

async fn read_tiered<Ev: 'static>(
    context: &CapabilityContext<StoreOperation, Ev>,
    key: &str,
) -> Option<String> {
    if let Some(value) = read_one(context, StoreTier::Device, key).await {
        return Some(value);
    }

    let value = read_one(context, StoreTier::Cloud, key).await?;
    debug!(key, "cloud value found, writing back to device tier");
    write_one(context, StoreTier::Device, key, &value).await;
    Some(value)
}

async fn read_tiered_batch<Ev: 'static>(
    context: &CapabilityContext<StoreOperation, Ev>,
    keys: &[String],
) -> Vec<Option<String>> {
    let mut values: Vec<Option<String>> = vec![None; keys.len()];

    let valid: Vec<usize> = keys
        .iter()
        .enumerate()
        .filter_map(|(i, key)| match validate_key(key) {
            Ok(()) => Some(i),
            Err(error) => {
                warn!(%error, key, "skipping storage read");
                None
            }
        })
        .collect();
    if valid.is_empty() {
        return values;
    }

    let device_keys: Vec<String> = valid.iter().map(|&i| keys[i].clone()).collect();
    if let Some(found) = read_batch(context, StoreTier::Device, &device_keys).await {
        for (slot, value) in valid.iter().zip(found) {
            values[*slot] = value;
        }
    }

    let missing: Vec<usize> = valid
        .iter()
        .copied()
        .filter(|&i| values[i].is_none())
        .collect();
    if missing.is_empty() {
        return values;
    }

    let cloud_keys: Vec<String> = missing.iter().map(|&i| keys[i].clone()).collect();
    if let Some(found) = read_batch(context, StoreTier::Cloud, &cloud_keys).await {
        for (slot, value) in missing.iter().zip(found) {
            if let Some(value) = value {
                debug!(key = %keys[*slot], "cloud value found, writing back to device tier");
                write_one(context, StoreTier::Device, &keys[*slot], &value).await;
                values[*slot] = Some(value);
            }
        }
    }

    values
}

async fn read_batch<Ev: 'static>(
    context: &CapabilityContext<StoreOperation, Ev>,
    tier: StoreTier,
    keys: &[String],
) -> Option<Vec<Option<String>>> {
    let request = StoreOperation::GetBatch {
        tier,
        keys: keys.to_vec(),
    };
    match context.request_from_shell(request).await {
        Ok(StoreOutput::Values(found)) if found.len() == keys.len() => Some(found),
        Ok(StoreOutput::Values(found)) => {
            warn!(
                expected = keys.len(),
                got = found.len(),
                %tier,
                "batch response misaligned, discarding"
            );
            None
        }
        Ok(other) => {
            warn!(?other, %tier, "unexpected storage response");
            None
        }
        Err(error) => {
            warn!(%error, %tier, "storage batch read failed");
            None
        }
    }
}
