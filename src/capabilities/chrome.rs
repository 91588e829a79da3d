//! Host chrome capability: the native UI surfaces the embedding host owns
//! (main action button, back button, haptic engine, ready handshake). All
//! operations are fire-and-forget notifications.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImpactStyle {
    Light,
    Medium,
    Heavy,
    Rigid,
    Soft,
}

impl ImpactStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactStyle::Light => "light",
            ImpactStyle::Medium => "medium",
            ImpactStyle::Heavy => "heavy",
            ImpactStyle::Rigid => "rigid",
            ImpactStyle::Soft => "soft",
        }
    }
}

impl fmt::Display for ImpactStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Error,
    Success,
    Warning,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Error => "error",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ChromeOperation {
    /// Tells the host the app has rendered its first frame.
    Ready,
    MainButton {
        visible: bool,
        text: String,
        enabled: bool,
    },
    BackButton {
        visible: bool,
    },
    HapticImpact {
        style: ImpactStyle,
    },
    HapticNotification {
        kind: NotificationKind,
    },
    HapticSelection,
}

impl Operation for ChromeOperation {
    type Output = ();
}

pub struct Chrome<Ev> {
    context: CapabilityContext<ChromeOperation, Ev>,
}

impl<Ev> Capability<Ev> for Chrome<Ev> {
    type Operation = ChromeOperation;
    type MappedSelf<MappedEv> = Chrome<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Chrome::new(self.context.map_event(f))
    }
}

impl<Ev> Chrome<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<ChromeOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn ready(&self) {
        self.notify(ChromeOperation::Ready);
    }

    pub fn main_button(&self, visible: bool, text: impl Into<String>, enabled: bool) {
        self.notify(ChromeOperation::MainButton {
            visible,
            text: text.into(),
            enabled,
        });
    }

    pub fn back_button(&self, visible: bool) {
        self.notify(ChromeOperation::BackButton { visible });
    }

    pub fn impact(&self, style: ImpactStyle) {
        self.notify(ChromeOperation::HapticImpact { style });
    }

    pub fn notification(&self, kind: NotificationKind) {
        self.notify(ChromeOperation::HapticNotification { kind });
    }

    pub fn selection_changed(&self) {
        self.notify(ChromeOperation::HapticSelection);
    }

    fn notify(&self, operation: ChromeOperation) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(operation).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haptic_names_match_host_strings() {
        // The host bridge passes these through to Telegram's HapticFeedback
        // API, which expects exactly these identifiers.
        for (style, expected) in [
            (ImpactStyle::Light, "\"light\""),
            (ImpactStyle::Medium, "\"medium\""),
            (ImpactStyle::Heavy, "\"heavy\""),
            (ImpactStyle::Rigid, "\"rigid\""),
            (ImpactStyle::Soft, "\"soft\""),
        ] {
            assert_eq!(serde_json::to_string(&style).unwrap(), expected);
            assert_eq!(format!("\"{style}\""), expected);
        }

        for (kind, expected) in [
            (NotificationKind::Error, "\"error\""),
            (NotificationKind::Success, "\"success\""),
            (NotificationKind::Warning, "\"warning\""),
        ] {
            assert_eq!(serde_json::to_string(&kind).unwrap(), expected);
        }
    }

    #[test]
    fn operations_roundtrip_through_serde() {
        let op = ChromeOperation::MainButton {
            visible: true,
            text: "Continue".into(),
            enabled: false,
        };
        let encoded = serde_json::to_string(&op).unwrap();
        let decoded: ChromeOperation = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, op);
    }
}
