mod chrome;
mod source;
mod store;

pub use self::chrome::{Chrome, ChromeOperation, ImpactStyle, NotificationKind};
pub use self::source::{Source, SourceError, SourceOperation, SourceOutput, SourceResult};
pub use self::store::{
    validate_key, Store, StoreError, StoreOperation, StoreOutput, StoreResult, StoreTier,
    MAX_KEY_LENGTH, MAX_VALUE_BYTES,
};

// Crux's built-in Render capability covers view invalidation as is.
pub use crux_core::render::Render;

use crate::event::Event;

// The Effect derive reads the event type argument off each field, so the
// fields spell out their generics instead of going through aliases.
#[derive(crux_core::macros::Effect)]
#[effect(app = "crate::app::App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub store: Store<Event>,
    pub chrome: Chrome<Event>,
    pub source: Source<Event>,
}
