//! Core domain logic for OneMust.
//! This crate is the single source of truth for card invariants, the
//! priority policy and the app/widget completion protocol.

pub mod config;
pub mod db;
pub mod deeplink;
pub mod logging;
pub mod model;
pub mod policy;
pub mod service;
pub mod store;
pub mod sync;
pub mod text;

pub use config::{StoreConfig, SHARED_CONTAINER_ID};
pub use deeplink::{parse_deep_link, DeepLink, DeepLinkError};
pub use logging::{default_log_level, init_logging, init_logging_for, logging_status, LogRole};
pub use model::card::{
    now_epoch_ms, Card, CardId, CardValidationError, CompletedCard, OnboardingFlag,
};
pub use policy::priority::{
    derive_view, should_auto_exclude, sort_cards, PolicyError, PriorityState, PriorityView,
    MAX_PRIORITIES,
};
pub use service::card_service::{CardService, CardState, ServiceError, ServiceResult};
pub use store::keys::{LocalKey, SharedKey, StoreKey};
pub use store::kv::{load, save, KeyValueStore, SqliteKeyValueStore, StoreError, StoreResult};
pub use store::shared::{publish_projection, read_snapshot, CompletingMarker, SharedSnapshot};
pub use sync::completion::{
    complete_from_widget, widget_timeline, CompletionOutcome, NoopReloader, TimelineEntry,
    TimelineEntryKind, TimelineReloader, WidgetCard, WidgetTimeline, REFRESH_INTERVAL_MS,
    STRIKE_THROUGH_MS, UNTITLED_CARD_TEXT,
};
pub use text::{emoji_for_text, simplify_text, strip_emoji};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
