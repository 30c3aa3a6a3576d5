//! FFI use-case API for the main app and the widget extension.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Open store connections per call from the cached `StoreConfig`.
//! - Flatten core results into plain envelopes for the UI.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - A missing or broken shared store never fails a main-app call.
//! - Card IDs cross the boundary as hyphenated UUID strings.

use log::warn;
use onemust_core::db::open_db;
use onemust_core::{
    complete_from_widget, core_version as core_version_inner, init_logging_for, now_epoch_ms,
    parse_deep_link, ping as ping_inner, widget_timeline as widget_timeline_inner, Card,
    CardId, CardService, CompletionOutcome, DeepLink, LogRole, OnboardingFlag, ServiceResult,
    SqliteKeyValueStore, StoreConfig, TimelineEntry, TimelineEntryKind, TimelineReloader,
    WidgetCard,
};
use rusqlite::Connection;
use std::cell::Cell;
use std::sync::OnceLock;
use uuid::Uuid;

static STORE_CONFIG: OnceLock<StoreConfig> = OnceLock::new();

type AppCardService<'conn> =
    CardService<SqliteKeyValueStore<'conn>, SqliteKeyValueStore<'conn>>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
/// - `role`: `app` or `widget`; empty means `app`.
///
/// # FFI contract
/// - Safe to call repeatedly with the same arguments (idempotent).
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String, role: String) -> String {
    let role = match LogRole::parse(&role) {
        Ok(role) => role,
        Err(err) => return err,
    };
    match init_logging_for(role, level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Card as rendered by the main app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardItem {
    pub card_id: String,
    pub original_text: String,
    pub simplified_text: String,
    pub emoji: Option<String>,
    pub timestamp_ms: i64,
}

impl From<Card> for CardItem {
    fn from(card: Card) -> Self {
        Self {
            card_id: card.id.to_string(),
            original_text: card.original_text,
            simplified_text: card.simplified_text,
            emoji: card.emoji,
            timestamp_ms: card.timestamp,
        }
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Card the action applied to, when known.
    pub card_id: Option<String>,
    /// Whether the widget host should reload its timelines now.
    pub reload_timelines: bool,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl CardActionResponse {
    fn success(message: impl Into<String>, card_id: CardId) -> Self {
        Self {
            ok: true,
            card_id: Some(card_id.to_string()),
            reload_timelines: false,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            card_id: None,
            reload_timelines: false,
            message: message.into(),
        }
    }
}

/// Priorities and drawer for the main screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardsViewResponse {
    pub ok: bool,
    /// Effective priorities, rank 1 first.
    pub priorities: Vec<CardItem>,
    /// Remaining cards after the search filter.
    pub drawer: Vec<CardItem>,
    pub message: String,
}

/// One widget row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetRowItem {
    pub card_id: String,
    pub text: String,
    pub emoji: Option<String>,
    pub rank: u32,
    pub struck: bool,
    pub link: String,
}

/// One timeline entry the widget host schedules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetEntryItem {
    pub at_epoch_ms: i64,
    /// `true` for the short strike-through entry.
    pub completing: bool,
    pub rows: Vec<WidgetRowItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetTimelineResponse {
    pub ok: bool,
    pub entries: Vec<WidgetEntryItem>,
    pub refresh_after_epoch_ms: i64,
    pub message: String,
}

/// Parsed deep link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinkResponse {
    pub ok: bool,
    /// `capture` or `card`; empty on failure.
    pub route: String,
    pub card_id: Option<String>,
    pub message: String,
}

/// Captures text as a new card.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Blank text returns `ok=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn cards_capture(text: String) -> CardActionResponse {
    match with_card_service(|service| service.capture(&text, now_epoch_ms())) {
        Ok(card) => CardActionResponse::success("Card captured.", card.id),
        Err(err) => CardActionResponse::failure(format!("cards_capture failed: {err}")),
    }
}

/// Completes a card from the main app and archives it.
#[flutter_rust_bridge::frb(sync)]
pub fn cards_complete(card_id: String) -> CardActionResponse {
    card_action("cards_complete", &card_id, |service, id| {
        Ok(service.complete(id, now_epoch_ms())?.is_some())
    })
}

/// Deletes a card without archiving it.
#[flutter_rust_bridge::frb(sync)]
pub fn cards_delete(card_id: String) -> CardActionResponse {
    card_action("cards_delete", &card_id, |service, id| service.delete(id))
}

/// Pins a card into the next manual priority slot.
///
/// Returns `ok=false` when all slots are already pinned.
#[flutter_rust_bridge::frb(sync)]
pub fn cards_pin(card_id: String) -> CardActionResponse {
    card_action("cards_pin", &card_id, |service, id| service.pin(id))
}

#[flutter_rust_bridge::frb(sync)]
pub fn cards_unpin(card_id: String) -> CardActionResponse {
    card_action("cards_unpin", &card_id, |service, id| service.unpin(id))
}

#[flutter_rust_bridge::frb(sync)]
pub fn cards_exclude(card_id: String) -> CardActionResponse {
    card_action("cards_exclude", &card_id, |service, id| service.exclude(id))
}

#[flutter_rust_bridge::frb(sync)]
pub fn cards_include(card_id: String) -> CardActionResponse {
    card_action("cards_include", &card_id, |service, id| service.include(id))
}

/// Returns priorities and the drawer filtered by `search`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Empty or missing search matches every drawer card.
#[flutter_rust_bridge::frb(sync)]
pub fn cards_view(search: Option<String>) -> CardsViewResponse {
    match with_card_service(|service| Ok(service.view(search.as_deref()))) {
        Ok(view) => CardsViewResponse {
            ok: true,
            message: format!(
                "{} priority card(s), {} in drawer.",
                view.priorities.len(),
                view.drawer.len()
            ),
            priorities: view.priorities.into_iter().map(CardItem::from).collect(),
            drawer: view.drawer.into_iter().map(CardItem::from).collect(),
        },
        Err(err) => CardsViewResponse {
            ok: false,
            priorities: Vec::new(),
            drawer: Vec::new(),
            message: format!("cards_view failed: {err}"),
        },
    }
}

/// Folds widget completions into local state. Call on app foreground.
#[flutter_rust_bridge::frb(sync)]
pub fn cards_reconcile() -> CardActionResponse {
    match with_card_service(|service| service.reconcile()) {
        Ok(absorbed) => CardActionResponse {
            ok: true,
            card_id: None,
            reload_timelines: absorbed > 0,
            message: format!("Absorbed {absorbed} widget completion(s)."),
        },
        Err(err) => CardActionResponse::failure(format!("cards_reconcile failed: {err}")),
    }
}

/// Dismisses an onboarding hint (`capture_hint|widget_hint`).
#[flutter_rust_bridge::frb(sync)]
pub fn onboarding_dismiss(flag: String) -> CardActionResponse {
    let Some(flag) = OnboardingFlag::parse(&flag) else {
        return CardActionResponse::failure(format!("unknown onboarding flag `{flag}`"));
    };
    match with_card_service(|service| service.dismiss_onboarding(flag)) {
        Ok(()) => CardActionResponse {
            ok: true,
            card_id: None,
            reload_timelines: false,
            message: format!("Dismissed {}.", flag.as_str()),
        },
        Err(err) => CardActionResponse::failure(format!("onboarding_dismiss failed: {err}")),
    }
}

/// Whether an onboarding hint was dismissed. Unknown flags read as `false`.
#[flutter_rust_bridge::frb(sync)]
pub fn onboarding_is_dismissed(flag: String) -> bool {
    let Some(flag) = OnboardingFlag::parse(&flag) else {
        return false;
    };
    with_card_service(|service| Ok(service.is_onboarding_dismissed(flag))).unwrap_or(false)
}

/// Completes a card from the widget's interactive control.
///
/// # FFI contract
/// - Sync call, touches only the shared store.
/// - `reload_timelines=true` asks the host to reload widget timelines.
#[flutter_rust_bridge::frb(sync)]
pub fn widget_complete(card_id: String) -> CardActionResponse {
    let id = match parse_card_id(&card_id) {
        Ok(id) => id,
        Err(err) => return CardActionResponse::failure(err),
    };

    let reloader = ReloadRequest::default();
    let shared_conn = open_shared_db(store_config());
    let shared = shared_store(shared_conn.as_ref());
    let outcome = complete_from_widget(shared.as_ref(), id, now_epoch_ms(), &reloader);

    CardActionResponse {
        ok: outcome != CompletionOutcome::StorageUnavailable,
        card_id: Some(id.to_string()),
        reload_timelines: reloader.requested.get(),
        message: format!("widget_complete: {}", outcome.as_str()),
    }
}

/// Builds the widget timeline, consuming any pending completion marker.
#[flutter_rust_bridge::frb(sync)]
pub fn widget_timeline() -> WidgetTimelineResponse {
    let shared_conn = open_shared_db(store_config());
    let shared = shared_store(shared_conn.as_ref());
    let timeline = widget_timeline_inner(shared.as_ref(), now_epoch_ms());

    let message = if shared.is_none() {
        "Shared store unavailable.".to_string()
    } else {
        format!("{} entry(ies).", timeline.entries.len())
    };
    WidgetTimelineResponse {
        ok: shared.is_some(),
        refresh_after_epoch_ms: timeline.refresh_after_ms,
        entries: timeline.entries.into_iter().map(to_widget_entry).collect(),
        message,
    }
}

/// Parses an `onemust://` URL opened by the widget.
#[flutter_rust_bridge::frb(sync)]
pub fn deep_link_parse(url: String) -> DeepLinkResponse {
    match parse_deep_link(&url) {
        Ok(DeepLink::Capture) => DeepLinkResponse {
            ok: true,
            route: "capture".to_string(),
            card_id: None,
            message: String::new(),
        },
        Ok(DeepLink::OpenCard(id)) => DeepLinkResponse {
            ok: true,
            route: "card".to_string(),
            card_id: Some(id.to_string()),
            message: String::new(),
        },
        Err(err) => DeepLinkResponse {
            ok: false,
            route: String::new(),
            card_id: None,
            message: format!("deep_link_parse failed: {err}"),
        },
    }
}

/// Records whether the core asked for a reload, for the host to act on.
#[derive(Default)]
struct ReloadRequest {
    requested: Cell<bool>,
}

impl TimelineReloader for ReloadRequest {
    fn reload_timelines(&self) {
        self.requested.set(true);
    }
}

fn store_config() -> &'static StoreConfig {
    STORE_CONFIG.get_or_init(StoreConfig::from_env)
}

fn parse_card_id(raw: &str) -> Result<CardId, String> {
    Uuid::parse_str(raw.trim()).map_err(|err| format!("invalid card id `{}`: {err}", raw.trim()))
}

fn card_action(
    event: &str,
    raw_id: &str,
    f: impl FnOnce(&AppCardService<'_>, CardId) -> ServiceResult<bool>,
) -> CardActionResponse {
    let id = match parse_card_id(raw_id) {
        Ok(id) => id,
        Err(err) => return CardActionResponse::failure(format!("{event} failed: {err}")),
    };
    match with_card_service(|service| f(service, id)) {
        Ok(true) => CardActionResponse::success("Done.", id),
        Ok(false) => CardActionResponse {
            ok: true,
            card_id: Some(id.to_string()),
            reload_timelines: false,
            message: "Card not found.".to_string(),
        },
        Err(err) => CardActionResponse::failure(format!("{event} failed: {err}")),
    }
}

fn with_card_service<T>(
    f: impl FnOnce(&AppCardService<'_>) -> ServiceResult<T>,
) -> Result<T, String> {
    let config = store_config();
    let local_conn =
        open_db(&config.local_db_path).map_err(|err| format!("local DB open failed: {err}"))?;
    let local = SqliteKeyValueStore::try_new(&local_conn)
        .map_err(|err| format!("local store init failed: {err}"))?;
    let shared_conn = open_shared_db(config);
    let service = CardService::new(local, shared_store(shared_conn.as_ref()));
    f(&service).map_err(|err| err.to_string())
}

fn open_shared_db(config: &StoreConfig) -> Option<Connection> {
    let path = config.shared_db_path.as_ref()?;
    match open_db(path) {
        Ok(conn) => Some(conn),
        Err(err) => {
            warn!("event=shared_open module=ffi status=error error={}", err);
            None
        }
    }
}

fn shared_store(conn: Option<&Connection>) -> Option<SqliteKeyValueStore<'_>> {
    let conn = conn?;
    match SqliteKeyValueStore::try_new(conn) {
        Ok(store) => Some(store),
        Err(err) => {
            warn!("event=shared_open module=ffi status=error error={}", err);
            None
        }
    }
}

fn to_widget_entry(entry: TimelineEntry) -> WidgetEntryItem {
    WidgetEntryItem {
        at_epoch_ms: entry.at_ms,
        completing: entry.kind == TimelineEntryKind::Completing,
        rows: entry.cards.into_iter().map(to_widget_row).collect(),
    }
}

fn to_widget_row(card: WidgetCard) -> WidgetRowItem {
    WidgetRowItem {
        card_id: card.id.to_string(),
        text: card.text,
        emoji: card.emoji,
        rank: card.rank,
        struck: card.struck,
        link: card.link,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        cards_capture, cards_complete, cards_pin, cards_reconcile, cards_view, core_version,
        deep_link_parse, init_logging, onboarding_dismiss, onboarding_is_dismissed, ping,
        store_config, widget_complete, widget_timeline, STORE_CONFIG,
    };
    use onemust_core::StoreConfig;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEST_STORE_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();
    static SERIAL: Mutex<()> = Mutex::new(());

    /// Points the process-wide config at one temp directory and serializes
    /// the tests that open it.
    fn temp_store() -> MutexGuard<'static, ()> {
        let dir = TEST_STORE_DIR
            .get_or_init(|| tempfile::tempdir().expect("create temp store dir"))
            .path();
        STORE_CONFIG.get_or_init(|| StoreConfig {
            local_db_path: dir.join("local.sqlite3"),
            shared_db_path: Some(dir.join("shared").join("shared.sqlite3")),
        });
        SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unknown_role() {
        let error = init_logging("info".to_string(), "/tmp".to_string(), "intent".to_string());
        assert!(error.contains("role"));
    }

    #[test]
    fn capture_then_view_finds_card() {
        let _guard = temp_store();
        let token = unique_token("capture");
        let created = cards_capture(format!("buy {token}"));
        assert!(created.ok, "{}", created.message);
        let card_id = created.card_id.expect("capture should return card_id");

        let view = cards_view(Some(token.clone()));
        assert!(view.ok, "{}", view.message);
        let found = view
            .priorities
            .iter()
            .chain(view.drawer.iter())
            .any(|card| card.card_id == card_id);
        assert!(found);
    }

    #[test]
    fn capture_rejects_blank_text() {
        let _guard = temp_store();
        let response = cards_capture("   ".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("empty"));
    }

    #[test]
    fn actions_reject_malformed_ids() {
        let _guard = temp_store();
        let response = cards_complete("not-a-uuid".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("invalid card id"));

        let response = widget_complete("not-a-uuid".to_string());
        assert!(!response.ok);
    }

    #[test]
    fn unknown_card_is_a_no_op() {
        let _guard = temp_store();
        let response = cards_pin(uuid::Uuid::new_v4().to_string());
        assert!(response.ok);
        assert_eq!(response.message, "Card not found.");
    }

    #[test]
    fn widget_completion_requests_reload_and_hides_card() {
        let _guard = temp_store();
        let token = unique_token("widget");
        let created = cards_capture(format!("call {token}"));
        assert!(created.ok, "{}", created.message);
        let card_id = created.card_id.expect("capture should return card_id");

        let completed = widget_complete(card_id.clone());
        assert!(completed.ok, "{}", completed.message);
        assert!(completed.reload_timelines);
        assert!(completed.message.ends_with("completed"));

        let reconciled = cards_reconcile();
        assert!(reconciled.ok, "{}", reconciled.message);
        let view = cards_view(Some(token));
        assert!(view
            .priorities
            .iter()
            .chain(view.drawer.iter())
            .all(|card| card.card_id != card_id));

        let timeline = widget_timeline();
        assert!(timeline.ok, "{}", timeline.message);
        assert!(!timeline.entries.is_empty());
        assert!(timeline.refresh_after_epoch_ms > timeline.entries[0].at_epoch_ms);
    }

    #[test]
    fn onboarding_flags_round_trip() {
        let _guard = temp_store();
        assert!(!onboarding_dismiss("tour".to_string()).ok);
        assert!(onboarding_dismiss("widget_hint".to_string()).ok);
        assert!(onboarding_is_dismissed("widget_hint".to_string()));
        assert!(!onboarding_is_dismissed("tour".to_string()));
    }

    #[test]
    fn tests_never_touch_default_store_paths() {
        let _guard = temp_store();
        let dir = TEST_STORE_DIR.get().expect("temp store initialized").path();
        let config = store_config();
        assert!(config.local_db_path.starts_with(dir));
        let shared = config.shared_db_path.as_ref().expect("shared store enabled");
        assert!(shared.starts_with(dir));
    }

    #[test]
    fn deep_link_parse_maps_routes() {
        let capture = deep_link_parse("onemust://capture".to_string());
        assert!(capture.ok);
        assert_eq!(capture.route, "capture");

        let id = uuid::Uuid::new_v4();
        let card = deep_link_parse(format!("onemust://card/{id}"));
        assert_eq!(card.card_id, Some(id.to_string()));

        let bad = deep_link_parse("https://example.com".to_string());
        assert!(!bad.ok);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
