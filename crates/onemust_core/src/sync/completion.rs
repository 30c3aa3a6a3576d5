//! Widget completion protocol and timeline derivation.
//!
//! # Responsibility
//! - Phase 1: archive and remove a card in the shared store, then leave a
//!   completing marker and request a timeline reload.
//! - Phase 2: consume the marker and emit a struck-through entry followed by
//!   the steady list.
//!
//! # Invariants
//! - Phase 1 commits before the reload is requested, so any later reader
//!   sees either the old state or the new one, never a mix.
//! - A card moves `present -> completing -> absent` and never back.
//! - Storage failures are logged and swallowed; nothing is retried.

use crate::deeplink::DeepLink;
use crate::model::card::{Card, CardId, CompletedCard};
use crate::store::keys::SharedKey;
use crate::store::kv::{load, load_optional, save, KeyValueStore, StoreError, StoreResult};
use crate::store::shared::{write_cards, CompletingMarker};
use log::{info, warn};
use std::time::Instant;

/// How long the struck-through entry stays before the steady entry.
pub const STRIKE_THROUGH_MS: i64 = 1_500;
/// Periodic refresh requested from the widget host.
pub const REFRESH_INTERVAL_MS: i64 = 15 * 60 * 1_000;
/// Row text for a card that is only decorative glyphs.
pub const UNTITLED_CARD_TEXT: &str = "Untitled card";

/// Asks the widget host to re-run the timeline provider.
pub trait TimelineReloader {
    fn reload_timelines(&self);
}

/// Reloader for hosts that refresh on their own schedule.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReloader;

impl TimelineReloader for NoopReloader {
    fn reload_timelines(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed,
    /// The card was already gone; nothing was written.
    NotFound,
    /// The shared area is missing or failed; nothing was written.
    StorageUnavailable,
}

impl CompletionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NotFound => "not_found",
            Self::StorageUnavailable => "storage_unavailable",
        }
    }
}

/// Completes `card_id` from the widget process (Phase 1).
pub fn complete_from_widget<S, R>(
    shared: Option<&S>,
    card_id: CardId,
    now_ms: i64,
    reloader: &R,
) -> CompletionOutcome
where
    S: KeyValueStore,
    R: TimelineReloader + ?Sized,
{
    let started_at = Instant::now();
    let Some(shared) = shared else {
        warn!("event=widget_complete module=sync status=skipped reason=shared_store_missing");
        return CompletionOutcome::StorageUnavailable;
    };

    let outcome = match shared.transact(|store| remove_and_archive(store, card_id, now_ms)) {
        Ok(true) => CompletionOutcome::Completed,
        Ok(false) => CompletionOutcome::NotFound,
        Err(err) => {
            warn!(
                "event=widget_complete module=sync status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return CompletionOutcome::StorageUnavailable;
        }
    };

    info!(
        "event=widget_complete module=sync status={} duration_ms={}",
        outcome.as_str(),
        started_at.elapsed().as_millis()
    );
    if outcome == CompletionOutcome::Completed {
        reloader.reload_timelines();
    }
    outcome
}

fn remove_and_archive<S: KeyValueStore>(
    store: &S,
    card_id: CardId,
    now_ms: i64,
) -> StoreResult<bool> {
    let mut all_cards: Vec<Card> = load(store, &SharedKey::AllCards);
    let mut priorities: Vec<Card> = load(store, &SharedKey::PriorityCards);

    let rank = priorities
        .iter()
        .position(|card| card.id == card_id)
        .and_then(|index| u32::try_from(index + 1).ok());
    let target = all_cards
        .iter()
        .chain(priorities.iter())
        .find(|card| card.id == card_id)
        .cloned();
    let Some(card) = target else {
        return Ok(false);
    };

    let mut completed: Vec<CompletedCard> = load(store, &SharedKey::CompletedCards);
    completed.push(CompletedCard::new(card.scrubbed(), now_ms));
    all_cards.retain(|card| card.id != card_id);
    priorities.retain(|card| card.id != card_id);

    write_cards(store, &all_cards, &priorities)?;
    save(store, &SharedKey::CompletedCards, &completed)?;
    save(
        store,
        &SharedKey::CompletingCardId,
        &CompletingMarker { card_id, rank },
    )?;
    Ok(true)
}

/// One row rendered by the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetCard {
    pub id: CardId,
    pub text: String,
    pub emoji: Option<String>,
    /// 1-based prominence; rank 1 renders largest.
    pub rank: u32,
    /// Rendered with a strike-through in the completing entry.
    pub struck: bool,
    /// Deep link opening this card in the main app.
    pub link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEntryKind {
    Completing,
    Steady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub at_ms: i64,
    pub kind: TimelineEntryKind,
    pub cards: Vec<WidgetCard>,
    pub completing_id: Option<CardId>,
}

/// Entries to render plus when the host should ask again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetTimeline {
    pub entries: Vec<TimelineEntry>,
    pub refresh_after_ms: i64,
}

impl WidgetTimeline {
    fn steady(cards: Vec<WidgetCard>, now_ms: i64) -> Self {
        Self {
            entries: vec![TimelineEntry {
                at_ms: now_ms,
                kind: TimelineEntryKind::Steady,
                cards,
                completing_id: None,
            }],
            refresh_after_ms: now_ms + REFRESH_INTERVAL_MS,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|entry| entry.cards.is_empty())
    }
}

/// Builds the widget timeline from the shared store (Phase 2).
///
/// Consumes the completing marker when present, so the strike-through cue
/// renders at most once per completion.
pub fn widget_timeline<S: KeyValueStore>(shared: Option<&S>, now_ms: i64) -> WidgetTimeline {
    let Some(shared) = shared else {
        return WidgetTimeline::steady(Vec::new(), now_ms);
    };

    let consumed = shared.transact(|store| {
        let marker: Option<CompletingMarker> = load_optional(store, &SharedKey::CompletingCardId);
        if marker.is_some() {
            store.remove(SharedKey::CompletingCardId.as_str())?;
        }
        let priorities: Vec<Card> = load(store, &SharedKey::PriorityCards);
        let completed: Vec<CompletedCard> = if marker.is_some() {
            load(store, &SharedKey::CompletedCards)
        } else {
            Vec::new()
        };
        Ok::<_, StoreError>((marker, priorities, completed))
    });

    let (marker, priorities, completed) = match consumed {
        Ok(values) => values,
        Err(err) => {
            warn!(
                "event=widget_timeline module=sync status=error error={}",
                err
            );
            // Still render what can be read without the write lock.
            (None, load(shared, &SharedKey::PriorityCards), Vec::new())
        }
    };

    let steady_cards = to_widget_cards(&priorities, None);
    let Some(marker) = marker else {
        return WidgetTimeline::steady(steady_cards, now_ms);
    };

    let struck = completed
        .iter()
        .rev()
        .find(|entry| entry.card.id == marker.card_id)
        .map(|entry| entry.card.clone());
    let mut completing_rows = priorities.clone();
    if let (Some(card), Some(rank)) = (struck, marker.rank) {
        let index = usize::try_from(rank.saturating_sub(1))
            .unwrap_or(usize::MAX)
            .min(completing_rows.len());
        completing_rows.insert(index, card);
    }

    info!(
        "event=widget_timeline module=sync status=ok completing=true cards={}",
        steady_cards.len()
    );
    WidgetTimeline {
        entries: vec![
            TimelineEntry {
                at_ms: now_ms,
                kind: TimelineEntryKind::Completing,
                cards: to_widget_cards(&completing_rows, Some(marker.card_id)),
                completing_id: Some(marker.card_id),
            },
            TimelineEntry {
                at_ms: now_ms + STRIKE_THROUGH_MS,
                kind: TimelineEntryKind::Steady,
                cards: steady_cards,
                completing_id: None,
            },
        ],
        refresh_after_ms: now_ms + REFRESH_INTERVAL_MS,
    }
}

fn to_widget_cards(cards: &[Card], struck_id: Option<CardId>) -> Vec<WidgetCard> {
    cards
        .iter()
        .zip(1u32..)
        .map(|(card, rank)| WidgetCard {
            id: card.id,
            text: display_text(card),
            emoji: card.emoji.clone(),
            rank,
            struck: struck_id == Some(card.id),
            link: DeepLink::OpenCard(card.id).to_url(),
        })
        .collect()
}

/// Simplified text, else original text. A card left with neither text nor an
/// emoji after scrubbing gets [`UNTITLED_CARD_TEXT`] so its row is never blank.
fn display_text(card: &Card) -> String {
    let text = [&card.simplified_text, &card.original_text]
        .into_iter()
        .map(|text| text.trim())
        .find(|text| !text.is_empty());
    match (text, card.emoji.as_ref()) {
        (Some(text), _) => text.to_string(),
        (None, Some(_)) => String::new(),
        (None, None) => UNTITLED_CARD_TEXT.to_string(),
    }
}
