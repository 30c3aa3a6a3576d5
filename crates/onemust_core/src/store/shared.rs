//! Widget-facing projection in the shared store area.
//!
//! # Responsibility
//! - Publish all cards, effective priorities and the current card in one write.
//! - Read the projection back as a single consistent snapshot.
//!
//! # Invariants
//! - Published card text is emoji-scrubbed; the curated `emoji` field is kept.
//! - `CurrentCard` always equals the first published priority, or `null`.
//! - Publishing never writes the completed archive or the completing marker.

use crate::model::card::{Card, CardId, CompletedCard};
use crate::store::keys::SharedKey;
use crate::store::kv::{load, load_optional, save, KeyValueStore, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Transient marker left by a widget completion for the next timeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletingMarker {
    pub card_id: CardId,
    /// 1-based rank the card held among published priorities, if any.
    #[serde(default)]
    pub rank: Option<u32>,
}

/// Everything the widget reads from the shared area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedSnapshot {
    pub current_card: Option<Card>,
    pub priority_cards: Vec<Card>,
    pub all_cards: Vec<Card>,
    pub completed_cards: Vec<CompletedCard>,
    pub completing: Option<CompletingMarker>,
}

/// Writes the scrubbed projection of `all_cards` and `priorities`.
///
/// Cards already archived by a widget completion are left out, so a main-app
/// write computed from stale local state cannot bring them back.
pub fn publish_projection<S: KeyValueStore>(
    shared: &S,
    all_cards: &[Card],
    priorities: &[Card],
) -> StoreResult<()> {
    shared.transact(|store| {
        let completed: Vec<CompletedCard> = load(store, &SharedKey::CompletedCards);
        let done = completed
            .iter()
            .map(|entry| entry.card.id)
            .collect::<HashSet<_>>();
        let project = |cards: &[Card]| {
            cards
                .iter()
                .filter(|card| !done.contains(&card.id))
                .map(Card::scrubbed)
                .collect::<Vec<_>>()
        };

        write_cards(store, &project(all_cards), &project(priorities))
    })
}

/// Reads the whole shared area.
pub fn read_snapshot<S: KeyValueStore>(shared: &S) -> SharedSnapshot {
    SharedSnapshot {
        current_card: load_optional(shared, &SharedKey::CurrentCard),
        priority_cards: load(shared, &SharedKey::PriorityCards),
        all_cards: load(shared, &SharedKey::AllCards),
        completed_cards: load(shared, &SharedKey::CompletedCards),
        completing: load_optional(shared, &SharedKey::CompletingCardId),
    }
}

/// Writes card lists and the derived current card. Callers own the transaction.
pub(crate) fn write_cards<S: KeyValueStore>(
    store: &S,
    all_cards: &[Card],
    priorities: &[Card],
) -> StoreResult<()> {
    save(store, &SharedKey::AllCards, all_cards)?;
    save(store, &SharedKey::PriorityCards, priorities)?;
    save(store, &SharedKey::CurrentCard, &priorities.first())?;
    Ok(())
}
