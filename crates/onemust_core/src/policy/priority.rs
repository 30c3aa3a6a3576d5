//! Priority/exclusion derivation.
//!
//! # Responsibility
//! - Sort cards by manual rank, then recency.
//! - Derive effective priorities and the searchable drawer.
//! - Mutate manual order and exclusions under the 3-slot cap.
//!
//! # Invariants
//! - Derivation is pure: same inputs give the same view.
//! - Manual ids missing from the collection are ignored, not errors.
//! - A pinned card is never also excluded.

use crate::model::card::{Card, CardId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Cap on manual and effective priorities.
pub const MAX_PRIORITIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    PrioritySlotsFull { limit: usize },
}

impl Display for PolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrioritySlotsFull { limit } => {
                write!(f, "all {limit} priority slots are already pinned")
            }
        }
    }
}

impl Error for PolicyError {}

/// Manual priority order plus the exclusion set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityState {
    pub manual_order: Vec<CardId>,
    pub exclusions: BTreeSet<CardId>,
}

impl PriorityState {
    /// Pins `id` at the end of the manual order and clears its exclusion.
    pub fn pin(&mut self, id: CardId) -> Result<(), PolicyError> {
        if self.manual_order.contains(&id) {
            self.exclusions.remove(&id);
            return Ok(());
        }
        if self.manual_order.len() >= MAX_PRIORITIES {
            return Err(PolicyError::PrioritySlotsFull {
                limit: MAX_PRIORITIES,
            });
        }
        self.manual_order.push(id);
        self.exclusions.remove(&id);
        Ok(())
    }

    /// Unpins `id` and parks it in the drawer instead of re-promoting it.
    pub fn unpin(&mut self, id: CardId) {
        self.manual_order.retain(|pinned| *pinned != id);
        self.exclusions.insert(id);
    }

    pub fn exclude(&mut self, id: CardId) {
        self.manual_order.retain(|pinned| *pinned != id);
        self.exclusions.insert(id);
    }

    pub fn include(&mut self, id: CardId) {
        self.exclusions.remove(&id);
    }

    /// Drops every trace of `id`; used when a card leaves the collection.
    pub fn forget(&mut self, id: CardId) {
        self.manual_order.retain(|pinned| *pinned != id);
        self.exclusions.remove(&id);
    }

    /// Drops ids that no longer match any card. Returns whether anything changed.
    pub fn prune(&mut self, cards: &[Card]) -> bool {
        let known = cards.iter().map(|card| card.id).collect::<HashSet<_>>();
        let before = (self.manual_order.len(), self.exclusions.len());
        self.manual_order.retain(|id| known.contains(id));
        self.exclusions.retain(|id| known.contains(id));
        before != (self.manual_order.len(), self.exclusions.len())
    }

    pub fn is_excluded(&self, id: CardId) -> bool {
        self.exclusions.contains(&id)
    }
}

/// Derived split of the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityView {
    /// Effective priorities in display order, at most `MAX_PRIORITIES`.
    pub priorities: Vec<Card>,
    /// Remaining cards in sort order, after the optional search filter.
    pub drawer: Vec<Card>,
}

/// Sorts manually ranked cards first (in manual order), then newest first.
///
/// Within the unranked group only the timestamp orders cards; equal
/// timestamps keep their input order.
pub fn sort_cards(cards: &[Card], manual_order: &[CardId]) -> Vec<Card> {
    let by_id = cards
        .iter()
        .map(|card| (card.id, card))
        .collect::<HashMap<_, _>>();

    let mut ranked_ids = HashSet::new();
    let mut sorted = Vec::with_capacity(cards.len());
    for id in manual_order {
        if let Some(card) = by_id.get(id) {
            if ranked_ids.insert(*id) {
                sorted.push((*card).clone());
            }
        }
    }

    let mut unranked = cards
        .iter()
        .filter(|card| !ranked_ids.contains(&card.id))
        .cloned()
        .collect::<Vec<_>>();
    unranked.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
    sorted.extend(unranked);
    sorted
}

/// Splits `cards` into effective priorities and the drawer.
pub fn derive_view(cards: &[Card], state: &PriorityState, search: Option<&str>) -> PriorityView {
    let sorted = sort_cards(cards, &state.manual_order);

    let priorities = sorted
        .iter()
        .filter(|card| !state.is_excluded(card.id))
        .take(MAX_PRIORITIES)
        .cloned()
        .collect::<Vec<_>>();
    let priority_ids = priorities
        .iter()
        .map(|card| card.id)
        .collect::<HashSet<_>>();

    let search = search.unwrap_or("");
    let drawer = sorted
        .into_iter()
        .filter(|card| !priority_ids.contains(&card.id))
        .filter(|card| card.matches_search(search))
        .collect();

    PriorityView { priorities, drawer }
}

/// Whether a newly captured card must skip automatic promotion.
///
/// True once the existing priority-eligible cards already fill every slot,
/// so a new card never bumps a current priority.
pub fn should_auto_exclude(existing: &[Card], state: &PriorityState) -> bool {
    existing
        .iter()
        .filter(|card| !state.is_excluded(card.id))
        .count()
        >= MAX_PRIORITIES
}
