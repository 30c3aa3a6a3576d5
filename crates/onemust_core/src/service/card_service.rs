//! Main-app card use cases.
//!
//! # Responsibility
//! - Capture, complete and delete cards against the local store.
//! - Apply pin/exclude changes through the priority policy.
//! - Publish the widget projection after every local mutation.
//! - Fold widget-side completions back into local state.
//!
//! # Invariants
//! - The local store is authoritative for card content.
//! - Every local mutation is one transaction; publishing happens after commit,
//!   so the shared area never shows state the local store did not keep.
//! - A missing shared store degrades to "widget shows nothing", never an error.
//! - Unknown card ids are no-ops, not errors.

use crate::model::card::{Card, CardId, CardValidationError, CompletedCard, OnboardingFlag};
use crate::policy::priority::{
    derive_view, should_auto_exclude, PolicyError, PriorityState, PriorityView,
};
use crate::store::keys::LocalKey;
use crate::store::kv::{load, save, KeyValueStore, StoreError};
use crate::store::shared::{publish_projection, read_snapshot};
use log::{info, warn};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for card use cases.
#[derive(Debug)]
pub enum ServiceError {
    Validation(CardValidationError),
    Policy(PolicyError),
    Store(StoreError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Policy(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Policy(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<CardValidationError> for ServiceError {
    fn from(value: CardValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<PolicyError> for ServiceError {
    fn from(value: PolicyError) -> Self {
        Self::Policy(value)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// In-memory view of the local store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardState {
    pub cards: Vec<Card>,
    pub priority: PriorityState,
}

impl CardState {
    fn position(&self, id: CardId) -> Option<usize> {
        self.cards.iter().position(|card| card.id == id)
    }

    fn contains(&self, id: CardId) -> bool {
        self.position(id).is_some()
    }

    /// Removes one card and every priority reference to it.
    fn take(&mut self, id: CardId) -> Option<Card> {
        let index = self.position(id)?;
        self.priority.forget(id);
        Some(self.cards.remove(index))
    }
}

/// Card use-case service over injected local and shared stores.
pub struct CardService<L: KeyValueStore, S: KeyValueStore> {
    local: L,
    shared: Option<S>,
}

impl<L: KeyValueStore, S: KeyValueStore> CardService<L, S> {
    /// Creates a service. `shared = None` models a missing App Group container.
    pub fn new(local: L, shared: Option<S>) -> Self {
        Self { local, shared }
    }

    pub fn has_shared_store(&self) -> bool {
        self.shared.is_some()
    }

    /// Loads cards and priority state, ignoring ids that no longer match a card.
    pub fn load_state(&self) -> CardState {
        read_state(&self.local)
    }

    /// Captures `text` as a new card.
    ///
    /// # Contract
    /// - Rejects blank text.
    /// - Auto-excludes the new card when the priority slots are already full.
    pub fn capture(&self, text: &str, now_ms: i64) -> ServiceResult<Card> {
        self.mutate("card_capture", |_, state| {
            let card = Card::capture(text, now_ms)?;
            if should_auto_exclude(&state.cards, &state.priority) {
                state.priority.exclude(card.id);
            }
            state.cards.push(card.clone());
            Ok(card)
        })
    }

    /// Completes a card: removes it and appends it to the local archive.
    ///
    /// Returns `Ok(None)` when `id` is unknown.
    pub fn complete(&self, id: CardId, now_ms: i64) -> ServiceResult<Option<CompletedCard>> {
        self.mutate("card_complete", |store, state| {
            let Some(card) = state.take(id) else {
                return Ok(None);
            };
            let entry = CompletedCard::new(card, now_ms);
            append_archive(store, std::slice::from_ref(&entry))?;
            Ok(Some(entry))
        })
    }

    /// Deletes a card without archiving it. Returns whether it existed.
    pub fn delete(&self, id: CardId) -> ServiceResult<bool> {
        self.mutate("card_delete", |_, state| Ok(state.take(id).is_some()))
    }

    /// Pins a card into the next free manual priority slot.
    pub fn pin(&self, id: CardId) -> ServiceResult<bool> {
        self.mutate("card_pin", |_, state| {
            if !state.contains(id) {
                return Ok(false);
            }
            state.priority.pin(id)?;
            Ok(true)
        })
    }

    /// Unpins a card and moves it to the drawer.
    pub fn unpin(&self, id: CardId) -> ServiceResult<bool> {
        self.priority_change("card_unpin", id, PriorityState::unpin)
    }

    /// Excludes a card from automatic promotion.
    pub fn exclude(&self, id: CardId) -> ServiceResult<bool> {
        self.priority_change("card_exclude", id, PriorityState::exclude)
    }

    /// Makes a card eligible for automatic promotion again.
    pub fn include(&self, id: CardId) -> ServiceResult<bool> {
        self.priority_change("card_include", id, PriorityState::include)
    }

    /// Derives priorities and the drawer, filtered by `search` when given.
    pub fn view(&self, search: Option<&str>) -> PriorityView {
        let state = self.load_state();
        derive_view(&state.cards, &state.priority, search)
    }

    /// Returns the local completed archive, oldest completion first.
    pub fn completed_archive(&self) -> Vec<CompletedCard> {
        load(&self.local, &LocalKey::CompletedArchive)
    }

    pub fn dismiss_onboarding(&self, flag: OnboardingFlag) -> ServiceResult<()> {
        save(&self.local, &LocalKey::Onboarding(flag), &true)?;
        Ok(())
    }

    pub fn is_onboarding_dismissed(&self, flag: OnboardingFlag) -> bool {
        load(&self.local, &LocalKey::Onboarding(flag))
    }

    /// Folds widget completions into local state and republishes.
    ///
    /// Returns how many local cards were archived as a result.
    pub fn reconcile(&self) -> ServiceResult<usize> {
        if self.shared.is_none() {
            return Ok(0);
        }
        // Every mutation absorbs widget completions first; this one adds nothing.
        let ((), absorbed) = self.run_mutation("card_reconcile", |_, _| Ok(()))?;
        Ok(absorbed)
    }

    fn priority_change(
        &self,
        event: &'static str,
        id: CardId,
        apply: fn(&mut PriorityState, CardId),
    ) -> ServiceResult<bool> {
        self.mutate(event, |_, state| {
            if !state.contains(id) {
                return Ok(false);
            }
            apply(&mut state.priority, id);
            Ok(true)
        })
    }

    fn mutate<T, F>(&self, event: &'static str, f: F) -> ServiceResult<T>
    where
        F: FnOnce(&L, &mut CardState) -> ServiceResult<T>,
    {
        self.run_mutation(event, f).map(|(value, _)| value)
    }

    fn run_mutation<T, F>(&self, event: &'static str, f: F) -> ServiceResult<(T, usize)>
    where
        F: FnOnce(&L, &mut CardState) -> ServiceResult<T>,
    {
        let started_at = Instant::now();
        let widget_completed = self.widget_completions();

        let result = self.local.transact(|store| {
            let mut state = read_state(store);
            let absorbed = absorb_widget_completions(store, &mut state, &widget_completed)?;
            let value = f(store, &mut state)?;
            write_state(store, &state)?;
            Ok::<_, ServiceError>((value, state, absorbed))
        });

        match result {
            Ok((value, state, absorbed)) => {
                info!(
                    "event={} module=service status=ok duration_ms={} cards={} absorbed={}",
                    event,
                    started_at.elapsed().as_millis(),
                    state.cards.len(),
                    absorbed
                );
                self.publish(&state);
                Ok((value, absorbed))
            }
            Err(err) => {
                warn!(
                    "event={} module=service status=error duration_ms={} error={}",
                    event,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Completion times by card id, as recorded by the widget.
    fn widget_completions(&self) -> HashMap<CardId, i64> {
        let Some(shared) = self.shared.as_ref() else {
            return HashMap::new();
        };
        read_snapshot(shared)
            .completed_cards
            .into_iter()
            .map(|entry| (entry.card.id, entry.completed_at))
            .collect()
    }

    fn publish(&self, state: &CardState) {
        let Some(shared) = self.shared.as_ref() else {
            warn!("event=shared_publish module=service status=skipped reason=shared_store_missing");
            return;
        };
        let view = derive_view(&state.cards, &state.priority, None);
        match publish_projection(shared, &state.cards, &view.priorities) {
            Ok(()) => info!(
                "event=shared_publish module=service status=ok cards={} priorities={}",
                state.cards.len(),
                view.priorities.len()
            ),
            Err(err) => warn!(
                "event=shared_publish module=service status=error error={}",
                err
            ),
        }
    }
}

fn read_state<S: KeyValueStore>(store: &S) -> CardState {
    let cards: Vec<Card> = load(store, &LocalKey::Cards);
    let manual_order: Vec<CardId> = load(store, &LocalKey::ManualPriority);
    let exclusions: BTreeSet<CardId> = load(store, &LocalKey::Exclusions);

    let mut priority = PriorityState {
        manual_order,
        exclusions,
    };
    priority.prune(&cards);
    CardState { cards, priority }
}

fn write_state<S: KeyValueStore>(store: &S, state: &CardState) -> ServiceResult<()> {
    save(store, &LocalKey::Cards, &state.cards)?;
    save(store, &LocalKey::ManualPriority, &state.priority.manual_order)?;
    save(store, &LocalKey::Exclusions, &state.priority.exclusions)?;
    Ok(())
}

fn append_archive<S: KeyValueStore>(store: &S, entries: &[CompletedCard]) -> ServiceResult<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let mut archive: Vec<CompletedCard> = load(store, &LocalKey::CompletedArchive);
    archive.extend_from_slice(entries);
    save(store, &LocalKey::CompletedArchive, &archive)?;
    Ok(())
}

/// Archives local cards the widget already completed. Returns the count.
///
/// The local archive keeps the unscrubbed card with the widget's timestamp.
fn absorb_widget_completions<S: KeyValueStore>(
    store: &S,
    state: &mut CardState,
    widget_completed: &HashMap<CardId, i64>,
) -> ServiceResult<usize> {
    if widget_completed.is_empty() {
        return Ok(0);
    }

    let mut entries = widget_completed
        .iter()
        .filter_map(|(id, completed_at)| {
            state
                .take(*id)
                .map(|card| CompletedCard::new(card, *completed_at))
        })
        .collect::<Vec<_>>();
    entries.sort_by_key(|entry| entry.completed_at);
    append_archive(store, &entries)?;
    Ok(entries.len())
}
