use onemust_core::{derive_view, strip_emoji, Card, CardId, PriorityState, MAX_PRIORITIES};
use proptest::prelude::*;
use std::collections::BTreeSet;
use uuid::Uuid;

fn card(text: &str, timestamp: i64) -> Card {
    Card::from_parts(Uuid::new_v4(), text, text, None, timestamp).unwrap()
}

/// Decorative glyphs and sequences that must never survive scrubbing.
const GLYPHS: &[&str] = &[
    "⭐",
    "⌛",
    "🅰\u{FE0F}",
    "↩\u{FE0F}",
    "‼",
    "🇯🇵",
    "🏴\u{E0067}\u{E0062}\u{E0073}\u{E0063}\u{E0074}\u{E007F}",
    "👩\u{200D}👧",
    "🏃🏽\u{200D}♀\u{FE0F}",
    "🔥",
];

fn ids(cards: &[Card]) -> Vec<CardId> {
    cards.iter().map(|card| card.id).collect()
}

/// Cards with arbitrary timestamps plus index-selected manual and excluded ids.
fn collection_strategy() -> impl Strategy<Value = (Vec<Card>, Vec<usize>, BTreeSet<usize>)> {
    proptest::collection::vec(0i64..50, 0..12)
        .prop_flat_map(|timestamps| {
            let len = timestamps.len().max(1);
            (
                Just(timestamps),
                proptest::collection::vec(0..len, 0..=MAX_PRIORITIES),
                proptest::collection::btree_set(0..len, 0..len),
            )
        })
        .prop_map(|(timestamps, manual, excluded)| {
            let cards = timestamps
                .iter()
                .enumerate()
                .map(|(index, timestamp)| card(&format!("card {index}"), *timestamp))
                .collect::<Vec<_>>();
            (cards, manual, excluded)
        })
}

fn state_for(cards: &[Card], manual: &[usize], excluded: &BTreeSet<usize>) -> PriorityState {
    let mut manual_order = Vec::new();
    for index in manual {
        if let Some(card) = cards.get(*index) {
            if !manual_order.contains(&card.id) {
                manual_order.push(card.id);
            }
        }
    }
    PriorityState {
        manual_order,
        exclusions: excluded
            .iter()
            .filter_map(|index| cards.get(*index).map(|card| card.id))
            .collect(),
    }
}

proptest! {
    #[test]
    fn priorities_are_capped_and_never_excluded(
        (cards, manual, excluded) in collection_strategy()
    ) {
        let state = state_for(&cards, &manual, &excluded);
        let view = derive_view(&cards, &state, None);

        prop_assert!(view.priorities.len() <= MAX_PRIORITIES);
        for card in &view.priorities {
            prop_assert!(!state.exclusions.contains(&card.id));
        }
        prop_assert_eq!(view.priorities.len() + view.drawer.len(), cards.len());
    }

    #[test]
    fn manual_order_is_preserved_when_present_and_not_excluded(
        (cards, manual, _excluded) in collection_strategy()
    ) {
        let state = state_for(&cards, &manual, &BTreeSet::new());
        let view = derive_view(&cards, &state, None);

        let leading = ids(&view.priorities)
            .into_iter()
            .take(state.manual_order.len())
            .collect::<Vec<_>>();
        prop_assert_eq!(leading, state.manual_order.clone());
    }

    #[test]
    fn strip_emoji_is_idempotent(text in "\\PC{0,40}") {
        let once = strip_emoji(&text);
        prop_assert_eq!(strip_emoji(&once), once.clone());
    }

    #[test]
    fn strip_emoji_leaves_only_the_words(
        pieces in prop::collection::vec(("[a-z]{1,8}", prop::sample::select(GLYPHS)), 0..6)
    ) {
        let text = pieces
            .iter()
            .map(|(word, glyph)| format!("{glyph}{word}"))
            .collect::<Vec<_>>()
            .join(" ");
        let words = pieces
            .iter()
            .map(|(word, _)| word.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        prop_assert_eq!(strip_emoji(&text), words);
    }
}

#[test]
fn three_cards_without_ranks_are_newest_first_with_empty_drawer() {
    let a = card("A", 1);
    let b = card("B", 2);
    let c = card("C", 3);

    let view = derive_view(
        &[a.clone(), b.clone(), c.clone()],
        &PriorityState::default(),
        None,
    );
    assert_eq!(ids(&view.priorities), vec![c.id, b.id, a.id]);
    assert!(view.drawer.is_empty());
}

#[test]
fn excluded_manual_card_is_replaced_by_next_candidate() {
    let a = card("A", 1);
    let b = card("B", 2);
    let c = card("C", 3);
    let d = card("D", 4);
    let cards = vec![a.clone(), b.clone(), c.clone(), d.clone()];

    let mut state = PriorityState::default();
    state.pin(a.id).unwrap();
    state.exclude(d.id);
    let view = derive_view(&cards, &state, None);
    assert_eq!(ids(&view.priorities), vec![a.id, c.id, b.id]);
    assert_eq!(ids(&view.drawer), vec![d.id]);
}

#[test]
fn drawer_search_is_case_insensitive_and_blank_matches_all() {
    let cards = (0..5)
        .map(|index| card(&format!("Errand {index}"), index))
        .collect::<Vec<_>>();

    let view = derive_view(&cards, &PriorityState::default(), Some("ERRAND 1"));
    assert_eq!(ids(&view.drawer), vec![cards[1].id]);

    let view = derive_view(&cards, &PriorityState::default(), Some("   "));
    assert_eq!(view.drawer.len(), 2);
}
