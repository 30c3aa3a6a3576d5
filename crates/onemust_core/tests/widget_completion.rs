use onemust_core::db::{open_db, open_db_in_memory};
use onemust_core::{
    complete_from_widget, publish_projection, read_snapshot, widget_timeline, Card,
    CompletingMarker, CompletionOutcome, NoopReloader, SqliteKeyValueStore, TimelineEntryKind,
    TimelineReloader, REFRESH_INTERVAL_MS, STRIKE_THROUGH_MS, UNTITLED_CARD_TEXT,
};
use std::cell::Cell;
use uuid::Uuid;

#[derive(Default)]
struct CountingReloader {
    calls: Cell<usize>,
}

impl TimelineReloader for CountingReloader {
    fn reload_timelines(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

fn card(text: &str, emoji: Option<&str>, timestamp: i64) -> Card {
    Card::from_parts(
        Uuid::new_v4(),
        text,
        text,
        emoji.map(str::to_string),
        timestamp,
    )
    .unwrap()
}

/// Publishes A..D with A, B, C as priorities.
fn seed(store: &SqliteKeyValueStore<'_>) -> Vec<Card> {
    let cards = vec![
        card("A", None, 4),
        card("B 🧾 taxes", Some("💸"), 3),
        card("C", None, 2),
        card("D", None, 1),
    ];
    publish_projection(store, &cards, &cards[..3]).unwrap();
    cards
}

fn ids(cards: &[Card]) -> Vec<Uuid> {
    cards.iter().map(|card| card.id).collect()
}

#[test]
fn completion_updates_every_shared_list() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::try_new(&conn).unwrap();
    let cards = seed(&store);
    let (a, b, c, d) = (&cards[0], &cards[1], &cards[2], &cards[3]);

    let outcome = complete_from_widget(Some(&store), b.id, 7_000, &NoopReloader);
    assert_eq!(outcome, CompletionOutcome::Completed);

    let snapshot = read_snapshot(&store);
    assert_eq!(ids(&snapshot.all_cards), vec![a.id, c.id, d.id]);
    assert_eq!(ids(&snapshot.priority_cards), vec![a.id, c.id]);
    assert_eq!(snapshot.current_card.map(|card| card.id), Some(a.id));
    assert_eq!(
        snapshot.completing,
        Some(CompletingMarker {
            card_id: b.id,
            rank: Some(2),
        })
    );
}

#[test]
fn completion_archives_scrubbed_copy() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::try_new(&conn).unwrap();
    let cards = seed(&store);
    let b = &cards[1];

    complete_from_widget(Some(&store), b.id, 7_000, &NoopReloader);

    let completed = read_snapshot(&store).completed_cards;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].card.id, b.id);
    assert_eq!(completed[0].card.original_text, "B taxes");
    assert_eq!(completed[0].card.emoji.as_deref(), Some("💸"));
    assert_eq!(completed[0].completed_at, 7_000);
}

#[test]
fn completing_the_current_card_promotes_the_next_one() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::try_new(&conn).unwrap();
    let cards = seed(&store);

    complete_from_widget(Some(&store), cards[0].id, 1, &NoopReloader);

    let snapshot = read_snapshot(&store);
    assert_eq!(snapshot.current_card.map(|card| card.id), Some(cards[1].id));
}

#[test]
fn unknown_card_writes_nothing_and_skips_reload() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::try_new(&conn).unwrap();
    seed(&store);
    let before = read_snapshot(&store);
    let reloader = CountingReloader::default();

    let outcome = complete_from_widget(Some(&store), Uuid::new_v4(), 1, &reloader);
    assert_eq!(outcome, CompletionOutcome::NotFound);
    assert_eq!(read_snapshot(&store), before);
    assert_eq!(reloader.calls.get(), 0);
}

#[test]
fn missing_store_reports_storage_unavailable() {
    let reloader = CountingReloader::default();
    let outcome = complete_from_widget::<SqliteKeyValueStore<'_>, _>(
        None,
        Uuid::new_v4(),
        1,
        &reloader,
    );
    assert_eq!(outcome, CompletionOutcome::StorageUnavailable);
    assert_eq!(reloader.calls.get(), 0);

    let timeline = widget_timeline::<SqliteKeyValueStore<'_>>(None, 10);
    assert_eq!(timeline.entries.len(), 1);
    assert!(timeline.is_empty());
}

#[test]
fn reload_is_requested_once_per_completion() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::try_new(&conn).unwrap();
    let cards = seed(&store);
    let reloader = CountingReloader::default();

    complete_from_widget(Some(&store), cards[2].id, 1, &reloader);
    assert_eq!(reloader.calls.get(), 1);

    // Second tap on the same card finds nothing to do.
    complete_from_widget(Some(&store), cards[2].id, 2, &reloader);
    assert_eq!(reloader.calls.get(), 1);
}

#[test]
fn timeline_shows_strike_through_then_steady_list() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::try_new(&conn).unwrap();
    let cards = seed(&store);
    let (a, b, c) = (&cards[0], &cards[1], &cards[2]);
    complete_from_widget(Some(&store), b.id, 50, &NoopReloader);

    let timeline = widget_timeline(Some(&store), 100);
    assert_eq!(timeline.entries.len(), 2);
    assert_eq!(timeline.refresh_after_ms, 100 + REFRESH_INTERVAL_MS);

    let completing = &timeline.entries[0];
    assert_eq!(completing.kind, TimelineEntryKind::Completing);
    assert_eq!(completing.at_ms, 100);
    assert_eq!(completing.completing_id, Some(b.id));
    let rows = completing
        .cards
        .iter()
        .map(|row| (row.id, row.rank, row.struck))
        .collect::<Vec<_>>();
    assert_eq!(
        rows,
        vec![(a.id, 1, false), (b.id, 2, true), (c.id, 3, false)]
    );
    assert_eq!(completing.cards[1].text, "B taxes");

    let steady = &timeline.entries[1];
    assert_eq!(steady.kind, TimelineEntryKind::Steady);
    assert_eq!(steady.at_ms, 100 + STRIKE_THROUGH_MS);
    assert_eq!(
        steady.cards.iter().map(|row| row.id).collect::<Vec<_>>(),
        vec![a.id, c.id]
    );
    assert!(steady.cards.iter().all(|row| !row.struck));
    assert_eq!(steady.cards[0].link, format!("onemust://card/{}", a.id));

    assert_eq!(read_snapshot(&store).completing, None);
    let next = widget_timeline(Some(&store), 200);
    assert_eq!(next.entries.len(), 1);
    assert_eq!(next.entries[0].kind, TimelineEntryKind::Steady);
    assert_eq!(next.entries[0].cards.len(), 2);
}

#[test]
fn drawer_completion_marks_without_reinserting() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::try_new(&conn).unwrap();
    let cards = seed(&store);
    let d = &cards[3];

    complete_from_widget(Some(&store), d.id, 1, &NoopReloader);
    assert_eq!(
        read_snapshot(&store).completing,
        Some(CompletingMarker {
            card_id: d.id,
            rank: None,
        })
    );

    let timeline = widget_timeline(Some(&store), 10);
    assert_eq!(timeline.entries.len(), 2);
    assert_eq!(timeline.entries[0].completing_id, Some(d.id));
    assert_eq!(timeline.entries[0].cards.len(), 3);
    assert!(timeline.entries[0].cards.iter().all(|row| !row.struck));
}

#[test]
fn stale_publish_does_not_resurrect_completed_card() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::try_new(&conn).unwrap();
    let cards = seed(&store);
    let b = &cards[1];

    complete_from_widget(Some(&store), b.id, 1, &NoopReloader);
    // App republishes from local state that still holds B.
    publish_projection(&store, &cards, &cards[..3]).unwrap();

    let snapshot = read_snapshot(&store);
    assert!(!snapshot.all_cards.iter().any(|card| card.id == b.id));
    assert!(!snapshot.priority_cards.iter().any(|card| card.id == b.id));
}

#[test]
fn completion_is_visible_to_another_process_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("group").join("shared.sqlite3");
    let app_conn = open_db(&path).unwrap();
    let widget_conn = open_db(&path).unwrap();
    let app = SqliteKeyValueStore::try_new(&app_conn).unwrap();
    let widget = SqliteKeyValueStore::try_new(&widget_conn).unwrap();

    let cards = seed(&app);
    let outcome = complete_from_widget(Some(&widget), cards[0].id, 5, &NoopReloader);
    assert_eq!(outcome, CompletionOutcome::Completed);

    let snapshot = read_snapshot(&app);
    assert_eq!(ids(&snapshot.priority_cards), vec![cards[1].id, cards[2].id]);
    assert_eq!(snapshot.completed_cards.len(), 1);
    assert_eq!(
        snapshot.completing.map(|marker| marker.card_id),
        Some(cards[0].id)
    );
}

#[test]
fn glyph_only_card_never_renders_a_blank_row() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::try_new(&conn).unwrap();
    let bare = Card::capture("🎉🎉", 2).unwrap();
    let curated = card("🎁", Some("🎁"), 1);
    let cards = vec![bare.clone(), curated.clone()];
    publish_projection(&store, &cards, &cards).unwrap();

    let timeline = widget_timeline(Some(&store), 10);
    let rows = &timeline.entries[0].cards;
    assert_eq!(rows[0].id, bare.id);
    assert_eq!(rows[0].text, UNTITLED_CARD_TEXT);
    assert_eq!(rows[0].emoji, None);
    assert_eq!(rows[1].id, curated.id);
    assert_eq!(rows[1].text, "");
    assert_eq!(rows[1].emoji.as_deref(), Some("🎁"));
}
