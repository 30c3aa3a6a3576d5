//! Card domain model.
//!
//! # Responsibility
//! - Define the captured note record and its JSON wire shape.
//! - Derive simplified text and emoji once, at capture time.
//!
//! # Invariants
//! - `id` is stable and never reused for another card.
//! - `original_text` and `simplified_text` are non-empty after trimming.
//! - `timestamp` is epoch milliseconds and never negative.

use crate::text::{emoji_for_text, simplify_text, strip_emoji};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a card.
pub type CardId = Uuid;

/// Validation failures for card construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardValidationError {
    EmptyText,
    EmptySimplifiedText,
    NegativeTimestamp(i64),
}

impl Display for CardValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "card text cannot be empty"),
            Self::EmptySimplifiedText => write!(f, "card simplified text cannot be empty"),
            Self::NegativeTimestamp(value) => {
                write!(f, "card timestamp must be non-negative, got {value}")
            }
        }
    }
}

impl Error for CardValidationError {}

/// One captured note.
///
/// Serialized as `{id, originalText, simplifiedText, emoji?, timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    /// Raw text or dictation as entered, trimmed.
    pub original_text: String,
    /// Action-oriented rendering derived at capture.
    pub simplified_text: String,
    /// Curated single glyph from the keyword lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
}

impl Card {
    /// Captures user text into a new card with a generated ID.
    pub fn capture(text: &str, now_ms: i64) -> Result<Self, CardValidationError> {
        let original = text.trim();
        if original.is_empty() {
            return Err(CardValidationError::EmptyText);
        }
        Self::from_parts(
            Uuid::new_v4(),
            original,
            simplify_text(original),
            emoji_for_text(original),
            now_ms,
        )
    }

    /// Rebuilds a card with a caller-provided identity.
    ///
    /// Used by import paths and tests where the ID already exists.
    pub fn from_parts(
        id: CardId,
        original_text: impl Into<String>,
        simplified_text: impl Into<String>,
        emoji: Option<String>,
        timestamp: i64,
    ) -> Result<Self, CardValidationError> {
        let card = Self {
            id,
            original_text: original_text.into(),
            simplified_text: simplified_text.into(),
            emoji,
            timestamp,
        };
        card.validate()?;
        Ok(card)
    }

    pub fn validate(&self) -> Result<(), CardValidationError> {
        if self.original_text.trim().is_empty() {
            return Err(CardValidationError::EmptyText);
        }
        if self.simplified_text.trim().is_empty() {
            return Err(CardValidationError::EmptySimplifiedText);
        }
        if self.timestamp < 0 {
            return Err(CardValidationError::NegativeTimestamp(self.timestamp));
        }
        Ok(())
    }

    /// Returns a copy with emoji glyphs removed from both text fields.
    ///
    /// The curated `emoji` field is kept as-is.
    pub fn scrubbed(&self) -> Self {
        Self {
            id: self.id,
            original_text: strip_emoji(&self.original_text),
            simplified_text: strip_emoji(&self.simplified_text),
            emoji: self.emoji.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Case-insensitive substring match on original and simplified text.
    ///
    /// A blank query matches every card.
    pub fn matches_search(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.original_text.to_lowercase().contains(&needle)
            || self.simplified_text.to_lowercase().contains(&needle)
    }
}

/// Archive entry written when a card is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedCard {
    pub card: Card,
    /// Completion time in epoch milliseconds.
    pub completed_at: i64,
}

impl CompletedCard {
    pub fn new(card: Card, completed_at: i64) -> Self {
        Self { card, completed_at }
    }

    /// Elapsed time between capture and completion, floored at zero.
    pub fn time_to_complete_ms(&self) -> i64 {
        (self.completed_at - self.card.timestamp).max(0)
    }
}

/// Hints the user can dismiss once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingFlag {
    /// First-run hint above the capture composer.
    CaptureHint,
    /// Prompt explaining how to add the home-screen widget.
    WidgetHint,
}

impl OnboardingFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CaptureHint => "capture_hint",
            Self::WidgetHint => "widget_hint",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "capture_hint" => Some(Self::CaptureHint),
            "widget_hint" => Some(Self::WidgetHint),
            _ => None,
        }
    }
}

/// Current time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
