//! Capture-time text derivation.
//!
//! # Responsibility
//! - Strip decorative emoji glyphs from free text.
//! - Derive the action-oriented `simplified_text` and the curated emoji.
//!
//! # Invariants
//! - Derivation runs once at capture; stored cards are never re-derived.
//! - `strip_emoji` is idempotent.

mod emoji;
mod simplify;

pub use emoji::{emoji_for_text, strip_emoji};
pub use simplify::simplify_text;
