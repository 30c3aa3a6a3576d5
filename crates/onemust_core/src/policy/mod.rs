//! Focus policy over the card collection.
//!
//! # Responsibility
//! - Decide which cards are the active priorities and which sit in the drawer.
//! - Own the manual priority order and the exclusion set.
//!
//! # Invariants
//! - At most `MAX_PRIORITIES` cards are ever effective priorities.
//! - Exclusion always wins over manual rank.

pub mod priority;
