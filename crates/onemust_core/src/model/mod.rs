//! Card domain model.
//!
//! # Responsibility
//! - Define the captured `Card` record and its completed-archive wrapper.
//! - Define the small enums persisted alongside cards.
//!
//! # Invariants
//! - Every card is identified by a stable `CardId`.
//! - Card text never changes after capture; there is no edit path.
//! - Completion and deletion remove cards outright (no tombstones).

pub mod card;
