//! Cross-process coordination between the main app and the widget.
//!
//! # Responsibility
//! - Run widget-initiated completions against the shared store.
//! - Turn shared state into a widget timeline with a completion cue.
//!
//! # Invariants
//! - The shared store is the only channel; there is no push to the app.

pub mod completion;
