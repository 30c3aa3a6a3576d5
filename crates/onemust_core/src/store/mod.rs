//! Key-value persistence for the local and shared card areas.
//!
//! # Responsibility
//! - Define the key-value contract both store areas implement.
//! - Provide typed JSON load/save helpers with never-failing reads.
//! - Own the reduced, emoji-scrubbed projection the widget reads.
//!
//! # Invariants
//! - Reads degrade to defaults on missing keys or undecodable values.
//! - Read-modify-write sequences run inside `KeyValueStore::transact`.

pub mod keys;
pub mod kv;
pub mod shared;
