//! Main-app use-case services.
//!
//! # Responsibility
//! - Orchestrate store reads/writes and policy decisions into use cases.
//! - Keep FFI and CLI layers decoupled from storage details.

pub mod card_service;
