//! Tiered character memory and scene drafting for collaborative fiction.
//!
//! Taleweave keeps per-character narrative memory for a story written together
//! with a local LLM (the *oracle*) and assembles that memory, plus world and
//! style texts, into prompts. Each character has three tiers:
//!
//! | Tier | Content | Changes |
//! |------|---------|---------|
//! | **Background** | Profile: role, traits, history, relationships | Written once |
//! | **Short-term** | One timestamped memory per committed scene | Appended; reset on consolidation |
//! | **Long-term** | Consolidated first-person summaries | Appended per consolidation |
//!
//! When short-term memory grows past a soft limit, [`memory::consolidate`]
//! compresses it into one long-term entry. Every write to a short-term,
//! long-term, or story record is preceded by a backup.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`store`] — Named text records, on disk or in memory
//! - [`memory`] — Tier records, backups, consolidation, and scene memories
//! - [`oracle`] — Text-generation client for OpenAI-compatible endpoints
//! - [`context`] — Prompt assembly from world, story, and cast
//! - [`operator`] — Line-based operator I/O, console or scripted
//! - [`session`] — The interactive scene loop

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod operator;
pub mod oracle;
pub mod session;
pub mod store;

pub use error::{Error, Result};
