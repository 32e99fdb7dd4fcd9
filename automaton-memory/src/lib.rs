#![deny(missing_docs)]
//! # automaton-memory — what the agent remembers after each turn
//!
//! Ingestion runs after every turn: classify what the turn was about,
//! then write episodic, semantic, relationship, and working entries.
//! Every step is wrapped: a failure is logged and the next step runs.
//! Memory is best-effort by contract: nothing here ever fails a turn.

mod classify;
mod ingest;

pub use classify::classify_turn;
pub use ingest::{MemoryIngestor, WORKING_MEMORY_CAP};
