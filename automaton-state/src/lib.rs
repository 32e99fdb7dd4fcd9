#![deny(missing_docs)]
//! # automaton-state — the durable state store
//!
//! A single embedded SQLite file is the sole source of truth: identity,
//! turns, finances, heartbeat schedule, child lifecycles, memory tiers,
//! and audit logs all live here. Exactly one process owns the file at a
//! time; within the process every component holds a shared
//! [`StateStore`] handle whose interior mutability is controlled by the
//! store's own transaction wrapper.
//!
//! Opening the store:
//! 1. ensure the parent directory exists with restrictive permissions,
//! 2. open with WAL mode, foreign-key enforcement, and an autocheckpoint
//!    threshold,
//! 3. run `PRAGMA integrity_check`; any non-"ok" result aborts boot,
//! 4. create the base tables,
//! 5. apply migrations V2–V9 in order, each in its own transaction,
//! 6. record the new schema version.
//!
//! JSON blob columns are decoded with [`safe_parse`], which logs and
//! returns a default instead of propagating. One corrupt row degrades;
//! it does not take the agent down.

mod error;
mod migrations;
mod queries;
mod store;

pub use error::StoreError;
pub use migrations::SCHEMA_VERSION;
pub use store::{StateStore, safe_parse};
