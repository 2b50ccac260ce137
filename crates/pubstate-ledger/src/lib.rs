//! # pubstate-ledger
//!
//! Persistence layer for workspace state snapshots.
//!
//! This crate provides:
//! - `SnapshotRecord` and `Workspace` (the persisted records)
//! - JSONL read/write (portable persistence)
//! - `SnapshotLedger` (canonical in-memory chain of every workspace)
//! - `LedgerFile` (lock-scoped, per-workspace mutation of a JSONL ledger)
//!
//! It does not interpret snapshot payloads; that belongs to
//! `pubstate-kernel`.
//!
//! ## Snapshot lifecycle
//!
//! ```text
//! append_pending        ← inactive record, workspace locked
//!     │ apply_outcome(Delivered)        │ apply_outcome(Failed)
//! active snapshot, unlocked          inactive forever, unlocked
//! ```

pub mod jsonl;
pub mod ledger;
pub mod ledger_file;
pub mod record;

pub use jsonl::{JsonlError, LedgerEntry, read_entries_from_path, write_entries_to_path};
pub use ledger::{LedgerError, SnapshotLedger};
pub use ledger_file::{LedgerFile, LedgerFileError};
pub use record::{Outcome, OutcomeEffect, SnapshotRecord, Workspace};
