//! # warden-audit
//!
//! The append-only security journal. Every security-relevant event — tool
//! dispatches, policy blocks, approval decisions, session lifecycle — is
//! recorded exactly once, durably, and in order. There is no update or
//! delete surface: once written, an entry is immutable.

pub mod entry;
pub mod journal;

pub use entry::{ActionResult, AuditEntry, AuditEventKind, Severity};
pub use journal::{AuditFilter, AuditJournal};
