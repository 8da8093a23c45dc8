//! # warden-memory
//!
//! The agent's persistent memory: a process-wide string→string map backed by
//! a single JSON file under the user's application data directory. Loaded at
//! startup, flushed on every mutation, with a backup copy taken before each
//! overwrite.

pub mod store;

pub use store::MemoryStore;
