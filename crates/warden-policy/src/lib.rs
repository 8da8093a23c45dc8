//! # warden-policy
//!
//! The policy and risk engine. Turns a tool call plus an agent's security
//! policy into one of `allow`, `ask`, or `block` — deterministically, in a
//! fixed rule order, with a human-readable reasoning string tied to the
//! highest-triggering rule.

pub mod engine;

pub use engine::{PolicyDecision, PolicyEngine, PolicyVerdict};
