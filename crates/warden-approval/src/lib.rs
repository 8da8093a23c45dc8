//! # warden-approval
//!
//! The approval queue parks `ask` decisions for human adjudication with
//! bounded waits. Pending requests are promoted FIFO, every request reaches
//! exactly one terminal state, and a background sweeper expires requests
//! whose deadline has passed.

pub mod queue;
pub mod request;

pub use queue::ApprovalQueue;
pub use request::{ApprovalRequest, ApprovalStatus, UserDecision};
