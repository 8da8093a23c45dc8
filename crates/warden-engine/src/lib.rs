//! # warden-engine
//!
//! The execution loop: carries a session from a user prompt to a terminal
//! result, with bounded iteration, policy-gated tool dispatch, human
//! approval roundtrips, optional vision feedback, and a full audit trail.
//!
//! ## The cycle
//!
//! ```text
//!   user prompt
//!       │
//!       ▼
//!  ┌──────────────┐   tool calls   ┌──────────────┐
//!  │  LLM client   │ ─────────────▶ │ Policy engine │──▶ block ──▶ tool result
//!  └──────────────┘                └──────┬───────┘
//!       ▲                                  │ ask            allow
//!       │ observations                     ▼                  │
//!       │                          ┌──────────────┐           │
//!       │                          │ Approval queue│──▶ deny/expire
//!       │                          └──────┬───────┘           │
//!       │                                  │ approve          │
//!       │                                  ▼                  ▼
//!       │                          ┌─────────────────────────────┐
//!       └──────────────────────────│   Tool registry dispatch     │
//!          (+ screenshot in        └─────────────────────────────┘
//!           agent mode)                        │
//!                                       audit journal
//! ```
//!
//! Every tool-level failure is surfaced to the model as text; only
//! infrastructure failures and explicit cancellation terminate the loop.

pub mod cancel;
pub mod capture;
pub mod engine;
pub mod store;

pub use cancel::CancelToken;
pub use capture::{PlatformScreenCapture, ScreenCapture};
pub use engine::{ExecutionEngine, RunOptions, MAX_DELEGATION_DEPTH};
pub use store::{MemorySessionStore, SessionStore};
