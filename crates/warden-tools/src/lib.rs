//! # warden-tools
//!
//! The typed catalog of side-effecting operations the model may request,
//! and the dispatcher that runs them. Every handler produces a UTF-8 string
//! result; failures come back as `Error: …` strings and timeouts as
//! `Error: timeout`, so tool-level problems reach the model as text instead
//! of unwinding the loop.

pub mod builtin;
pub mod registry;

pub use builtin::register_builtins;
pub use registry::{ToolHandler, ToolRegistry, UPDATE_SELF};
