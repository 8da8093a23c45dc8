//! # warden-config
//!
//! Configuration for the Warden host: the default LLM provider and model,
//! the default security policy applied to new agents, and storage paths.
//! Loaded from `warden.toml` with environment-variable overrides.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    AuditSettings, LlmSettings, LoggingSettings, MemorySettings, SecuritySettings, WardenConfig,
};
