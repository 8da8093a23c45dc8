//! # warden-llm
//!
//! The LLM client contract the execution engine talks through, plus the two
//! adapters the core ships: a deterministic mock for tests and an
//! Ollama-compatible HTTP adapter. Real multi-provider routing is a host
//! concern; any `LlmClient` implementation can be installed.

pub mod client;
pub mod mock;
pub mod ollama;

pub use client::{FinishReason, LlmChunk, LlmClient, LlmReply, LlmRequest, TokenUsage};
pub use mock::{MockLlm, MockReply};
pub use ollama::OllamaClient;
