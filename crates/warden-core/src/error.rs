use thiserror::Error;

/// Unified error type for the entire Warden runtime.
///
/// Tool-level failures deliberately do NOT travel through this type during a
/// run — the dispatcher folds them into `Error: …` result strings so the
/// model can see and react to them. `WardenError` is for infrastructure
/// failures that legitimately terminate or refuse work.
#[derive(Error, Debug)]
pub enum WardenError {
    // ── LLM errors ─────────────────────────────────────────────
    #[error("llm client error: {0}")]
    Llm(String),

    // ── Tool errors ────────────────────────────────────────────
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution failed: {tool}: {reason}")]
    ToolExecution { tool: String, reason: String },

    // ── Approval errors ────────────────────────────────────────
    #[error("approval error: {0}")]
    Approval(String),

    // ── Storage errors ─────────────────────────────────────────
    #[error("storage error: {0}")]
    Storage(String),

    #[error("memory store error: {0}")]
    Memory(String),

    // ── Engine errors ──────────────────────────────────────────
    #[error("delegation depth {depth} exceeds the maximum of {max}")]
    DelegationDepthExceeded { depth: u8, max: u8 },

    #[error("session cancelled")]
    Cancelled,

    #[error("screen capture failed: {0}")]
    ScreenCapture(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WardenError>;
