//! The built-in tool set, registered at process start.
//!
//! Grouped by concern; each module registers its descriptors and handlers
//! into the shared registry. Hosts may register further tools (or override
//! these by name) before the first session starts.

pub mod clipboard;
pub mod code;
pub mod fs;
pub mod git;
pub mod media;
pub mod memory;
pub mod net;
pub mod screen;
pub mod self_modify;
pub mod shell;
pub mod system;
pub mod text;

use std::collections::BTreeMap;
use std::sync::Arc;

use warden_core::{Result, WardenError};
use warden_memory::MemoryStore;

use crate::registry::ToolRegistry;

/// Register every built-in tool.
pub fn register_builtins(registry: &ToolRegistry, memory: Arc<MemoryStore>) {
    fs::register(registry);
    shell::register(registry);
    system::register(registry);
    net::register(registry);
    git::register(registry);
    text::register(registry);
    clipboard::register(registry);
    media::register(registry);
    code::register(registry);
    screen::register(registry);
    memory::register(registry, memory);
    self_modify::register(registry);
}

/// Fetch a required argument or fail with a handler error.
pub(crate) fn required<'a>(
    args: &'a BTreeMap<String, String>,
    key: &str,
    tool: &str,
) -> Result<&'a str> {
    args.get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| WardenError::ToolExecution {
            tool: tool.into(),
            reason: format!("missing '{key}' argument"),
        })
}

pub(crate) fn optional<'a>(args: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    args.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

pub(crate) fn optional_usize(args: &BTreeMap<String, String>, key: &str, default: usize) -> usize {
    optional(args, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Shell-escape a string for safe use in `sh -c` commands.
pub(crate) fn shell_escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Run a subprocess with stdin nulled and return
/// `(exit_code, stdout, stderr)`.
pub(crate) async fn run_command(
    program: &str,
    args: &[&str],
    working_dir: Option<&str>,
) -> Result<(i32, String, String)> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args);
    cmd.stdin(std::process::Stdio::null());
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }
    let output = cmd.output().await.map_err(|e| WardenError::ToolExecution {
        tool: program.into(),
        reason: e.to_string(),
    })?;
    Ok((
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    ))
}

/// Run a shell line through `sh -c` with stdin nulled.
pub(crate) async fn run_shell(line: &str, working_dir: Option<&str>) -> Result<(i32, String, String)> {
    run_command("sh", &["-c", line], working_dir).await
}
