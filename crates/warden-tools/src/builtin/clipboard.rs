//! Clipboard tools, shelling out to the platform's clipboard utility
//! (`pbcopy`/`pbpaste` on macOS, `xclip` or `wl-paste` on Linux).

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use warden_core::{ParamSpec, Result, RiskLevel, ToolCategory, ToolDescriptor, WardenError};

use super::run_shell;
use crate::registry::{ToolHandler, ToolRegistry};

pub fn register(registry: &ToolRegistry) {
    registry.register(
        ToolDescriptor::new(
            "read_clipboard",
            "Read the current clipboard contents as text",
            ToolCategory::Clipboard,
            RiskLevel::Low,
        ),
        Arc::new(ReadClipboard),
    );
    registry.register(
        ToolDescriptor::new(
            "write_clipboard",
            "Replace the clipboard contents with text",
            ToolCategory::Clipboard,
            RiskLevel::Low,
        )
        .param("text", ParamSpec::string("Text to place on the clipboard")),
        Arc::new(WriteClipboard),
    );
}

struct ReadClipboard;

#[async_trait]
impl ToolHandler for ReadClipboard {
    async fn run(&self, _args: &BTreeMap<String, String>) -> Result<String> {
        let line = if cfg!(target_os = "macos") {
            "pbpaste"
        } else if cfg!(target_os = "linux") {
            "xclip -selection clipboard -o 2>/dev/null || wl-paste 2>/dev/null"
        } else {
            return Ok("Error: clipboard access is not supported on this platform".into());
        };
        let (code, stdout, stderr) = run_shell(line, None).await?;
        if code == 0 {
            Ok(stdout)
        } else {
            Ok(format!("Error: clipboard read failed: {}", stderr.trim()))
        }
    }
}

struct WriteClipboard;

#[async_trait]
impl ToolHandler for WriteClipboard {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let text = args.get("text").map(String::as_str).unwrap_or_default();
        let program: &[&str] = if cfg!(target_os = "macos") {
            &["pbcopy"]
        } else if cfg!(target_os = "linux") {
            &["xclip", "-selection", "clipboard"]
        } else {
            return Ok("Error: clipboard access is not supported on this platform".into());
        };

        let mut cmd = tokio::process::Command::new(program[0]);
        cmd.args(&program[1..]);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        let mut child = cmd.spawn().map_err(|e| WardenError::ToolExecution {
            tool: "write_clipboard".into(),
            reason: e.to_string(),
        })?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| WardenError::ToolExecution {
                    tool: "write_clipboard".into(),
                    reason: e.to_string(),
                })?;
        }
        drop(child.stdin.take());
        let status = child.wait().await.map_err(|e| WardenError::ToolExecution {
            tool: "write_clipboard".into(),
            reason: e.to_string(),
        })?;
        if status.success() {
            Ok(format!("Copied {} bytes to the clipboard", text.len()))
        } else {
            Ok("Error: clipboard write failed".into())
        }
    }
}
