//! The shell tool. One command per call, stdin nulled so interactive
//! commands fail fast instead of hanging, stdout and stderr both captured.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use warden_core::{ParamSpec, Result, RiskLevel, ToolCategory, ToolDescriptor};

use super::{optional, required, run_shell};
use crate::registry::{ToolHandler, ToolRegistry};

pub fn register(registry: &ToolRegistry) {
    registry.register(
        ToolDescriptor::new(
            "execute_command",
            "Run a non-interactive shell command and return its exit code, stdout, and stderr. \
             Stdin is /dev/null — commands that prompt will fail fast.",
            ToolCategory::Shell,
            RiskLevel::High,
        )
        .param("command", ParamSpec::string("The shell command to execute"))
        .param(
            "working_dir",
            ParamSpec::string("Working directory (optional)").optional(),
        ),
        Arc::new(ExecuteCommand),
    );
}

struct ExecuteCommand;

#[async_trait]
impl ToolHandler for ExecuteCommand {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let command = required(args, "command", "execute_command")?;
        let working_dir = optional(args, "working_dir");

        info!(command, "executing shell command");
        let (exit_code, stdout, stderr) = run_shell(command, working_dir).await?;

        let body = format!(
            "Exit code: {exit_code}\n\nSTDOUT:\n{}\n\nSTDERR:\n{}",
            stdout.chars().take(10_000).collect::<String>(),
            stderr.chars().take(5_000).collect::<String>(),
        );
        if exit_code == 0 {
            Ok(body)
        } else {
            Ok(format!("Error: command exited with {exit_code}\n{body}"))
        }
    }
}
