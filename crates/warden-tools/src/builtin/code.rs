//! Script execution tools. The source is written to a temp file and run
//! under the platform interpreter; the dispatcher's wall-clock budget
//! bounds runtime.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use warden_core::{ParamSpec, Result, RiskLevel, ToolCategory, ToolDescriptor, WardenError};

use super::{required, run_command};
use crate::registry::{ToolHandler, ToolRegistry};

pub fn register(registry: &ToolRegistry) {
    registry.register(
        ToolDescriptor::new(
            "run_python",
            "Run a Python script with python3 and return its output",
            ToolCategory::CodeExec,
            RiskLevel::High,
        )
        .param("code", ParamSpec::string("Python source to execute")),
        Arc::new(RunScript {
            tool: "run_python",
            interpreter: "python3",
            extension: "py",
        }),
    );
    registry.register(
        ToolDescriptor::new(
            "run_node",
            "Run a JavaScript script with node and return its output",
            ToolCategory::CodeExec,
            RiskLevel::High,
        )
        .param("code", ParamSpec::string("JavaScript source to execute")),
        Arc::new(RunScript {
            tool: "run_node",
            interpreter: "node",
            extension: "js",
        }),
    );
}

struct RunScript {
    tool: &'static str,
    interpreter: &'static str,
    extension: &'static str,
}

#[async_trait]
impl ToolHandler for RunScript {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let code = required(args, "code", self.tool)?;
        let path = std::env::temp_dir().join(format!(
            "warden-script-{}.{}",
            uuid::Uuid::new_v4().as_simple(),
            self.extension
        ));
        tokio::fs::write(&path, code)
            .await
            .map_err(|e| WardenError::ToolExecution {
                tool: self.tool.into(),
                reason: e.to_string(),
            })?;

        info!(interpreter = self.interpreter, bytes = code.len(), "running script");
        let result = run_command(self.interpreter, &[&path.to_string_lossy()], None).await;
        tokio::fs::remove_file(&path).await.ok();

        let (exit_code, stdout, stderr) = result?;
        let body = format!(
            "Exit code: {exit_code}\n\nSTDOUT:\n{}\n\nSTDERR:\n{}",
            stdout.chars().take(10_000).collect::<String>(),
            stderr.chars().take(5_000).collect::<String>(),
        );
        if exit_code == 0 {
            Ok(body)
        } else {
            Ok(format!("Error: script exited with {exit_code}\n{body}"))
        }
    }
}
