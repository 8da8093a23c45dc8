//! Read-only system introspection tools.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

use warden_core::{ParamSpec, Result, RiskLevel, ToolCategory, ToolDescriptor};

use super::{optional_usize, run_command};
use crate::registry::{ToolHandler, ToolRegistry};

pub fn register(registry: &ToolRegistry) {
    registry.register(
        ToolDescriptor::new(
            "get_current_datetime",
            "Get the current date and time in UTC and the local timezone",
            ToolCategory::System,
            RiskLevel::Low,
        ),
        Arc::new(GetCurrentDatetime),
    );
    registry.register(
        ToolDescriptor::new(
            "get_system_info",
            "Get operating system, architecture, and hostname",
            ToolCategory::System,
            RiskLevel::Low,
        ),
        Arc::new(GetSystemInfo),
    );
    registry.register(
        ToolDescriptor::new(
            "list_processes",
            "List running processes with pid, cpu, and memory usage",
            ToolCategory::System,
            RiskLevel::Low,
        )
        .param(
            "limit",
            ParamSpec::integer("Maximum processes to list (default: 30)").optional(),
        ),
        Arc::new(ListProcesses),
    );
}

struct GetCurrentDatetime;

#[async_trait]
impl ToolHandler for GetCurrentDatetime {
    async fn run(&self, _args: &BTreeMap<String, String>) -> Result<String> {
        let utc = Utc::now();
        let local = chrono::Local::now();
        Ok(format!(
            "UTC: {}\nLocal: {}",
            utc.to_rfc3339(),
            local.to_rfc3339()
        ))
    }
}

struct GetSystemInfo;

#[async_trait]
impl ToolHandler for GetSystemInfo {
    async fn run(&self, _args: &BTreeMap<String, String>) -> Result<String> {
        let hostname = run_command("hostname", &[], None)
            .await
            .map(|(_, out, _)| out.trim().to_string())
            .unwrap_or_else(|_| "unknown".into());
        Ok(format!(
            "os: {}\nfamily: {}\narch: {}\nhostname: {hostname}",
            std::env::consts::OS,
            std::env::consts::FAMILY,
            std::env::consts::ARCH,
        ))
    }
}

struct ListProcesses;

#[async_trait]
impl ToolHandler for ListProcesses {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let limit = optional_usize(args, "limit", 30);
        let (code, stdout, stderr) =
            run_command("ps", &["-eo", "pid,pcpu,pmem,comm"], None).await?;
        if code != 0 {
            return Ok(format!("Error: ps failed: {}", stderr.trim()));
        }
        let lines: Vec<&str> = stdout.lines().take(limit + 1).collect();
        Ok(lines.join("\n"))
    }
}
