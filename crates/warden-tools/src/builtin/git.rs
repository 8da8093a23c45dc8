//! Git tools. Everything shells out to the `git` binary with stdin nulled;
//! a missing repository or binary surfaces as an `Error:` string the model
//! can read.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use warden_core::{ParamSpec, Result, RiskLevel, ToolCategory, ToolDescriptor};

use super::{optional, optional_usize, required, run_command};
use crate::registry::{ToolHandler, ToolRegistry};

pub fn register(registry: &ToolRegistry) {
    registry.register(
        ToolDescriptor::new(
            "git_status",
            "Show the working-tree status of a repository",
            ToolCategory::Git,
            RiskLevel::Low,
        )
        .param("path", ParamSpec::string("Repository path (default: current directory)").optional()),
        Arc::new(Git(GitOp::Status)),
    );
    registry.register(
        ToolDescriptor::new(
            "git_log",
            "Show recent commits",
            ToolCategory::Git,
            RiskLevel::Low,
        )
        .param("path", ParamSpec::string("Repository path").optional())
        .param("count", ParamSpec::integer("Number of commits (default: 10)").optional()),
        Arc::new(Git(GitOp::Log)),
    );
    registry.register(
        ToolDescriptor::new(
            "git_diff",
            "Show uncommitted changes",
            ToolCategory::Git,
            RiskLevel::Low,
        )
        .param("path", ParamSpec::string("Repository path").optional()),
        Arc::new(Git(GitOp::Diff)),
    );
    registry.register(
        ToolDescriptor::new(
            "git_branch",
            "List branches, or create one when a name is given",
            ToolCategory::Git,
            RiskLevel::Medium,
        )
        .param("path", ParamSpec::string("Repository path").optional())
        .param("name", ParamSpec::string("Branch to create (omit to list)").optional()),
        Arc::new(Git(GitOp::Branch)),
    );
    registry.register(
        ToolDescriptor::new(
            "git_clone",
            "Clone a repository",
            ToolCategory::Git,
            RiskLevel::Medium,
        )
        .param("url", ParamSpec::string("Repository URL to clone"))
        .param("destination", ParamSpec::string("Target directory").optional()),
        Arc::new(Git(GitOp::Clone)),
    );
    registry.register(
        ToolDescriptor::new(
            "git_commit",
            "Stage all changes and commit with a message",
            ToolCategory::Git,
            RiskLevel::High,
        )
        .param("path", ParamSpec::string("Repository path").optional())
        .param("message", ParamSpec::string("Commit message")),
        Arc::new(Git(GitOp::Commit)),
    );
}

enum GitOp {
    Status,
    Log,
    Diff,
    Branch,
    Clone,
    Commit,
}

struct Git(GitOp);

#[async_trait]
impl ToolHandler for Git {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let path = optional(args, "path");
        let (code, stdout, stderr) = match &self.0 {
            GitOp::Status => run_command("git", &["status", "--short", "--branch"], path).await?,
            GitOp::Log => {
                let count = optional_usize(args, "count", 10).to_string();
                run_command("git", &["log", "--oneline", "-n", &count], path).await?
            }
            GitOp::Diff => run_command("git", &["diff"], path).await?,
            GitOp::Branch => match optional(args, "name") {
                Some(name) => run_command("git", &["checkout", "-b", name], path).await?,
                None => run_command("git", &["branch", "--list"], path).await?,
            },
            GitOp::Clone => {
                let url = required(args, "url", "git_clone")?;
                match optional(args, "destination") {
                    Some(dest) => run_command("git", &["clone", url, dest], None).await?,
                    None => run_command("git", &["clone", url], None).await?,
                }
            }
            GitOp::Commit => {
                let message = required(args, "message", "git_commit")?;
                let (code, _, stderr) = run_command("git", &["add", "-A"], path).await?;
                if code != 0 {
                    return Ok(format!("Error: git add failed: {}", stderr.trim()));
                }
                run_command("git", &["commit", "-m", message], path).await?
            }
        };

        if code == 0 {
            let out = stdout.trim();
            Ok(if out.is_empty() {
                "(no output)".to_string()
            } else {
                out.chars().take(20_000).collect()
            })
        } else {
            Ok(format!("Error: git exited with {code}: {}", stderr.trim()))
        }
    }
}
