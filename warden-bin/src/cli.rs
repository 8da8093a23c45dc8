use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use warden_approval::ApprovalQueue;
use warden_audit::{AuditFilter, AuditJournal};
use warden_config::ConfigLoader;
use warden_core::{AgentSnapshot, Result, SessionStatus};
use warden_engine::{CancelToken, ExecutionEngine, PlatformScreenCapture, RunOptions};
use warden_llm::OllamaClient;
use warden_memory::MemoryStore;
use warden_tools::{register_builtins, ToolRegistry};

#[derive(Parser)]
#[command(name = "warden", about = "A policy-governed agent execution core", version)]
pub struct Cli {
    /// Path to warden.toml (default: ~/.warden/warden.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an agent on a prompt and print the result
    Run {
        /// The user prompt
        prompt: String,
        /// Offer every registered tool, raise the iteration ceiling, and
        /// feed post-action screenshots back to the model
        #[arg(long)]
        agent_mode: bool,
        /// Model override
        #[arg(long)]
        model: Option<String>,
        /// Approve every pending request without asking (use with care)
        #[arg(long)]
        approve_all: bool,
    },
    /// List registered tools
    Tools,
    /// Query or export the audit journal
    Audit {
        /// Export matching entries as CSV and print the file path
        #[arg(long)]
        export: bool,
        /// Maximum entries to show
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },
    /// List persistent memory entries
    Memory,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        let loader = ConfigLoader::load(self.config.as_deref())?;
        let config = loader.get();

        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
            )
            .with_target(false)
            .init();

        match &self.command {
            Command::Run {
                prompt,
                agent_mode,
                model,
                approve_all,
            } => self.cmd_run(&config, prompt, *agent_mode, model.clone(), *approve_all).await,
            Command::Tools => self.cmd_tools(&config),
            Command::Audit { export, limit } => self.cmd_audit(&config, *export, *limit),
            Command::Memory => self.cmd_memory(&config),
        }
    }

    async fn cmd_run(
        &self,
        config: &warden_config::WardenConfig,
        prompt: &str,
        agent_mode: bool,
        model: Option<String>,
        approve_all: bool,
    ) -> Result<()> {
        let memory = Arc::new(MemoryStore::open(&config.memory.file_path)?);
        let registry = Arc::new(ToolRegistry::new());
        register_builtins(&registry, Arc::clone(&memory));
        // The CLI host enables the full catalog; policy still gates each call.
        let all_tools: Vec<String> = registry.descriptors().iter().map(|d| d.name.clone()).collect();

        let audit = Arc::new(AuditJournal::open(&config.audit.db_path)?);
        let queue = ApprovalQueue::new();
        let sweeper = queue.spawn_sweeper(Duration::from_secs(5));
        let llm = Arc::new(OllamaClient::new(config.llm.ollama_url.clone()));

        let engine = ExecutionEngine::new(registry, queue.clone(), audit, llm)
            .with_capture(Arc::new(PlatformScreenCapture::new()));

        let mut agent = AgentSnapshot::new(
            "warden",
            config.llm.default_provider,
            model.unwrap_or_else(|| config.llm.default_model.clone()),
        )
        .with_policy(config.security.to_policy());
        agent.temperature = config.llm.temperature;
        agent.max_tokens = config.llm.max_tokens;
        agent.enabled_tools = all_tools;

        // Human side of the approval queue: prompt on stdin, or rubber-stamp
        // with --approve-all.
        let responder = spawn_approval_responder(queue.clone(), approve_all);

        let options = if agent_mode {
            RunOptions::agent_mode()
        } else {
            RunOptions::default()
        };
        let session = engine
            .run(&agent, prompt, options, CancelToken::new())
            .await?;

        responder.abort();
        sweeper.abort();

        match session.status {
            SessionStatus::Completed => {
                println!("{}", session.result.as_ref().map(|r| r.output.as_str()).unwrap_or(""));
                Ok(())
            }
            status => {
                let result = session.result.as_ref();
                if let Some(output) = result.map(|r| r.output.as_str()).filter(|o| !o.is_empty()) {
                    println!("{output}");
                }
                eprintln!(
                    "session {:?}: {}",
                    status,
                    result.and_then(|r| r.error.as_deref()).unwrap_or("unknown")
                );
                std::process::exit(1);
            }
        }
    }

    fn cmd_tools(&self, config: &warden_config::WardenConfig) -> Result<()> {
        let memory = Arc::new(MemoryStore::open(&config.memory.file_path)?);
        let registry = ToolRegistry::new();
        register_builtins(&registry, memory);
        for tool in registry.descriptors() {
            println!("{:<40} {:<8} {}", tool.name, tool.risk_level.as_str(), tool.description);
        }
        Ok(())
    }

    fn cmd_audit(&self, config: &warden_config::WardenConfig, export: bool, limit: usize) -> Result<()> {
        let journal = AuditJournal::open(&config.audit.db_path)?;
        let filter = AuditFilter {
            limit,
            ..Default::default()
        };
        if export {
            let path = journal.export(&filter)?;
            println!("{}", path.display());
            return Ok(());
        }
        for entry in journal.query(&filter)? {
            println!(
                "{}  {:<22} {:<8} {:<8} {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.kind.as_str(),
                entry.severity.as_str(),
                entry.result.as_str(),
                entry.action,
            );
        }
        Ok(())
    }

    fn cmd_memory(&self, config: &warden_config::WardenConfig) -> Result<()> {
        let memory = MemoryStore::open(&config.memory.file_path)?;
        for (key, value) in memory.list() {
            println!("{key}: {value}");
        }
        Ok(())
    }
}

fn spawn_approval_responder(
    queue: ApprovalQueue,
    approve_all: bool,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let Some(request) = queue.current().await else {
                tokio::time::sleep(Duration::from_millis(200)).await;
                continue;
            };
            if approve_all {
                let _ = queue.approve(request.id, Some("--approve-all".into()), None).await;
                continue;
            }
            eprintln!(
                "\napproval required: {} (risk: {})\n  reason: {}\n  impact: {}\napprove? [y/N] ",
                request.call.name, request.risk, request.reasoning, request.impact
            );
            match lines.next_line().await {
                Ok(Some(answer)) if answer.trim().eq_ignore_ascii_case("y") => {
                    let _ = queue.approve(request.id, None, None).await;
                }
                Ok(Some(_)) | Ok(None) => {
                    let _ = queue.deny(request.id, None).await;
                }
                Err(_) => break,
            }
        }
    })
}
