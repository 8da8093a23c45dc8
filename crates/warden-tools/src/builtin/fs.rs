//! File-system tools: reads are intrinsically low risk, writes medium,
//! deletion high.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use warden_core::{ParamSpec, Result, RiskLevel, ToolCategory, ToolDescriptor};

use super::{optional_usize, required};
use crate::registry::{ToolHandler, ToolRegistry};

pub fn register(registry: &ToolRegistry) {
    registry.register(
        ToolDescriptor::new(
            "read_file",
            "Read the contents of a UTF-8 text file",
            ToolCategory::FileOps,
            RiskLevel::Low,
        )
        .param("path", ParamSpec::string("Path to the file to read")),
        Arc::new(ReadFile),
    );
    registry.register(
        ToolDescriptor::new(
            "list_directory",
            "List files and directories at a path",
            ToolCategory::FileOps,
            RiskLevel::Low,
        )
        .param("path", ParamSpec::string("Directory path to list")),
        Arc::new(ListDirectory),
    );
    registry.register(
        ToolDescriptor::new(
            "get_file_info",
            "Get size, kind, and modification time for a path",
            ToolCategory::FileOps,
            RiskLevel::Low,
        )
        .param("path", ParamSpec::string("Path to inspect")),
        Arc::new(GetFileInfo),
    );
    registry.register(
        ToolDescriptor::new(
            "search_files",
            "Find files whose names contain a pattern, recursively",
            ToolCategory::FileOps,
            RiskLevel::Low,
        )
        .param("directory", ParamSpec::string("Root directory to search from"))
        .param("pattern", ParamSpec::string("Substring to match in file names"))
        .param(
            "max_results",
            ParamSpec::integer("Maximum number of results (default: 100)").optional(),
        ),
        Arc::new(SearchFiles),
    );
    registry.register(
        ToolDescriptor::new(
            "count_lines",
            "Count the lines in a text file",
            ToolCategory::FileOps,
            RiskLevel::Low,
        )
        .param("path", ParamSpec::string("Path to the file")),
        Arc::new(CountLines),
    );
    registry.register(
        ToolDescriptor::new(
            "write_file",
            "Write content to a file, creating or overwriting it",
            ToolCategory::FileOps,
            RiskLevel::Medium,
        )
        .param("path", ParamSpec::string("Path to the file to write"))
        .param("content", ParamSpec::string("Content to write")),
        Arc::new(WriteFile),
    );
    registry.register(
        ToolDescriptor::new(
            "append_to_file",
            "Append content to the end of a file",
            ToolCategory::FileOps,
            RiskLevel::Medium,
        )
        .param("path", ParamSpec::string("Path to the file"))
        .param("content", ParamSpec::string("Content to append")),
        Arc::new(AppendToFile),
    );
    registry.register(
        ToolDescriptor::new(
            "move_file",
            "Move or rename a file",
            ToolCategory::FileOps,
            RiskLevel::Medium,
        )
        .param("source", ParamSpec::string("Current path"))
        .param("destination", ParamSpec::string("New path")),
        Arc::new(MoveFile),
    );
    registry.register(
        ToolDescriptor::new(
            "copy_file",
            "Copy a file to a new location",
            ToolCategory::FileOps,
            RiskLevel::Medium,
        )
        .param("source", ParamSpec::string("Path to copy from"))
        .param("destination", ParamSpec::string("Path to copy to")),
        Arc::new(CopyFile),
    );
    registry.register(
        ToolDescriptor::new(
            "create_directory",
            "Create a directory, including missing parents",
            ToolCategory::FileOps,
            RiskLevel::Medium,
        )
        .param("path", ParamSpec::string("Directory path to create")),
        Arc::new(CreateDirectory),
    );
    registry.register(
        ToolDescriptor::new(
            "delete_file",
            "Permanently delete a file",
            ToolCategory::FileOps,
            RiskLevel::High,
        )
        .param("path", ParamSpec::string("Path to the file to delete")),
        Arc::new(DeleteFile),
    );
}

struct ReadFile;

#[async_trait]
impl ToolHandler for ReadFile {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let path = required(args, "path", "read_file")?;
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(content.chars().take(50_000).collect()),
            Err(e) => Ok(format!("Error: reading {path}: {e}")),
        }
    }
}

struct ListDirectory;

#[async_trait]
impl ToolHandler for ListDirectory {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let path = required(args, "path", "list_directory")?;
        let mut dir = match tokio::fs::read_dir(path).await {
            Ok(d) => d,
            Err(e) => return Ok(format!("Error: listing {path}: {e}")),
        };
        let mut entries = Vec::new();
        while let Ok(Some(entry)) = dir.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry
                .file_type()
                .await
                .map(|ft| ft.is_dir())
                .unwrap_or(false);
            entries.push(if is_dir { format!("{name}/") } else { name });
        }
        entries.sort();
        Ok(entries.join("\n"))
    }
}

struct GetFileInfo;

#[async_trait]
impl ToolHandler for GetFileInfo {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let path = required(args, "path", "get_file_info")?;
        let meta = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) => return Ok(format!("Error: stat {path}: {e}")),
        };
        let kind = if meta.is_dir() {
            "directory"
        } else if meta.is_symlink() {
            "symlink"
        } else {
            "file"
        };
        let modified = meta
            .modified()
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339())
            .unwrap_or_else(|| "unknown".into());
        Ok(format!(
            "{path}\nkind: {kind}\nsize: {} bytes\nmodified: {modified}\nread-only: {}",
            meta.len(),
            meta.permissions().readonly(),
        ))
    }
}

struct SearchFiles;

#[async_trait]
impl ToolHandler for SearchFiles {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let directory = required(args, "directory", "search_files")?;
        let pattern = required(args, "pattern", "search_files")?;
        let max_results = optional_usize(args, "max_results", 100);

        let mut matches = Vec::new();
        let mut queue = vec![std::path::PathBuf::from(directory)];
        while let Some(dir) = queue.pop() {
            let Ok(mut rd) = tokio::fs::read_dir(&dir).await else {
                continue;
            };
            while let Ok(Some(entry)) = rd.next_entry().await {
                if matches.len() >= max_results {
                    break;
                }
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                // Skip common junk directories.
                if matches!(
                    name.as_str(),
                    "node_modules" | ".git" | "target" | "dist" | "__pycache__"
                ) {
                    continue;
                }
                if entry
                    .file_type()
                    .await
                    .map(|ft| ft.is_dir())
                    .unwrap_or(false)
                {
                    queue.push(path);
                } else if name.contains(pattern) {
                    matches.push(path.to_string_lossy().into_owned());
                }
            }
            if matches.len() >= max_results {
                break;
            }
        }

        if matches.is_empty() {
            Ok(format!("No files matching '{pattern}' under {directory}"))
        } else {
            matches.sort();
            Ok(format!("Found {} files:\n{}", matches.len(), matches.join("\n")))
        }
    }
}

struct CountLines;

#[async_trait]
impl ToolHandler for CountLines {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let path = required(args, "path", "count_lines")?;
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(format!("{} lines", content.lines().count())),
            Err(e) => Ok(format!("Error: reading {path}: {e}")),
        }
    }
}

struct WriteFile;

#[async_trait]
impl ToolHandler for WriteFile {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let path = required(args, "path", "write_file")?;
        let content = args
            .get("content")
            .map(String::as_str)
            .unwrap_or_default();
        if let Some(parent) = std::path::Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        match tokio::fs::write(path, content).await {
            Ok(()) => Ok(format!("Wrote {} bytes to {path}", content.len())),
            Err(e) => Ok(format!("Error: writing {path}: {e}")),
        }
    }
}

struct AppendToFile;

#[async_trait]
impl ToolHandler for AppendToFile {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let path = required(args, "path", "append_to_file")?;
        let content = args
            .get("content")
            .map(String::as_str)
            .unwrap_or_default();
        let existing = tokio::fs::read_to_string(path).await.unwrap_or_default();
        match tokio::fs::write(path, format!("{existing}{content}")).await {
            Ok(()) => Ok(format!("Appended {} bytes to {path}", content.len())),
            Err(e) => Ok(format!("Error: appending to {path}: {e}")),
        }
    }
}

struct MoveFile;

#[async_trait]
impl ToolHandler for MoveFile {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let source = required(args, "source", "move_file")?;
        let destination = required(args, "destination", "move_file")?;
        match tokio::fs::rename(source, destination).await {
            Ok(()) => Ok(format!("Moved {source} to {destination}")),
            Err(e) => Ok(format!("Error: moving {source}: {e}")),
        }
    }
}

struct CopyFile;

#[async_trait]
impl ToolHandler for CopyFile {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let source = required(args, "source", "copy_file")?;
        let destination = required(args, "destination", "copy_file")?;
        match tokio::fs::copy(source, destination).await {
            Ok(bytes) => Ok(format!("Copied {bytes} bytes from {source} to {destination}")),
            Err(e) => Ok(format!("Error: copying {source}: {e}")),
        }
    }
}

struct CreateDirectory;

#[async_trait]
impl ToolHandler for CreateDirectory {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let path = required(args, "path", "create_directory")?;
        match tokio::fs::create_dir_all(path).await {
            Ok(()) => Ok(format!("Created directory {path}")),
            Err(e) => Ok(format!("Error: creating {path}: {e}")),
        }
    }
}

struct DeleteFile;

#[async_trait]
impl ToolHandler for DeleteFile {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let path = required(args, "path", "delete_file")?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(format!("Deleted {path}")),
            Err(e) => Ok(format!("Error: deleting {path}: {e}")),
        }
    }
}
