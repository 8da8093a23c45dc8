//! Memory tools, delegating to the shared [`MemoryStore`].

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use warden_core::{ParamSpec, Result, RiskLevel, ToolCategory, ToolDescriptor};
use warden_memory::MemoryStore;

use super::required;
use crate::registry::{ToolHandler, ToolRegistry};

pub fn register(registry: &ToolRegistry, store: Arc<MemoryStore>) {
    registry.register(
        ToolDescriptor::new(
            "memory_save",
            "Store a fact in persistent memory under a key",
            ToolCategory::Memory,
            RiskLevel::Low,
        )
        .param("key", ParamSpec::string("Key to store under"))
        .param("value", ParamSpec::string("The fact to remember")),
        Arc::new(MemorySave {
            store: Arc::clone(&store),
        }),
    );
    registry.register(
        ToolDescriptor::new(
            "memory_read",
            "Read a fact from persistent memory by key",
            ToolCategory::Memory,
            RiskLevel::Low,
        )
        .param("key", ParamSpec::string("Key to read")),
        Arc::new(MemoryRead {
            store: Arc::clone(&store),
        }),
    );
    registry.register(
        ToolDescriptor::new(
            "memory_list",
            "List every key/value pair in persistent memory",
            ToolCategory::Memory,
            RiskLevel::Low,
        ),
        Arc::new(MemoryList {
            store: Arc::clone(&store),
        }),
    );
    registry.register(
        ToolDescriptor::new(
            "memory_delete",
            "Delete a fact from persistent memory by key",
            ToolCategory::Memory,
            RiskLevel::Low,
        )
        .param("key", ParamSpec::string("Key to delete")),
        Arc::new(MemoryDelete { store }),
    );
}

struct MemorySave {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl ToolHandler for MemorySave {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let key = required(args, "key", "memory_save")?;
        let value = required(args, "value", "memory_save")?;
        self.store.save(key, value)?;
        Ok(format!("Remembered '{key}'"))
    }
}

struct MemoryRead {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl ToolHandler for MemoryRead {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let key = required(args, "key", "memory_read")?;
        match self.store.read(key) {
            Some(value) => Ok(value),
            None => Ok(format!("Error: no memory stored under '{key}'")),
        }
    }
}

struct MemoryList {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl ToolHandler for MemoryList {
    async fn run(&self, _args: &BTreeMap<String, String>) -> Result<String> {
        let entries = self.store.list();
        if entries.is_empty() {
            return Ok("Memory is empty".into());
        }
        Ok(entries
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

struct MemoryDelete {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl ToolHandler for MemoryDelete {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let key = required(args, "key", "memory_delete")?;
        if self.store.delete(key)? {
            Ok(format!("Forgot '{key}'"))
        } else {
            Ok(format!("Error: no memory stored under '{key}'"))
        }
    }
}
