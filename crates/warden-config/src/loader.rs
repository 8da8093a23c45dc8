use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use warden_core::{ProviderTag, Result, WardenError};

use crate::schema::WardenConfig;

/// Loads the Warden configuration from disk with env overrides.
pub struct ConfigLoader {
    config: Arc<RwLock<WardenConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > `WARDEN_CONFIG` env >
    /// `~/.warden/warden.toml`.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("WARDEN_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".warden")
            .join("warden.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str::<WardenConfig>(&raw).map_err(|e| {
                WardenError::Config(format!("failed to parse {}: {e}", config_path.display()))
            })?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            WardenConfig::default()
        };

        let mut config = Self::apply_env_overrides(config);
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{w}");
                }
            }
            Err(e) => return Err(WardenError::Config(e)),
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> WardenConfig {
        self.config.read().clone()
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn apply_env_overrides(mut config: WardenConfig) -> WardenConfig {
        if let Ok(v) = std::env::var("WARDEN_PROVIDER") {
            match v.as_str() {
                "openai" => config.llm.default_provider = ProviderTag::OpenAi,
                "anthropic" => config.llm.default_provider = ProviderTag::Anthropic,
                "gemini" => config.llm.default_provider = ProviderTag::Gemini,
                "ollama" => config.llm.default_provider = ProviderTag::Ollama,
                other => warn!(provider = other, "unknown WARDEN_PROVIDER, ignoring"),
            }
        }
        if let Ok(v) = std::env::var("WARDEN_MODEL") {
            config.llm.default_model = v;
        }
        if let Ok(v) = std::env::var("WARDEN_OLLAMA_URL") {
            config.llm.ollama_url = v;
        }
        if let Ok(v) = std::env::var("WARDEN_LOG_LEVEL") {
            config.logging.level = v;
        }
        config
    }
}
