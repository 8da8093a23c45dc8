use parking_lot::RwLock;
use std::collections::HashMap;

/// A named-secret store. The canonical host implementation sits on the OS
/// keyring; the core only depends on this contract.
pub trait SecretStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str);
}

/// In-memory secret store for tests and ephemeral hosts.
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, name: &str) -> Option<String> {
        self.secrets.read().get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) {
        self.secrets.write().insert(name.into(), value.into());
    }
}

/// Reads secrets from `WARDEN_SECRET_<NAME>` environment variables.
/// Writes only update the in-process overlay, never the environment.
#[derive(Default)]
pub struct EnvSecretStore {
    overlay: RwLock<HashMap<String, String>>,
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn env_key(name: &str) -> String {
        format!(
            "WARDEN_SECRET_{}",
            name.to_uppercase().replace(['-', ' ', '.'], "_")
        )
    }
}

impl SecretStore for EnvSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        if let Some(v) = self.overlay.read().get(name) {
            return Some(v.clone());
        }
        std::env::var(Self::env_key(name)).ok()
    }

    fn set(&self, name: &str, value: &str) {
        self.overlay.write().insert(name.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemorySecretStore::new();
        assert!(store.get("api_key").is_none());
        store.set("api_key", "s3cret");
        assert_eq!(store.get("api_key").as_deref(), Some("s3cret"));
    }

    #[test]
    fn env_store_overlay_wins() {
        let store = EnvSecretStore::new();
        store.set("token", "overlaid");
        assert_eq!(store.get("token").as_deref(), Some("overlaid"));
    }

    #[test]
    fn env_key_normalization() {
        assert_eq!(
            EnvSecretStore::env_key("brave.api-key"),
            "WARDEN_SECRET_BRAVE_API_KEY"
        );
    }
}
