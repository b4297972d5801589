/// Config schema for the builder, router, and backend roles.
///
/// Every section is serde-defaulted so a missing or partial config file
/// yields a runnable local setup.
use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use ragswitch_protocol::VersionSlot;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagswitchConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
    pub builder: BuilderConfig,
    pub router: RouterConfig,
    pub backend: BackendConfig,
}

/// Shared on-disk layout root. The knowledge directory, the per-slot index
/// directories, and the active-version marker all live under `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// External embedding endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub url: String,
    /// Bearer token; env var substitution (`${EMBED_API_KEY}`) applies.
    pub api_key: Option<String>,
    /// Dimension of the random vectors substituted when the provider fails.
    pub fallback_dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9900/embeddings".into(),
            api_key: None,
            fallback_dimensions: 384,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External chat-completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9900/chat".into(),
            api_key: None,
            max_tokens: 512,
            timeout_secs: 30,
        }
    }
}

impl ChatConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Builder behavior: debounce window and where to announce new builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub debounce_ms: u64,
    pub router_url: String,
    pub activate_timeout_secs: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1500,
            router_url: "http://127.0.0.1:8080".into(),
            activate_timeout_secs: 10,
        }
    }
}

impl BuilderConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn activate_timeout(&self) -> Duration {
        Duration::from_secs(self.activate_timeout_secs)
    }
}

/// Router listen address and the fixed slot → backend mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub bind: String,
    pub port: u16,
    pub backend_v1: String,
    pub backend_v2: String,
    pub timeout_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8080,
            backend_v1: "http://127.0.0.1:8101".into(),
            backend_v2: "http://127.0.0.1:8102".into(),
            timeout_secs: 30,
        }
    }
}

impl RouterConfig {
    /// Base URL of the backend serving the given slot.
    pub fn backend_url(&self, slot: VersionSlot) -> &str {
        match slot {
            VersionSlot::V1 => &self.backend_v1,
            VersionSlot::V2 => &self.backend_v2,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Backend listen addresses, one port per slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub bind: String,
    pub port_v1: u16,
    pub port_v2: u16,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port_v1: 8101,
            port_v2: 8102,
        }
    }
}

impl BackendConfig {
    pub fn port_for(&self, slot: VersionSlot) -> u16 {
        match slot {
            VersionSlot::V1 => self.port_v1,
            VersionSlot::V2 => self.port_v2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_runnable() {
        let config = RagswitchConfig::default();
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.embedding.fallback_dimensions, 384);
        assert_eq!(config.chat.max_tokens, 512);
        assert_eq!(config.builder.debounce(), Duration::from_millis(1500));
    }

    #[test]
    fn backend_url_is_slot_driven() {
        let router = RouterConfig::default();
        assert_eq!(router.backend_url(VersionSlot::V1), "http://127.0.0.1:8101");
        assert_eq!(router.backend_url(VersionSlot::V2), "http://127.0.0.1:8102");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: RagswitchConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/srv/rag"

            [router]
            port = 9090
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/rag"));
        assert_eq!(config.router.port, 9090);
        assert_eq!(config.router.bind, "127.0.0.1");
        assert_eq!(config.backend.port_for(VersionSlot::V2), 8102);
    }
}
