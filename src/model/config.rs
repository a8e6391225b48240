use serde::{Deserialize, Serialize};

/// Configuration from stepwise.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub editing: EditingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Zero disables the timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditingConfig {
    /// Escape restores the title the task had when editing began.
    /// Off by default: titles are written through on every keystroke and
    /// Escape simply leaves edit mode.
    #[serde(default)]
    pub cancel_reverts: bool,
    /// Drop update responses that were overtaken by a newer request for
    /// the same task.
    #[serde(default = "default_true")]
    pub guard_stale_responses: bool,
}

impl Default for EditingConfig {
    fn default() -> Self {
        EditingConfig {
            cancel_reverts: false,
            guard_stale_responses: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_path")]
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            path: default_cache_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_path() -> String {
    ".stepwise-cache.json".to_string()
}
