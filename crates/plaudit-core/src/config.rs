use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Wire constants
pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_DATA_PATH: &str = "data.json";
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024; // 64 KB cap per WS frame and HTTP body
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30; // tick event cadence
pub const DEFAULT_QUEUE_CAPACITY: usize = 64; // per-observer pending events

/// Top-level config (plaudit.toml + PLAUDIT_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlauditConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Which Comment Store backend the process runs with.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    /// In-process only, lost on exit.
    #[default]
    Memory,
    /// Single pretty-printed JSON file, rewritten on every mutation.
    File,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::File => "file",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Location of the JSON file for the `file` backend. Ignored otherwise.
    #[serde(default = "default_data_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_data_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Honor a client-chosen `id` when it is not already in use.
    /// Off by default: ids are always store-assigned.
    #[serde(default)]
    pub legacy_client_ids: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Events buffered per observer before further events are dropped for it.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer token for PATCH/DELETE routes. Unset means the routes are open.
    pub token: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_data_path() -> String {
    DEFAULT_DATA_PATH.to_string()
}
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl PlauditConfig {
    /// Load config from a TOML file with PLAUDIT_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.plaudit/plaudit.toml
    ///
    /// A missing file is not an error; every section has defaults.
    /// Nested env keys use a double underscore: `PLAUDIT_STORE__BACKEND=file`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: PlauditConfig = Figment::from(Serialized::defaults(PlauditConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PLAUDIT_").split("__"))
            .extract()
            .map_err(|e| crate::error::PlauditError::Config(e.to_string()))?;

        if config.broadcast.queue_capacity == 0 {
            return Err(crate::error::PlauditError::Config(
                "broadcast.queue_capacity must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.plaudit/plaudit.toml", home)
}
