//! Configuration types for the Lightning assets client

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::LacError;
use crate::traits::LacResult;

/// Name of the contract database inside the data directory
pub const DEFAULT_DB_NAME: &str = "lac.db";

/// Main client daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Data directory, holds the contract database
    pub data_dir: PathBuf,

    /// Address the remote contract service can reach this client at
    pub net_address: String,

    /// Logging level
    pub log_level: String,

    /// API configuration
    pub api: ApiConfig,

    /// Remote contract service configuration
    pub server: ServerConfig,

    /// Lightning node configuration
    pub lnd: LndConfig,

    /// Price feed configuration
    pub prices: PriceConfig,

    /// Upper bound on any call to the payment backend or the remote service
    pub rpc_timeout_secs: u64,

    /// Queued updates per contract subscriber before updates are dropped
    pub subscriber_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: expand_path("~/.lac"),
            net_address: "localhost:10456".to_string(),
            log_level: "info".to_string(),
            api: ApiConfig::default(),
            server: ServerConfig::default(),
            lnd: LndConfig::default(),
            prices: PriceConfig::default(),
            rpc_timeout_secs: 60,
            subscriber_capacity: 16,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> LacResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LacError::Config(format!("could not read {}: {}", path.display(), e)))?;
        let config: ClientConfig = serde_json::from_str(&content)
            .map_err(|e| LacError::Config(format!("could not parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LacResult<()> {
        if self.rpc_timeout_secs == 0 {
            return Err(LacError::Config("rpc_timeout_secs must be non-zero".into()));
        }
        if self.subscriber_capacity == 0 {
            return Err(LacError::Config("subscriber_capacity must be non-zero".into()));
        }
        if self.prices.assets.is_empty() {
            return Err(LacError::Config("at least one asset must be configured".into()));
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_DB_NAME)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API listen address
    pub listen_addr: String,

    /// Enable CORS for browser clients
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8081".to_string(),
            enable_cors: true,
        }
    }
}

/// Remote contract service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the asset server
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:10455".to_string(),
        }
    }
}

/// Lightning node (LND REST) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LndConfig {
    /// Base URL of the LND REST interface
    pub rest_url: String,

    /// LND data directory
    pub lnd_dir: PathBuf,

    /// Bitcoin network, regtest | testnet | mainnet
    pub network: String,

    /// Override for the admin macaroon location
    pub macaroon_path: Option<PathBuf>,

    /// Override for the TLS certificate location
    pub tls_cert_path: Option<PathBuf>,
}

impl Default for LndConfig {
    fn default() -> Self {
        Self {
            rest_url: "https://localhost:8080".to_string(),
            lnd_dir: expand_path("~/.lnd"),
            network: "regtest".to_string(),
            macaroon_path: None,
            tls_cert_path: None,
        }
    }
}

impl LndConfig {
    pub fn macaroon_path(&self) -> PathBuf {
        self.macaroon_path.clone().unwrap_or_else(|| {
            self.lnd_dir
                .join("data/chain/bitcoin")
                .join(&self.network)
                .join("admin.macaroon")
        })
    }

    pub fn tls_cert_path(&self) -> PathBuf {
        self.tls_cert_path
            .clone()
            .unwrap_or_else(|| self.lnd_dir.join("tls.cert"))
    }
}

/// Price feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Assets contracts can be denominated in
    pub assets: Vec<String>,

    /// Base URL of the price server
    pub server_address: String,

    /// Seconds between price polls
    pub poll_interval_secs: u64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            assets: vec!["USD".to_string(), "NOK".to_string()],
            server_address: "http://127.0.0.1:3001".to_string(),
            poll_interval_secs: 30,
        }
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(path.trim_start_matches('~').trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}
