//! Client daemon

use crate::api::start_api_server;
use crate::feed::PriceFeed;
use crate::runtime::ClientRuntime;
use lac_core::{expand_path, ClientConfig, LacResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// Lightning assets client daemon
pub struct ClientNode {
    runtime: Arc<ClientRuntime>,
}

impl ClientNode {
    /// Create a new daemon
    pub fn new(config: ClientConfig) -> LacResult<Self> {
        let runtime = Arc::new(ClientRuntime::new(config)?);
        Ok(Self { runtime })
    }

    /// Run until ctrl-c
    pub async fn start(&self) -> anyhow::Result<()> {
        info!("Starting Lightning assets client...");

        let config = self.runtime.config();

        // Start price feed
        let feed = PriceFeed::new(&config.prices, self.runtime.prices().clone(), config.rpc_timeout())?;
        let feed_handle = feed.spawn();

        // Start API server
        let manager = self.runtime.manager().clone();
        let api_addr = config.api.listen_addr.clone();
        let enable_cors = config.api.enable_cors;

        let api_handle = tokio::spawn(async move {
            if let Err(e) = start_api_server(manager, &api_addr, enable_cors).await {
                error!("API server error: {}", e);
            }
        });

        info!("Client started successfully");
        info!("Asset server: {}", config.server.address);
        info!("Advertised address: {}", config.net_address);

        // Wait for shutdown signal
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, stopping client...");
            }
            Err(e) => {
                error!("Error waiting for shutdown signal: {}", e);
            }
        }

        // Cleanup
        api_handle.abort();
        feed_handle.abort();
        self.runtime.shutdown().await?;

        info!("Client stopped");

        Ok(())
    }

    /// Get runtime reference
    pub fn runtime(&self) -> &Arc<ClientRuntime> {
        &self.runtime
    }
}

/// Builder applying command line overrides on top of a configuration
pub struct NodeBuilder {
    config: ClientConfig,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn data_dir(mut self, dir: &str) -> Self {
        self.config.data_dir = expand_path(dir);
        self
    }

    pub fn api_addr(mut self, addr: &str) -> Self {
        self.config.api.listen_addr = addr.to_string();
        self
    }

    pub fn net_address(mut self, addr: &str) -> Self {
        self.config.net_address = addr.to_string();
        self
    }

    pub fn server_address(mut self, addr: &str) -> Self {
        self.config.server.address = addr.to_string();
        self
    }

    pub fn lnd_rest_url(mut self, url: &str) -> Self {
        self.config.lnd.rest_url = url.to_string();
        self
    }

    pub fn lnd_dir(mut self, dir: &str) -> Self {
        self.config.lnd.lnd_dir = expand_path(dir);
        self
    }

    pub fn network(mut self, network: &str) -> Self {
        self.config.lnd.network = network.to_string();
        self
    }

    pub fn macaroon_path(mut self, path: PathBuf) -> Self {
        self.config.lnd.macaroon_path = Some(path);
        self
    }

    pub fn tls_cert_path(mut self, path: PathBuf) -> Self {
        self.config.lnd.tls_cert_path = Some(path);
        self
    }

    pub fn price_server(mut self, addr: &str) -> Self {
        self.config.prices.server_address = addr.to_string();
        self
    }

    pub fn into_config(self) -> ClientConfig {
        self.config
    }

    pub fn build(self) -> LacResult<ClientNode> {
        ClientNode::new(self.config)
    }
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
