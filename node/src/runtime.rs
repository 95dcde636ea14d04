//! Client runtime wiring all components together

use lac_contracts::{
    ContractManager, HttpContractService, LndRestClient, ManagerConfig, PriceBook,
    SharedPriceBook,
};
use lac_core::{ClientConfig, LacResult, PaymentBackend};
use lac_state::{create_persistent_store, SharedPersistentContractStore};
use std::sync::Arc;
use tracing::info;

/// Client runtime owning the store, the price book and the manager
pub struct ClientRuntime {
    config: ClientConfig,
    store: SharedPersistentContractStore,
    prices: SharedPriceBook,
    manager: Arc<ContractManager>,
}

impl ClientRuntime {
    /// Open the contract database and connect to LND and the asset server
    pub fn new(config: ClientConfig) -> LacResult<Self> {
        let payments = Arc::new(LndRestClient::from_config(&config.lnd, config.rpc_timeout())?);
        Self::with_payments(config, payments)
    }

    /// Same as [`ClientRuntime::new`] with a caller supplied payment backend
    pub fn with_payments(config: ClientConfig, payments: Arc<dyn PaymentBackend>) -> LacResult<Self> {
        config.validate()?;

        let db_path = config.db_path();
        let store = create_persistent_store(&db_path)?;
        info!("Opened contract database at {} ({} contracts)", db_path.display(), store.len());

        let service = Arc::new(HttpContractService::new(
            &config.server.address,
            config.rpc_timeout(),
        )?);
        let prices = Arc::new(PriceBook::new(config.prices.assets.clone()));

        let manager = Arc::new(ContractManager::new(
            ManagerConfig::from(&config),
            store.clone(),
            payments,
            service,
            prices.clone(),
        ));

        Ok(Self {
            config,
            store,
            prices,
            manager,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<ContractManager> {
        &self.manager
    }

    pub fn prices(&self) -> &SharedPriceBook {
        &self.prices
    }

    /// Flush pending writes to disk
    pub async fn shutdown(&self) -> LacResult<()> {
        self.store.flush().await?;
        info!("Contract database flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lac_core::{LacError, LndConfig, PriceSource, Sats};

    struct NoPayments;

    #[async_trait]
    impl PaymentBackend for NoPayments {
        async fn decode_payment_request(&self, _pay_req: &str) -> LacResult<Sats> {
            Err(LacError::PaymentFailure("offline".into()))
        }

        async fn pay(&self, _pay_req: &str) -> LacResult<()> {
            Err(LacError::PaymentFailure("offline".into()))
        }

        async fn create_payment_request(&self, _amount: Sats) -> LacResult<String> {
            Err(LacError::PaymentFailure("offline".into()))
        }
    }

    fn config(dir: &std::path::Path) -> ClientConfig {
        ClientConfig {
            data_dir: dir.join("data"),
            lnd: LndConfig {
                lnd_dir: dir.join("lnd"),
                ..LndConfig::default()
            },
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn test_runtime_starts_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let runtime = ClientRuntime::with_payments(config(tmp.path()), Arc::new(NoPayments)).unwrap();

        assert!(runtime.manager().list_contracts().await.unwrap().is_empty());
        assert!(runtime.prices().is_supported("USD"));
        assert!(runtime.prices().price("USD").is_none());
        assert!(tmp.path().join("data").join("lac.db").exists());

        runtime.shutdown().await.unwrap();
    }

    #[test]
    fn test_runtime_needs_macaroon() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            ClientRuntime::new(config(tmp.path())),
            Err(LacError::Config(_))
        ));
    }

    #[test]
    fn test_runtime_rejects_invalid_config() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = config(tmp.path());
        config.rpc_timeout_secs = 0;
        assert!(matches!(
            ClientRuntime::with_payments(config, Arc::new(NoPayments)),
            Err(LacError::Config(_))
        ));
    }
}
