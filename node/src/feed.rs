//! Price feed polling the price server

use lac_contracts::SharedPriceBook;
use lac_core::{LacError, LacResult, PriceConfig};
use serde::Deserialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: f64,
}

/// Periodically fetches asset prices into the price book
pub struct PriceFeed {
    server_address: String,
    interval: Duration,
    prices: SharedPriceBook,
    client: reqwest::Client,
}

impl PriceFeed {
    pub fn new(config: &PriceConfig, prices: SharedPriceBook, timeout: Duration) -> LacResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LacError::Config(format!("could not build HTTP client: {}", e)))?;

        Ok(Self {
            server_address: config.server_address.trim_end_matches('/').to_string(),
            interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            prices,
            client,
        })
    }

    async fn fetch_price(&self, asset: &str) -> LacResult<f64> {
        let url = format!("{}/price/{}", self.server_address, asset);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LacError::PriceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LacError::PriceUnavailable(format!(
                "price server returned {} for {}",
                response.status(),
                asset
            )));
        }

        let data: PriceResponse = response
            .json()
            .await
            .map_err(|e| LacError::PriceUnavailable(e.to_string()))?;
        Ok(data.price)
    }

    /// Fetch every configured asset once, returns how many prices were updated
    pub async fn poll_once(&self) -> usize {
        let mut updated = 0;

        for asset in self.prices.assets() {
            match self.fetch_price(asset).await {
                Ok(price) => match self.prices.update(asset, price) {
                    Ok(()) => updated += 1,
                    Err(e) => warn!("Ignoring price for {}: {}", asset, e),
                },
                Err(e) => warn!("Failed to fetch price for {}: {}", asset, e),
            }
        }

        debug!("Price poll updated {} of {} assets", updated, self.prices.assets().len());
        updated
    }

    /// Poll forever on the configured interval
    pub async fn run(self) {
        info!(
            "Starting price feed from {} every {:?}",
            self.server_address, self.interval
        );

        let mut interval = tokio::time::interval(self.interval);
        loop {
            interval.tick().await;
            self.poll_once().await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
