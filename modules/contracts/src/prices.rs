//! Locally tracked asset prices

use dashmap::DashMap;
use lac_core::{AssetPrice, LacError, LacResult, PriceSource, Timestamp};
use std::sync::Arc;
use tracing::debug;

/// Latest known price per supported asset.
///
/// Written by an external price feed, read by the contract manager through
/// [`PriceSource`].
pub struct PriceBook {
    assets: Vec<String>,
    prices: DashMap<String, AssetPrice>,
}

impl PriceBook {
    pub fn new(assets: Vec<String>) -> Self {
        Self {
            assets,
            prices: DashMap::new(),
        }
    }

    /// Record a new price for a supported asset
    pub fn update(&self, asset: &str, price: f64) -> LacResult<()> {
        if !self.is_supported(asset) {
            return Err(LacError::InvalidArgument(format!("asset {} not supported", asset)));
        }
        if !(price.is_finite() && price > 0.0) {
            return Err(LacError::InvalidArgument(format!(
                "price {} for {} is not usable",
                price, asset
            )));
        }

        self.prices.insert(
            asset.to_string(),
            AssetPrice {
                price,
                updated_at: Timestamp::now(),
            },
        );
        debug!("Price of {} updated to {}", asset, price);

        Ok(())
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }
}

impl PriceSource for PriceBook {
    fn is_supported(&self, asset: &str) -> bool {
        self.assets.iter().any(|a| a == asset)
    }

    fn price(&self, asset: &str) -> Option<AssetPrice> {
        self.prices.get(asset).map(|entry| *entry.value())
    }
}

pub type SharedPriceBook = Arc<PriceBook>;
