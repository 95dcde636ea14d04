//! HTTP client for the remote contract service

use async_trait::async_trait;
use lac_core::{
    ApiResponse, ContractId, ContractProposal, ContractQuote, ContractService, LacError,
    LacResult,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Contract service reached over HTTP JSON
pub struct HttpContractService {
    base_url: String,
    client: Client,
}

impl HttpContractService {
    pub fn new(base_url: &str, timeout: Duration) -> LacResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LacError::Config(format!("could not build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> LacResult<Option<T>> {
        let resp = request
            .send()
            .await
            .map_err(|e| LacError::RemoteFailure(e.to_string()))?;

        let status = resp.status();
        let envelope: ApiResponse<T> = resp.json().await.map_err(|e| {
            LacError::RemoteFailure(format!("unexpected response ({}): {}", status, e))
        })?;

        envelope.into_result().map_err(LacError::RemoteFailure)
    }
}

#[async_trait]
impl ContractService for HttpContractService {
    async fn propose_contract(&self, proposal: &ContractProposal) -> LacResult<ContractQuote> {
        let url = format!("{}/contracts", self.base_url);
        debug!("Proposing {} {} contract to {}", proposal.amount, proposal.asset, url);

        self.call(self.client.post(&url).json(proposal))
            .await?
            .ok_or_else(|| LacError::RemoteFailure("empty response to contract proposal".into()))
    }

    async fn close_contract(&self, id: &ContractId) -> LacResult<()> {
        let url = format!("{}/contracts/{}", self.base_url, id);
        debug!("Closing contract {} at {}", id, url);

        self.call::<serde_json::Value>(self.client.delete(&url)).await?;
        Ok(())
    }
}
