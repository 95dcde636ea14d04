//! CLI Commands

use lac_core::{ApiResponse, Contract, ContractType, CreatedContract};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// API client for the client daemon
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Opening a contract pays invoices, so requests may take a while
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, ApiError> {
        let resp: ApiResponse<T> = request.send().await?.json().await?;
        resp.into_result().map_err(ApiError::Server)
    }

    async fn call_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.call(request).await?.ok_or(ApiError::EmptyResponse)
    }

    /// Create a contract, it stays unpaid until opened
    pub async fn create_contract(
        &self,
        asset: &str,
        amount: f64,
        contract_type: ContractType,
    ) -> Result<CreatedContract, ApiError> {
        let url = format!("{}/contracts", self.base_url);
        let req = CreateContractRequest {
            asset,
            amount,
            contract_type,
        };
        self.call_data(self.client.post(&url).json(&req)).await
    }

    /// Pay the invoices of a created contract
    pub async fn open_contract(&self, id: &str) -> Result<Contract, ApiError> {
        let url = format!("{}/contracts/{}/open", self.base_url, id);
        self.call_data(self.client.post(&url)).await
    }

    pub async fn close_contract(&self, id: &str) -> Result<(), ApiError> {
        let url = format!("{}/contracts/{}", self.base_url, id);
        self.call::<serde_json::Value>(self.client.delete(&url)).await?;
        Ok(())
    }

    pub async fn list_contracts(&self) -> Result<Vec<Contract>, ApiError> {
        let url = format!("{}/contracts", self.base_url);
        Ok(self.call(self.client.get(&url)).await?.unwrap_or_default())
    }

    /// Ask the daemon's node for an invoice
    pub async fn payment_request(&self, amount: u64) -> Result<String, ApiError> {
        let url = format!("{}/payreq", self.base_url);
        let resp: PayReqResponse = self
            .call_data(self.client.post(&url).json(&serde_json::json!({ "amount": amount })))
            .await?;
        Ok(resp.pay_req)
    }

    /// Have the daemon's node pay an invoice
    pub async fn pay(&self, pay_req: &str) -> Result<(), ApiError> {
        let url = format!("{}/pay", self.base_url);
        self.call::<serde_json::Value>(
            self.client
                .post(&url)
                .json(&serde_json::json!({ "pay_req": pay_req })),
        )
        .await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CreateContractRequest<'a> {
    asset: &'a str,
    amount: f64,
    contract_type: ContractType,
}

#[derive(serde::Deserialize)]
struct PayReqResponse {
    pay_req: String,
}

/// API Error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Empty response")]
    EmptyResponse,
}

/// Terms shown to the user before a contract is opened
pub fn format_quote(created: &CreatedContract) -> String {
    let contract = &created.contract;
    let mut quote = format!(
        "Initiating contract requires {:.2} percent margin, which equals {} sats\n\
         Server used a price of {:.2}, we have a price of {:.2}",
        created.percent_margin, contract.amount_sat_margin.0, created.server_price, created.our_price
    );

    if contract.amount_sat_margin != created.expected_margin_amount {
        quote.push_str(&format!(
            "\nMargin invoice differs from our estimate of {} sats",
            created.expected_margin_amount.0
        ));
    }
    if contract.contract_type == ContractType::Funded {
        quote.push_str(&format!(
            "\nFunding invoice of {} sats (we expect {} sats)",
            contract.amount_sat_init.0, created.expected_init_amount.0
        ));
    }

    quote
}

/// One line summary of a contract
pub fn format_contract(contract: &Contract) -> String {
    format!(
        "{:<36} {:>12} {:<5} {:<9} {:>10} {:>12} {}",
        contract.id.as_str(),
        contract.amount,
        contract.asset,
        contract.contract_type.as_str(),
        contract.amount_sat_margin.0,
        contract.amount_sat_init.0,
        if contract.invoices_paid { "open" } else { "unpaid" }
    )
}
