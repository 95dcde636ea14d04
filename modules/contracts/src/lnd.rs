//! LND REST payment backend

use async_trait::async_trait;
use lac_core::{LacError, LacResult, LndConfig, PaymentBackend, Sats};
use reqwest::{Certificate, Client, RequestBuilder};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Header carrying the hex encoded macaroon
const MACAROON_HEADER: &str = "Grpc-Metadata-macaroon";

/// Payment backend talking to an LND node over its REST interface
pub struct LndRestClient {
    base_url: String,
    macaroon: String,
    client: Client,
}

impl LndRestClient {
    pub fn new(
        base_url: &str,
        macaroon: &[u8],
        tls_cert_pem: Option<&[u8]>,
        timeout: Duration,
    ) -> LacResult<Self> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(pem) = tls_cert_pem {
            let cert = Certificate::from_pem(pem)
                .map_err(|e| LacError::Config(format!("invalid LND TLS certificate: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| LacError::Config(format!("could not build LND client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            macaroon: hex::encode(macaroon),
            client,
        })
    }

    /// Read macaroon and TLS certificate from the locations in `config`.
    ///
    /// A missing certificate file falls back to the system roots.
    pub fn from_config(config: &LndConfig, timeout: Duration) -> LacResult<Self> {
        let macaroon_path = config.macaroon_path();
        let macaroon = std::fs::read(&macaroon_path).map_err(|e| {
            LacError::Config(format!(
                "could not read macaroon {}: {}",
                macaroon_path.display(),
                e
            ))
        })?;

        let cert_path = config.tls_cert_path();
        let cert = match std::fs::read(&cert_path) {
            Ok(pem) => Some(pem),
            Err(e) => {
                debug!("No LND TLS certificate at {}: {}", cert_path.display(), e);
                None
            }
        };

        info!("Using LND at {}", config.rest_url);

        Self::new(&config.rest_url, &macaroon, cert.as_deref(), timeout)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(MACAROON_HEADER, &self.macaroon)
    }

    async fn send<T: for<'de> Deserialize<'de>>(&self, request: RequestBuilder) -> LacResult<T> {
        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| LacError::PaymentFailure(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LacError::PaymentFailure(format!(
                "LND returned {}: {}",
                status,
                lnd_error_message(&body)
            )));
        }

        resp.json()
            .await
            .map_err(|e| LacError::PaymentFailure(format!("unexpected LND response: {}", e)))
    }
}

#[async_trait]
impl PaymentBackend for LndRestClient {
    async fn decode_payment_request(&self, pay_req: &str) -> LacResult<Sats> {
        let url = format!("{}/v1/payreq/{}", self.base_url, pay_req);
        let decoded: PayReq = self.send(self.client.get(&url)).await?;
        Ok(Sats(decoded.num_satoshis))
    }

    async fn pay(&self, pay_req: &str) -> LacResult<()> {
        let url = format!("{}/v1/channels/transactions", self.base_url);
        let request = SendRequest {
            payment_request: pay_req.to_string(),
        };
        let resp: SendResponse = self.send(self.client.post(&url).json(&request)).await?;
        resp.into_result()
    }

    async fn create_payment_request(&self, amount: Sats) -> LacResult<String> {
        let url = format!("{}/v1/invoices", self.base_url);
        let request = InvoiceRequest { value: amount.0 };
        let resp: AddInvoiceResponse = self.send(self.client.post(&url).json(&request)).await?;
        if resp.payment_request.is_empty() {
            return Err(LacError::PaymentFailure("LND returned no payment request".into()));
        }
        Ok(resp.payment_request)
    }
}

#[derive(Debug, Deserialize)]
struct PayReq {
    #[serde(default, deserialize_with = "int64")]
    num_satoshis: u64,
}

#[derive(Debug, Serialize)]
struct SendRequest {
    payment_request: String,
}

#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    #[serde(default)]
    payment_error: String,
}

impl SendResponse {
    fn into_result(self) -> LacResult<()> {
        if self.payment_error.is_empty() {
            Ok(())
        } else {
            Err(LacError::PaymentFailure(self.payment_error))
        }
    }
}

#[derive(Debug, Serialize)]
struct InvoiceRequest {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct AddInvoiceResponse {
    #[serde(default)]
    payment_request: String,
}

/// LND encodes 64-bit integers as JSON strings
fn int64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(u64),
        Text(String),
    }

    match Int64::deserialize(deserializer)? {
        Int64::Number(n) => Ok(n),
        Int64::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Pull the message out of an LND error body, or return the body as is
fn lnd_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct LndError {
        #[serde(alias = "error")]
        message: String,
    }

    serde_json::from_str::<LndError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string())
}
