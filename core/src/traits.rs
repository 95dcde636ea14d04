//! Core traits defining the collaborator interfaces
//!
//! The contract lifecycle manager only talks to the payment backend, the
//! remote contract service and the price source through these traits.

use crate::types::*;
use async_trait::async_trait;

/// Result type for client operations
pub type LacResult<T> = Result<T, crate::error::LacError>;

/// Payment backend (a Lightning node)
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    /// Decode a payment request into its amount
    async fn decode_payment_request(&self, pay_req: &str) -> LacResult<Sats>;

    /// Pay a payment request, failing with `PaymentFailure` if the backend reports an error
    async fn pay(&self, pay_req: &str) -> LacResult<()>;

    /// Create a payment request for the given amount
    async fn create_payment_request(&self, amount: Sats) -> LacResult<String>;
}

/// Remote contract service (the counterparty)
#[async_trait]
pub trait ContractService: Send + Sync {
    /// Request a quote for a new contract
    async fn propose_contract(&self, proposal: &ContractProposal) -> LacResult<ContractQuote>;

    /// Close the counterpart of a contract
    async fn close_contract(&self, id: &ContractId) -> LacResult<()>;
}

/// Read-only view of locally tracked asset prices
pub trait PriceSource: Send + Sync {
    /// Whether the asset is one this client trades
    fn is_supported(&self, asset: &str) -> bool;

    /// Latest known price, if any
    fn price(&self, asset: &str) -> Option<AssetPrice>;
}
