//! Core types for the Lightning assets client
//!
//! Defines the contract record and the quote types exchanged with the
//! remote contract service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LacError;

/// Opaque contract identifier, assigned by the remote contract service
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(pub String);

impl ContractId {
    pub fn new(id: impl Into<String>) -> Self {
        ContractId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractId({})", self.0)
    }
}

impl From<&str> for ContractId {
    fn from(s: &str) -> Self {
        ContractId(s.to_string())
    }
}

/// Amount in payment-channel units (satoshis)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Sats(pub u64);

impl Sats {
    pub const ZERO: Sats = Sats(0);

    pub fn new(value: u64) -> Self {
        Sats(value)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Sats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sat", self.0)
    }
}

impl fmt::Debug for Sats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sats({})", self.0)
    }
}

/// Contract type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractType {
    /// Requires an initial funding invoice in addition to margin
    Funded,
    /// Margin only
    Unfunded,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Funded => "FUNDED",
            ContractType::Unfunded => "UNFUNDED",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractType {
    type Err = LacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FUNDED" => Ok(ContractType::Funded),
            "UNFUNDED" => Ok(ContractType::Unfunded),
            other => Err(LacError::InvalidArgument(format!(
                "contract type {:?} not supported",
                other
            ))),
        }
    }
}

/// A client-side asset contract
///
/// Presence of a record in the store means the contract was proposed and
/// has not been closed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub asset: String,
    pub amount: f64,
    pub contract_type: ContractType,
    pub margin_invoice: String,
    pub amount_sat_margin: Sats,
    pub init_invoice: Option<String>,
    pub amount_sat_init: Sats,
    pub invoices_paid: bool,
}

impl Contract {
    /// Payment requests that must be paid to open this contract, in payment order
    pub fn required_invoices(&self) -> Vec<&str> {
        let mut invoices = vec![self.margin_invoice.as_str()];
        if self.contract_type == ContractType::Funded {
            if let Some(init) = self.init_invoice.as_deref() {
                invoices.push(init);
            }
        }
        invoices
    }

    /// Check the record invariants
    pub fn validate(&self) -> Result<(), LacError> {
        if !(self.amount.is_finite() && self.amount > 0.0) {
            return Err(LacError::InvalidArgument(format!(
                "contract amount must be positive, got {}",
                self.amount
            )));
        }
        if self.margin_invoice.is_empty() {
            return Err(LacError::InvalidArgument("missing margin invoice".into()));
        }

        match self.contract_type {
            ContractType::Funded => {
                let has_init = self.init_invoice.as_deref().map_or(false, |s| !s.is_empty());
                if !has_init || self.amount_sat_init.is_zero() {
                    return Err(LacError::InvalidArgument(
                        "funded contract requires a non-zero init invoice".into(),
                    ));
                }
            }
            ContractType::Unfunded => {
                if self.init_invoice.is_some() || !self.amount_sat_init.is_zero() {
                    return Err(LacError::InvalidArgument(
                        "unfunded contract can not carry an init invoice".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Contract proposal sent to the remote contract service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractProposal {
    pub asset: String,
    pub amount: f64,
    /// Network address the remote service can reach this client at
    pub host: String,
    pub contract_type: ContractType,
}

/// Terms quoted by the remote contract service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractQuote {
    pub id: ContractId,
    pub margin_pay_req: String,
    #[serde(default)]
    pub init_pay_req: Option<String>,
    pub asset_price: f64,
    pub percent_margin: f64,
}

/// Result of creating a contract, handed back to the caller for acceptance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedContract {
    pub contract: Contract,
    pub server_price: f64,
    pub our_price: f64,
    pub percent_margin: f64,
    pub expected_margin_amount: Sats,
    pub expected_init_amount: Sats,
}

/// Locally tracked price of an asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetPrice {
    pub price: f64,
    pub updated_at: Timestamp,
}

/// Timestamp in milliseconds since Unix epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(chrono::Utc::now().timestamp_millis() as u64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// JSON envelope used by the daemon API and the remote contract service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }

    /// Unwrap the envelope, turning a failure into its error message
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or_else(|| "unknown error".to_string()))
        }
    }
}
