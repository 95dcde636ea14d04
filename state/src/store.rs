//! Contract store trait and record encoding

use async_trait::async_trait;
use lac_core::{Contract, ContractId, LacError, LacResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Version of the stored record layout
pub const SCHEMA_VERSION: u32 = 1;

/// Name of the tree holding contract records
pub const CONTRACTS_TREE: &str = "contracts";

#[derive(Serialize)]
struct StoredContractRef<'a> {
    schema_version: u32,
    contract: &'a Contract,
}

#[derive(Deserialize)]
struct StoredContract {
    schema_version: u32,
    contract: Contract,
}

/// Encode a contract into its stored representation
pub fn encode_contract(contract: &Contract) -> LacResult<Vec<u8>> {
    serde_json::to_vec(&StoredContractRef {
        schema_version: SCHEMA_VERSION,
        contract,
    })
    .map_err(|e| LacError::StoreFailure(format!("could not encode contract {}: {}", contract.id, e)))
}

/// Decode a stored contract, rejecting unknown layouts
pub fn decode_contract(bytes: &[u8]) -> LacResult<Contract> {
    let stored: StoredContract = serde_json::from_slice(bytes)
        .map_err(|e| LacError::Corrupt(format!("could not decode contract: {}", e)))?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(LacError::Corrupt(format!(
            "contract {} has unknown schema version {}",
            stored.contract.id, stored.schema_version
        )));
    }

    Ok(stored.contract)
}

/// Abstract contract store interface
///
/// Every mutation is applied in a single atomic transaction and is durable
/// once the call returns.
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Write or overwrite a contract
    async fn put(&self, contract: &Contract) -> LacResult<()>;

    /// Get a contract, `NotFound` if absent
    async fn get(&self, id: &ContractId) -> LacResult<Contract>;

    /// Delete a contract; deleting an absent id is a no-op
    async fn delete(&self, id: &ContractId) -> LacResult<()>;

    /// All stored contracts, in store iteration order.
    ///
    /// Each record is read atomically, but the result is not a snapshot: a
    /// write racing the call may or may not be reflected.
    async fn list(&self) -> LacResult<Vec<Contract>>;

    /// Overwrite `expected` with `new` only if the stored record still equals `expected`.
    ///
    /// Fails with `NotFound` if the contract is gone and `Conflict` if it changed.
    async fn replace(&self, expected: &Contract, new: &Contract) -> LacResult<()>;

    /// Check if a contract exists
    async fn exists(&self, id: &ContractId) -> LacResult<bool> {
        match self.get(id).await {
            Ok(_) => Ok(true),
            Err(LacError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Shared handle to any contract store
pub type SharedContractStore = Arc<dyn ContractStore>;

pub(crate) fn check_same_id(expected: &Contract, new: &Contract) -> LacResult<()> {
    if expected.id != new.id {
        return Err(LacError::InvalidArgument(format!(
            "can not replace contract {} with contract {}",
            expected.id, new.id
        )));
    }
    Ok(())
}
