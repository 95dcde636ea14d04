//! Persistent contract store using sled database

use async_trait::async_trait;
use lac_core::{Contract, ContractId, LacError, LacResult};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::store::{check_same_id, decode_contract, encode_contract, ContractStore, CONTRACTS_TREE};

/// Persistent contract store backed by sled database
pub struct PersistentContractStore {
    db: Db,
    contracts: Tree,
}

impl PersistentContractStore {
    pub fn open<P: AsRef<Path>>(path: P) -> LacResult<Self> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            LacError::StoreFailure(format!("could not open {}: {}", path.as_ref().display(), e))
        })?;

        let contracts = db
            .open_tree(CONTRACTS_TREE)
            .map_err(|e| LacError::StoreFailure(e.to_string()))?;

        debug!("Opened contract store with {} records", contracts.len());

        Ok(Self { db, contracts })
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> LacResult<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| LacError::StoreFailure(e.to_string()))?;
        Ok(())
    }

    /// Number of stored contracts
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

fn map_transaction_error(err: TransactionError<LacError>) -> LacError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => LacError::StoreFailure(e.to_string()),
    }
}

#[async_trait]
impl ContractStore for PersistentContractStore {
    async fn put(&self, contract: &Contract) -> LacResult<()> {
        let key = contract.id.as_bytes();
        let value = encode_contract(contract)?;

        self.contracts
            .transaction(|tx| {
                tx.insert(key, value.as_slice())?;
                Ok::<_, ConflictableTransactionError<LacError>>(())
            })
            .map_err(map_transaction_error)?;

        self.flush().await
    }

    async fn get(&self, id: &ContractId) -> LacResult<Contract> {
        let bytes = self
            .contracts
            .get(id.as_bytes())
            .map_err(|e| LacError::StoreFailure(e.to_string()))?
            .ok_or_else(|| LacError::NotFound(id.to_string()))?;

        decode_contract(&bytes)
    }

    async fn delete(&self, id: &ContractId) -> LacResult<()> {
        let key = id.as_bytes();

        self.contracts
            .transaction(|tx| {
                tx.remove(key)?;
                Ok::<_, ConflictableTransactionError<LacError>>(())
            })
            .map_err(map_transaction_error)?;

        self.flush().await
    }

    async fn list(&self) -> LacResult<Vec<Contract>> {
        self.contracts
            .iter()
            .map(|result| {
                let (key, value) = result.map_err(|e| LacError::StoreFailure(e.to_string()))?;
                let contract = decode_contract(&value)?;
                if contract.id.as_bytes() != key.as_ref() {
                    return Err(LacError::Corrupt(format!(
                        "contract {} stored under key {}",
                        contract.id,
                        String::from_utf8_lossy(&key)
                    )));
                }
                Ok(contract)
            })
            .collect()
    }

    async fn replace(&self, expected: &Contract, new: &Contract) -> LacResult<()> {
        check_same_id(expected, new)?;

        let key = new.id.as_bytes();
        let value = encode_contract(new)?;

        self.contracts
            .transaction(|tx| {
                let current = match tx.get(key)? {
                    Some(bytes) => decode_contract(&bytes).map_err(ConflictableTransactionError::Abort)?,
                    None => {
                        return Err(ConflictableTransactionError::Abort(LacError::NotFound(
                            new.id.to_string(),
                        )))
                    }
                };

                if current != *expected {
                    return Err(ConflictableTransactionError::Abort(LacError::Conflict(
                        new.id.to_string(),
                    )));
                }

                tx.insert(key, value.as_slice())?;
                Ok(())
            })
            .map_err(map_transaction_error)?;

        self.flush().await
    }
}

/// Thread-safe persistent store wrapper
pub type SharedPersistentContractStore = Arc<PersistentContractStore>;

/// Create a shared persistent contract store
pub fn create_persistent_store<P: AsRef<Path>>(path: P) -> LacResult<SharedPersistentContractStore> {
    Ok(Arc::new(PersistentContractStore::open(path)?))
}
