//! In-memory contract store for testing and ephemeral clients

use async_trait::async_trait;
use dashmap::DashMap;
use lac_core::{Contract, ContractId, LacError, LacResult};

use crate::store::{check_same_id, ContractStore};

/// In-memory contract store
pub struct MemoryContractStore {
    contracts: DashMap<ContractId, Contract>,
}

impl MemoryContractStore {
    pub fn new() -> Self {
        Self {
            contracts: DashMap::new(),
        }
    }

    pub fn with_contracts(contracts: Vec<Contract>) -> Self {
        let store = Self::new();
        for contract in contracts {
            store.contracts.insert(contract.id.clone(), contract);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl Default for MemoryContractStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContractStore for MemoryContractStore {
    async fn put(&self, contract: &Contract) -> LacResult<()> {
        self.contracts.insert(contract.id.clone(), contract.clone());
        Ok(())
    }

    async fn get(&self, id: &ContractId) -> LacResult<Contract> {
        self.contracts
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LacError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &ContractId) -> LacResult<()> {
        self.contracts.remove(id);
        Ok(())
    }

    async fn list(&self) -> LacResult<Vec<Contract>> {
        Ok(self
            .contracts
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn replace(&self, expected: &Contract, new: &Contract) -> LacResult<()> {
        check_same_id(expected, new)?;

        // The shard write lock is held until `entry` drops
        let mut entry = self
            .contracts
            .get_mut(&new.id)
            .ok_or_else(|| LacError::NotFound(new.id.to_string()))?;

        if *entry.value() != *expected {
            return Err(LacError::Conflict(new.id.to_string()));
        }

        *entry.value_mut() = new.clone();
        Ok(())
    }
}
