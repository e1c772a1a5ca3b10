//! # src/storage/memory_storage.rs
//!
//! Eine In-Memory-Implementierung des `Storage`-Traits. Standard-Backend
//! für Tests und das CLI; hält alle Daten in `HashMap`s.

use std::collections::HashMap;

use crate::models::contract::Contract;
use crate::models::identity::IdentityRecord;
use crate::models::log::LogEntry;
use crate::storage::{Storage, StorageError};

/// Flüchtiger Speicher ohne Persistenz.
#[derive(Default)]
pub struct MemoryStorage {
    contracts: HashMap<String, Contract>,
    identities: HashMap<String, IdentityRecord>,
    logs: HashMap<String, Vec<LogEntry>>,
    blobs: HashMap<String, Vec<u8>>,
    /// Testschalter: lässt jeden `append_log`-Aufruf fehlschlagen, um das
    /// Best-Effort-Verhalten des Audit-Logs prüfen zu können.
    pub fail_log_appends: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn save_contract(&mut self, contract: &Contract) -> Result<(), StorageError> {
        self.contracts
            .insert(contract.contract_id.clone(), contract.clone());
        Ok(())
    }

    fn load_contract(&self, contract_id: &str) -> Result<Contract, StorageError> {
        self.contracts
            .get(contract_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn delete_contract(&mut self, contract_id: &str) -> Result<(), StorageError> {
        self.contracts
            .remove(contract_id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    fn load_all_contracts(&self) -> Result<Vec<Contract>, StorageError> {
        Ok(self.contracts.values().cloned().collect())
    }

    fn save_identity(&mut self, record: &IdentityRecord) -> Result<(), StorageError> {
        self.identities
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    fn load_identity(&self, user_id: &str) -> Result<IdentityRecord, StorageError> {
        self.identities
            .get(user_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn find_identity_by_email_hash(
        &self,
        email_lookup_hash: &str,
    ) -> Result<Option<IdentityRecord>, StorageError> {
        Ok(self
            .identities
            .values()
            .find(|record| record.email_lookup_hash == email_lookup_hash)
            .cloned())
    }

    fn append_log(&mut self, entry: &LogEntry) -> Result<(), StorageError> {
        if self.fail_log_appends {
            return Err(StorageError::Generic(
                "Log appends are disabled for this test.".to_string(),
            ));
        }
        self.logs
            .entry(entry.payload.contract_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    fn load_logs(&self, contract_id: &str) -> Result<Vec<LogEntry>, StorageError> {
        Ok(self.logs.get(contract_id).cloned().unwrap_or_default())
    }

    fn latest_log(&self, contract_id: &str) -> Result<Option<LogEntry>, StorageError> {
        Ok(self
            .logs
            .get(contract_id)
            .and_then(|chain| chain.last().cloned()))
    }

    fn save_blob(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        self.blobs.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn load_blob(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs.get(name).cloned().ok_or(StorageError::NotFound)
    }

    fn delete_blob(&mut self, name: &str) -> Result<(), StorageError> {
        self.blobs
            .remove(name)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}
