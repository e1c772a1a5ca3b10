//! # src/storage/file_storage.rs
//!
//! Eine dateibasierte Implementierung des `Storage`-Traits. Verträge,
//! Identitäten und Log-Ketten liegen als JSON-Dokumente in Unterordnern;
//! die Datei-Blobs (bereits Chiffrate der Umschlagverschlüsselung) werden
//! unverändert abgelegt.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::contract::Contract;
use crate::models::identity::IdentityRecord;
use crate::models::log::LogEntry;
use crate::services::crypto_utils::get_hash;
use crate::storage::{Storage, StorageError};

/// Speichert alle Daten unterhalb eines Basisverzeichnisses.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Erstellt eine neue Instanz und legt die Verzeichnisstruktur an.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        for sub in ["contracts", "identities", "logs", "blobs"] {
            fs::create_dir_all(base_path.join(sub))?;
        }
        Ok(Self { base_path })
    }

    fn contract_path(&self, contract_id: &str) -> PathBuf {
        // IDs sind UUIDs; der Hash schützt trotzdem vor Pfad-Tricks.
        self.base_path
            .join("contracts")
            .join(format!("{}.json", get_hash(contract_id)))
    }

    fn identity_path(&self, user_id: &str) -> PathBuf {
        // User-IDs enthalten ':' und sind nicht als Dateinamen geeignet.
        self.base_path
            .join("identities")
            .join(format!("{}.json", get_hash(user_id)))
    }

    fn log_path(&self, contract_id: &str) -> PathBuf {
        self.base_path
            .join("logs")
            .join(format!("{}.json", get_hash(contract_id)))
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.base_path.join("blobs").join(get_hash(name))
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
        if !path.exists() {
            return Err(StorageError::NotFound);
        }
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| StorageError::InvalidFormat(e.to_string()))
    }
}

impl Storage for FileStorage {
    fn save_contract(&mut self, contract: &Contract) -> Result<(), StorageError> {
        Self::write_json(&self.contract_path(&contract.contract_id), contract)
    }

    fn load_contract(&self, contract_id: &str) -> Result<Contract, StorageError> {
        Self::read_json(&self.contract_path(contract_id))
    }

    fn delete_contract(&mut self, contract_id: &str) -> Result<(), StorageError> {
        let path = self.contract_path(contract_id);
        if !path.exists() {
            return Err(StorageError::NotFound);
        }
        fs::remove_file(path)?;
        Ok(())
    }

    fn load_all_contracts(&self) -> Result<Vec<Contract>, StorageError> {
        let mut contracts = Vec::new();
        for dir_entry in fs::read_dir(self.base_path.join("contracts"))? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                contracts.push(Self::read_json(&path)?);
            }
        }
        Ok(contracts)
    }

    fn save_identity(&mut self, record: &IdentityRecord) -> Result<(), StorageError> {
        Self::write_json(&self.identity_path(&record.user_id), record)
    }

    fn load_identity(&self, user_id: &str) -> Result<IdentityRecord, StorageError> {
        Self::read_json(&self.identity_path(user_id))
    }

    fn find_identity_by_email_hash(
        &self,
        email_lookup_hash: &str,
    ) -> Result<Option<IdentityRecord>, StorageError> {
        for dir_entry in fs::read_dir(self.base_path.join("identities"))? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let record: IdentityRecord = Self::read_json(&path)?;
            if record.email_lookup_hash == email_lookup_hash {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn append_log(&mut self, entry: &LogEntry) -> Result<(), StorageError> {
        let path = self.log_path(&entry.payload.contract_id);
        let mut chain: Vec<LogEntry> = if path.exists() {
            Self::read_json(&path)?
        } else {
            Vec::new()
        };
        chain.push(entry.clone());
        Self::write_json(&path, &chain)
    }

    fn load_logs(&self, contract_id: &str) -> Result<Vec<LogEntry>, StorageError> {
        let path = self.log_path(contract_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        Self::read_json(&path)
    }

    fn latest_log(&self, contract_id: &str) -> Result<Option<LogEntry>, StorageError> {
        Ok(self.load_logs(contract_id)?.into_iter().last())
    }

    fn save_blob(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        fs::write(self.blob_path(name), data)?;
        Ok(())
    }

    fn load_blob(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.blob_path(name);
        if !path.exists() {
            return Err(StorageError::NotFound);
        }
        Ok(fs::read(path)?)
    }

    fn delete_blob(&mut self, name: &str) -> Result<(), StorageError> {
        let path = self.blob_path(name);
        if !path.exists() {
            return Err(StorageError::NotFound);
        }
        fs::remove_file(path)?;
        Ok(())
    }
}
