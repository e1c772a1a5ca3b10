//! # src/storage/mod.rs
//!
//! Definiert die Abstraktion für die persistente Speicherung von Verträgen,
//! Identitäten, Log-Ketten und verschlüsselten Datei-Blobs. Dies ermöglicht
//! es, die Kernlogik von der konkreten Speichermethode zu entkoppeln.

use crate::models::contract::Contract;
use crate::models::identity::IdentityRecord;
use crate::models::log::LogEntry;

pub mod file_storage;
pub mod memory_storage;

use thiserror::Error;

/// Ein generischer Fehler-Typ für alle Speicheroperationen.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Data not found for the given identifier.")]
    NotFound,

    #[error("Data is corrupted or has an invalid format: {0}")]
    InvalidFormat(String),

    #[error("Underlying I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("An unexpected error occurred: {0}")]
    Generic(String),
}

/// Die Schnittstelle für persistente Speicherung.
///
/// Jede Methode ist eine atomare Operation. Die Serialisierung
/// konkurrierender Log-Anhänge entsteht durch das exklusive `&mut self`
/// der Schreiboperationen: zwischen dem Lesen des letzten Eintrags und dem
/// Anhängen des nächsten hält der Aufrufer den Speicher exklusiv.
pub trait Storage {
    /// Speichert einen Vertrag (legt ihn an oder überschreibt ihn).
    fn save_contract(&mut self, contract: &Contract) -> Result<(), StorageError>;

    /// Lädt einen Vertrag anhand seiner ID.
    fn load_contract(&self, contract_id: &str) -> Result<Contract, StorageError>;

    /// Entfernt einen Vertrag endgültig (harter Löschvorgang).
    fn delete_contract(&mut self, contract_id: &str) -> Result<(), StorageError>;

    /// Lädt alle gespeicherten Verträge.
    fn load_all_contracts(&self) -> Result<Vec<Contract>, StorageError>;

    /// Speichert einen Identitätsdatensatz.
    fn save_identity(&mut self, record: &IdentityRecord) -> Result<(), StorageError>;

    /// Lädt einen Identitätsdatensatz anhand der User-ID.
    fn load_identity(&self, user_id: &str) -> Result<IdentityRecord, StorageError>;

    /// Sucht eine Identität über den deterministischen E-Mail-Lookup-Hash.
    fn find_identity_by_email_hash(
        &self,
        email_lookup_hash: &str,
    ) -> Result<Option<IdentityRecord>, StorageError>;

    /// Hängt einen Log-Eintrag an die Kette des Vertrags an.
    fn append_log(&mut self, entry: &LogEntry) -> Result<(), StorageError>;

    /// Lädt die vollständige Log-Kette eines Vertrags in Einfüge-Reihenfolge.
    fn load_logs(&self, contract_id: &str) -> Result<Vec<LogEntry>, StorageError>;

    /// Lädt den zuletzt angehängten Log-Eintrag eines Vertrags, falls vorhanden.
    fn latest_log(&self, contract_id: &str) -> Result<Option<LogEntry>, StorageError>;

    /// Speichert einen (bereits verschlüsselten) Datei-Blob unter seinem Namen.
    fn save_blob(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Lädt einen Datei-Blob anhand seines Namens.
    fn load_blob(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Entfernt einen Datei-Blob endgültig.
    fn delete_blob(&mut self, name: &str) -> Result<(), StorageError>;
}
