//! # src/services/audit_log.rs
//!
//! Das Hash-Ketten-Audit-Log. Jeder Vertrag hat seine eigene, unabhängige
//! Kette: Der `previous_hash` jedes Eintrags ist der Hash seines
//! Vorgängers, der erste Eintrag verweist auf den leeren String. Die Kette
//! ist rein aus gespeicherten Daten nachrechenbar.
//!
//! Anhänge sind Best-Effort: Ein fehlgeschriebener Eintrag lässt die
//! Primäraktion nicht scheitern, wird aber als `LogWriteOutcome::Failed`
//! gemeldet und per `tracing` protokolliert.

use tracing::warn;

use crate::error::{ContractCoreError, IntegrityError};
use crate::models::contract::Contract;
use crate::models::log::{LogAction, LogEntry, LogPayload};
use crate::services::crypto_utils::get_hash;
use crate::services::utils::{get_current_timestamp, to_canonical_json};
use crate::storage::Storage;

/// Das Ergebnis eines Best-Effort-Anhangs.
#[derive(Debug, Clone, PartialEq)]
pub enum LogWriteOutcome {
    /// Der Eintrag wurde angehängt.
    Written,
    /// Der Anhang ist fehlgeschlagen; die Primäraktion bleibt gültig.
    Failed(String),
}

impl LogWriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, LogWriteOutcome::Written)
    }
}

/// Berechnet den Hash eines Log-Eintrags über seine kanonische JSON-Form.
fn payload_hash(payload: &LogPayload) -> Result<String, ContractCoreError> {
    Ok(get_hash(to_canonical_json(payload)?))
}

/// Hängt einen Eintrag an die Kette des Vertrags an (Best-Effort).
///
/// Zwischen dem Lesen des letzten Eintrags und dem Anhängen hält der
/// Aufrufer den Speicher exklusiv (`&mut`); konkurrierende Anhänge derselben
/// Kette sind damit serialisiert.
pub fn record(
    storage: &mut dyn Storage,
    contract: &Contract,
    action: LogAction,
    file_hash: &str,
) -> LogWriteOutcome {
    let previous_hash = match storage.latest_log(&contract.contract_id) {
        Ok(Some(last)) => last.hash,
        Ok(None) => String::new(),
        Err(e) => {
            warn!(
                contract_id = %contract.contract_id,
                error = %e,
                "audit log read failed, entry dropped"
            );
            return LogWriteOutcome::Failed(e.to_string());
        }
    };

    let payload = LogPayload {
        contract_id: contract.contract_id.clone(),
        action,
        file_path: contract.file_path.clone(),
        file_name: contract.file_name.clone(),
        file_hash: file_hash.to_string(),
        previous_hash,
        timestamp: get_current_timestamp(),
    };

    let hash = match payload_hash(&payload) {
        Ok(hash) => hash,
        Err(e) => {
            warn!(
                contract_id = %contract.contract_id,
                error = %e,
                "audit log entry could not be hashed, entry dropped"
            );
            return LogWriteOutcome::Failed(e.to_string());
        }
    };

    let entry = LogEntry { payload, hash };
    match storage.append_log(&entry) {
        Ok(()) => LogWriteOutcome::Written,
        Err(e) => {
            warn!(
                contract_id = %contract.contract_id,
                error = %e,
                "audit log append failed, entry dropped"
            );
            LogWriteOutcome::Failed(e.to_string())
        }
    }
}

/// Prüft die vollständige Kette eines Vertrags.
///
/// Verifiziert für jeden Eintrag den nachgerechneten Hash und die
/// Verkettung zum Vorgänger. Der Index des ersten gebrochenen Eintrags
/// wird im Fehler mitgeliefert.
pub fn verify_chain(
    storage: &dyn Storage,
    contract_id: &str,
) -> Result<usize, ContractCoreError> {
    let entries = storage.load_logs(contract_id)?;
    verify_entries(&entries)?;
    Ok(entries.len())
}

/// Prüft eine bereits geladene Kette in Einfüge-Reihenfolge.
pub fn verify_entries(entries: &[LogEntry]) -> Result<(), ContractCoreError> {
    let mut expected_previous = String::new();
    for (index, entry) in entries.iter().enumerate() {
        if entry.payload.previous_hash != expected_previous {
            return Err(IntegrityError::ChainBroken { index }.into());
        }
        let computed = payload_hash(&entry.payload)?;
        if computed != entry.hash {
            return Err(IntegrityError::ChainBroken { index }.into());
        }
        expected_previous = entry.hash.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contract::{ContractStatus, SecurityInfo, SignatureInfo, WrappedKey};
    use crate::storage::memory_storage::MemoryStorage;

    fn dummy_contract() -> Contract {
        let wrapped = WrappedKey {
            ephemeral_public_key: String::new(),
            ciphertext: String::new(),
        };
        Contract {
            contract_id: "c-1".to_string(),
            title: "Testvertrag".to_string(),
            uploader_id: "did:key:zUploader".to_string(),
            recipient_id: "did:key:zRecipient".to_string(),
            uploader_email_enc: String::new(),
            recipient_email_enc: String::new(),
            file_name: "vertrag.pdf".to_string(),
            file_path: "blob-1.pdf".to_string(),
            status: ContractStatus::Uploaded,
            created_at: get_current_timestamp(),
            expiration_date: get_current_timestamp(),
            received: false,
            deleted_by: Vec::new(),
            qr_token: "token".to_string(),
            security: SecurityInfo {
                file_hash: "hash".to_string(),
                wrapped_key_for_uploader: wrapped.clone(),
                wrapped_key_for_recipient: wrapped,
                recipient_public_key_hash: String::new(),
            },
            signature: SignatureInfo::default(),
        }
    }

    #[test]
    fn chain_links_and_verifies() {
        let mut storage = MemoryStorage::new();
        let contract = dummy_contract();

        for action in [LogAction::Upload, LogAction::View, LogAction::Download] {
            let outcome = record(&mut storage, &contract, action, "hash");
            assert!(outcome.is_written());
        }

        let entries = storage.load_logs("c-1").unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].payload.previous_hash, "");
        assert_eq!(entries[1].payload.previous_hash, entries[0].hash);
        assert_eq!(entries[2].payload.previous_hash, entries[1].hash);
        assert_eq!(verify_chain(&storage, "c-1").unwrap(), 3);
    }

    #[test]
    fn tampered_entry_breaks_verification() {
        let mut storage = MemoryStorage::new();
        let contract = dummy_contract();
        record(&mut storage, &contract, LogAction::Upload, "hash");
        record(&mut storage, &contract, LogAction::View, "hash");

        let mut entries = storage.load_logs("c-1").unwrap();
        entries[0].payload.file_name = "anders.pdf".to_string();
        let result = verify_entries(&entries);
        assert!(matches!(
            result,
            Err(ContractCoreError::Integrity(IntegrityError::ChainBroken {
                index: 0
            }))
        ));
    }

    #[test]
    fn failed_append_is_reported_not_fatal() {
        let mut storage = MemoryStorage::new();
        storage.fail_log_appends = true;
        let contract = dummy_contract();

        let outcome = record(&mut storage, &contract, LogAction::Upload, "hash");
        assert!(matches!(outcome, LogWriteOutcome::Failed(_)));
        assert!(storage.load_logs("c-1").unwrap().is_empty());
    }
}
