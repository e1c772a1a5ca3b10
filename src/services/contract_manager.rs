//! # src/services/contract_manager.rs
//!
//! Der Vertrags-Lebenszyklus: Upload mit Validierung und
//! Umschlagverschlüsselung, die Autorisierungsmatrix der Zustandsmaschine,
//! Einsicht und Download mit harter Integritätsprüfung, Ablehnung,
//! Eingangsbestätigung, Soft-Delete und Auflistungen.
//!
//! Der Ablauf eines Vertrags wird lazy ausgewertet: Jede lesende oder
//! schreibende Operation prüft zuerst das Ablaufdatum und schreibt den
//! Status fort. Ein überschrittenes Ablaufdatum gewinnt gegen jede andere
//! Zustandsänderung.

use uuid::Uuid;

use crate::error::{AuthorizationError, ContractCoreError, IntegrityError, ValidationError};
use crate::models::config::CoreConfig;
use crate::models::contract::{Contract, ContractStatus, Party, SignatureInfo};
use crate::models::log::LogAction;
use crate::services::audit_log::{self, LogWriteOutcome};
use crate::services::crypto_utils;
use crate::services::envelope;
use crate::services::identity_manager;
use crate::services::utils::{get_current_timestamp, get_timestamp_in_days, is_in_past};
use crate::storage::{Storage, StorageError};

/// Die Eingabedaten eines Uploads.
pub struct NewContractData {
    /// Der Anzeigetitel des Vertrags.
    pub title: String,
    /// Der ursprüngliche Dateiname (die Endung wird validiert).
    pub file_name: String,
    /// Der unverschlüsselte Dateiinhalt.
    pub file_data: Vec<u8>,
    /// Die User-ID des Uploaders.
    pub uploader_id: String,
    /// Die E-Mail-Adresse des Empfängers.
    pub recipient_email: String,
}

/// Das Ergebnis eines erfolgreichen Uploads.
pub struct UploadReceipt {
    /// Der gespeicherte Vertrag.
    pub contract: Contract,
    /// Das QR-Token für den Besitznachweis in Schritt 2 des Protokolls.
    pub qr_token: String,
    /// Das Ergebnis des Best-Effort-Log-Anhangs.
    pub log: LogWriteOutcome,
}

/// Die durch die Matrix autorisierten Inhalts-Zugriffe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessAction {
    View,
    Download,
}

/// Das Ergebnis eines autorisierten Inhalts-Zugriffs: das Chiffrat und der
/// Vertrag mit den Umschlag-Daten der Partei. Entschlüsselt wird beim
/// Aufrufer über `envelope::open_envelope`.
pub struct DocumentAccess {
    pub contract: Contract,
    pub ciphertext: Vec<u8>,
    pub party: Party,
    /// Das Ergebnis des Best-Effort-Log-Anhangs (`view` bzw. `download`).
    pub log: LogWriteOutcome,
}

/// Das Ergebnis eines Löschvorgangs.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Nur aus Sicht des Akteurs gelöscht; die Gegenseite sieht den
    /// Vertrag weiterhin.
    SoftDeleted,
    /// Beide Parteien hatten gelöscht; Datensatz und Blob sind entfernt.
    /// Die Log-Kette bleibt als Historie erhalten.
    HardDeleted,
}

/// Extrahiert die Dateiendung (mit Punkt, lowercase).
fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rfind('.')
        .map(|pos| file_name[pos..].to_lowercase())
}

/// Validiert die Eingabedaten eines Uploads, ohne Seiteneffekte.
fn validate_upload(config: &CoreConfig, data: &NewContractData) -> Result<(), ContractCoreError> {
    if data.title.trim().is_empty() {
        return Err(ValidationError::MissingField("title").into());
    }
    if data.file_data.is_empty() {
        return Err(ValidationError::MissingField("file_data").into());
    }

    let extension = file_extension(&data.file_name)
        .ok_or_else(|| ValidationError::ExtensionNotAllowed(data.file_name.clone()))?;
    if !config.allowed_extensions.contains(&extension) {
        return Err(ValidationError::ExtensionNotAllowed(extension).into());
    }

    if data.file_data.len() > config.max_file_size_bytes {
        return Err(ValidationError::FileTooLarge {
            size: data.file_data.len(),
            max: config.max_file_size_bytes,
        }
        .into());
    }
    Ok(())
}

/// Lädt einen Vertrag hoch.
///
/// Validiert die Eingaben, löst den Empfänger über den E-Mail-Lookup-Hash
/// auf, versiegelt das Dokument im Umschlag und persistiert Blob und
/// Vertrag. Der `upload`-Log-Eintrag ist Best-Effort.
pub fn upload(
    storage: &mut dyn Storage,
    config: &CoreConfig,
    data: NewContractData,
) -> Result<UploadReceipt, ContractCoreError> {
    validate_upload(config, &data)?;

    let uploader = storage
        .load_identity(&data.uploader_id)
        .map_err(|_| ContractCoreError::IdentityNotFound(data.uploader_id.clone()))?;
    let recipient = identity_manager::find_by_email(storage, &data.recipient_email)?
        .ok_or(ValidationError::UnknownRecipient)?;

    if recipient.user_id == uploader.user_id {
        return Err(ValidationError::SelfAddressedContract.into());
    }

    let uploader_public_key = crypto_utils::get_pubkey_from_user_id(&uploader.user_id)?;
    let recipient_public_key = crypto_utils::get_pubkey_from_user_id(&recipient.user_id)?;

    let (ciphertext, security) =
        envelope::seal_envelope(&data.file_data, &uploader_public_key, &recipient_public_key)?;

    let extension = file_extension(&data.file_name).unwrap_or_default();
    let contract = Contract {
        contract_id: Uuid::new_v4().to_string(),
        title: data.title.trim().to_string(),
        uploader_id: uploader.user_id.clone(),
        recipient_id: recipient.user_id.clone(),
        uploader_email_enc: uploader.email_enc.clone(),
        recipient_email_enc: recipient.email_enc.clone(),
        file_name: data.file_name.clone(),
        file_path: format!("{}{}", Uuid::new_v4(), extension),
        status: ContractStatus::Uploaded,
        created_at: get_current_timestamp(),
        expiration_date: get_timestamp_in_days(config.contract_validity_days),
        received: false,
        deleted_by: Vec::new(),
        qr_token: Uuid::new_v4().to_string(),
        security,
        signature: SignatureInfo::default(),
    };

    storage.save_blob(&contract.file_path, &ciphertext)?;
    storage.save_contract(&contract)?;

    let file_hash = contract.security.file_hash.clone();
    let log = audit_log::record(storage, &contract, LogAction::Upload, &file_hash);

    let qr_token = contract.qr_token.clone();
    Ok(UploadReceipt {
        contract,
        qr_token,
        log,
    })
}

/// Schreibt den Status fort, wenn das Ablaufdatum überschritten ist.
///
/// Gibt den (ggf. aktualisierten) Vertrag zurück. Der Ablauf greift aus
/// jedem Zustand heraus und wird persistiert, sobald er festgestellt wird.
pub fn apply_lazy_expiry(
    storage: &mut dyn Storage,
    mut contract: Contract,
) -> Result<Contract, ContractCoreError> {
    if contract.status != ContractStatus::Expired && is_in_past(&contract.expiration_date) {
        contract.status = ContractStatus::Expired;
        storage.save_contract(&contract)?;
    }
    Ok(contract)
}

/// Lädt einen Vertrag aus Sicht eines Akteurs.
///
/// Vom Akteur soft-gelöschte Verträge sind für ihn unsichtbar und werden
/// als nicht gefunden gemeldet. Der Ablauf wird vor der Rückgabe
/// fortgeschrieben.
pub fn get_for_user(
    storage: &mut dyn Storage,
    contract_id: &str,
    user_id: &str,
) -> Result<Contract, ContractCoreError> {
    let contract = match storage.load_contract(contract_id) {
        Ok(contract) => contract,
        Err(StorageError::NotFound) => {
            return Err(ContractCoreError::ContractNotFound(contract_id.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    if contract.party_of(user_id).is_none() {
        return Err(AuthorizationError::NotAParty(user_id.to_string()).into());
    }
    if contract.is_deleted_for(user_id) {
        return Err(ContractCoreError::ContractNotFound(contract_id.to_string()));
    }
    apply_lazy_expiry(storage, contract)
}

/// Wertet die Autorisierungsmatrix für einen Inhalts-Zugriff aus.
///
/// Reihenfolge: zuerst der Ablauf, dann die Ablehnung, zuletzt die
/// rollenspezifische Regel des aktuellen Zustands.
pub fn authorize_access(
    contract: &Contract,
    user_id: &str,
    action: AccessAction,
) -> Result<Party, ContractCoreError> {
    let party = contract
        .party_of(user_id)
        .ok_or_else(|| AuthorizationError::NotAParty(user_id.to_string()))?;

    match contract.status {
        ContractStatus::Expired => Err(AuthorizationError::ContractExpired.into()),
        ContractStatus::Rejected => match party {
            Party::Uploader => Ok(party),
            Party::Recipient => Err(AuthorizationError::ContractRejected.into()),
        },
        ContractStatus::Signed => Ok(party),
        ContractStatus::Uploaded => match (party, action) {
            (Party::Recipient, AccessAction::Download) => {
                Err(AuthorizationError::DownloadBeforeSigning.into())
            }
            _ => Ok(party),
        },
    }
}

/// Liefert das Chiffrat für einen autorisierten Zugriff aus.
///
/// Vor der Auslieferung wird der Hash des gespeicherten Chiffrats neu
/// berechnet und gegen den Referenzwert geprüft; eine Abweichung ist ein
/// harter Stopp. Erst danach wird der Log-Eintrag (Best-Effort) angehängt.
fn serve_document(
    storage: &mut dyn Storage,
    contract: Contract,
    party: Party,
    action: LogAction,
) -> Result<DocumentAccess, ContractCoreError> {
    let ciphertext = storage.load_blob(&contract.file_path)?;

    let computed = crypto_utils::get_hash(&ciphertext);
    if computed != contract.security.file_hash {
        return Err(IntegrityError::FileHashMismatch {
            expected: contract.security.file_hash.clone(),
            computed,
        }
        .into());
    }

    let log = audit_log::record(storage, &contract, action, &computed);
    Ok(DocumentAccess {
        contract,
        ciphertext,
        party,
        log,
    })
}

/// Einsicht in den Vertragsinhalt (Vorschau).
pub fn view(
    storage: &mut dyn Storage,
    contract_id: &str,
    user_id: &str,
) -> Result<DocumentAccess, ContractCoreError> {
    let contract = get_for_user(storage, contract_id, user_id)?;
    let party = authorize_access(&contract, user_id, AccessAction::View)?;
    serve_document(storage, contract, party, LogAction::View)
}

/// Download des Vertragsinhalts.
pub fn download(
    storage: &mut dyn Storage,
    contract_id: &str,
    user_id: &str,
) -> Result<DocumentAccess, ContractCoreError> {
    let contract = get_for_user(storage, contract_id, user_id)?;
    let party = authorize_access(&contract, user_id, AccessAction::Download)?;
    serve_document(storage, contract, party, LogAction::Download)
}

/// Lehnt einen Vertrag ab. Nur der Empfänger darf das, und nur solange der
/// Vertrag auf die Signatur wartet.
pub fn reject(
    storage: &mut dyn Storage,
    contract_id: &str,
    user_id: &str,
) -> Result<(Contract, LogWriteOutcome), ContractCoreError> {
    let mut contract = get_for_user(storage, contract_id, user_id)?;

    if contract.party_of(user_id) != Some(Party::Recipient) {
        return Err(AuthorizationError::RejectReservedToRecipient.into());
    }
    match contract.status {
        ContractStatus::Expired => return Err(AuthorizationError::ContractExpired.into()),
        ContractStatus::Uploaded => {}
        other => return Err(ContractCoreError::StateConflict { current: other }),
    }

    contract.status = ContractStatus::Rejected;
    storage.save_contract(&contract)?;

    let file_hash = contract.security.file_hash.clone();
    let log = audit_log::record(storage, &contract, LogAction::Reject, &file_hash);
    Ok((contract, log))
}

/// Bestätigt den Eingang eines Vertrags (nur Empfänger).
pub fn mark_received(
    storage: &mut dyn Storage,
    contract_id: &str,
    user_id: &str,
) -> Result<Contract, ContractCoreError> {
    let mut contract = get_for_user(storage, contract_id, user_id)?;
    if contract.party_of(user_id) != Some(Party::Recipient) {
        return Err(AuthorizationError::NotAParty(user_id.to_string()).into());
    }
    if contract.status == ContractStatus::Expired {
        return Err(AuthorizationError::ContractExpired.into());
    }
    if !contract.received {
        contract.received = true;
        storage.save_contract(&contract)?;
    }
    Ok(contract)
}

/// Löscht einen Vertrag aus Sicht eines Akteurs (idempotent).
///
/// Löscht der Empfänger, solange der Vertrag unsigniert ist, wird die
/// Ablehnung erzwungen und die Eingangsbestätigung zurückgenommen. Haben
/// beide Parteien gelöscht, werden Datensatz und Blob endgültig entfernt;
/// die Log-Kette bleibt erhalten.
pub fn soft_delete(
    storage: &mut dyn Storage,
    contract_id: &str,
    user_id: &str,
) -> Result<DeleteOutcome, ContractCoreError> {
    let contract = match storage.load_contract(contract_id) {
        Ok(contract) => contract,
        Err(StorageError::NotFound) => {
            return Err(ContractCoreError::ContractNotFound(contract_id.to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    let party = contract
        .party_of(user_id)
        .ok_or_else(|| AuthorizationError::NotAParty(user_id.to_string()))?;

    // Idempotent: Wiederholtes Löschen derselben Partei ändert nichts.
    if contract.is_deleted_for(user_id) {
        return Ok(DeleteOutcome::SoftDeleted);
    }

    let mut contract = apply_lazy_expiry(storage, contract)?;
    contract.deleted_by.push(user_id.to_string());

    if party == Party::Recipient && contract.status == ContractStatus::Uploaded {
        contract.status = ContractStatus::Rejected;
        contract.received = false;
        let file_hash = contract.security.file_hash.clone();
        audit_log::record(storage, &contract, LogAction::Reject, &file_hash);
    }

    if contract.deleted_by.len() >= 2 {
        storage.delete_contract(&contract.contract_id)?;
        // Blob kann bereits fehlen, das ist beim harten Löschen unkritisch.
        match storage.delete_blob(&contract.file_path) {
            Ok(()) | Err(StorageError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        return Ok(DeleteOutcome::HardDeleted);
    }

    storage.save_contract(&contract)?;
    Ok(DeleteOutcome::SoftDeleted)
}

/// Listet alle für den Akteur sichtbaren Verträge auf.
///
/// Unsichtbar sind Verträge, an denen er nicht beteiligt ist oder die er
/// soft-gelöscht hat. Der Ablauf wird je Vertrag fortgeschrieben.
pub fn list_for_user(
    storage: &mut dyn Storage,
    user_id: &str,
) -> Result<Vec<Contract>, ContractCoreError> {
    let mut visible = Vec::new();
    for contract in storage.load_all_contracts()? {
        if contract.party_of(user_id).is_none() || contract.is_deleted_for(user_id) {
            continue;
        }
        visible.push(apply_lazy_expiry(storage, contract)?);
    }
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(visible)
}
