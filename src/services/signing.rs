//! # src/services/signing.rs
//!
//! Das vierstufige Signaturprotokoll des Empfängers:
//!
//! 1. Integritätsprüfung des gespeicherten Chiffrats,
//! 2. Besitznachweis über das QR-Token,
//! 3. elektronische Signatur über den Datei-Hash (Zertifikat erforderlich),
//! 4. handschriftliche Bindung: Hash des Unterschriftenbilds, signiert mit
//!    demselben Schlüssel.
//!
//! Erst Schritt 4 überführt den Vertrag in den Zustand `signed`. Jeder
//! Abbruch lässt den Status unverändert. Es gibt bewusst keinen
//! persistierten Schritt-Zeiger: Ein Wiedereinstieg beginnt bei Schritt 1,
//! und jeder spätere Schritt prüft seine Voraussetzungen erneut.

use ed25519_dalek::{Signature, SigningKey, VerifyingKey as EdPublicKey};

use crate::error::{
    AuthorizationError, ContractCoreError, IntegrityError, SigningError, ValidationError,
};
use crate::models::contract::{Contract, ContractStatus, Party};
use crate::models::log::LogAction;
use crate::services::audit_log::{self, LogWriteOutcome};
use crate::services::certificate;
use crate::services::contract_manager;
use crate::services::crypto_utils;
use crate::services::identity_manager;
use crate::services::utils::{get_current_timestamp, to_canonical_json};
use crate::storage::Storage;

/// Das Eingabe-Bündel für Schritt 4. Alle Felder sind Pflicht; ein
/// unvollständiges Bündel wird ohne Seiteneffekte zurückgewiesen.
pub struct HandSignatureBundle {
    /// Das Unterschriftenbild (Rohbytes).
    pub image: Vec<u8>,
    /// SHA-256-Hex-Hash des Bilds, vom Client berechnet.
    pub image_hash: String,
    /// Ed25519-Signatur über den Bild-Hash, mit demselben Schlüssel wie
    /// die elektronische Signatur (Base58).
    pub image_hash_signature: String,
}

/// Lädt den Vertrag und stellt sicher, dass der Akteur der Empfänger ist
/// und der Vertrag noch auf die Signatur wartet.
fn load_for_signing(
    storage: &mut dyn Storage,
    contract_id: &str,
    user_id: &str,
) -> Result<Contract, ContractCoreError> {
    let contract = contract_manager::get_for_user(storage, contract_id, user_id)?;
    if contract.party_of(user_id) != Some(Party::Recipient) {
        return Err(AuthorizationError::NotAParty(user_id.to_string()).into());
    }
    match contract.status {
        ContractStatus::Uploaded => Ok(contract),
        ContractStatus::Expired => Err(AuthorizationError::ContractExpired.into()),
        other => Err(ContractCoreError::StateConflict { current: other }),
    }
}

/// Prüft Chiffrat-Hash gegen den Referenzwert (harter Stopp bei Abweichung).
fn check_ciphertext_integrity(
    storage: &dyn Storage,
    contract: &Contract,
) -> Result<(), ContractCoreError> {
    let ciphertext = storage.load_blob(&contract.file_path)?;
    let computed = crypto_utils::get_hash(&ciphertext);
    if computed != contract.security.file_hash {
        return Err(IntegrityError::FileHashMismatch {
            expected: contract.security.file_hash.clone(),
            computed,
        }
        .into());
    }
    Ok(())
}

/// **Schritt 1** — Integritätsprüfung des gespeicherten Chiffrats.
///
/// Ohne Seiteneffekte; beliebig wiederholbar.
pub fn verify_integrity(
    storage: &mut dyn Storage,
    contract_id: &str,
    user_id: &str,
) -> Result<(), ContractCoreError> {
    let contract = load_for_signing(storage, contract_id, user_id)?;
    check_ciphertext_integrity(storage, &contract)
}

/// **Schritt 2** — Besitznachweis über das QR-Token.
///
/// Ein Mismatch ist wiederholbar und ohne Seiteneffekte; ein Treffer wird
/// (Best-Effort) als `qr_verified` protokolliert. Das Token bleibt nach
/// erfolgreicher Prüfung gültig.
pub fn verify_qr_token(
    storage: &mut dyn Storage,
    contract_id: &str,
    user_id: &str,
    presented_token: &str,
) -> Result<LogWriteOutcome, ContractCoreError> {
    let contract = load_for_signing(storage, contract_id, user_id)?;
    if presented_token != contract.qr_token {
        return Err(SigningError::QrTokenMismatch.into());
    }

    let file_hash = contract.security.file_hash.clone();
    Ok(audit_log::record(
        storage,
        &contract,
        LogAction::QrVerified,
        &file_hash,
    ))
}

/// **Schritt 3** — elektronische Signatur über den Datei-Hash.
///
/// Voraussetzungen: gültiges (nicht abgelaufenes, nicht widerrufenes)
/// Zertifikat, zusammenpassendes Schlüsselpaar und unversehrtes Chiffrat.
/// Setzt `signed = true`; der Vertragsstatus bleibt `uploaded`.
pub fn apply_digital_signature(
    storage: &mut dyn Storage,
    ca_public_key: &EdPublicKey,
    contract_id: &str,
    user_id: &str,
    signing_key: &SigningKey,
) -> Result<Contract, ContractCoreError> {
    let mut contract = load_for_signing(storage, contract_id, user_id)?;
    check_ciphertext_integrity(storage, &contract)?;

    let identity = identity_manager::require_signing_permission(storage, user_id)?;
    certificate::verify_certificate(&identity.certificate, ca_public_key)?;

    let expected_public_key = crypto_utils::get_pubkey_from_user_id(user_id)?;
    if crypto_utils::public_key_of(signing_key) != expected_public_key {
        return Err(IntegrityError::KeyPairMismatch.into());
    }

    let signature =
        crypto_utils::sign_ed25519(signing_key, contract.security.file_hash.as_bytes());

    contract.signature.signed = true;
    contract.signature.signer = Some(user_id.to_string());
    contract.signature.certificate = Some(to_canonical_json(&identity.certificate)?);
    contract.signature.signature = Some(bs58::encode(signature.to_bytes()).into_string());
    storage.save_contract(&contract)?;

    Ok(contract)
}

/// **Schritt 4** — handschriftliche Bindung und Zustandsübergang.
///
/// Alle Felder des Bündels werden vor jeder Änderung geprüft
/// (alles-oder-nichts). Erst wenn Bild-Hash und Signatur stimmen, werden
/// Signaturblock (inklusive des Bilds selbst) und Status
/// (`uploaded → signed`) in einem Zug fortgeschrieben und der
/// `hand-sign`-Eintrag mit dem Bild-Hash angehängt.
pub fn bind_handwritten_signature(
    storage: &mut dyn Storage,
    contract_id: &str,
    user_id: &str,
    bundle: &HandSignatureBundle,
) -> Result<(Contract, LogWriteOutcome), ContractCoreError> {
    let mut contract = load_for_signing(storage, contract_id, user_id)?;

    if !contract.signature.signed {
        return Err(SigningError::DigitalSignatureMissing.into());
    }
    if bundle.image.is_empty() {
        return Err(SigningError::IncompleteBundle("image").into());
    }
    if bundle.image_hash.is_empty() {
        return Err(SigningError::IncompleteBundle("image_hash").into());
    }
    if bundle.image_hash_signature.is_empty() {
        return Err(SigningError::IncompleteBundle("image_hash_signature").into());
    }

    let computed = crypto_utils::get_hash(&bundle.image);
    if computed != bundle.image_hash {
        return Err(SigningError::ImageHashMismatch.into());
    }

    let signer_public_key = crypto_utils::get_pubkey_from_user_id(user_id)?;
    let signature_bytes = bs58::decode(&bundle.image_hash_signature)
        .into_vec()
        .map_err(|_| ValidationError::MalformedId("image_hash_signature".to_string()))?;
    let signature_array: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| ValidationError::MalformedId("image_hash_signature".to_string()))?;
    let signature = Signature::from_bytes(&signature_array);

    if !crypto_utils::verify_ed25519(
        &signer_public_key,
        bundle.image_hash.as_bytes(),
        &signature,
    ) {
        return Err(IntegrityError::SignatureInvalid {
            context: "handwritten image hash",
        }
        .into());
    }

    contract.signature.signature_image = Some(bs58::encode(&bundle.image).into_string());
    contract.signature.signature_image_hash = Some(bundle.image_hash.clone());
    contract.signature.signature_image_hash_signature =
        Some(bundle.image_hash_signature.clone());
    contract.signature.signed_at = Some(get_current_timestamp());
    contract.status = ContractStatus::Signed;
    storage.save_contract(&contract)?;

    // Der hand-sign-Eintrag trägt den Hash des Unterschriftenbilds, nicht
    // den des Chiffrats.
    let log = audit_log::record(storage, &contract, LogAction::HandSign, &bundle.image_hash);
    Ok((contract, log))
}

/// Erzeugt clientseitig das Bündel für Schritt 4 aus Bild und Schlüssel.
///
/// Hilfsfunktion für Tests und das CLI; ein echter Client berechnet Hash
/// und Signatur selbst.
pub fn build_hand_signature_bundle(
    image: Vec<u8>,
    signing_key: &SigningKey,
) -> HandSignatureBundle {
    let image_hash = crypto_utils::get_hash(&image);
    let signature = crypto_utils::sign_ed25519(signing_key, image_hash.as_bytes());
    HandSignatureBundle {
        image,
        image_hash,
        image_hash_signature: bs58::encode(signature.to_bytes()).into_string(),
    }
}
