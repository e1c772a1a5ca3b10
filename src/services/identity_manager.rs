//! # src/services/identity_manager.rs
//!
//! Der Lebenszyklus registrierter Identitäten: Registrierung mit
//! Zertifikatsausstellung, Widerruf bei Deaktivierung und die lazy
//! ausgewertete Signierberechtigung. Der private Schlüssel wird bei der
//! Registrierung genau einmal herausgegeben und nie gespeichert.

use ed25519_dalek::SigningKey;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{CertificateError, ContractCoreError, ValidationError};
use crate::models::config::CoreConfig;
use crate::models::identity::{CertificateStatus, IdentityRecord, IssuedIdentity, UserIdentity};
use crate::services::certificate::{self, CertificateAuthority};
use crate::services::crypto_utils;
use crate::services::utils::get_current_timestamp;
use crate::storage::Storage;

lazy_static! {
    /// Einfache Format-Prüfung; die eigentliche Zustellbarkeit ist Sache
    /// der äußeren Schichten.
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Normalisiert eine E-Mail-Adresse für Hash und Vergleich.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Der deterministische Lookup-Hash einer E-Mail-Adresse.
///
/// Erlaubt die Empfänger-Suche, ohne alle verschlüsselten Adressen zu
/// entschlüsseln.
pub fn email_lookup_hash(email: &str) -> String {
    crypto_utils::get_hash(normalize_email(email))
}

/// Verschlüsselt eine E-Mail-Adresse mit dem konfigurierten Schlüssel.
pub fn encrypt_email(config: &CoreConfig, email: &str) -> Result<String, ContractCoreError> {
    let key = config.email_key_bytes()?;
    let encrypted = crypto_utils::encrypt_data(&key, normalize_email(email).as_bytes())?;
    Ok(bs58::encode(encrypted).into_string())
}

/// Entschlüsselt eine mit `encrypt_email` abgelegte Adresse.
pub fn decrypt_email(config: &CoreConfig, email_enc: &str) -> Result<String, ContractCoreError> {
    let key = config.email_key_bytes()?;
    let encrypted = bs58::decode(email_enc)
        .into_vec()
        .map_err(|e| ContractCoreError::Crypto(format!("Invalid e-mail ciphertext: {}", e)))?;
    let plain = crypto_utils::decrypt_data(&key, &encrypted)?;
    String::from_utf8(plain)
        .map_err(|e| ContractCoreError::Crypto(format!("Decrypted e-mail is not UTF-8: {}", e)))
}

/// Registriert eine neue Identität.
///
/// Erzeugt das Ed25519-Schlüsselpaar, lässt die CA ein Zertifikat
/// ausstellen und persistiert den öffentlichen Datensatz. Der private
/// Schlüssel wird ausschließlich im Rückgabewert herausgegeben.
pub fn register(
    storage: &mut dyn Storage,
    ca: &CertificateAuthority,
    config: &CoreConfig,
    email: &str,
) -> Result<IssuedIdentity, ContractCoreError> {
    let normalized = normalize_email(email);
    if !EMAIL_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidEmailFormat(normalized).into());
    }

    let lookup_hash = email_lookup_hash(&normalized);
    if storage.find_identity_by_email_hash(&lookup_hash)?.is_some() {
        return Err(ValidationError::MalformedId(
            "An identity for this e-mail address already exists.".to_string(),
        )
        .into());
    }

    let (public_key, signing_key) = crypto_utils::generate_ed25519_keypair();
    let user_id = crypto_utils::create_user_id(&public_key);

    let certificate = ca.issue(&user_id, &public_key, config.certificate_validity_days)?;

    let record = IdentityRecord {
        user_id,
        email_enc: encrypt_email(config, &normalized)?,
        email_lookup_hash: lookup_hash,
        certificate,
        certificate_status: CertificateStatus::Valid,
        created_at: get_current_timestamp(),
    };
    storage.save_identity(&record)?;

    Ok(IssuedIdentity {
        record,
        private_key: bs58::encode(signing_key.to_bytes()).into_string(),
    })
}

/// Sucht eine Identität über ihre E-Mail-Adresse.
pub fn find_by_email(
    storage: &dyn Storage,
    email: &str,
) -> Result<Option<IdentityRecord>, ContractCoreError> {
    Ok(storage.find_identity_by_email_hash(&email_lookup_hash(email))?)
}

/// Widerruft das Zertifikat einer Identität (z.B. bei Deaktivierung).
///
/// Der Widerruf ist endgültig; erneutes Signieren erfordert eine
/// Neu-Registrierung.
pub fn revoke(storage: &mut dyn Storage, user_id: &str) -> Result<(), ContractCoreError> {
    let mut record = storage
        .load_identity(user_id)
        .map_err(|_| ContractCoreError::IdentityNotFound(user_id.to_string()))?;
    record.certificate_status = CertificateStatus::Revoked;
    storage.save_identity(&record)?;
    Ok(())
}

/// Lädt eine Identität und prüft ihre Signierberechtigung.
///
/// Der Zertifikatsstatus wird lazy fortgeschrieben: Ist das Fenster beim
/// Aufruf überschritten, wird `Expired` persistiert und die Signatur
/// verweigert.
pub fn require_signing_permission(
    storage: &mut dyn Storage,
    user_id: &str,
) -> Result<IdentityRecord, ContractCoreError> {
    let mut record = storage
        .load_identity(user_id)
        .map_err(|_| ContractCoreError::IdentityNotFound(user_id.to_string()))?;

    let current = certificate::evaluate_status(&record.certificate, record.certificate_status);
    if current != record.certificate_status {
        record.certificate_status = current;
        storage.save_identity(&record)?;
    }

    if current != CertificateStatus::Valid {
        return Err(CertificateError::StatusNotValid(current).into());
    }
    Ok(record)
}

/// Dekodiert einen bei der Registrierung herausgegebenen privaten Schlüssel.
pub fn decode_private_key(private_key: &str) -> Result<SigningKey, ContractCoreError> {
    let bytes = bs58::decode(private_key)
        .into_vec()
        .map_err(|e| ContractCoreError::Crypto(format!("Invalid private key encoding: {}", e)))?;
    let key_bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| ContractCoreError::Crypto("Private key must be 32 bytes.".to_string()))?;
    Ok(SigningKey::from_bytes(&key_bytes))
}

/// Rekonstruiert die vollständige Identität aus einem privaten Schlüssel.
///
/// Clientseitiges Gegenstück zur Registrierung: Der Inhaber lädt seinen
/// Schlüssel und erhält die transiente `UserIdentity` (wird beim Verlassen
/// des Gültigkeitsbereichs genullt).
pub fn identity_from_private_key(private_key: &str) -> Result<UserIdentity, ContractCoreError> {
    let signing_key = decode_private_key(private_key)?;
    let public_key = crypto_utils::public_key_of(&signing_key);
    let user_id = crypto_utils::create_user_id(&public_key);
    Ok(UserIdentity {
        signing_key,
        public_key,
        user_id,
    })
}
