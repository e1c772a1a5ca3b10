//! # src/services/certificate.rs
//!
//! Die Zertifizierungsstelle (CA) der Plattform. Sie ist ein gewöhnlicher,
//! injizierter Wert ohne globalen Zustand: Wer signierte Zertifikate
//! ausstellen will, hält eine `CertificateAuthority`; wer nur prüfen will,
//! braucht lediglich deren öffentlichen Schlüssel.

use ed25519_dalek::{Signature, SigningKey, VerifyingKey as EdPublicKey};
use uuid::Uuid;

use crate::error::{CertificateError, ContractCoreError};
use crate::models::identity::{Certificate, CertificatePayload, CertificateStatus};
use crate::services::crypto_utils;
use crate::services::utils::{get_current_timestamp, get_timestamp_in_days, is_in_past, to_canonical_json};

/// Die Zertifizierungsstelle. Hält den privaten CA-Schlüssel im Speicher.
pub struct CertificateAuthority {
    signing_key: SigningKey,
    ca_id: String,
}

impl CertificateAuthority {
    /// Erstellt eine CA aus einem vorhandenen Schlüssel.
    pub fn new(signing_key: SigningKey) -> Self {
        let ca_id = crypto_utils::create_user_id(&signing_key.verifying_key());
        Self { signing_key, ca_id }
    }

    /// Erzeugt eine CA mit einem frischen, zufälligen Schlüsselpaar.
    pub fn generate() -> Self {
        let (_, signing_key) = crypto_utils::generate_ed25519_keypair();
        Self::new(signing_key)
    }

    /// Die User-ID der CA (Aussteller-Kennung in jedem Zertifikat).
    pub fn ca_id(&self) -> &str {
        &self.ca_id
    }

    /// Der öffentliche Schlüssel der CA, für die Zertifikatsprüfung.
    pub fn public_key(&self) -> EdPublicKey {
        self.signing_key.verifying_key()
    }

    /// Stellt ein Zertifikat für den Inhaber aus.
    ///
    /// Die Signatur läuft über die kanonische JSON-Form der Nutzdaten,
    /// damit sie aus dem gespeicherten Zertifikat jederzeit nachprüfbar ist.
    pub fn issue(
        &self,
        subject_id: &str,
        subject_public_key: &EdPublicKey,
        validity_days: i64,
    ) -> Result<Certificate, ContractCoreError> {
        let payload = CertificatePayload {
            serial: Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            subject_public_key: bs58::encode(subject_public_key.to_bytes()).into_string(),
            issuer_id: self.ca_id.clone(),
            issued_at: get_current_timestamp(),
            expires_at: get_timestamp_in_days(validity_days),
        };

        let canonical = to_canonical_json(&payload)?;
        let signature = crypto_utils::sign_ed25519(&self.signing_key, canonical.as_bytes());

        Ok(Certificate {
            payload,
            ca_signature: bs58::encode(signature.to_bytes()).into_string(),
        })
    }
}

/// Prüft ein Zertifikat gegen den öffentlichen Schlüssel der erwarteten CA.
///
/// Geprüft werden Aussteller-Signatur und Gültigkeitsfenster; der
/// persistierte Status (widerrufen usw.) ist Sache des Aufrufers.
pub fn verify_certificate(
    certificate: &Certificate,
    ca_public_key: &EdPublicKey,
) -> Result<(), ContractCoreError> {
    let canonical = to_canonical_json(&certificate.payload)?;

    let signature_bytes = bs58::decode(&certificate.ca_signature)
        .into_vec()
        .map_err(|e| CertificateError::Decode(format!("Invalid signature encoding: {}", e)))?;
    let signature_array: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| CertificateError::Decode("Signature must be 64 bytes.".to_string()))?;
    let signature = Signature::from_bytes(&signature_array);

    if !crypto_utils::verify_ed25519(ca_public_key, canonical.as_bytes(), &signature) {
        return Err(CertificateError::UntrustedIssuer.into());
    }

    if is_in_past(&certificate.payload.expires_at) {
        return Err(CertificateError::OutsideValidityWindow.into());
    }

    Ok(())
}

/// Ermittelt den aktuellen Status eines Zertifikats (lazy Ablauf).
///
/// Ein widerrufenes Zertifikat bleibt widerrufen; ein gültiges wird beim
/// Überschreiten des Fensters als abgelaufen gemeldet.
pub fn evaluate_status(certificate: &Certificate, stored: CertificateStatus) -> CertificateStatus {
    match stored {
        CertificateStatus::Revoked => CertificateStatus::Revoked,
        _ if is_in_past(&certificate.payload.expires_at) => CertificateStatus::Expired,
        other => other,
    }
}
