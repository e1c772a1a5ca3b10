//! # src/error.rs
//!
//! Definiert den zentralen Fehlertyp für die gesamte contract_core-Bibliothek
//! sowie die modul-spezifischen Unterfehler. Verwendet `thiserror` zur
//! automatischen Konvertierung der untergeordneten Fehlertypen.

use thiserror::Error;

use crate::models::contract::ContractStatus;
use crate::models::identity::CertificateStatus;
use crate::services::crypto_utils::{GetPubkeyError, SymmetricEncryptionError};
use crate::storage::StorageError;

/// Der zentrale Fehlertyp für alle Operationen in der `contract_core`-Bibliothek.
///
/// Die fünf Fehlerklassen des Systems (Validierung, Autorisierung, Integrität,
/// Zustandskonflikt, Speicher) sind hier als eigene Varianten abgebildet, damit
/// die aufrufende Schicht sie auf unterschiedliche Antworten abbilden kann.
#[derive(Error, Debug)]
pub enum ContractCoreError {
    /// Fehlgeschlagene Eingabe-Validierung: ungültige ID, fehlendes Feld,
    /// unzulässige Datei. Wird ohne Seiteneffekte zurückgewiesen.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Der Akteur ist für die angeforderte Aktion im aktuellen Zustand
    /// nicht berechtigt.
    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    /// Eine Integritätsverletzung: Hash-Abweichung, gebrochene Log-Kette
    /// oder nicht zusammenpassendes Schlüsselpaar. Muss der aufrufenden
    /// Schicht als Manipulationswarnung unterscheidbar sein.
    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Die angeforderte Zustandsänderung ist für den aktuellen Status nicht
    /// erlaubt. Der aktuelle Status wird mitgeliefert, damit der Aufrufer
    /// die Ablehnung erklären kann.
    #[error("State conflict: action not allowed while contract status is {current:?}.")]
    StateConflict { current: ContractStatus },

    /// Ein Fehler im Signaturprotokoll (QR-Abgleich, fehlende Vorstufe,
    /// ungültiges Signaturbündel).
    #[error("Signing protocol error: {0}")]
    Signing(#[from] SigningError),

    /// Ein Fehler rund um Zertifikate (Ausstellung, Prüfung, Status).
    #[error("Certificate error: {0}")]
    Certificate(#[from] CertificateError),

    /// Ein Fehler einer Speicheroperation. Für den Aufrufer wiederholbar;
    /// niemals stillschweigend als Erfolg gewertet.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Ein Fehler bei der symmetrischen Ver- oder Entschlüsselung.
    #[error("Symmetric encryption error: {0}")]
    SymmetricEncryption(#[from] SymmetricEncryptionError),

    /// Ein Fehler bei der Verarbeitung einer User-ID oder eines Public Keys.
    #[error("User ID or key error: {0}")]
    KeyOrId(#[from] GetPubkeyError),

    /// Ein Fehler bei der Verarbeitung von JSON.
    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ein Fehler bei der Deserialisierung von TOML (Konfiguration).
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Ein allgemeiner kryptographischer Fehler, der nicht von anderen
    /// Typen abgedeckt wird.
    #[error("Cryptography error: {0}")]
    Crypto(String),

    /// Der angeforderte Vertrag wurde nicht gefunden (oder ist für den
    /// Akteur durch Soft-Delete unsichtbar).
    #[error("Contract '{0}' not found.")]
    ContractNotFound(String),

    /// Die angeforderte Identität wurde nicht gefunden.
    #[error("Identity '{0}' not found.")]
    IdentityNotFound(String),
}

/// Fehler der Eingabe-Validierung. Werden vor jedem Seiteneffekt geprüft.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Die übergebene Vertrags- oder Nutzer-ID ist leer oder missgebildet.
    #[error("Malformed identifier: {0}")]
    MalformedId(String),

    /// Ein Pflichtfeld fehlt im Aufruf.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Die E-Mail-Adresse entspricht nicht dem erwarteten Format.
    #[error("Invalid e-mail address format: {0}")]
    InvalidEmailFormat(String),

    /// Die Dateiendung ist nicht zugelassen.
    #[error("File extension '{0}' is not allowed.")]
    ExtensionNotAllowed(String),

    /// Die Datei überschreitet die konfigurierte Maximalgröße.
    #[error("File of {size} bytes exceeds the maximum of {max} bytes.")]
    FileTooLarge { size: usize, max: usize },

    /// Sender und Empfänger sind dieselbe Identität.
    #[error("A contract cannot be sent to the uploader's own address.")]
    SelfAddressedContract,

    /// Der angegebene Empfänger ist nicht registriert.
    #[error("Recipient e-mail is not registered.")]
    UnknownRecipient,
}

/// Fehler der Autorisierungsmatrix (§ Zustandsmaschine).
#[derive(Error, Debug, PartialEq)]
pub enum AuthorizationError {
    /// Der Akteur ist weder Uploader noch Empfänger des Vertrags.
    #[error("Actor '{0}' is not a party to this contract.")]
    NotAParty(String),

    /// Der Vertrag ist abgelaufen; kein Zugriff mehr für beide Parteien.
    #[error("Contract has expired; access is denied for all parties.")]
    ContractExpired,

    /// Der Vertrag wurde abgelehnt; der Empfänger hat keinen Inhalt-Zugriff mehr.
    #[error("Contract was rejected; recipient access to its content is revoked.")]
    ContractRejected,

    /// Der Empfänger darf erst nach vollständiger Signatur herunterladen.
    #[error("Recipient may download only after the contract is fully signed.")]
    DownloadBeforeSigning,

    /// Nur der Empfänger (oder eine administrative Aktion) darf ablehnen.
    #[error("Only the recipient may reject a contract.")]
    RejectReservedToRecipient,
}

/// Integritätsfehler. Diese Klasse signalisiert mögliche Manipulation und
/// wird in Logs getrennt von gewöhnlichen Entschlüsselungsfehlern geführt.
#[derive(Error, Debug, PartialEq)]
pub enum IntegrityError {
    /// Der Hash des gespeicherten Chiffrats weicht vom Wert zum
    /// Upload-Zeitpunkt ab.
    #[error("Ciphertext hash mismatch: expected {expected}, computed {computed}.")]
    FileHashMismatch { expected: String, computed: String },

    /// Die Hash-Kette des Audit-Logs ist an einem Eintrag gebrochen.
    #[error("Audit log chain is broken at entry index {index}.")]
    ChainBroken { index: usize },

    /// Der gelieferte private Schlüssel gehört nicht zum hinterlegten
    /// öffentlichen Schlüssel. Bewusst unterscheidbar vom generischen
    /// Entschlüsselungsfehler.
    #[error("Supplied private key does not pair with the public key on record.")]
    KeyPairMismatch,

    /// Der Fingerprint des Empfänger-Schlüssels weicht vom beim Upload
    /// festgehaltenen Wert ab (Schlüsselrotation oder falscher Schlüssel).
    #[error("Recipient public key fingerprint does not match the one captured at upload.")]
    RecipientKeyRotated,

    /// Eine digitale Signatur konnte nicht verifiziert werden.
    #[error("Signature verification failed for {context}.")]
    SignatureInvalid { context: &'static str },
}

/// Fehler des vierstufigen Signaturprotokolls.
#[derive(Error, Debug, PartialEq)]
pub enum SigningError {
    /// Das vorgelegte QR-Token stimmt nicht mit dem beim Upload erzeugten
    /// Token überein. Wiederholbar; ohne Seiteneffekte.
    #[error("QR token does not match the contract's possession proof.")]
    QrTokenMismatch,

    /// Schritt 4 wurde aufgerufen, bevor die elektronische Signatur
    /// (Schritt 3) vorliegt.
    #[error("Handwritten binding requires a completed digital signature step.")]
    DigitalSignatureMissing,

    /// Der mitgelieferte Hash des Unterschriftenbilds passt nicht zum Bild.
    #[error("Handwritten image hash does not match the submitted image.")]
    ImageHashMismatch,

    /// Das Signaturbündel ist unvollständig (alle Felder sind Pflicht).
    #[error("Hand signature bundle is missing the field '{0}'.")]
    IncompleteBundle(&'static str),
}

/// Fehler rund um Zertifikate und die Zertifizierungsstelle.
#[derive(Error, Debug, PartialEq)]
pub enum CertificateError {
    /// Das Zertifikat wurde nicht von der erwarteten CA signiert.
    #[error("Certificate was not issued by the trusted certificate authority.")]
    UntrustedIssuer,

    /// Das Zertifikat ist außerhalb seines Gültigkeitsfensters.
    #[error("Certificate is outside its validity window.")]
    OutsideValidityWindow,

    /// Der Zertifikatsstatus erlaubt die Aktion nicht (abgelaufen/widerrufen).
    #[error("Certificate status {0:?} does not permit signing; re-registration is required.")]
    StatusNotValid(CertificateStatus),

    /// Das Zertifikat konnte nicht dekodiert werden.
    #[error("Certificate could not be decoded: {0}")]
    Decode(String),
}
