//! # src/models/identity.rs
//!
//! Definiert die Datenstrukturen rund um Identitäten und Zertifikate:
//! die transiente kryptographische Identität im Speicher, den persistierten
//! Identitätsdatensatz und das von der Zertifizierungsstelle signierte
//! Zertifikat.

use ed25519_dalek::{SigningKey, VerifyingKey as EdPublicKey};
use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

/// Repräsentiert die kryptographische Identität eines Nutzers im Speicher.
/// Der private Schlüssel wird beim Verlassen des Gültigkeitsbereichs genullt.
#[derive(ZeroizeOnDrop)]
pub struct UserIdentity {
    /// Der private Ed25519-Schlüssel des Nutzers.
    /// **Wichtig:** Dieser Schlüssel wird nicht serialisiert und niemals
    /// serverseitig persistiert.
    #[zeroize]
    pub signing_key: SigningKey,
    /// Der öffentliche Ed25519-Schlüssel, abgeleitet vom privaten Schlüssel.
    #[zeroize(skip)]
    pub public_key: EdPublicKey,
    /// Die öffentliche, teilbare User-ID, generiert aus dem Public Key.
    #[zeroize(skip)]
    pub user_id: String,
}

/// Der Gültigkeitsstatus eines Zertifikats.
///
/// `Expired` wird lazy ermittelt: erst wenn eine Signatur angefordert wird,
/// wird das Gültigkeitsfenster geprüft und der Status ggf. fortgeschrieben.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    /// Innerhalb des Gültigkeitsfensters, nicht widerrufen.
    Valid,
    /// Das Gültigkeitsfenster ist überschritten; Neu-Registrierung nötig.
    Expired,
    /// Widerrufen (z.B. bei Deaktivierung der Identität).
    Revoked,
}

/// Die Nutzdaten eines Zertifikats, über deren kanonische JSON-Form die
/// Zertifizierungsstelle signiert.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CertificatePayload {
    /// Die Seriennummer des Zertifikats (UUID v4).
    pub serial: String,
    /// Die User-ID des Zertifikatsinhabers.
    pub subject_id: String,
    /// Der öffentliche Ed25519-Schlüssel des Inhabers (Base58).
    pub subject_public_key: String,
    /// Die User-ID der ausstellenden Zertifizierungsstelle.
    pub issuer_id: String,
    /// Beginn des Gültigkeitsfensters.
    pub issued_at: String,
    /// Ende des Gültigkeitsfensters.
    pub expires_at: String,
}

/// Ein von der Zertifizierungsstelle ausgestelltes Zertifikat: die
/// Nutzdaten plus die abgetrennte Ed25519-Signatur der CA.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Certificate {
    /// Die signierten Nutzdaten.
    #[serde(flatten)]
    pub payload: CertificatePayload,
    /// Ed25519-Signatur der CA über die kanonische JSON-Form der
    /// Nutzdaten (Base58).
    pub ca_signature: String,
}

/// Der persistierte Datensatz einer registrierten Identität.
/// Enthält ausschließlich öffentliches Material; der private Schlüssel
/// wird nie gespeichert.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IdentityRecord {
    /// Die öffentliche User-ID (did:key, kodiert den Public Key).
    pub user_id: String,
    /// Die E-Mail-Adresse, verschlüsselt abgelegt (Base58).
    pub email_enc: String,
    /// Deterministischer SHA-256-Hex-Hash der normalisierten E-Mail.
    /// Ermöglicht die Empfänger-Suche ohne Entschlüsselung aller Datensätze.
    pub email_lookup_hash: String,
    /// Das aktuell gültige Zertifikat der Identität.
    pub certificate: Certificate,
    /// Der zuletzt ermittelte Zertifikatsstatus.
    pub certificate_status: CertificateStatus,
    /// Zeitstempel der Registrierung.
    pub created_at: String,
}

/// Das Ergebnis einer Registrierung. Der private Schlüssel verlässt die
/// Bibliothek hier genau einmal und wird nirgends sonst aufbewahrt.
pub struct IssuedIdentity {
    /// Der persistierte (öffentliche) Identitätsdatensatz.
    pub record: IdentityRecord,
    /// Der private Ed25519-Schlüssel des Inhabers (Base58).
    pub private_key: String,
}
