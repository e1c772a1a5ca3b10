//! # src/models/contract.rs
//!
//! Definiert die Kern-Datenstrukturen eines Vertragsdokuments: den Vertrag
//! selbst, seine Zustandsmaschine, die Sicherheitsinformationen der
//! Umschlagverschlüsselung und den Signaturblock.

use serde::{Deserialize, Serialize};

/// Der Lebenszyklus-Zustand eines Vertrags.
///
/// Erlaubte Übergänge: `Uploaded → Signed | Rejected | Expired` und
/// `Signed → Expired`. `Rejected` und `Expired` sind terminal (abgesehen
/// davon, dass ein abgelehnter Vertrag noch ablaufen kann, was an den
/// Zugriffsrechten nichts mehr ändert). Der Ablauf wird lazy ausgewertet
/// und gewinnt gegen jede andere Zustandsänderung.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    /// Hochgeladen, wartet auf die Signatur des Empfängers.
    Uploaded,
    /// Vollständig signiert (elektronisch + handschriftlich gebunden).
    Signed,
    /// Vom Empfänger abgelehnt (oder durch Empfänger-Löschung erzwungen).
    Rejected,
    /// Das Ablaufdatum ist überschritten; kein Zugriff mehr für beide Seiten.
    Expired,
}

/// Die Rolle eines Akteurs in Bezug auf einen konkreten Vertrag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Uploader,
    Recipient,
}

/// Ein für genau eine Partei umhüllter Inhaltsschlüssel.
///
/// Die Umhüllung verwendet ein ephemeres X25519-Schlüsselpaar: dessen
/// öffentlicher Teil wird mitgespeichert, damit die Partei den Schlüssel
/// später allein mit ihrem eigenen privaten Schlüssel auspacken kann.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WrappedKey {
    /// Der öffentliche ephemere X25519-Schlüssel (Base58).
    pub ephemeral_public_key: String,
    /// Der umhüllte 32-Byte-Inhaltsschlüssel inklusive Nonce (Base58).
    pub ciphertext: String,
}

/// Die kryptographischen Sicherheitsinformationen eines Vertrags.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SecurityInfo {
    /// SHA-256-Hex-Hash des Chiffrats, festgehalten beim Upload.
    /// Referenzwert für alle späteren Integritätsprüfungen.
    pub file_hash: String,
    /// Der für den Uploader umhüllte Inhaltsschlüssel.
    pub wrapped_key_for_uploader: WrappedKey,
    /// Der für den Empfänger umhüllte Inhaltsschlüssel.
    pub wrapped_key_for_recipient: WrappedKey,
    /// SHA-256-Hex-Fingerprint des öffentlichen Empfänger-Schlüssels zum
    /// Upload-Zeitpunkt. Erkennt Schlüsselrotation vor dem Auspacken.
    pub recipient_public_key_hash: String,
}

/// Der Signaturblock eines Vertrags. Vor Schritt 3 des Protokolls sind alle
/// optionalen Felder leer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SignatureInfo {
    /// `true`, sobald die elektronische Signatur (Schritt 3) vorliegt.
    /// Der Vertragsstatus bleibt dabei unverändert `uploaded`.
    pub signed: bool,
    /// Die User-ID des Signierenden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    /// Das zum Signaturzeitpunkt gültige Zertifikat (kanonisches JSON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    /// Die elektronische Signatur über den `file_hash` (Base58).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Das handschriftliche Unterschriftenbild (Rohbytes, Base58).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_image: Option<String>,
    /// SHA-256-Hex-Hash des handschriftlichen Unterschriftenbilds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_image_hash: Option<String>,
    /// Signatur über den Bild-Hash mit demselben Schlüssel (Base58).
    /// Bindet die Handschrift kryptographisch an die Identität.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_image_hash_signature: Option<String>,
    /// Zeitstempel des Abschlusses von Schritt 4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<String>,
}

/// Ein Vertragsdokument mit allen Metadaten. Der Dateiinhalt selbst liegt
/// als Chiffrat unter `file_path` im Blob-Speicher.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Contract {
    /// Die eindeutige Vertrags-ID (UUID v4).
    pub contract_id: String,
    /// Der Anzeigetitel des Vertrags.
    pub title: String,
    /// Die User-ID des Uploaders.
    pub uploader_id: String,
    /// Die User-ID des Empfängers.
    pub recipient_id: String,
    /// Die E-Mail-Adresse des Uploaders, verschlüsselt abgelegt (Base58).
    pub uploader_email_enc: String,
    /// Die E-Mail-Adresse des Empfängers, verschlüsselt abgelegt (Base58).
    pub recipient_email_enc: String,
    /// Der ursprüngliche Dateiname (z.B. "vertrag.pdf").
    pub file_name: String,
    /// Der Blob-Name des Chiffrats im Speicher (UUID + Endung).
    pub file_path: String,
    /// Der aktuelle Lebenszyklus-Zustand.
    pub status: ContractStatus,
    /// Zeitstempel des Uploads.
    pub created_at: String,
    /// Ablaufdatum; danach ist der Vertrag für beide Seiten gesperrt.
    pub expiration_date: String,
    /// `true`, sobald der Empfänger den Eingang bestätigt hat.
    pub received: bool,
    /// User-IDs der Parteien, die den Vertrag aus ihrer Sicht gelöscht
    /// haben (Soft-Delete). Haben beide gelöscht, wird hart gelöscht.
    pub deleted_by: Vec<String>,
    /// Das beim Upload erzeugte QR-Token (Besitznachweis in Schritt 2).
    pub qr_token: String,
    /// Die Sicherheitsinformationen der Umschlagverschlüsselung.
    pub security: SecurityInfo,
    /// Der Signaturblock.
    pub signature: SignatureInfo,
}

impl Contract {
    /// Ermittelt die Rolle des Akteurs in diesem Vertrag, falls er Partei ist.
    pub fn party_of(&self, user_id: &str) -> Option<Party> {
        if user_id == self.uploader_id {
            Some(Party::Uploader)
        } else if user_id == self.recipient_id {
            Some(Party::Recipient)
        } else {
            None
        }
    }

    /// Prüft, ob die Partei den Vertrag aus ihrer Sicht gelöscht hat.
    pub fn is_deleted_for(&self, user_id: &str) -> bool {
        self.deleted_by.iter().any(|id| id == user_id)
    }
}
