//! # src/models/log.rs
//!
//! Definiert die Einträge des Hash-Ketten-Audit-Logs. Jeder Vertrag besitzt
//! seine eigene, unabhängige Kette; der `previous_hash` des ersten Eintrags
//! ist der leere String.

use serde::{Deserialize, Serialize};

/// Die auditierten Aktionen. Ein geschlossenes Enum statt freier Strings,
/// damit an der Vertrauensgrenze keine untypisierten Werte entstehen.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAction {
    #[serde(rename = "upload")]
    Upload,
    #[serde(rename = "view")]
    View,
    #[serde(rename = "download")]
    Download,
    #[serde(rename = "reject")]
    Reject,
    #[serde(rename = "hand-sign")]
    HandSign,
    #[serde(rename = "qr_verified")]
    QrVerified,
}

/// Die Nutzdaten eines Log-Eintrags, über die sein Hash gebildet wird.
///
/// Der Hash wird über die kanonische JSON-Form (RFC 8785) dieser Struktur
/// berechnet, damit er aus den gespeicherten Daten jederzeit nachgerechnet
/// werden kann.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogPayload {
    /// Die ID des betroffenen Vertrags.
    pub contract_id: String,
    /// Die auditierte Aktion.
    pub action: LogAction,
    /// Der Blob-Name des Chiffrats zum Zeitpunkt der Aktion.
    pub file_path: String,
    /// Der ursprüngliche Dateiname.
    pub file_name: String,
    /// Der SHA-256-Hex-Hash des Chiffrats zum Zeitpunkt der Aktion.
    pub file_hash: String,
    /// Der Hash des unmittelbar vorangehenden Eintrags derselben Kette,
    /// oder der leere String für den ersten Eintrag.
    pub previous_hash: String,
    /// Zeitstempel der Aktion.
    pub timestamp: String,
}

/// Ein vollständiger, gespeicherter Eintrag des Audit-Logs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Die Nutzdaten des Eintrags.
    #[serde(flatten)]
    pub payload: LogPayload,
    /// SHA-256-Hex-Hash der kanonischen JSON-Form von `payload`.
    pub hash: String,
}
