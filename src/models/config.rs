//! # src/models/config.rs
//!
//! Die aus TOML geladene Konfiguration der Bibliothek. Alle Werte haben
//! Defaults, die dem Verhalten der Plattform entsprechen.

use serde::{Deserialize, Serialize};

/// Die zentrale Konfiguration der Bibliothek.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CoreConfig {
    /// Gültigkeitsdauer eines Vertrags ab Upload, in Tagen.
    #[serde(default = "default_contract_validity_days")]
    pub contract_validity_days: i64,
    /// Gültigkeitsdauer eines Zertifikats ab Ausstellung, in Tagen.
    #[serde(default = "default_certificate_validity_days")]
    pub certificate_validity_days: i64,
    /// Maximale Dateigröße eines Uploads in Bytes.
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: usize,
    /// Zugelassene Dateiendungen (mit führendem Punkt, lowercase).
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// 32-Byte-Schlüssel für die E-Mail-Verschlüsselung, Base58-kodiert.
    pub email_key: String,
}

fn default_contract_validity_days() -> i64 {
    30
}

fn default_certificate_validity_days() -> i64 {
    365
}

fn default_max_file_size_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    vec![".pdf".to_string(), ".docx".to_string(), ".txt".to_string()]
}

impl CoreConfig {
    /// Dekodiert den konfigurierten E-Mail-Schlüssel in seine 32 Bytes.
    pub fn email_key_bytes(&self) -> Result<[u8; 32], crate::error::ContractCoreError> {
        let bytes = bs58::decode(&self.email_key)
            .into_vec()
            .map_err(|e| crate::error::ContractCoreError::Crypto(format!(
                "E-mail key is not valid Base58: {}",
                e
            )))?;
        bytes.try_into().map_err(|_| {
            crate::error::ContractCoreError::Crypto(
                "E-mail key must decode to exactly 32 bytes.".to_string(),
            )
        })
    }
}
