//! # src/services/mod.rs
//!
//! Bündelt die Dienste der Bibliothek und stellt den Konfigurations-Lader
//! bereit.

pub mod audit_log;
pub mod certificate;
pub mod contract_manager;
pub mod crypto_utils;
pub mod envelope;
pub mod identity_manager;
pub mod signing;
pub mod utils;

use crate::error::ContractCoreError;
use crate::models::config::CoreConfig;

/// Lädt die Konfiguration aus einem TOML-String.
pub fn load_config(toml_str: &str) -> Result<CoreConfig, ContractCoreError> {
    let config: CoreConfig = toml::from_str(toml_str)?;
    Ok(config)
}
