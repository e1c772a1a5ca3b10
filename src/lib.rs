//! # contract_core
//!
//! Die Kernlogik einer elektronischen Vertragsplattform. Diese Bibliothek
//! stellt den Vertrags-Lebenszyklus (Zustandsmaschine mit Autorisierungsmatrix),
//! die Umschlagverschlüsselung hochgeladener Dokumente, das Hash-Ketten-Audit-Log
//! und das vierstufige Signaturprotokoll bereit.
//!
//! Die HTTP-Schicht, Sitzungsverwaltung und Datenbanktreiber sind bewusst
//! ausgeklammert: Die Bibliothek wird mit einer bereits authentifizierten
//! Identität und einem `Storage`-Backend aufgerufen und liefert typisierte
//! Ergebnisse zurück.

pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub mod test_utils;

// Re-exportiert die wichtigsten öffentlichen Typen für eine einfachere Nutzung.

// Modelle
pub use models::config::CoreConfig;
pub use models::contract::{
    Contract, ContractStatus, Party, SecurityInfo, SignatureInfo, WrappedKey,
};
pub use models::identity::{
    Certificate, CertificateStatus, IdentityRecord, IssuedIdentity, UserIdentity,
};
pub use models::log::{LogAction, LogEntry};

// Services
pub use services::audit_log::{self, LogWriteOutcome};
pub use services::certificate::CertificateAuthority;
pub use services::contract_manager::{
    self, AccessAction, DeleteOutcome, DocumentAccess, NewContractData, UploadReceipt,
};
pub use services::crypto_utils;
pub use services::envelope;
pub use services::identity_manager;
pub use services::load_config;
pub use services::signing::{self, HandSignatureBundle};
pub use services::utils::{get_current_timestamp, to_canonical_json};

// Fehler
pub use error::{
    AuthorizationError, CertificateError, ContractCoreError, IntegrityError, SigningError,
    ValidationError,
};
pub use storage::{Storage, StorageError};
