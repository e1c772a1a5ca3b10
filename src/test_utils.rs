//! # src/test_utils.rs
//!
//! Deterministische Akteure und Fixtures für die Integrationstests.
//! Die Schlüsselpaare werden aus festen Seeds abgeleitet, damit Tests
//! reproduzierbar sind und keine langsame Schlüsselerzeugung brauchen.

use ed25519_dalek::{SigningKey, VerifyingKey as EdPublicKey};
use lazy_static::lazy_static;

use crate::models::config::CoreConfig;
use crate::models::identity::{CertificateStatus, IdentityRecord};
use crate::services::certificate::CertificateAuthority;
use crate::services::contract_manager::{self, NewContractData, UploadReceipt};
use crate::services::crypto_utils;
use crate::services::identity_manager;
use crate::services::utils::get_current_timestamp;
use crate::storage::memory_storage::MemoryStorage;
use crate::storage::Storage;

/// Ein Test-Akteur mit festem Schlüsselpaar und fester E-Mail-Adresse.
pub struct TestActor {
    pub name: &'static str,
    pub email: &'static str,
    pub public_key: EdPublicKey,
    pub signing_key: SigningKey,
    pub user_id: String,
}

impl TestActor {
    fn from_seed(name: &'static str, email: &'static str, seed: &str) -> Self {
        let (public_key, signing_key) =
            crypto_utils::generate_ed25519_keypair_for_tests(Some(seed));
        let user_id = crypto_utils::create_user_id(&public_key);
        Self {
            name,
            email,
            public_key,
            signing_key,
            user_id,
        }
    }
}

lazy_static! {
    /// Die Standard-Akteure aller Tests: Uploader, Empfänger und ein
    /// unbeteiligter Dritter.
    pub static ref ACTORS: Actors = Actors {
        uploader: TestActor::from_seed("uploader", "alice@example.com", "test-actor-uploader"),
        recipient: TestActor::from_seed("recipient", "bob@example.com", "test-actor-recipient"),
        outsider: TestActor::from_seed("outsider", "carol@example.com", "test-actor-outsider"),
    };
}

pub struct Actors {
    pub uploader: TestActor,
    pub recipient: TestActor,
    pub outsider: TestActor,
}

/// Eine Test-Konfiguration mit kleinem Größenlimit und Null-Schlüssel
/// für die E-Mail-Verschlüsselung (32 Base58-'1'-Zeichen).
pub fn test_config() -> CoreConfig {
    CoreConfig {
        contract_validity_days: 30,
        certificate_validity_days: 365,
        max_file_size_bytes: 1024 * 1024,
        allowed_extensions: vec![".pdf".to_string(), ".docx".to_string(), ".txt".to_string()],
        email_key: "1".repeat(32),
    }
}

/// Eine deterministische Test-CA.
pub fn test_ca() -> CertificateAuthority {
    let (_, signing_key) = crypto_utils::generate_ed25519_keypair_for_tests(Some("test-ca"));
    CertificateAuthority::new(signing_key)
}

/// Registriert einen Test-Akteur mit seinem festen Schlüsselpaar.
///
/// Umgeht die zufällige Schlüsselerzeugung von `identity_manager::register`,
/// stellt das Zertifikat aber regulär über die CA aus.
pub fn register_actor(
    storage: &mut dyn Storage,
    ca: &CertificateAuthority,
    config: &CoreConfig,
    actor: &TestActor,
) -> IdentityRecord {
    let certificate = ca
        .issue(&actor.user_id, &actor.public_key, config.certificate_validity_days)
        .expect("certificate issuance must succeed for test actors");
    let record = IdentityRecord {
        user_id: actor.user_id.clone(),
        email_enc: identity_manager::encrypt_email(config, actor.email)
            .expect("e-mail encryption must succeed for test actors"),
        email_lookup_hash: identity_manager::email_lookup_hash(actor.email),
        certificate,
        certificate_status: CertificateStatus::Valid,
        created_at: get_current_timestamp(),
    };
    storage
        .save_identity(&record)
        .expect("saving a test identity must succeed");
    record
}

/// Baut die Standard-Testumgebung auf: In-Memory-Speicher, Test-CA und
/// alle drei Akteure registriert.
pub fn setup_environment() -> (MemoryStorage, CertificateAuthority, CoreConfig) {
    let mut storage = MemoryStorage::new();
    let ca = test_ca();
    let config = test_config();
    register_actor(&mut storage, &ca, &config, &ACTORS.uploader);
    register_actor(&mut storage, &ca, &config, &ACTORS.recipient);
    register_actor(&mut storage, &ca, &config, &ACTORS.outsider);
    (storage, ca, config)
}

/// Der Standard-Inhalt des Test-Vertrags.
pub const TEST_DOCUMENT: &[u8] = b"Dienstleistungsvertrag zwischen Alice und Bob, Fassung 1.";

/// Lädt den Standard-Testvertrag vom Uploader an den Empfänger hoch.
pub fn upload_test_contract(storage: &mut dyn Storage, config: &CoreConfig) -> UploadReceipt {
    contract_manager::upload(
        storage,
        config,
        NewContractData {
            title: "Dienstleistungsvertrag".to_string(),
            file_name: "vertrag.pdf".to_string(),
            file_data: TEST_DOCUMENT.to_vec(),
            uploader_id: ACTORS.uploader.user_id.clone(),
            recipient_email: ACTORS.recipient.email.to_string(),
        },
    )
    .expect("uploading the standard test contract must succeed")
}
