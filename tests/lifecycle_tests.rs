//! End-to-End-Szenarien über den vollständigen Vertrags-Lebenszyklus,
//! von der Registrierung bis zur verifizierten Log-Kette.

use contract_lib::storage::memory_storage::MemoryStorage;
use contract_lib::test_utils::test_config;
use contract_lib::{
    audit_log, contract_manager, envelope, identity_manager, signing,
    services::certificate::CertificateAuthority, ContractStatus, LogAction, NewContractData,
    Party, Storage,
};

const DOCUMENT: &[u8] = b"Mietvertrag ueber Gewerberaeume, 12 Seiten.";

#[test]
fn happy_path_from_registration_to_verified_chain() {
    let mut storage = MemoryStorage::new();
    let ca = CertificateAuthority::generate();
    let config = test_config();

    // 1. Beide Parteien registrieren sich; die privaten Schlüssel werden
    //    genau einmal herausgegeben.
    let uploader =
        identity_manager::register(&mut storage, &ca, &config, "vermieter@example.com").unwrap();
    let recipient =
        identity_manager::register(&mut storage, &ca, &config, "mieter@example.com").unwrap();
    // Die Clients rekonstruieren ihre Identität aus dem Schlüssel.
    let uploader_identity =
        identity_manager::identity_from_private_key(&uploader.private_key).unwrap();
    let recipient_identity =
        identity_manager::identity_from_private_key(&recipient.private_key).unwrap();
    assert_eq!(uploader_identity.user_id, uploader.record.user_id);
    assert_eq!(recipient_identity.user_id, recipient.record.user_id);
    let uploader_key = &uploader_identity.signing_key;
    let recipient_key = &recipient_identity.signing_key;

    // 2. Der Uploader lädt den Vertrag hoch.
    let receipt = contract_manager::upload(
        &mut storage,
        &config,
        NewContractData {
            title: "Mietvertrag".to_string(),
            file_name: "mietvertrag.pdf".to_string(),
            file_data: DOCUMENT.to_vec(),
            uploader_id: uploader.record.user_id.clone(),
            recipient_email: "mieter@example.com".to_string(),
        },
    )
    .unwrap();
    let id = receipt.contract.contract_id.clone();
    assert_eq!(receipt.contract.status, ContractStatus::Uploaded);

    // 3. Der Empfänger bestätigt den Eingang und sieht den Vertrag ein.
    contract_manager::mark_received(&mut storage, &id, &recipient.record.user_id).unwrap();
    let access = contract_manager::view(&mut storage, &id, &recipient.record.user_id).unwrap();
    let plaintext = envelope::open_envelope(
        &access.ciphertext,
        &access.contract.security,
        Party::Recipient,
        &recipient_identity.public_key,
        recipient_key,
    )
    .unwrap();
    assert_eq!(plaintext, DOCUMENT);

    // 4. Das vierstufige Signaturprotokoll.
    signing::verify_integrity(&mut storage, &id, &recipient.record.user_id).unwrap();
    signing::verify_qr_token(&mut storage, &id, &recipient.record.user_id, &receipt.qr_token)
        .unwrap();
    signing::apply_digital_signature(
        &mut storage,
        &ca.public_key(),
        &id,
        &recipient.record.user_id,
        recipient_key,
    )
    .unwrap();
    let bundle = signing::build_hand_signature_bundle(
        b"unterschrift.png".to_vec(),
        recipient_key,
    );
    let (contract, _) =
        signing::bind_handwritten_signature(&mut storage, &id, &recipient.record.user_id, &bundle)
            .unwrap();
    assert_eq!(contract.status, ContractStatus::Signed);

    // 5. Jetzt darf auch der Empfänger herunterladen und entschlüsseln.
    let access = contract_manager::download(&mut storage, &id, &recipient.record.user_id).unwrap();
    let plaintext = envelope::open_envelope(
        &access.ciphertext,
        &access.contract.security,
        Party::Recipient,
        &recipient_identity.public_key,
        recipient_key,
    )
    .unwrap();
    assert_eq!(plaintext, DOCUMENT);

    // 6. Der Uploader kann ebenfalls weiterhin öffnen.
    let access = contract_manager::download(&mut storage, &id, &uploader.record.user_id).unwrap();
    envelope::open_envelope(
        &access.ciphertext,
        &access.contract.security,
        Party::Uploader,
        &uploader_identity.public_key,
        uploader_key,
    )
    .unwrap();

    // 7. Die Log-Kette ist vollständig und intakt.
    let entries = storage.load_logs(&id).unwrap();
    let actions: Vec<LogAction> = entries.iter().map(|e| e.payload.action).collect();
    assert_eq!(
        actions,
        vec![
            LogAction::Upload,
            LogAction::View,
            LogAction::QrVerified,
            LogAction::HandSign,
            LogAction::Download,
            LogAction::Download,
        ]
    );
    audit_log::verify_entries(&entries).unwrap();
    assert_eq!(audit_log::verify_chain(&storage, &id).unwrap(), entries.len());
}

#[test]
fn rejection_path_leaves_a_consistent_record() {
    let mut storage = MemoryStorage::new();
    let ca = CertificateAuthority::generate();
    let config = test_config();

    let uploader =
        identity_manager::register(&mut storage, &ca, &config, "anbieter@example.com").unwrap();
    let recipient =
        identity_manager::register(&mut storage, &ca, &config, "kunde@example.com").unwrap();

    let receipt = contract_manager::upload(
        &mut storage,
        &config,
        NewContractData {
            title: "Angebot".to_string(),
            file_name: "angebot.docx".to_string(),
            file_data: b"Angebotstext".to_vec(),
            uploader_id: uploader.record.user_id.clone(),
            recipient_email: "kunde@example.com".to_string(),
        },
    )
    .unwrap();
    let id = receipt.contract.contract_id.clone();

    let (contract, log) =
        contract_manager::reject(&mut storage, &id, &recipient.record.user_id).unwrap();
    assert_eq!(contract.status, ContractStatus::Rejected);
    assert!(log.is_written());

    // Kette: upload, reject; verifizierbar.
    let entries = storage.load_logs(&id).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].payload.action, LogAction::Reject);
    audit_log::verify_entries(&entries).unwrap();

    // Der Uploader behält Zugriff auf den abgelehnten Vertrag.
    assert!(contract_manager::download(&mut storage, &id, &uploader.record.user_id).is_ok());
}
