//! Integrationstests der Umschlagverschlüsselung über den vollen
//! Upload-Pfad: versiegeln beim Upload, öffnen über die Zugriffs-Pfade.

use contract_lib::test_utils::{setup_environment, upload_test_contract, ACTORS, TEST_DOCUMENT};
use contract_lib::{contract_manager, envelope, ContractCoreError, IntegrityError, Party};

#[test]
fn uploader_and_recipient_decrypt_the_same_document() {
    let (mut storage, _ca, config) = setup_environment();
    let receipt = upload_test_contract(&mut storage, &config);
    let contract_id = receipt.contract.contract_id.clone();

    // Der Uploader öffnet seinen Umschlag über die Einsicht.
    let access =
        contract_manager::view(&mut storage, &contract_id, &ACTORS.uploader.user_id).unwrap();
    assert_eq!(access.party, Party::Uploader);
    let plaintext = envelope::open_envelope(
        &access.ciphertext,
        &access.contract.security,
        Party::Uploader,
        &ACTORS.uploader.public_key,
        &ACTORS.uploader.signing_key,
    )
    .unwrap();
    assert_eq!(plaintext, TEST_DOCUMENT);

    // Der Empfänger darf vor der Signatur einsehen und öffnet unabhängig.
    let access =
        contract_manager::view(&mut storage, &contract_id, &ACTORS.recipient.user_id).unwrap();
    let plaintext = envelope::open_envelope(
        &access.ciphertext,
        &access.contract.security,
        Party::Recipient,
        &ACTORS.recipient.public_key,
        &ACTORS.recipient.signing_key,
    )
    .unwrap();
    assert_eq!(plaintext, TEST_DOCUMENT);
}

#[test]
fn ciphertext_differs_from_plaintext_and_hash_is_recorded() {
    let (mut storage, _ca, config) = setup_environment();
    let receipt = upload_test_contract(&mut storage, &config);

    let access = contract_manager::view(
        &mut storage,
        &receipt.contract.contract_id,
        &ACTORS.uploader.user_id,
    )
    .unwrap();
    assert_ne!(access.ciphertext.as_slice(), TEST_DOCUMENT);
    assert!(!access.contract.security.file_hash.is_empty());
    assert_eq!(
        access.contract.security.file_hash.len(),
        64,
        "SHA-256 Hex hat 64 Zeichen"
    );
}

#[test]
fn foreign_private_key_fails_closed() {
    let (mut storage, _ca, config) = setup_environment();
    let receipt = upload_test_contract(&mut storage, &config);

    let access = contract_manager::view(
        &mut storage,
        &receipt.contract.contract_id,
        &ACTORS.recipient.user_id,
    )
    .unwrap();

    // Der Außenstehende liefert zwar den richtigen Public Key der
    // Gegenseite, aber seinen eigenen privaten Schlüssel.
    let result = envelope::open_envelope(
        &access.ciphertext,
        &access.contract.security,
        Party::Recipient,
        &ACTORS.recipient.public_key,
        &ACTORS.outsider.signing_key,
    );
    assert!(matches!(
        result,
        Err(ContractCoreError::Integrity(IntegrityError::KeyPairMismatch))
    ));
}

#[test]
fn each_upload_uses_a_fresh_content_key() {
    let (mut storage, _ca, config) = setup_environment();
    let first = upload_test_contract(&mut storage, &config);
    let second = upload_test_contract(&mut storage, &config);

    // Gleicher Klartext, aber unterschiedliche Inhaltsschlüssel und Nonces.
    assert_ne!(
        first.contract.security.file_hash,
        second.contract.security.file_hash
    );
    assert_ne!(
        first.contract.security.wrapped_key_for_recipient,
        second.contract.security.wrapped_key_for_recipient
    );
}
