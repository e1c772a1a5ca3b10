//! Persistenz-Tests des dateibasierten Speichers: Alle Daten überleben
//! das Neuöffnen des Verzeichnisses, und der volle Lebenszyklus läuft
//! auch über `FileStorage`.

use contract_lib::storage::file_storage::FileStorage;
use contract_lib::test_utils::{register_actor, test_ca, test_config, upload_test_contract, ACTORS};
use contract_lib::{
    audit_log, contract_manager, signing, ContractStatus, Storage, StorageError,
};
use tempfile::tempdir;

#[test]
fn contracts_identities_logs_and_blobs_survive_reopening() {
    let dir = tempdir().unwrap();
    let ca = test_ca();
    let config = test_config();

    let contract_id;
    let blob_name;
    {
        let mut storage = FileStorage::new(dir.path()).unwrap();
        register_actor(&mut storage, &ca, &config, &ACTORS.uploader);
        register_actor(&mut storage, &ca, &config, &ACTORS.recipient);

        let receipt = upload_test_contract(&mut storage, &config);
        contract_id = receipt.contract.contract_id.clone();
        blob_name = receipt.contract.file_path.clone();
        contract_manager::view(&mut storage, &contract_id, &ACTORS.uploader.user_id).unwrap();
    }

    // Neu öffnen: Alles ist wieder da.
    let storage = FileStorage::new(dir.path()).unwrap();
    let contract = storage.load_contract(&contract_id).unwrap();
    assert_eq!(contract.status, ContractStatus::Uploaded);
    assert!(storage.load_identity(&ACTORS.uploader.user_id).is_ok());
    assert!(!storage.load_blob(&blob_name).unwrap().is_empty());

    let entries = storage.load_logs(&contract_id).unwrap();
    assert_eq!(entries.len(), 2);
    audit_log::verify_entries(&entries).unwrap();
    assert_eq!(
        storage.latest_log(&contract_id).unwrap().unwrap().hash,
        entries[1].hash
    );
}

#[test]
fn full_signing_flow_works_on_file_storage() {
    let dir = tempdir().unwrap();
    let ca = test_ca();
    let config = test_config();
    let mut storage = FileStorage::new(dir.path()).unwrap();
    register_actor(&mut storage, &ca, &config, &ACTORS.uploader);
    register_actor(&mut storage, &ca, &config, &ACTORS.recipient);

    let receipt = upload_test_contract(&mut storage, &config);
    let id = receipt.contract.contract_id.clone();

    signing::verify_integrity(&mut storage, &id, &ACTORS.recipient.user_id).unwrap();
    signing::verify_qr_token(&mut storage, &id, &ACTORS.recipient.user_id, &receipt.qr_token)
        .unwrap();
    signing::apply_digital_signature(
        &mut storage,
        &ca.public_key(),
        &id,
        &ACTORS.recipient.user_id,
        &ACTORS.recipient.signing_key,
    )
    .unwrap();
    let bundle = signing::build_hand_signature_bundle(
        b"unterschrift".to_vec(),
        &ACTORS.recipient.signing_key,
    );
    signing::bind_handwritten_signature(&mut storage, &id, &ACTORS.recipient.user_id, &bundle)
        .unwrap();

    // Neu öffnen und Zustand prüfen.
    let storage = FileStorage::new(dir.path()).unwrap();
    let contract = storage.load_contract(&id).unwrap();
    assert_eq!(contract.status, ContractStatus::Signed);
    assert!(contract.signature.signed);
    assert!(audit_log::verify_chain(&storage, &id).is_ok());
}

#[test]
fn hard_delete_removes_files_but_keeps_the_chain() {
    let dir = tempdir().unwrap();
    let ca = test_ca();
    let config = test_config();
    let mut storage = FileStorage::new(dir.path()).unwrap();
    register_actor(&mut storage, &ca, &config, &ACTORS.uploader);
    register_actor(&mut storage, &ca, &config, &ACTORS.recipient);

    let receipt = upload_test_contract(&mut storage, &config);
    let id = receipt.contract.contract_id.clone();
    let blob_name = receipt.contract.file_path.clone();

    contract_manager::soft_delete(&mut storage, &id, &ACTORS.uploader.user_id).unwrap();
    contract_manager::soft_delete(&mut storage, &id, &ACTORS.recipient.user_id).unwrap();

    assert!(matches!(
        storage.load_contract(&id),
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        storage.load_blob(&blob_name),
        Err(StorageError::NotFound)
    ));
    assert!(!storage.load_logs(&id).unwrap().is_empty());
}

#[test]
fn missing_data_is_reported_as_not_found() {
    let dir = tempdir().unwrap();
    let storage = FileStorage::new(dir.path()).unwrap();
    assert!(matches!(
        storage.load_contract("gibt-es-nicht"),
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        storage.load_identity("did:key:zNiemand"),
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        storage.load_blob("kein-blob"),
        Err(StorageError::NotFound)
    ));
    assert!(storage.load_logs("ohne-kette").unwrap().is_empty());
}
