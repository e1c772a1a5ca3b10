//! Integrationstests des Hash-Ketten-Audit-Logs: Verkettung über die
//! realen Operationen, Manipulationserkennung und Best-Effort-Verhalten.

use contract_lib::test_utils::{setup_environment, upload_test_contract, ACTORS};
use contract_lib::{
    audit_log, contract_manager, ContractCoreError, IntegrityError, LogAction, LogWriteOutcome,
    Storage,
};

#[test]
fn operations_append_a_linked_chain() {
    let (mut storage, _ca, config) = setup_environment();
    let receipt = upload_test_contract(&mut storage, &config);
    let contract_id = receipt.contract.contract_id.clone();
    assert!(receipt.log.is_written());

    contract_manager::view(&mut storage, &contract_id, &ACTORS.recipient.user_id).unwrap();
    contract_manager::view(&mut storage, &contract_id, &ACTORS.uploader.user_id).unwrap();

    let entries = storage.load_logs(&contract_id).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].payload.action, LogAction::Upload);
    assert_eq!(entries[1].payload.action, LogAction::View);
    assert_eq!(entries[2].payload.action, LogAction::View);

    // Verkettung: erster Eintrag auf "", danach jeweils auf den Vorgänger.
    assert_eq!(entries[0].payload.previous_hash, "");
    assert_eq!(entries[1].payload.previous_hash, entries[0].hash);
    assert_eq!(entries[2].payload.previous_hash, entries[1].hash);

    assert_eq!(audit_log::verify_chain(&storage, &contract_id).unwrap(), 3);
}

#[test]
fn chains_of_different_contracts_are_independent() {
    let (mut storage, _ca, config) = setup_environment();
    let first = upload_test_contract(&mut storage, &config);
    let second = upload_test_contract(&mut storage, &config);

    let first_entries = storage.load_logs(&first.contract.contract_id).unwrap();
    let second_entries = storage.load_logs(&second.contract.contract_id).unwrap();
    assert_eq!(first_entries.len(), 1);
    assert_eq!(second_entries.len(), 1);
    assert_eq!(first_entries[0].payload.previous_hash, "");
    assert_eq!(second_entries[0].payload.previous_hash, "");
}

#[test]
fn tampered_stored_entry_is_detected() {
    let (mut storage, _ca, config) = setup_environment();
    let receipt = upload_test_contract(&mut storage, &config);
    let contract_id = receipt.contract.contract_id.clone();
    contract_manager::view(&mut storage, &contract_id, &ACTORS.uploader.user_id).unwrap();

    let mut entries = storage.load_logs(&contract_id).unwrap();
    entries[1].payload.file_hash = "0".repeat(64);
    let result = audit_log::verify_entries(&entries);
    assert!(matches!(
        result,
        Err(ContractCoreError::Integrity(IntegrityError::ChainBroken {
            index: 1
        }))
    ));
}

#[test]
fn removed_middle_entry_breaks_the_chain() {
    let (mut storage, _ca, config) = setup_environment();
    let receipt = upload_test_contract(&mut storage, &config);
    let contract_id = receipt.contract.contract_id.clone();
    contract_manager::view(&mut storage, &contract_id, &ACTORS.uploader.user_id).unwrap();
    contract_manager::view(&mut storage, &contract_id, &ACTORS.recipient.user_id).unwrap();

    let mut entries = storage.load_logs(&contract_id).unwrap();
    entries.remove(1);
    assert!(audit_log::verify_entries(&entries).is_err());
}

#[test]
fn primary_action_survives_failed_log_append() {
    let (mut storage, _ca, config) = setup_environment();
    storage.fail_log_appends = true;

    let receipt = upload_test_contract(&mut storage, &config);
    assert!(matches!(receipt.log, LogWriteOutcome::Failed(_)));

    // Der Vertrag selbst wurde trotzdem gespeichert.
    storage.fail_log_appends = false;
    let contract = contract_manager::get_for_user(
        &mut storage,
        &receipt.contract.contract_id,
        &ACTORS.uploader.user_id,
    )
    .unwrap();
    assert_eq!(contract.contract_id, receipt.contract.contract_id);
    assert!(storage
        .load_logs(&receipt.contract.contract_id)
        .unwrap()
        .is_empty());
}

#[test]
fn integrity_stop_prevents_view_and_writes_no_entry() {
    let (mut storage, _ca, config) = setup_environment();
    let receipt = upload_test_contract(&mut storage, &config);
    let contract_id = receipt.contract.contract_id.clone();

    // Blob manipulieren: Die Einsicht muss hart stoppen, bevor ein
    // view-Eintrag entsteht.
    let mut blob = storage.load_blob(&receipt.contract.file_path).unwrap();
    blob[0] ^= 0xff;
    storage.save_blob(&receipt.contract.file_path, &blob).unwrap();

    let result = contract_manager::view(&mut storage, &contract_id, &ACTORS.uploader.user_id);
    assert!(matches!(
        result,
        Err(ContractCoreError::Integrity(
            IntegrityError::FileHashMismatch { .. }
        ))
    ));
    assert_eq!(storage.load_logs(&contract_id).unwrap().len(), 1);
}
