//! # src/services/envelope.rs
//!
//! Die Umschlagverschlüsselung für Vertragsdokumente: Das Dokument wird
//! genau einmal mit einem zufälligen Inhaltsschlüssel verschlüsselt; der
//! Schlüssel wird anschließend unabhängig für Uploader und Empfänger
//! umhüllt. Jede Partei kann ihren Umschlag später allein mit dem eigenen
//! privaten Schlüssel öffnen.

use ed25519_dalek::{SigningKey, VerifyingKey as EdPublicKey};
use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::PublicKey as X25519PublicKey;
use zeroize::Zeroize;

use crate::error::{ContractCoreError, IntegrityError};
use crate::models::contract::{Party, SecurityInfo, WrappedKey};
use crate::services::crypto_utils;

/// Domänen-Trenner der KEK-Ableitung.
const ENVELOPE_KEK_INFO: &[u8] = b"contract-envelope-kek";

/// Leitet aus einem X25519-Shared-Secret den Key-Encryption-Key ab.
fn derive_kek(shared_secret: &[u8; 32]) -> Result<[u8; 32], ContractCoreError> {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut kek = [0u8; 32];
    hkdf.expand(ENVELOPE_KEK_INFO, &mut kek)
        .map_err(|_| ContractCoreError::Crypto("HKDF expansion failed.".to_string()))?;
    Ok(kek)
}

/// Umhüllt den Inhaltsschlüssel für genau eine Partei.
///
/// Verwendet ein frisches ephemeres X25519-Paar; der öffentliche Teil wird
/// mitgespeichert, damit die Partei das Shared Secret aus ihrem eigenen
/// Identitätsschlüssel rekonstruieren kann.
fn wrap_key(
    content_key: &[u8; 32],
    party_public_key: &EdPublicKey,
) -> Result<WrappedKey, ContractCoreError> {
    let party_x25519 = crypto_utils::ed25519_pub_to_x25519(party_public_key);
    let (ephemeral_public, ephemeral_secret) = crypto_utils::generate_ephemeral_x25519_keypair();
    let shared_secret = crypto_utils::perform_diffie_hellman(ephemeral_secret, &party_x25519);

    let mut kek = derive_kek(&shared_secret)?;
    let ciphertext = crypto_utils::encrypt_data(&kek, content_key)?;
    kek.zeroize();

    Ok(WrappedKey {
        ephemeral_public_key: bs58::encode(ephemeral_public.as_bytes()).into_string(),
        ciphertext: bs58::encode(ciphertext).into_string(),
    })
}

/// Packt den Inhaltsschlüssel mit dem privaten Schlüssel der Partei aus.
fn unwrap_key(
    wrapped: &WrappedKey,
    party_signing_key: &SigningKey,
) -> Result<[u8; 32], ContractCoreError> {
    let ephemeral_bytes = bs58::decode(&wrapped.ephemeral_public_key)
        .into_vec()
        .map_err(|e| ContractCoreError::Crypto(format!("Invalid ephemeral key encoding: {}", e)))?;
    let ephemeral_array: [u8; 32] = ephemeral_bytes
        .try_into()
        .map_err(|_| ContractCoreError::Crypto("Ephemeral key must be 32 bytes.".to_string()))?;
    let ephemeral_public = X25519PublicKey::from(ephemeral_array);

    let party_x25519_secret = crypto_utils::ed25519_sk_to_x25519_sk(party_signing_key);
    let shared_secret = party_x25519_secret.diffie_hellman(&ephemeral_public).to_bytes();

    let mut kek = derive_kek(&shared_secret)?;
    let ciphertext = bs58::decode(&wrapped.ciphertext)
        .into_vec()
        .map_err(|e| ContractCoreError::Crypto(format!("Invalid wrapped key encoding: {}", e)))?;
    let result = crypto_utils::decrypt_data(&kek, &ciphertext);
    kek.zeroize();

    let mut key_vec = result?;
    let content_key: [u8; 32] = key_vec
        .as_slice()
        .try_into()
        .map_err(|_| ContractCoreError::Crypto("Content key must be 32 bytes.".to_string()))?;
    key_vec.zeroize();
    Ok(content_key)
}

/// Versiegelt ein Dokument in einem Umschlag.
///
/// # Returns
///
/// Das Chiffrat (inklusive Nonce) und die `SecurityInfo` mit dem
/// Referenz-Hash des Chiffrats, beiden umhüllten Schlüsseln und dem
/// Fingerprint des Empfänger-Schlüssels zum Upload-Zeitpunkt.
pub fn seal_envelope(
    plaintext: &[u8],
    uploader_public_key: &EdPublicKey,
    recipient_public_key: &EdPublicKey,
) -> Result<(Vec<u8>, SecurityInfo), ContractCoreError> {
    let mut content_key = crypto_utils::generate_symmetric_key();
    let ciphertext = crypto_utils::encrypt_data(&content_key, plaintext)?;

    let security = SecurityInfo {
        file_hash: crypto_utils::get_hash(&ciphertext),
        wrapped_key_for_uploader: wrap_key(&content_key, uploader_public_key)?,
        wrapped_key_for_recipient: wrap_key(&content_key, recipient_public_key)?,
        recipient_public_key_hash: crypto_utils::get_hash(recipient_public_key.to_bytes()),
    };
    content_key.zeroize();

    Ok((ciphertext, security))
}

/// Öffnet einen Umschlag für eine Partei.
///
/// Fail-closed: Zuerst wird der abgeleitete öffentliche Schlüssel gegen den
/// hinterlegten geprüft (ein Mismatch ist ein `IntegrityError`, kein
/// gewöhnlicher Entschlüsselungsfehler), dann der Chiffrat-Hash gegen den
/// Referenzwert. Erst danach wird ausgepackt und entschlüsselt.
pub fn open_envelope(
    ciphertext: &[u8],
    security: &SecurityInfo,
    party: Party,
    expected_public_key: &EdPublicKey,
    party_signing_key: &SigningKey,
) -> Result<Vec<u8>, ContractCoreError> {
    if crypto_utils::public_key_of(party_signing_key) != *expected_public_key {
        return Err(IntegrityError::KeyPairMismatch.into());
    }

    if party == Party::Recipient {
        let fingerprint = crypto_utils::get_hash(expected_public_key.to_bytes());
        if fingerprint != security.recipient_public_key_hash {
            return Err(IntegrityError::RecipientKeyRotated.into());
        }
    }

    let computed = crypto_utils::get_hash(ciphertext);
    if computed != security.file_hash {
        return Err(IntegrityError::FileHashMismatch {
            expected: security.file_hash.clone(),
            computed,
        }
        .into());
    }

    let wrapped = match party {
        Party::Uploader => &security.wrapped_key_for_uploader,
        Party::Recipient => &security.wrapped_key_for_recipient,
    };
    let mut content_key = unwrap_key(wrapped, party_signing_key)?;
    let plaintext = crypto_utils::decrypt_data(&content_key, ciphertext);
    content_key.zeroize();

    Ok(plaintext?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(seed: &str) -> (EdPublicKey, SigningKey) {
        crypto_utils::generate_ed25519_keypair_for_tests(Some(seed))
    }

    #[test]
    fn both_parties_can_open_independently() {
        let (uploader_pub, uploader_sk) = keypair("env-uploader");
        let (recipient_pub, recipient_sk) = keypair("env-recipient");
        let document = b"Werkvertrag, Fassung 3".to_vec();

        let (ciphertext, security) =
            seal_envelope(&document, &uploader_pub, &recipient_pub).unwrap();
        assert_ne!(ciphertext, document);

        let for_uploader = open_envelope(
            &ciphertext,
            &security,
            Party::Uploader,
            &uploader_pub,
            &uploader_sk,
        )
        .unwrap();
        let for_recipient = open_envelope(
            &ciphertext,
            &security,
            Party::Recipient,
            &recipient_pub,
            &recipient_sk,
        )
        .unwrap();
        assert_eq!(for_uploader, document);
        assert_eq!(for_recipient, document);
    }

    #[test]
    fn wrong_private_key_fails_closed_before_decrypting() {
        let (uploader_pub, _) = keypair("env-uploader-2");
        let (recipient_pub, _) = keypair("env-recipient-2");
        let (_, stranger_sk) = keypair("env-stranger");

        let (ciphertext, security) =
            seal_envelope(b"geheim", &uploader_pub, &recipient_pub).unwrap();

        let result = open_envelope(
            &ciphertext,
            &security,
            Party::Uploader,
            &uploader_pub,
            &stranger_sk,
        );
        assert!(matches!(
            result,
            Err(ContractCoreError::Integrity(IntegrityError::KeyPairMismatch))
        ));
    }

    #[test]
    fn tampered_ciphertext_is_detected_by_hash() {
        let (uploader_pub, uploader_sk) = keypair("env-uploader-3");
        let (recipient_pub, _) = keypair("env-recipient-3");

        let (mut ciphertext, security) =
            seal_envelope(b"Inhalt", &uploader_pub, &recipient_pub).unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;

        let result = open_envelope(
            &ciphertext,
            &security,
            Party::Uploader,
            &uploader_pub,
            &uploader_sk,
        );
        assert!(matches!(
            result,
            Err(ContractCoreError::Integrity(
                IntegrityError::FileHashMismatch { .. }
            ))
        ));
    }

    #[test]
    fn rotated_recipient_key_is_detected() {
        let (uploader_pub, _) = keypair("env-uploader-4");
        let (recipient_pub, _) = keypair("env-recipient-4");
        let (rotated_pub, rotated_sk) = keypair("env-recipient-4-rotated");

        let (ciphertext, security) =
            seal_envelope(b"Inhalt", &uploader_pub, &recipient_pub).unwrap();

        // Schlüsselpaar in sich stimmig, aber nicht das beim Upload erfasste.
        let result = open_envelope(
            &ciphertext,
            &security,
            Party::Recipient,
            &rotated_pub,
            &rotated_sk,
        );
        assert!(matches!(
            result,
            Err(ContractCoreError::Integrity(
                IntegrityError::RecipientKeyRotated
            ))
        ));
    }
}
