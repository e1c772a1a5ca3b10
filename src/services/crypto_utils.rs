//! # src/services/crypto_utils.rs
//!
//! Der Adapter für alle kryptographischen Primitiven der Bibliothek.
//! Alle Funktionen sind zustandslos; kein Schlüssel wird hier gespeichert.

// Zufallszahlengenerierung
use rand_core::{OsRng, RngCore};

// Kryptografische Hashes (SHA-2)
use sha2::{Digest, Sha256, Sha512};

// Symmetrische Verschlüsselung
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit},
    ChaCha20Poly1305, Nonce,
};

// Ed25519 Signaturen
use ed25519_dalek::{
    Signature, SignatureError, Signer, SigningKey, Verifier, VerifyingKey as EdPublicKey,
};

// X25519 Schlüsselvereinbarung
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};

// Standard Bibliothek
use std::convert::TryInto;

/// Computes a SHA-256 hash of the input and returns it as a lowercase hex string.
///
/// This is the single digest used everywhere in the library: ciphertext
/// hashes, audit log chaining, handwritten signature image hashes and
/// e-mail lookup hashes.
pub fn get_hash(input: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_ref());
    let hash_bytes = hasher.finalize();
    hex_encode(&hash_bytes)
}

/// Kodiert Bytes als Lowercase-Hex-String.
fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // In einen String schreiben kann nicht fehlschlagen.
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Erzeugt ein frisches, zufälliges Ed25519-Schlüsselpaar.
///
/// Wird bei der Registrierung einer Identität verwendet; der private
/// Schlüssel verlässt die Bibliothek genau einmal über `IssuedIdentity`.
pub fn generate_ed25519_keypair() -> (EdPublicKey, SigningKey) {
    let mut csprng = OsRng;
    let mut key_bytes = [0u8; 32];
    csprng.fill_bytes(&mut key_bytes);

    let signing_key = SigningKey::from_bytes(&key_bytes);
    (signing_key.verifying_key(), signing_key)
}

/// Erzeugt ein zufälliges oder deterministisches Ed25519-Schlüsselpaar für Testzwecke.
///
/// # Warnung
/// **Diese Funktion ist NICHT für den produktiven Einsatz geeignet!**
/// Der deterministische Pfad verwendet eine einfache Hash-Funktion und ist nicht
/// gegen Brute-Force-Angriffe gehärtet. Er dient ausschließlich dazu, in Tests
/// reproduzierbare Schlüsselpaare zu erzeugen.
///
/// # Arguments
/// * `seed` - Ein optionaler String.
///   - `None`: Erzeugt ein vollständig zufälliges, neues Schlüsselpaar.
///   - `Some(seed_str)`: Erzeugt ein deterministisches Schlüsselpaar aus dem Seed-String.
pub fn generate_ed25519_keypair_for_tests(seed: Option<&str>) -> (EdPublicKey, SigningKey) {
    if let Some(seed_str) = seed {
        // Deterministischer Pfad: Seed hashen, um einen 32-Byte-Schlüssel zu erzeugen.
        let mut hasher = Sha512::new();
        hasher.update(seed_str.as_bytes());
        let hash_result = hasher.finalize();
        let key_bytes: [u8; 32] = hash_result[..32]
            .try_into()
            .expect("Hash output must be 64 bytes");

        let signing_key = SigningKey::from_bytes(&key_bytes);
        (signing_key.verifying_key(), signing_key)
    } else {
        generate_ed25519_keypair()
    }
}

/// Leitet den zum privaten Schlüssel gehörenden öffentlichen Schlüssel neu ab.
///
/// Grundlage der Fail-Closed-Prüfung beim Öffnen eines Umschlags: stimmt
/// der abgeleitete Schlüssel nicht mit dem hinterlegten überein, wird gar
/// nicht erst entschlüsselt.
pub fn public_key_of(private_key: &SigningKey) -> EdPublicKey {
    private_key.verifying_key()
}

/// Converts an Ed25519 public key to an X25519 public key for Diffie-Hellman key exchange.
pub fn ed25519_pub_to_x25519(ed_pub: &EdPublicKey) -> X25519PublicKey {
    let montgomery_point = ed_pub.to_montgomery();
    let x25519_bytes: [u8; 32] = montgomery_point.to_bytes();
    X25519PublicKey::from(x25519_bytes)
}

/// Konvertiert einen Ed25519 Signaturschlüssel in einen X25519 geheimen Schlüssel für Diffie-Hellman.
///
/// # Sicherheit
///
/// Die Konvertierung folgt der Standardmethode, bei der der Seed des privaten
/// Ed25519-Schlüssels mit SHA-512 gehasht wird. Die unteren 32 Bytes des Hashes
/// werden verwendet; `StaticSecret::from` führt anschließend das für X25519
/// erforderliche Clamping durch.
pub fn ed25519_sk_to_x25519_sk(ed_sk: &SigningKey) -> StaticSecret {
    let mut hasher = Sha512::new();
    hasher.update(ed_sk.to_bytes());
    let hash = hasher.finalize();
    let key_bytes: [u8; 32] = hash[..32].try_into().expect("SHA512 hash must be 64 bytes");
    StaticSecret::from(key_bytes)
}

/// Generates a temporary X25519 key pair for Diffie-Hellman (Forward Secrecy).
///
/// Jeder Schlüsselumschlag verwendet ein frisches ephemeres Paar; der
/// öffentliche Teil wird neben dem umhüllten Schlüssel gespeichert.
pub fn generate_ephemeral_x25519_keypair() -> (X25519PublicKey, EphemeralSecret) {
    let secret = EphemeralSecret::random_from_rng(OsRng);
    let public = X25519PublicKey::from(&secret);
    (public, secret)
}

/// Performs Diffie-Hellman key exchange using our secret and the other
/// party's public key.
pub fn perform_diffie_hellman(
    our_secret: EphemeralSecret,
    their_public: &X25519PublicKey,
) -> [u8; 32] {
    our_secret.diffie_hellman(their_public).to_bytes()
}

/// Custom error type for symmetric encryption/decryption functions.
#[derive(Debug, thiserror::Error)]
pub enum SymmetricEncryptionError {
    /// Indicates that the AEAD encryption process failed.
    #[error("AEAD encryption failed.")]
    EncryptionFailed,

    /// Indicates that AEAD decryption failed, likely due to a wrong key or tampered data.
    #[error("AEAD decryption failed. The key may be incorrect or the data may have been tampered with.")]
    DecryptionFailed,

    /// Indicates that the provided data slice has an invalid length (e.g., too short to contain a nonce).
    #[error("Invalid data length: {0}")]
    InvalidLength(String),
}

/// Symmetrically encrypts data using ChaCha20-Poly1305.
///
/// A random 12-byte nonce is generated for each encryption and prepended to
/// the ciphertext, so the scheme needs no separately stored IV.
///
/// # Returns
///
/// A `Result` containing a byte vector `[12-byte nonce | ciphertext]` or a `SymmetricEncryptionError`.
pub fn encrypt_data(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>, SymmetricEncryptionError> {
    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, data)
        .map_err(|_| SymmetricEncryptionError::EncryptionFailed)?;

    let mut result = Vec::with_capacity(nonce.len() + ciphertext.len());
    result.extend_from_slice(&nonce);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Symmetrically decrypts data encrypted with `encrypt_data`.
///
/// Expects the input in the format `[12-byte nonce | ciphertext]`. The AEAD
/// tag is verified before any plaintext is returned.
pub fn decrypt_data(
    key: &[u8; 32],
    encrypted_data_with_nonce: &[u8],
) -> Result<Vec<u8>, SymmetricEncryptionError> {
    const NONCE_SIZE: usize = 12;
    if encrypted_data_with_nonce.len() < NONCE_SIZE {
        return Err(SymmetricEncryptionError::InvalidLength(format!(
            "Encrypted data must be at least {} bytes long to contain a nonce.",
            NONCE_SIZE
        )));
    }

    let cipher = ChaCha20Poly1305::new(key.into());
    let (nonce_bytes, ciphertext) = encrypted_data_with_nonce.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| SymmetricEncryptionError::DecryptionFailed)
}

/// Signs a message with an Ed25519 signing key.
pub fn sign_ed25519(signing_key: &SigningKey, message: &[u8]) -> Signature {
    signing_key.sign(message)
}

/// Verifies an Ed25519 signature.
///
/// # Returns
///
/// `true` if the signature is valid, `false` otherwise.
pub fn verify_ed25519(public_key: &EdPublicKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature).is_ok()
}

/// Custom error type for `get_pubkey_from_user_id`.
#[derive(Debug, thiserror::Error)]
pub enum GetPubkeyError {
    /// Indicates that the user ID format is invalid (e.g., missing 'did:key:z').
    #[error("Invalid user ID format (must be 'did:key:z...')")]
    InvalidDidFormat,

    /// Indicates that Base58 decoding failed.
    #[error("Base58 decoding failed: {0}")]
    DecodingFailed(#[from] bs58::decode::Error),

    /// Indicates that the decoded key bytes have an invalid multicodec prefix.
    #[error("Decoded key has invalid multicodec prefix (expected 0xed01 for Ed25519)")]
    InvalidMulticodec,

    /// Indicates that the decoded public key payload has an invalid length.
    #[error("Decoded public key has invalid length (expected 32, got {0})")]
    InvalidLength(usize),

    /// Indicates that public key conversion failed.
    #[error("Public key conversion failed: {0}")]
    ConversionFailed(#[from] SignatureError),
}

// Multicodec prefix for Ed25519 public keys: 0xed01
const ED25519_MULTICODEC_PREFIX: [u8; 2] = [0xed, 0x01];
const DID_KEY_PREFIX: &str = "did:key:z";

/// Generates a user ID based on the W3C did:key standard.
///
/// The format is: `did:key:z[base58(0xed01 || Ed25519 public key)]`.
pub fn create_user_id(public_key: &EdPublicKey) -> String {
    let mut bytes_to_encode = Vec::with_capacity(34);
    bytes_to_encode.extend_from_slice(&ED25519_MULTICODEC_PREFIX);
    bytes_to_encode.extend_from_slice(&public_key.to_bytes());

    format!("{}{}", DID_KEY_PREFIX, bs58::encode(bytes_to_encode).into_string())
}

/// Validates a user ID string.
pub fn validate_user_id(user_id: &str) -> bool {
    get_pubkey_from_user_id(user_id).is_ok()
}

/// Extracts the Ed25519 public key from a user ID string.
pub fn get_pubkey_from_user_id(user_id: &str) -> Result<EdPublicKey, GetPubkeyError> {
    if !user_id.starts_with(DID_KEY_PREFIX) {
        return Err(GetPubkeyError::InvalidDidFormat);
    }

    let base58_payload = &user_id[DID_KEY_PREFIX.len()..];
    let decoded_bytes = bs58::decode(base58_payload).into_vec()?;

    if !decoded_bytes.starts_with(&ED25519_MULTICODEC_PREFIX) {
        return Err(GetPubkeyError::InvalidMulticodec);
    }

    let key_bytes = &decoded_bytes[ED25519_MULTICODEC_PREFIX.len()..];
    let actual_len = key_bytes.len();

    let key_bytes_array: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| GetPubkeyError::InvalidLength(actual_len))?;

    Ok(EdPublicKey::from_bytes(&key_bytes_array)?)
}

/// Erzeugt einen frischen, zufälligen 32-Byte-Schlüssel (z. B. den
/// Inhaltsschlüssel eines Umschlags).
pub fn generate_symmetric_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vector() {
        // SHA-256("abc"), NIST-Testvektor.
        assert_eq!(
            get_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn user_id_roundtrip() {
        let (public_key, _) = generate_ed25519_keypair_for_tests(Some("user-id-roundtrip"));
        let user_id = create_user_id(&public_key);
        assert!(user_id.starts_with("did:key:z"));
        assert!(validate_user_id(&user_id));
        let recovered = get_pubkey_from_user_id(&user_id).unwrap();
        assert_eq!(recovered, public_key);
    }

    #[test]
    fn symmetric_roundtrip_and_tamper_detection() {
        let key = generate_symmetric_key();
        let encrypted = encrypt_data(&key, b"vertraulicher Inhalt").unwrap();
        let decrypted = decrypt_data(&key, &encrypted).unwrap();
        assert_eq!(decrypted, b"vertraulicher Inhalt");

        let mut tampered = encrypted.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert!(matches!(
            decrypt_data(&key, &tampered),
            Err(SymmetricEncryptionError::DecryptionFailed)
        ));
    }

    #[test]
    fn key_pair_rederivation_detects_mismatch() {
        let (public_a, private_a) = generate_ed25519_keypair_for_tests(Some("actor-a"));
        let (_, private_b) = generate_ed25519_keypair_for_tests(Some("actor-b"));
        assert_eq!(public_key_of(&private_a), public_a);
        assert_ne!(public_key_of(&private_b), public_a);
    }

    #[test]
    fn diffie_hellman_agrees_between_ephemeral_and_static() {
        let (_, identity_sk) = generate_ed25519_keypair_for_tests(Some("dh-identity"));
        let identity_x_pub = ed25519_pub_to_x25519(&identity_sk.verifying_key());

        let (eph_pub, eph_secret) = generate_ephemeral_x25519_keypair();
        let shared_sender = perform_diffie_hellman(eph_secret, &identity_x_pub);

        let identity_x_sk = ed25519_sk_to_x25519_sk(&identity_sk);
        let shared_receiver = identity_x_sk.diffie_hellman(&eph_pub).to_bytes();

        assert_eq!(shared_sender, shared_receiver);
    }
}
