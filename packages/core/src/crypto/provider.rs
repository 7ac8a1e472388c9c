//! Defines the CryptoProvider trait for crypto-agility.
//!
//! A provider is the only place primitives live. Everything above it
//! (key manager, envelope crypto, stores) handles keys as opaque byte strings
//! whose lengths and validity the provider vouches for.

use crate::error::CryptoError;
use zeroize::Zeroizing;

/// Длина ключа AEAD (ChaCha20-Poly1305)
pub const AEAD_KEY_LEN: usize = 32;
/// Длина nonce AEAD
pub const AEAD_NONCE_LEN: usize = 12;

const SEAL_KEY_LABEL: &[u8] = b"pqmsg/v1 seal key";
const SEAL_NONCE_LABEL: &[u8] = b"pqmsg/v1 seal nonce";

/// Trait that formalizes all cryptographic operations for a specific cipher suite.
pub trait CryptoProvider: Send + Sync + 'static {
    /// Fixed literal stamped into every envelope sealed with this suite.
    fn suite_id() -> &'static str;

    fn kem_public_key_len() -> usize;
    fn kem_private_key_len() -> usize;
    fn signature_public_key_len() -> usize;
    fn signature_private_key_len() -> usize;
    fn signature_len() -> usize;

    /// Generates a new hybrid KEM key pair as `(private, public)`.
    fn generate_kem_keys() -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), CryptoError>;

    /// Generates a new signature key pair as `(private, public)`.
    fn generate_signature_keys() -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), CryptoError>;

    /// Structural check of raw KEM public key bytes.
    fn check_kem_public_key(bytes: &[u8]) -> Result<(), CryptoError>;

    /// Structural check of raw KEM private key bytes.
    fn check_kem_private_key(bytes: &[u8]) -> Result<(), CryptoError>;

    /// Structural check of raw signature public key bytes.
    fn check_signature_public_key(bytes: &[u8]) -> Result<(), CryptoError>;

    /// Structural check of raw signature private key bytes.
    fn check_signature_private_key(bytes: &[u8]) -> Result<(), CryptoError>;

    /// Derives a KEM public key from a KEM private key.
    fn kem_public_from_private(private_key: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Encapsulates a shared secret to the recipient's public key.
    /// Returns `(encapsulated_key, shared_secret)`.
    fn kem_encapsulate(public_key: &[u8]) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), CryptoError>;

    /// Recovers the shared secret from an encapsulated key.
    fn kem_decapsulate(
        private_key: &[u8],
        encapsulated_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;

    /// Performs AEAD encryption.
    fn aead_encrypt(
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Performs AEAD decryption.
    fn aead_decrypt(
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;

    /// Derives a key from input key material using HKDF.
    fn hkdf_derive_key(
        salt: &[u8],
        ikm: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;

    /// Signs a message with the given private key.
    fn sign(private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Verifies a detached signature with the given public key.
    fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError>;

    /// Single-shot HPKE-style seal: encapsulate, derive key and nonce from the
    /// shared secret bound to the encapsulated key, then AEAD under `aad`.
    /// Returns `(encapsulated_key, ciphertext)`.
    fn seal(
        recipient_public: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let (encapsulated_key, shared_secret) = Self::kem_encapsulate(recipient_public)?;
        let (key, nonce) = seal_key_schedule::<Self>(&shared_secret, &encapsulated_key)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let ciphertext = Self::aead_encrypt(&key, &nonce, plaintext, Some(aad))?;
        Ok((encapsulated_key, ciphertext))
    }

    /// Inverse of [`CryptoProvider::seal`].
    fn open(
        recipient_private: &[u8],
        encapsulated_key: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let shared_secret = Self::kem_decapsulate(recipient_private, encapsulated_key)?;
        let (key, nonce) = seal_key_schedule::<Self>(&shared_secret, encapsulated_key)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        Self::aead_decrypt(&key, &nonce, ciphertext, Some(aad))
    }
}

/// Ключ и nonce одного сообщения. Nonce детерминирован, но каждая
/// инкапсуляция даёт новый shared secret, поэтому пара (key, nonce) не повторяется.
fn seal_key_schedule<P: CryptoProvider + ?Sized>(
    shared_secret: &[u8],
    encapsulated_key: &[u8],
) -> Result<(Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>), CryptoError> {
    let salt = P::suite_id().as_bytes();

    let mut key_info = SEAL_KEY_LABEL.to_vec();
    key_info.extend_from_slice(encapsulated_key);
    let key = P::hkdf_derive_key(salt, shared_secret, &key_info, AEAD_KEY_LEN)?;

    let mut nonce_info = SEAL_NONCE_LABEL.to_vec();
    nonce_info.extend_from_slice(encapsulated_key);
    let nonce = P::hkdf_derive_key(salt, shared_secret, &nonce_info, AEAD_NONCE_LEN)?;

    Ok((key, nonce))
}
