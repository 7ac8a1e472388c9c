use thiserror::Error;

/// Ошибки криптографического ядра.
///
/// Every variant is deterministic: repeating the call with identical input
/// yields the same error, so callers must not retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Failed to generate keys")]
    KeyGenerationFailed,
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("Invalid public key data")]
    InvalidPublicKeyData,
    #[error("Invalid private key data")]
    InvalidPrivateKeyData,
    #[error("Invalid message format")]
    InvalidMessageFormat,
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    #[error("Signature verification failed: {0}")]
    VerificationFailed(String),
    #[error("Invalid signature data")]
    InvalidSignatureData,
}

impl From<rand::Error> for CryptoError {
    fn from(_err: rand::Error) -> Self {
        CryptoError::KeyGenerationFailed
    }
}
