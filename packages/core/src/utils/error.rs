// Типы ошибок приложения

use crate::error::CryptoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessengerError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Contact already exists: {0}")]
    DuplicateContact(String),

    #[error("No identity: {0}")]
    NoIdentity(String),
}

impl MessengerError {
    /// Одна строка для показа пользователю.
    pub fn user_message(&self) -> String {
        match self {
            MessengerError::Crypto(CryptoError::KeyGenerationFailed) => {
                "Could not generate keys. Please try again later.".to_string()
            }
            MessengerError::Crypto(CryptoError::InvalidPublicKeyData) => {
                "The public key is not valid.".to_string()
            }
            MessengerError::Crypto(CryptoError::InvalidPrivateKeyData) => {
                "Your private key could not be read. It may be corrupted.".to_string()
            }
            MessengerError::Crypto(CryptoError::InvalidMessageFormat) => {
                "This does not look like an encrypted message.".to_string()
            }
            MessengerError::Crypto(CryptoError::InvalidSignatureData) => {
                "The message signature is malformed.".to_string()
            }
            MessengerError::Crypto(CryptoError::VerificationFailed(_)) => {
                "The signature does not match the sender. The message was not opened.".to_string()
            }
            MessengerError::Crypto(CryptoError::DecryptionFailed(_)) => {
                "The message could not be decrypted with your key.".to_string()
            }
            MessengerError::Crypto(CryptoError::EncryptionFailed(_)) => {
                "The message could not be encrypted.".to_string()
            }
            MessengerError::Crypto(CryptoError::SigningFailed(_)) => {
                "The message could not be signed.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for MessengerError {
    fn from(err: serde_json::Error) -> Self {
        MessengerError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MessengerError>;
