//! Шифрование и подпись сообщений
//!
//! ## Dataflow
//! ```text
//! Отправка:
//!   plaintext ─┬─ seal(recipient_pub, aad = metadata) ─→ {encapsulated_key, ciphertext}
//!              └─ (опционально) sign(signing_priv, ciphertext) ─→ signature
//!   → EncryptedEnvelope
//!
//! Приём, ровно одна из трёх веток:
//!   signature отсутствует                → open                 → SignatureStatus::None
//!   signature есть, ключ отправителя есть → verify, потом open   → SignatureStatus::Verified
//!                                           verify не прошёл      → VerificationFailed, plaintext не выдаётся
//!   signature есть, ключа нет            → open                 → SignatureStatus::PresentButKeyUnknown
//! ```
//!
//! The signature covers the ciphertext bytes only. Every message is
//! encapsulated independently; no session state survives between messages.

use crate::crypto::keys::{KeyKind, PrivateKey, PublicKey};
use crate::crypto::CryptoProvider;
use crate::error::CryptoError;
use crate::protocol::envelope::EncryptedEnvelope;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use zeroize::{Zeroize, Zeroizing};

/// Результат проверки подписи
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureStatus {
    /// Сообщение не подписано
    None,
    /// Подпись проверена ключом отправителя
    Verified,
    /// Подпись не прошла проверку (сообщение не раскрыто)
    Invalid,
    /// Подпись есть, но ключ отправителя неизвестен
    PresentButKeyUnknown,
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignatureStatus::None => "unsigned",
            SignatureStatus::Verified => "signature verified",
            SignatureStatus::Invalid => "signature invalid",
            SignatureStatus::PresentButKeyUnknown => "signed, unverifiable",
        };
        f.write_str(label)
    }
}

/// Расшифрованное сообщение. Plaintext живёт только в памяти.
pub struct DecryptedMessage {
    pub plaintext: Zeroizing<String>,
    pub signature_status: SignatureStatus,
}

impl fmt::Debug for DecryptedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedMessage")
            .field("plaintext", &format_args!("<{} bytes>", self.plaintext.len()))
            .field("signature_status", &self.signature_status)
            .finish()
    }
}

/// Оркестрация encrypt(+sign) / decrypt(+verify) поверх провайдера
pub struct MessageCrypto<P: CryptoProvider> {
    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> MessageCrypto<P> {
    /// Зашифровать без подписи
    pub fn encrypt(
        plaintext: &[u8],
        recipient: &PublicKey,
        metadata: &[u8],
    ) -> Result<EncryptedEnvelope, CryptoError> {
        Self::seal(plaintext, recipient, metadata, None)
    }

    /// Зашифровать и подписать ciphertext
    pub fn encrypt_and_sign(
        plaintext: &[u8],
        recipient: &PublicKey,
        metadata: &[u8],
        signing_key: &PrivateKey,
    ) -> Result<EncryptedEnvelope, CryptoError> {
        Self::seal(plaintext, recipient, metadata, Some(signing_key))
    }

    fn seal(
        plaintext: &[u8],
        recipient: &PublicKey,
        metadata: &[u8],
        signing_key: Option<&PrivateKey>,
    ) -> Result<EncryptedEnvelope, CryptoError> {
        if recipient.kind() != KeyKind::Encryption {
            return Err(CryptoError::InvalidPublicKeyData);
        }
        if let Some(key) = signing_key {
            if key.kind() != KeyKind::Signing {
                return Err(CryptoError::SigningFailed("not a signing key".to_string()));
            }
        }

        let (encapsulated_key, ciphertext) = P::seal(recipient.as_bytes(), plaintext, metadata)
            .map_err(|e| match e {
                CryptoError::InvalidPublicKeyData => CryptoError::InvalidPublicKeyData,
                CryptoError::EncryptionFailed(detail) => CryptoError::EncryptionFailed(detail),
                other => CryptoError::EncryptionFailed(other.to_string()),
            })?;

        let signature = match signing_key {
            Some(key) => Some(P::sign(key.as_bytes(), &ciphertext).map_err(|e| match e {
                CryptoError::SigningFailed(detail) => CryptoError::SigningFailed(detail),
                other => CryptoError::SigningFailed(other.to_string()),
            })?),
            None => None,
        };

        tracing::debug!(
            ciphertext_len = ciphertext.len(),
            signed = signature.is_some(),
            "sealed envelope"
        );

        Ok(EncryptedEnvelope::new(
            encapsulated_key,
            ciphertext,
            metadata.to_vec(),
            P::suite_id(),
            signature,
        ))
    }

    /// Расшифровать, не проверяя подпись.
    /// A signed envelope is reported as [`SignatureStatus::PresentButKeyUnknown`].
    pub fn decrypt(
        envelope: &EncryptedEnvelope,
        recipient_key: &PrivateKey,
    ) -> Result<DecryptedMessage, CryptoError> {
        Self::decrypt_and_verify(envelope, recipient_key, None)
    }

    /// Расшифровать и, если возможно, проверить подпись.
    ///
    /// On a present signature with a known sender key, verification runs
    /// first and a failure returns the error without opening the ciphertext.
    pub fn decrypt_and_verify(
        envelope: &EncryptedEnvelope,
        recipient_key: &PrivateKey,
        sender_signing_key: Option<&PublicKey>,
    ) -> Result<DecryptedMessage, CryptoError> {
        if envelope.ciphersuite_id() != P::suite_id() {
            return Err(CryptoError::InvalidMessageFormat);
        }
        if recipient_key.kind() != KeyKind::Encryption {
            return Err(CryptoError::InvalidPrivateKeyData);
        }

        let signature_status = match (envelope.signature(), sender_signing_key) {
            (None, _) => SignatureStatus::None,
            (Some(signature), Some(sender)) => {
                if sender.kind() != KeyKind::Signing {
                    return Err(CryptoError::InvalidPublicKeyData);
                }
                P::verify(sender.as_bytes(), envelope.ciphertext(), signature).map_err(|e| {
                    tracing::warn!(error = %e, "envelope signature rejected");
                    match e {
                        CryptoError::InvalidSignatureData => CryptoError::InvalidSignatureData,
                        CryptoError::InvalidPublicKeyData => CryptoError::InvalidPublicKeyData,
                        CryptoError::VerificationFailed(detail) => {
                            CryptoError::VerificationFailed(detail)
                        }
                        other => CryptoError::VerificationFailed(other.to_string()),
                    }
                })?;
                SignatureStatus::Verified
            }
            (Some(_), None) => SignatureStatus::PresentButKeyUnknown,
        };

        let plaintext = Self::open(envelope, recipient_key)?;
        tracing::debug!(status = %signature_status, "opened envelope");

        Ok(DecryptedMessage {
            plaintext,
            signature_status,
        })
    }

    fn open(
        envelope: &EncryptedEnvelope,
        recipient_key: &PrivateKey,
    ) -> Result<Zeroizing<String>, CryptoError> {
        let bytes = P::open(
            recipient_key.as_bytes(),
            envelope.encapsulated_key(),
            envelope.ciphertext(),
            envelope.authenticated_metadata(),
        )
        .map_err(|e| match e {
            CryptoError::DecryptionFailed(detail) => CryptoError::DecryptionFailed(detail),
            other => CryptoError::DecryptionFailed(other.to_string()),
        })?;

        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Ok(Zeroizing::new(text)),
            Err(err) => {
                let mut raw = err.into_bytes();
                raw.zeroize();
                Err(CryptoError::DecryptionFailed(
                    "plaintext is not valid UTF-8".to_string(),
                ))
            }
        }
    }

    /// Проверить подпись над произвольными байтами
    pub fn verify_detached(
        sender: &PublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        if sender.kind() != KeyKind::Signing {
            return Err(CryptoError::InvalidPublicKeyData);
        }
        P::verify(sender.as_bytes(), message, signature)
    }
}
