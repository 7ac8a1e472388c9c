// Wire format конверта (JSON, затем Base64 для передачи)
// Конверт передаётся пользователем как непрозрачная строка

use crate::config::Config;
use crate::error::CryptoError;
use crate::protocol::envelope::{AuthenticatedMetadata, EncryptedEnvelope};
use crate::utils::b64;

/// Сериализация и разбор [`EncryptedEnvelope`].
///
/// The codec only accepts envelopes stamped with `suite_id`, the single
/// ciphersuite this build speaks.
pub struct EnvelopeCodec {
    suite_id: &'static str,
}

impl EnvelopeCodec {
    pub fn new(suite_id: &'static str) -> Self {
        Self { suite_id }
    }

    /// Канонический байтовый вид: JSON с фиксированным порядком полей
    pub fn serialize(&self, envelope: &EncryptedEnvelope) -> Result<Vec<u8>, CryptoError> {
        serde_json::to_vec(envelope).map_err(|_| CryptoError::InvalidMessageFormat)
    }

    /// Разобрать канонический вид
    pub fn parse(&self, bytes: &[u8]) -> Result<EncryptedEnvelope, CryptoError> {
        let envelope: EncryptedEnvelope = serde_json::from_slice(bytes).map_err(|e| {
            tracing::debug!(error = %e, "envelope structure rejected");
            CryptoError::InvalidMessageFormat
        })?;

        if envelope.ciphersuite_id() != self.suite_id {
            tracing::warn!(scheme = envelope.ciphersuite_id(), "unsupported ciphersuite");
            return Err(CryptoError::InvalidMessageFormat);
        }
        Ok(envelope)
    }

    /// Base64 от [`EnvelopeCodec::serialize`]
    pub fn to_transmissible(&self, envelope: &EncryptedEnvelope) -> Result<String, CryptoError> {
        Ok(b64::encode(&self.serialize(envelope)?))
    }

    pub fn from_transmissible(&self, text: &str) -> Result<EncryptedEnvelope, CryptoError> {
        if text.len() > Config::global().max_envelope_bytes {
            tracing::warn!(len = text.len(), "transmissible envelope exceeds size limit");
            return Err(CryptoError::InvalidMessageFormat);
        }
        let bytes = b64::decode(text).map_err(|_| CryptoError::InvalidMessageFormat)?;
        self.parse(&bytes)
    }

    pub fn encode_metadata(metadata: &AuthenticatedMetadata) -> Result<Vec<u8>, CryptoError> {
        serde_json::to_vec(metadata).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    }

    /// Разобрать metadata конверта (для отображения)
    pub fn parse_metadata(envelope: &EncryptedEnvelope) -> Result<AuthenticatedMetadata, CryptoError> {
        serde_json::from_slice(envelope.authenticated_metadata())
            .map_err(|_| CryptoError::InvalidMessageFormat)
    }
}
