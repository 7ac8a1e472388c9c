// Конверт зашифрованного сообщения
// Поля и их порядок фиксированы: это wire format

use crate::utils::b64::{serde_bytes_b64, serde_opt_bytes_b64};
use serde::{Deserialize, Serialize};

/// Зашифрованный конверт. Неизменяем после создания.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EncryptedEnvelope {
    #[serde(with = "serde_bytes_b64")]
    encapsulated_key: Vec<u8>,
    #[serde(with = "serde_bytes_b64")]
    ciphertext: Vec<u8>,
    /// Authenticated, not encrypted
    #[serde(rename = "metadata", with = "serde_bytes_b64")]
    authenticated_metadata: Vec<u8>,
    #[serde(rename = "scheme")]
    ciphersuite_id: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_opt_bytes_b64"
    )]
    signature: Option<Vec<u8>>,
}

impl EncryptedEnvelope {
    pub fn new(
        encapsulated_key: Vec<u8>,
        ciphertext: Vec<u8>,
        authenticated_metadata: Vec<u8>,
        ciphersuite_id: impl Into<String>,
        signature: Option<Vec<u8>>,
    ) -> Self {
        Self {
            encapsulated_key,
            ciphertext,
            authenticated_metadata,
            ciphersuite_id: ciphersuite_id.into(),
            signature,
        }
    }

    pub fn encapsulated_key(&self) -> &[u8] {
        &self.encapsulated_key
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn authenticated_metadata(&self) -> &[u8] {
        &self.authenticated_metadata
    }

    pub fn ciphersuite_id(&self) -> &str {
        &self.ciphersuite_id
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// Associated data, которую приложение кладёт в конверт.
/// Integrity-protected by the AEAD; not a sender binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedMetadata {
    pub version: u32,
    pub sender_label: String,
    pub recipient_label: String,
    /// RFC 3339
    pub sent_at: String,
    /// UUID v4
    pub message_id: String,
}

impl AuthenticatedMetadata {
    pub fn new(sender_label: impl Into<String>, recipient_label: impl Into<String>) -> Self {
        Self {
            version: crate::config::Config::global().metadata_version,
            sender_label: sender_label.into(),
            recipient_label: recipient_label.into(),
            sent_at: crate::utils::time::now_rfc3339(),
            message_id: crate::utils::uuid::generate_v4(),
        }
    }
}
