// Хранилище полученных сообщений
// На диск попадает только MessageRecord: расшифрованный текст живёт в памяти

use crate::crypto::message_crypto::SignatureStatus;
use crate::protocol::envelope::EncryptedEnvelope;
use crate::storage::models::MessageRecord;
use crate::storage::records::RecordStore;
use crate::utils::error::{MessengerError, Result};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

pub const MESSAGES_RECORD: &str = "messages";

/// Сообщение в памяти.
///
/// `plaintext` and `signature_status` are transient: both start empty after
/// every load and are filled only by a decryption attempt in this session.
#[derive(Clone)]
pub struct StoredMessage {
    pub id: String,
    pub sender_label: String,
    pub received_at: i64,
    pub envelope: EncryptedEnvelope,
    pub plaintext: Option<Zeroizing<String>>,
    pub signature_status: Option<SignatureStatus>,
}

impl StoredMessage {
    pub fn is_decrypted(&self) -> bool {
        self.plaintext.is_some()
    }

    fn to_record(&self) -> MessageRecord {
        MessageRecord {
            id: self.id.clone(),
            sender_label: self.sender_label.clone(),
            received_at: self.received_at,
            envelope: self.envelope.clone(),
        }
    }
}

impl From<MessageRecord> for StoredMessage {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            sender_label: record.sender_label,
            received_at: record.received_at,
            envelope: record.envelope,
            plaintext: None,
            signature_status: None,
        }
    }
}

impl fmt::Debug for StoredMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredMessage")
            .field("id", &self.id)
            .field("sender_label", &self.sender_label)
            .field("received_at", &self.received_at)
            .field("signed", &self.envelope.is_signed())
            .field("decrypted", &self.plaintext.is_some())
            .field("signature_status", &self.signature_status)
            .finish()
    }
}

pub struct MessageStore {
    records: Arc<dyn RecordStore>,
    messages: Vec<StoredMessage>,
}

impl MessageStore {
    pub fn load(records: Arc<dyn RecordStore>) -> Self {
        let messages = read_records(records.as_ref())
            .into_iter()
            .map(StoredMessage::from)
            .collect::<Vec<_>>();
        tracing::debug!(count = messages.len(), "messages loaded");
        Self { records, messages }
    }

    /// Сохранить полученный конверт, вернуть ID сообщения
    pub fn add(&mut self, sender_label: &str, envelope: EncryptedEnvelope) -> Result<String> {
        let message = StoredMessage {
            id: crate::utils::uuid::generate_v4(),
            sender_label: sender_label.trim().to_string(),
            received_at: crate::utils::time::current_timestamp(),
            envelope,
            plaintext: None,
            signature_status: None,
        };
        let id = message.id.clone();
        self.messages.push(message);
        self.persist()?;
        tracing::info!(message_id = %id, "message stored");
        Ok(id)
    }

    pub fn get(&self, message_id: &str) -> Option<&StoredMessage> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    fn get_mut(&mut self, message_id: &str) -> Result<&mut StoredMessage> {
        self.messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| MessengerError::NotFound(format!("Message not found: {}", message_id)))
    }

    /// Запомнить результат успешной расшифровки (только в памяти)
    pub fn set_decrypted(
        &mut self,
        message_id: &str,
        plaintext: Zeroizing<String>,
        status: SignatureStatus,
    ) -> Result<()> {
        let message = self.get_mut(message_id)?;
        message.plaintext = Some(plaintext);
        message.signature_status = Some(status);
        Ok(())
    }

    /// Подпись не прошла проверку: текст не показываем
    pub fn mark_invalid(&mut self, message_id: &str) -> Result<()> {
        let message = self.get_mut(message_id)?;
        message.plaintext = None;
        message.signature_status = Some(SignatureStatus::Invalid);
        Ok(())
    }

    /// Расшифровка не удалась: сбросить результат прошлой попытки
    pub fn clear_decryption(&mut self, message_id: &str) -> Result<()> {
        let message = self.get_mut(message_id)?;
        message.plaintext = None;
        message.signature_status = None;
        Ok(())
    }

    pub fn clear_plaintext(&mut self, message_id: &str) -> Result<()> {
        self.get_mut(message_id)?.plaintext = None;
        Ok(())
    }

    pub fn clear_all_plaintext(&mut self) {
        for message in &mut self.messages {
            message.plaintext = None;
        }
    }

    /// Удалить сообщение. Отсутствующее сообщение не ошибка.
    pub fn delete(&mut self, message_id: &str) -> Result<bool> {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != message_id);
        if self.messages.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn all(&self) -> &[StoredMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Единственная точка записи сообщений на диск
    pub fn persist(&self) -> Result<()> {
        let records: Vec<MessageRecord> = self.messages.iter().map(StoredMessage::to_record).collect();
        let bytes = serde_json::to_vec(&records)?;
        self.records.put(MESSAGES_RECORD, &bytes)
    }
}

fn read_records(records: &dyn RecordStore) -> Vec<MessageRecord> {
    let bytes = match records.get(MESSAGES_RECORD) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "messages unreadable, starting empty");
            return Vec::new();
        }
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "messages record corrupt, starting empty");
        Vec::new()
    })
}
