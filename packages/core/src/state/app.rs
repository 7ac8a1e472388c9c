use crate::crypto::keys::{KeyKind, KeyManager, KeyPair};
use crate::crypto::message_crypto::{DecryptedMessage, MessageCrypto, SignatureStatus};
use crate::crypto::CryptoProvider;
use crate::error::CryptoError;
use crate::protocol::envelope::{AuthenticatedMetadata, EncryptedEnvelope};
use crate::protocol::validation::{validate_plaintext, validate_sender_label};
use crate::protocol::wire::EnvelopeCodec;
use crate::storage::contact_store::{Contact, ContactStore};
use crate::storage::identity_store::{Identity, IdentityStore};
use crate::storage::message_store::{MessageStore, StoredMessage};
use crate::storage::migration::{migrate_legacy_keys, MigrationReport};
use crate::storage::models::IdentityProfile;
use crate::storage::protected::ProtectedStore;
use crate::storage::records::RecordStore;
use crate::utils::b64;
use crate::utils::error::{MessengerError, Result};
use crate::utils::time::current_timestamp;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Фиксированное сообщение самопроверки
pub const SELF_TEST_MESSAGE: &str = "Hello, post-quantum world!";

/// Состояние UI
#[derive(Debug, Clone)]
pub struct UiState {
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub notification: Option<String>,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            is_loading: false,
            error_message: None,
            notification: None,
        }
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn set_error(&mut self, error: String) {
        self.error_message = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    pub fn set_notification(&mut self, notification: String) {
        self.notification = Some(notification);
    }

    pub fn clear_notification(&mut self) {
        self.notification = None;
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

/// Публичные ключи владельца в Base64
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedPublicKeys {
    pub encryption: String,
    pub signing: Option<String>,
}

/// Приватные ключи владельца в Base64 (формат с контрольной суммой)
pub struct ExportedPrivateKeys {
    pub encryption: Zeroizing<String>,
    pub signing: Option<Zeroizing<String>>,
}

/// Результат самопроверки
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestReport {
    pub signature_status: SignatureStatus,
    /// `false` when the identity lacked a key pair and fresh keys were used
    pub used_identity_keys: bool,
    pub tamper_detected: bool,
}

/// Главное состояние приложения.
///
/// Every mutating command persists explicitly before returning. Callers
/// serialize commands; there is no internal locking.
pub struct AppState<P: CryptoProvider> {
    identity_store: IdentityStore<P>,
    identity: Identity,
    contacts: ContactStore<P>,
    messages: MessageStore,
    codec: EnvelopeCodec,
    migration: MigrationReport,
    ui_state: UiState,
}

impl<P: CryptoProvider> AppState<P> {
    /// Открыть состояние: миграция legacy-ключей, затем загрузка всего остального
    pub fn open(protected: Arc<dyn ProtectedStore>, records: Arc<dyn RecordStore>) -> Result<Self> {
        let mut ui_state = UiState::new();
        ui_state.set_loading(true);

        let migration = migrate_legacy_keys::<P>(records.as_ref(), protected.as_ref())?;

        let identity_store = IdentityStore::<P>::new(protected.clone(), records.clone());
        let identity = identity_store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stored identity keys unusable");
            ui_state.set_error(e.user_message());
            Identity {
                profile: identity_store.load_profile(),
                ..Identity::default()
            }
        });

        let contacts = ContactStore::<P>::load(protected, records.clone());
        if !contacts.unavailable().is_empty() {
            ui_state.set_notification(format!(
                "{} contact(s) could not be loaded and were kept for later.",
                contacts.unavailable().len()
            ));
        }
        let messages = MessageStore::load(records);

        tracing::info!(
            has_encryption = identity.has_encryption_keys(),
            has_signing = identity.has_signing_keys(),
            contacts = contacts.len(),
            messages = messages.len(),
            "app state opened"
        );

        ui_state.set_loading(false);
        Ok(Self {
            identity_store,
            identity,
            contacts,
            messages,
            codec: EnvelopeCodec::new(P::suite_id()),
            migration,
            ui_state,
        })
    }

    /// Записать ошибку в UiState и вернуть результат как есть
    fn report<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.ui_state.clear_error(),
            Err(e) => {
                tracing::warn!(error = %e, "command failed");
                self.ui_state.set_error(e.user_message());
            }
        }
        result
    }

    // === Идентичность ===

    /// Сгенерировать новую идентичность, заменив существующую.
    /// Keys are generated before anything is written.
    pub fn generate_identity(&mut self, name: &str, email: &str, with_signing: bool) -> Result<()> {
        self.ui_state.set_loading(true);
        let result = self.generate_identity_inner(name, email, with_signing);
        self.ui_state.set_loading(false);
        self.report(result)
    }

    fn generate_identity_inner(&mut self, name: &str, email: &str, with_signing: bool) -> Result<()> {
        let encryption = KeyManager::<P>::generate_encryption_key_pair()?;
        let signing = if with_signing {
            Some(KeyManager::<P>::generate_signing_key_pair()?)
        } else {
            None
        };

        let profile = IdentityProfile {
            display_name: name.trim().to_string(),
            email: email.trim().to_string(),
            created_at: Some(current_timestamp()),
        };

        if let Err(e) = self.write_identity(&encryption, signing.as_ref(), &profile) {
            self.restore_identity();
            return Err(e);
        }

        self.identity = Identity {
            profile,
            encryption: Some(encryption),
            signing,
        };
        self.ui_state
            .set_notification(format!("Identity created for {}", self.identity.label()));
        Ok(())
    }

    fn write_identity(
        &self,
        encryption: &KeyPair,
        signing: Option<&KeyPair>,
        profile: &IdentityProfile,
    ) -> Result<()> {
        match signing {
            Some(pair) => self.identity_store.save_pair(pair)?,
            None => self.identity_store.delete_pair(KeyKind::Signing)?,
        }
        self.identity_store.save_pair(encryption)?;
        self.identity_store.save_profile(profile)
    }

    /// Вернуть в хранилище идентичность, которая сейчас в памяти
    fn restore_identity(&self) {
        for kind in [KeyKind::Encryption, KeyKind::Signing] {
            let pair = match kind {
                KeyKind::Encryption => self.identity.encryption.as_ref(),
                KeyKind::Signing => self.identity.signing.as_ref(),
            };
            let restored = match pair {
                Some(pair) => self.identity_store.save_pair(pair),
                None => self.identity_store.delete_pair(kind),
            };
            if let Err(e) = restored {
                tracing::warn!(%kind, error = %e, "could not restore previous key pair");
            }
        }
        if let Err(e) = self.identity_store.save_profile(&self.identity.profile) {
            tracing::warn!(error = %e, "could not restore previous profile");
        }
    }

    /// Удалить идентичность. Повторный вызов ничего не делает.
    pub fn delete_identity(&mut self) -> Result<()> {
        let result = self.identity_store.delete();
        if result.is_ok() {
            self.identity = Identity::default();
            self.messages.clear_all_plaintext();
        }
        self.report(result)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn identity_label(&self) -> String {
        self.identity.label()
    }

    pub fn export_public_keys(&mut self) -> Result<ExportedPublicKeys> {
        let result = self.encryption_pair().map(|encryption| ExportedPublicKeys {
            encryption: b64::encode(&KeyManager::<P>::export_public(encryption)),
            signing: self
                .identity
                .signing
                .as_ref()
                .map(|pair| b64::encode(&KeyManager::<P>::export_public(pair))),
        });
        self.report(result)
    }

    /// Явный экспорт приватных ключей по запросу пользователя
    pub fn export_private_keys(&mut self) -> Result<ExportedPrivateKeys> {
        let result = self.encryption_pair().map(|encryption| {
            let encode = |pair: &KeyPair| {
                let exported = KeyManager::<P>::export_private(pair);
                Zeroizing::new(b64::encode(&exported))
            };
            ExportedPrivateKeys {
                encryption: encode(encryption),
                signing: self.identity.signing.as_ref().map(encode),
            }
        });
        if result.is_ok() {
            tracing::warn!("private keys exported on user request");
        }
        self.report(result)
    }

    fn encryption_pair(&self) -> Result<&KeyPair> {
        self.identity
            .encryption
            .as_ref()
            .ok_or_else(|| MessengerError::NoIdentity("generate an identity first".to_string()))
    }

    // === Контакты ===

    /// Добавить контакт по Base64 публичным ключам
    pub fn add_contact(
        &mut self,
        name: &str,
        encryption_key_b64: &str,
        signing_key_b64: Option<&str>,
    ) -> Result<Contact> {
        let result = self.add_contact_inner(name, encryption_key_b64, signing_key_b64);
        if let Ok(contact) = &result {
            self.ui_state
                .set_notification(format!("Added {} ({})", contact.name, contact.fingerprint()));
        }
        self.report(result)
    }

    fn add_contact_inner(
        &mut self,
        name: &str,
        encryption_key_b64: &str,
        signing_key_b64: Option<&str>,
    ) -> Result<Contact> {
        let encryption_key = decode_public(KeyKind::Encryption, encryption_key_b64)?;
        let encryption_key = KeyManager::<P>::import_public(KeyKind::Encryption, &encryption_key)?;

        let signing_key = match signing_key_b64.map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => {
                let bytes = decode_public(KeyKind::Signing, text)?;
                Some(KeyManager::<P>::import_public(KeyKind::Signing, &bytes)?)
            }
            None => None,
        };

        self.contacts.add(name, encryption_key, signing_key)
    }

    pub fn rename_contact(&mut self, contact_id: &str, name: &str) -> Result<()> {
        let result = self.contacts.rename(contact_id, name);
        self.report(result)
    }

    /// Удалить контакт. Отсутствующий контакт не ошибка.
    pub fn remove_contact(&mut self, contact_id: &str) -> Result<()> {
        let result = self.contacts.remove(contact_id).map(|_| ());
        self.report(result)
    }

    pub fn contacts(&self) -> &[Contact] {
        self.contacts.all()
    }

    pub fn contact_store(&self) -> &ContactStore<P> {
        &self.contacts
    }

    // === Сообщения ===

    /// Зашифровать сообщение для контакта, вернуть Base64 конверта.
    ///
    /// If `sign` is set but there is no signing key, the message goes out
    /// unsigned and the UI is notified.
    pub fn send_message(&mut self, contact_id: &str, plaintext: &str, sign: bool) -> Result<String> {
        let result = self.send_message_inner(contact_id, plaintext, sign);
        self.report(result)
    }

    fn send_message_inner(&mut self, contact_id: &str, plaintext: &str, sign: bool) -> Result<String> {
        validate_plaintext(plaintext)?;
        let contact = self
            .contacts
            .get(contact_id)
            .ok_or_else(|| MessengerError::NotFound(format!("Contact not found: {}", contact_id)))?;

        let metadata = AuthenticatedMetadata::new(self.identity.label(), contact.name.clone());
        let metadata = EnvelopeCodec::encode_metadata(&metadata)?;

        let signing_key = match (&self.identity.signing, sign) {
            (Some(pair), true) => Some(&pair.private),
            (None, true) => {
                tracing::warn!("signing requested without a signing key, sending unsigned");
                self.ui_state.set_notification(
                    "No signing key: the message was sent unsigned.".to_string(),
                );
                None
            }
            (_, false) => None,
        };

        let envelope = match signing_key {
            Some(key) => MessageCrypto::<P>::encrypt_and_sign(
                plaintext.as_bytes(),
                &contact.encryption_key,
                &metadata,
                key,
            )?,
            None => MessageCrypto::<P>::encrypt(plaintext.as_bytes(), &contact.encryption_key, &metadata)?,
        };

        tracing::info!(
            contact_id = %contact.id,
            signed = envelope.is_signed(),
            "message encrypted"
        );
        Ok(self.codec.to_transmissible(&envelope)?)
    }

    /// Принять Base64 конверт от отправителя, вернуть ID сообщения
    pub fn receive_message(&mut self, sender_label: &str, envelope_b64: &str) -> Result<String> {
        let result = self.receive_message_inner(sender_label, envelope_b64);
        self.report(result)
    }

    fn receive_message_inner(&mut self, sender_label: &str, envelope_b64: &str) -> Result<String> {
        validate_sender_label(sender_label)?;
        let envelope = self.codec.from_transmissible(envelope_b64)?;
        self.messages.add(sender_label, envelope)
    }

    /// Расшифровать сохранённое сообщение.
    ///
    /// The verification key is the signing key of the first contact whose
    /// name equals the sender label. On a failed signature the message is
    /// marked invalid and no plaintext is kept.
    pub fn decrypt_message(&mut self, message_id: &str) -> Result<DecryptedMessage> {
        let result = self.decrypt_message_inner(message_id);
        self.report(result)
    }

    fn decrypt_message_inner(&mut self, message_id: &str) -> Result<DecryptedMessage> {
        let message = self
            .messages
            .get(message_id)
            .ok_or_else(|| MessengerError::NotFound(format!("Message not found: {}", message_id)))?;
        let recipient = match self.identity.encryption.as_ref() {
            Some(pair) => pair,
            None => {
                self.messages.clear_decryption(message_id)?;
                return Err(CryptoError::InvalidPrivateKeyData.into());
            }
        };

        let sender_key = if message.envelope.is_signed() {
            self.contacts
                .find_by_name(&message.sender_label)
                .and_then(|contact| contact.signing_key.as_ref())
        } else {
            None
        };

        match MessageCrypto::<P>::decrypt_and_verify(&message.envelope, &recipient.private, sender_key) {
            Ok(decrypted) => {
                self.messages.set_decrypted(
                    message_id,
                    decrypted.plaintext.clone(),
                    decrypted.signature_status,
                )?;
                Ok(decrypted)
            }
            Err(e @ (CryptoError::VerificationFailed(_) | CryptoError::InvalidSignatureData)) => {
                self.messages.mark_invalid(message_id)?;
                Err(e.into())
            }
            Err(e) => {
                self.messages.clear_decryption(message_id)?;
                Err(e.into())
            }
        }
    }

    /// Удалить сообщение. Отсутствующее сообщение не ошибка.
    pub fn delete_message(&mut self, message_id: &str) -> Result<()> {
        let result = self.messages.delete(message_id).map(|_| ());
        self.report(result)
    }

    pub fn messages(&self) -> &[StoredMessage] {
        self.messages.all()
    }

    pub fn message(&self, message_id: &str) -> Option<&StoredMessage> {
        self.messages.get(message_id)
    }

    pub fn clear_plaintext(&mut self, message_id: &str) -> Result<()> {
        let result = self.messages.clear_plaintext(message_id);
        self.report(result)
    }

    /// Сбросить весь расшифрованный текст (например, при уходе приложения в фон)
    pub fn clear_all_plaintext(&mut self) {
        self.messages.clear_all_plaintext();
    }

    // === Самопроверка ===

    /// Encrypt, sign, transmit, decrypt and verify a fixed message against
    /// self, then check that a flipped ciphertext byte is rejected.
    pub fn self_test(&mut self) -> Result<SelfTestReport> {
        self.ui_state.set_loading(true);
        let result = self.run_self_test();
        self.ui_state.set_loading(false);
        if result.is_ok() {
            self.ui_state
                .set_notification("Self-test passed: signature verified.".to_string());
        }
        self.report(result)
    }

    fn run_self_test(&self) -> Result<SelfTestReport> {
        let (encryption, signing, used_identity_keys) =
            match (&self.identity.encryption, &self.identity.signing) {
                (Some(encryption), Some(signing)) => (encryption.clone(), signing.clone(), true),
                _ => (
                    KeyManager::<P>::generate_encryption_key_pair()?,
                    KeyManager::<P>::generate_signing_key_pair()?,
                    false,
                ),
            };

        let label = self.identity.label();
        let metadata = EnvelopeCodec::encode_metadata(&AuthenticatedMetadata::new(&label, &label))?;
        let sealed = MessageCrypto::<P>::encrypt_and_sign(
            SELF_TEST_MESSAGE.as_bytes(),
            &encryption.public,
            &metadata,
            &signing.private,
        )?;
        let envelope = self
            .codec
            .from_transmissible(&self.codec.to_transmissible(&sealed)?)?;

        let decrypted =
            MessageCrypto::<P>::decrypt_and_verify(&envelope, &encryption.private, Some(&signing.public))?;
        if decrypted.plaintext.as_str() != SELF_TEST_MESSAGE
            || decrypted.signature_status != SignatureStatus::Verified
        {
            return Err(CryptoError::DecryptionFailed("self-test round trip mismatch".to_string()).into());
        }

        let mut ciphertext = envelope.ciphertext().to_vec();
        if let Some(first) = ciphertext.first_mut() {
            *first ^= 0x01;
        }
        let tampered = EncryptedEnvelope::new(
            envelope.encapsulated_key().to_vec(),
            ciphertext,
            envelope.authenticated_metadata().to_vec(),
            envelope.ciphersuite_id(),
            envelope.signature().map(<[u8]>::to_vec),
        );
        let tamper_detected =
            MessageCrypto::<P>::decrypt_and_verify(&tampered, &encryption.private, Some(&signing.public))
                .is_err();
        if !tamper_detected {
            return Err(CryptoError::VerificationFailed("tampered envelope accepted".to_string()).into());
        }

        tracing::info!(used_identity_keys, "self-test passed");
        Ok(SelfTestReport {
            signature_status: decrypted.signature_status,
            used_identity_keys,
            tamper_detected,
        })
    }

    // === Прочее ===

    /// Итог миграции legacy-ключей при открытии
    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration
    }

    pub fn ui_state(&self) -> &UiState {
        &self.ui_state
    }

    pub fn ui_state_mut(&mut self) -> &mut UiState {
        &mut self.ui_state
    }
}

fn decode_public(kind: KeyKind, text: &str) -> Result<Vec<u8>> {
    b64::decode(text).map_err(|_| {
        tracing::debug!(%kind, "public key is not valid Base64");
        MessengerError::Crypto(CryptoError::InvalidPublicKeyData)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::suites::hybrid::HybridSuiteProvider;
    use crate::storage::memory::{MemoryProtectedStore, MemoryRecordStore};

    type App = AppState<HybridSuiteProvider>;

    fn open_app() -> App {
        App::open(
            Arc::new(MemoryProtectedStore::new()),
            Arc::new(MemoryRecordStore::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_app_state_creation() {
        let state = open_app();
        assert!(!state.identity().has_encryption_keys());
        assert!(state.contacts().is_empty());
        assert!(state.migration_report().is_noop());
        assert!(!state.ui_state().is_loading);
    }

    #[test]
    fn test_generate_identity_replaces_signing_pair() {
        let mut state = open_app();
        state.generate_identity("alice", "alice@example.com", true).unwrap();
        assert!(state.identity().has_signing_keys());
        assert_eq!(state.identity_label(), "alice <alice@example.com>");

        state.generate_identity("alice", "", false).unwrap();
        assert!(!state.identity().has_signing_keys());
        assert!(state.export_public_keys().unwrap().signing.is_none());
    }

    #[test]
    fn test_export_without_identity_sets_ui_error() {
        let mut state = open_app();
        let err = state.export_public_keys().unwrap_err();
        assert!(matches!(err, MessengerError::NoIdentity(_)));
        assert!(state.ui_state().error_message.is_some());
    }

    #[test]
    fn test_invalid_base64_key_is_invalid_public_key() {
        let mut state = open_app();
        let err = state.add_contact("bob", "%%%not-base64", None).unwrap_err();
        assert!(matches!(
            err,
            MessengerError::Crypto(CryptoError::InvalidPublicKeyData)
        ));
    }

    #[test]
    fn test_sign_without_signing_key_sends_unsigned() {
        let mut state = open_app();
        state.generate_identity("alice", "", false).unwrap();
        let keys = state.export_public_keys().unwrap();
        let contact = state.add_contact("me", &keys.encryption, None).unwrap();

        let envelope = state.send_message(&contact.id, "hi", true).unwrap();
        assert!(state.ui_state().notification.as_deref().unwrap_or("").contains("unsigned"));

        let id = state.receive_message("me", &envelope).unwrap();
        let decrypted = state.decrypt_message(&id).unwrap();
        assert_eq!(decrypted.signature_status, SignatureStatus::None);
    }

    #[test]
    fn test_self_test_with_fresh_keys() {
        let mut state = open_app();
        let report = state.self_test().unwrap();
        assert_eq!(report.signature_status, SignatureStatus::Verified);
        assert!(!report.used_identity_keys);
        assert!(report.tamper_detected);
    }
}
