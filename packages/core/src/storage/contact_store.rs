// Хранилище контактов
// Записи контактов: одна JSON-запись, публичные ключи: after-first-unlock tier

use crate::crypto::keys::{self, KeyKind, KeyManager, PublicKey};
use crate::crypto::CryptoProvider;
use crate::error::CryptoError;
use crate::protocol::validation::validate_contact_name;
use crate::storage::models::ContactRecord;
use crate::storage::protected::{AccessTier, ProtectedStore};
use crate::storage::records::RecordStore;
use crate::utils::error::{MessengerError, Result};
use std::marker::PhantomData;
use std::sync::Arc;

pub const CONTACTS_RECORD: &str = "contacts";

fn key_account(contact_id: &str, kind: KeyKind) -> String {
    match kind {
        KeyKind::Encryption => format!("contact.{}.encryption.public", contact_id),
        KeyKind::Signing => format!("contact.{}.signing.public", contact_id),
    }
}

/// Информация о контакте
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub encryption_key: PublicKey,
    pub signing_key: Option<PublicKey>,
    pub added_at: i64,
}

impl Contact {
    pub fn key_id(&self) -> String {
        keys::key_id(self.encryption_key.as_bytes())
    }

    pub fn fingerprint(&self) -> String {
        keys::fingerprint(self.encryption_key.as_bytes())
    }

    pub fn can_verify(&self) -> bool {
        self.signing_key.is_some()
    }

    fn record(&self) -> ContactRecord {
        ContactRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            added_at: self.added_at,
        }
    }
}

/// Менеджер контактов. Порядок вставки сохраняется.
///
/// Records whose keys could not be read at load time are kept in
/// `unavailable` and written back on every persist.
pub struct ContactStore<P: CryptoProvider> {
    protected: Arc<dyn ProtectedStore>,
    records: Arc<dyn RecordStore>,
    contacts: Vec<Contact>,
    unavailable: Vec<ContactRecord>,
    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> ContactStore<P> {
    /// Загрузить контакты. Контакты, чьи ключи не читаются, не теряются:
    /// they stay out of lookups but remain in the persisted record.
    pub fn load(protected: Arc<dyn ProtectedStore>, records: Arc<dyn RecordStore>) -> Self {
        let stored = read_records(records.as_ref());
        let mut store = Self {
            protected,
            records,
            contacts: Vec::with_capacity(stored.len()),
            unavailable: Vec::new(),
            _phantom: PhantomData,
        };

        for record in stored {
            match store.load_keys(&record.id) {
                Ok((encryption_key, signing_key)) => store.contacts.push(Contact {
                    id: record.id,
                    name: record.name,
                    encryption_key,
                    signing_key,
                    added_at: record.added_at,
                }),
                Err(e) => {
                    tracing::warn!(contact_id = %record.id, error = %e, "contact keys unavailable, keeping record");
                    store.unavailable.push(record);
                }
            }
        }

        tracing::debug!(
            count = store.contacts.len(),
            unavailable = store.unavailable.len(),
            "contacts loaded"
        );
        store
    }

    fn load_keys(&self, contact_id: &str) -> Result<(PublicKey, Option<PublicKey>)> {
        let encryption = self
            .protected
            .load(&key_account(contact_id, KeyKind::Encryption))?
            .ok_or_else(|| MessengerError::NotFound(format!("encryption key of {}", contact_id)))?;
        let encryption = KeyManager::<P>::import_public(KeyKind::Encryption, &encryption)?;

        let signing = match self.protected.load(&key_account(contact_id, KeyKind::Signing))? {
            Some(bytes) => Some(KeyManager::<P>::import_public(KeyKind::Signing, &bytes)?),
            None => None,
        };

        Ok((encryption, signing))
    }

    /// Добавить контакт.
    /// A contact whose encryption key is already known is rejected.
    pub fn add(
        &mut self,
        name: &str,
        encryption_key: PublicKey,
        signing_key: Option<PublicKey>,
    ) -> Result<Contact> {
        validate_contact_name(name)?;
        if encryption_key.kind() != KeyKind::Encryption {
            return Err(CryptoError::InvalidPublicKeyData.into());
        }
        if matches!(&signing_key, Some(key) if key.kind() != KeyKind::Signing) {
            return Err(CryptoError::InvalidPublicKeyData.into());
        }
        if let Some(existing) = self
            .contacts
            .iter()
            .find(|c| c.encryption_key == encryption_key)
        {
            return Err(MessengerError::DuplicateContact(existing.name.clone()));
        }

        let contact = Contact {
            id: crate::utils::uuid::generate_v4(),
            name: name.trim().to_string(),
            encryption_key,
            signing_key,
            added_at: crate::utils::time::current_timestamp(),
        };

        self.protected.save(
            &key_account(&contact.id, KeyKind::Encryption),
            contact.encryption_key.as_bytes(),
            AccessTier::AfterFirstUnlockThisDeviceOnly,
        )?;
        if let Some(signing) = &contact.signing_key {
            self.protected.save(
                &key_account(&contact.id, KeyKind::Signing),
                signing.as_bytes(),
                AccessTier::AfterFirstUnlockThisDeviceOnly,
            )?;
        }

        self.contacts.push(contact.clone());
        self.persist()?;
        tracing::info!(contact_id = %contact.id, key_id = %contact.key_id(), "contact added");
        Ok(contact)
    }

    /// Переименовать контакт (единственная допустимая мутация)
    pub fn rename(&mut self, contact_id: &str, name: &str) -> Result<()> {
        validate_contact_name(name)?;
        let contact = self
            .contacts
            .iter_mut()
            .find(|c| c.id == contact_id)
            .ok_or_else(|| MessengerError::NotFound(format!("Contact not found: {}", contact_id)))?;
        contact.name = name.trim().to_string();
        self.persist()
    }

    /// Удалить контакт вместе с ключами. Отсутствующий контакт не ошибка.
    pub fn remove(&mut self, contact_id: &str) -> Result<Option<Contact>> {
        self.protected
            .delete(&key_account(contact_id, KeyKind::Encryption))?;
        self.protected
            .delete(&key_account(contact_id, KeyKind::Signing))?;

        let unavailable_before = self.unavailable.len();
        self.unavailable.retain(|r| r.id != contact_id);
        let dropped_unavailable = self.unavailable.len() != unavailable_before;

        let removed = match self.contacts.iter().position(|c| c.id == contact_id) {
            Some(position) => Some(self.contacts.remove(position)),
            None => None,
        };
        if removed.is_some() || dropped_unavailable {
            self.persist()?;
            tracing::info!(contact_id = %contact_id, "contact removed");
        }
        Ok(removed)
    }

    /// Получить контакт по ID
    pub fn get(&self, contact_id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == contact_id)
    }

    /// Первый контакт с таким именем.
    ///
    /// Names are not unique, so this is a label match and not a binding to
    /// a key: two contacts sharing a name resolve to whichever was added first.
    pub fn find_by_name(&self, name: &str) -> Option<&Contact> {
        let name = name.trim();
        self.contacts.iter().find(|c| c.name == name)
    }

    pub fn find_by_fingerprint(&self, fingerprint: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.fingerprint() == fingerprint)
    }

    pub fn all(&self) -> &[Contact] {
        &self.contacts
    }

    /// Поиск контактов по имени (начинается с)
    pub fn search(&self, query: &str) -> Vec<&Contact> {
        let query_lower = query.to_lowercase();
        self.contacts
            .iter()
            .filter(|c| c.name.to_lowercase().starts_with(&query_lower))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Записи контактов, чьи ключи не удалось прочитать при загрузке
    pub fn unavailable(&self) -> &[ContactRecord] {
        &self.unavailable
    }

    fn persist(&self) -> Result<()> {
        let records: Vec<ContactRecord> = self
            .contacts
            .iter()
            .map(Contact::record)
            .chain(self.unavailable.iter().cloned())
            .collect();
        let bytes = serde_json::to_vec(&records)?;
        self.records.put(CONTACTS_RECORD, &bytes)
    }
}

fn read_records(records: &dyn RecordStore) -> Vec<ContactRecord> {
    let bytes = match records.get(CONTACTS_RECORD) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "contacts unreadable, starting empty");
            return Vec::new();
        }
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "contacts record corrupt, starting empty");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::suites::hybrid::HybridSuiteProvider;
    use crate::storage::memory::{MemoryProtectedStore, MemoryRecordStore};

    use std::sync::atomic::{AtomicBool, Ordering};
    use zeroize::Zeroizing;

    type Store = ContactStore<HybridSuiteProvider>;
    type Keys = KeyManager<HybridSuiteProvider>;

    /// Protected store whose reads fail while `failing` is set
    struct FlakyStore {
        inner: MemoryProtectedStore,
        failing: AtomicBool,
    }

    impl ProtectedStore for FlakyStore {
        fn save(&self, account: &str, data: &[u8], tier: AccessTier) -> Result<()> {
            self.inner.save(account, data, tier)
        }

        fn load(&self, account: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(MessengerError::StorageError("keychain busy".to_string()));
            }
            self.inner.load(account)
        }

        fn delete(&self, account: &str) -> Result<()> {
            self.inner.delete(account)
        }
    }

    fn open(protected: &MemoryProtectedStore, records: &MemoryRecordStore) -> Store {
        Store::load(Arc::new(protected.clone()), Arc::new(records.clone()))
    }

    fn encryption_key() -> PublicKey {
        Keys::generate_encryption_key_pair().unwrap().public
    }

    #[test]
    fn test_contact_store_add_get() {
        let (protected, records) = (MemoryProtectedStore::new(), MemoryRecordStore::new());
        let mut store = open(&protected, &records);

        let contact = store.add(" alice ", encryption_key(), None).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(contact.name, "alice");
        assert_eq!(store.get(&contact.id).unwrap().name, "alice");
        assert!(!contact.can_verify());
        assert_eq!(contact.key_id().len(), 16);
    }

    #[test]
    fn test_contact_store_search() {
        let (protected, records) = (MemoryProtectedStore::new(), MemoryRecordStore::new());
        let mut store = open(&protected, &records);

        store.add("alice", encryption_key(), None).unwrap();
        store.add("bob", encryption_key(), None).unwrap();
        store.add("alex", encryption_key(), None).unwrap();

        let results = store.search("al");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_duplicate_encryption_key_rejected() {
        let (protected, records) = (MemoryProtectedStore::new(), MemoryRecordStore::new());
        let mut store = open(&protected, &records);
        let key = encryption_key();

        store.add("alice", key.clone(), None).unwrap();
        let err = store.add("alice again", key, None).unwrap_err();
        assert!(matches!(err, MessengerError::DuplicateContact(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let (protected, records) = (MemoryProtectedStore::new(), MemoryRecordStore::new());
        let mut store = open(&protected, &records);

        let first = store.add("sam", encryption_key(), None).unwrap();
        store.add("sam", encryption_key(), None).unwrap();

        assert_eq!(store.find_by_name("sam").unwrap().id, first.id);
        assert_eq!(store.find_by_name(" sam ").unwrap().id, first.id);
    }

    #[test]
    fn test_reload_keeps_keys_and_order() {
        let (protected, records) = (MemoryProtectedStore::new(), MemoryRecordStore::new());
        let signing = Keys::generate_signing_key_pair().unwrap().public;
        {
            let mut store = open(&protected, &records);
            store.add("alice", encryption_key(), Some(signing.clone())).unwrap();
            store.add("bob", encryption_key(), None).unwrap();
        }

        let store = open(&protected, &records);
        let names: Vec<&str> = store.all().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(store.all()[0].signing_key.as_ref(), Some(&signing));
        assert_eq!(
            protected.tier_of(&key_account(&store.all()[0].id, KeyKind::Encryption)),
            Some(AccessTier::AfterFirstUnlockThisDeviceOnly)
        );
    }

    #[test]
    fn test_rename_and_remove() {
        let (protected, records) = (MemoryProtectedStore::new(), MemoryRecordStore::new());
        let mut store = open(&protected, &records);
        let contact = store.add("alice", encryption_key(), None).unwrap();

        store.rename(&contact.id, "Alice Liddell").unwrap();
        assert_eq!(store.get(&contact.id).unwrap().name, "Alice Liddell");
        assert!(store.rename("missing", "x").is_err());

        assert!(store.remove(&contact.id).unwrap().is_some());
        assert!(store.remove(&contact.id).unwrap().is_none());
        assert!(protected.is_empty());
    }

    #[test]
    fn test_find_by_fingerprint() {
        let (protected, records) = (MemoryProtectedStore::new(), MemoryRecordStore::new());
        let mut store = open(&protected, &records);
        store.add("alice", encryption_key(), None).unwrap();
        let bob = store.add("bob", encryption_key(), None).unwrap();

        let fingerprint = bob.fingerprint();
        assert_eq!(fingerprint, keys::fingerprint(bob.encryption_key.as_bytes()));
        assert_eq!(store.find_by_fingerprint(&fingerprint).unwrap().id, bob.id);
        assert!(store.find_by_fingerprint("0000 0000").is_none());
    }

    #[test]
    fn test_unreadable_keys_do_not_lose_contact() {
        let records = MemoryRecordStore::new();
        let flaky = Arc::new(FlakyStore {
            inner: MemoryProtectedStore::new(),
            failing: AtomicBool::new(false),
        });
        let alice_id = {
            let mut store = Store::load(flaky.clone(), Arc::new(records.clone()));
            store.add("alice", encryption_key(), None).unwrap().id
        };

        flaky.failing.store(true, Ordering::SeqCst);
        let mut store = Store::load(flaky.clone(), Arc::new(records.clone()));
        assert!(store.is_empty());
        assert_eq!(store.unavailable().len(), 1);
        flaky.failing.store(false, Ordering::SeqCst);
        store.add("bob", encryption_key(), None).unwrap();

        let store = Store::load(flaky.clone(), Arc::new(records.clone()));
        let names: Vec<&str> = store.all().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["bob", "alice"]);
        assert!(store.get(&alice_id).is_some());
    }

    #[test]
    fn test_remove_unavailable_contact() {
        let records = MemoryRecordStore::new();
        let flaky = Arc::new(FlakyStore {
            inner: MemoryProtectedStore::new(),
            failing: AtomicBool::new(false),
        });
        let alice_id = {
            let mut store = Store::load(flaky.clone(), Arc::new(records.clone()));
            store.add("alice", encryption_key(), None).unwrap().id
        };

        flaky.failing.store(true, Ordering::SeqCst);
        let mut store = Store::load(flaky.clone(), Arc::new(records.clone()));
        assert!(store.remove(&alice_id).unwrap().is_none());
        assert!(store.unavailable().is_empty());

        flaky.failing.store(false, Ordering::SeqCst);
        assert!(Store::load(flaky, Arc::new(records)).all().is_empty());
    }

    #[test]
    fn test_corrupt_record_starts_empty() {
        let (protected, records) = (MemoryProtectedStore::new(), MemoryRecordStore::new());
        records.put(CONTACTS_RECORD, b"{not json").unwrap();

        let store = open(&protected, &records);
        assert!(store.is_empty());
    }

    #[test]
    fn test_signing_key_as_encryption_key_rejected() {
        let (protected, records) = (MemoryProtectedStore::new(), MemoryRecordStore::new());
        let mut store = open(&protected, &records);
        let signing = Keys::generate_signing_key_pair().unwrap().public;

        assert!(store.add("mallory", signing, None).is_err());
    }
}
