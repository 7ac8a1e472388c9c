// In-memory хранилища для тестов и платформ без Keychain

use crate::storage::protected::{AccessTier, ProtectedStore};
use crate::storage::records::RecordStore;
use crate::utils::error::{MessengerError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use zeroize::Zeroizing;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| MessengerError::StorageError("Storage lock poisoned".to_string()))
}

/// In-memory защищённое хранилище. Клоны разделяют одно состояние.
///
/// `set_locked(true)` simulates a locked device: items in the
/// unlocked-only tier become unreadable until unlocked again.
#[derive(Clone, Default)]
pub struct MemoryProtectedStore {
    items: Arc<Mutex<HashMap<String, (AccessTier, Zeroizing<Vec<u8>>)>>>,
    locked: Arc<AtomicBool>,
}

impl MemoryProtectedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }

    /// Уровень доступа записи (для тестов)
    pub fn tier_of(&self, account: &str) -> Option<AccessTier> {
        lock(&self.items)
            .ok()
            .and_then(|items| items.get(account).map(|(tier, _)| *tier))
    }

    pub fn len(&self) -> usize {
        lock(&self.items).map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProtectedStore for MemoryProtectedStore {
    fn save(&self, account: &str, data: &[u8], tier: AccessTier) -> Result<()> {
        lock(&self.items)?.insert(account.to_string(), (tier, Zeroizing::new(data.to_vec())));
        Ok(())
    }

    fn load(&self, account: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        let items = lock(&self.items)?;
        match items.get(account) {
            Some((AccessTier::WhenUnlockedThisDeviceOnly, _))
                if self.locked.load(Ordering::SeqCst) =>
            {
                Err(MessengerError::StorageError(format!(
                    "{} is unavailable while the device is locked",
                    account
                )))
            }
            Some((_, data)) => Ok(Some(data.clone())),
            None => Ok(None),
        }
    }

    fn delete(&self, account: &str) -> Result<()> {
        lock(&self.items)?.remove(account);
        Ok(())
    }
}

/// In-memory хранилище записей. Клоны разделяют одно состояние.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.records)
            .map(|records| {
                let mut keys: Vec<String> = records.keys().cloned().collect();
                keys.sort();
                keys
            })
            .unwrap_or_default()
    }

    // === Утилиты ===

    pub fn clear_all(&self) -> Result<()> {
        lock(&self.records)?.clear();
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(lock(&self.records)?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        lock(&self.records)?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.records)?.remove(key);
        Ok(())
    }
}
