// Защищённое хранилище (Keychain-подобное) с уровнями доступа

use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Уровень доступа к записи защищённого хранилища
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessTier {
    /// Только пока устройство разблокировано, без синхронизации. Для приватных ключей.
    WhenUnlockedThisDeviceOnly,
    /// После первой разблокировки, без синхронизации. Для публичных ключей.
    AfterFirstUnlockThisDeviceOnly,
}

/// Контракт внешнего защищённого хранилища.
///
/// `delete` of an absent account is not an error. Implementations must never
/// move items off the device.
pub trait ProtectedStore: Send + Sync {
    fn save(&self, account: &str, data: &[u8], tier: AccessTier) -> Result<()>;

    fn load(&self, account: &str) -> Result<Option<Zeroizing<Vec<u8>>>>;

    fn delete(&self, account: &str) -> Result<()>;
}
