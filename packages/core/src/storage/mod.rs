// Модуль хранилища
// Защищённое хранилище для ключей, обычное для профиля, контактов и сообщений

pub mod contact_store;
pub mod identity_store;
#[cfg(feature = "keyring")]
pub mod keyring;
pub mod memory;
pub mod message_store;
pub mod migration;
pub mod models;
pub mod protected;
pub mod records;

pub use contact_store::{Contact, ContactStore};
pub use identity_store::{Identity, IdentityStore};
#[cfg(feature = "keyring")]
pub use self::keyring::KeyringProtectedStore;
pub use memory::{MemoryProtectedStore, MemoryRecordStore};
pub use message_store::{MessageStore, StoredMessage};
pub use migration::{migrate_legacy_keys, MigrationReport};
pub use protected::{AccessTier, ProtectedStore};
pub use records::{FileRecordStore, RecordStore};
