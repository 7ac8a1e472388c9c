// Одноразовая миграция ключей из незащищённого хранилища
// Безопасно вызывать при каждом старте: без legacy-записей ничего не делает

use crate::crypto::keys::{KeyKind, KeyManager};
use crate::crypto::CryptoProvider;
use crate::storage::identity_store::accounts_for;
use crate::storage::protected::{AccessTier, ProtectedStore};
use crate::storage::records::RecordStore;
use crate::utils::error::Result;

pub const LEGACY_ENCRYPTION_PRIVATE: &str = "legacy.encryption.private";
pub const LEGACY_ENCRYPTION_PUBLIC: &str = "legacy.encryption.public";
pub const LEGACY_SIGNING_PRIVATE: &str = "legacy.signing.private";
pub const LEGACY_SIGNING_PUBLIC: &str = "legacy.signing.public";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Legacy record keys moved into the protected store and removed
    pub migrated: Vec<String>,
    /// Legacy record keys left in place because they could not be read
    pub skipped: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.migrated.is_empty() && self.skipped.is_empty()
    }
}

/// Перенести legacy-ключи в защищённые tiers и удалить старые копии.
///
/// Private keys may be raw provider bytes or already in the export format;
/// either way they are stored in the export format. Existing protected
/// entries are never overwritten; a legacy copy that disagrees with one is
/// reported as skipped and left in place.
pub fn migrate_legacy_keys<P: CryptoProvider>(
    records: &dyn RecordStore,
    protected: &dyn ProtectedStore,
) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();

    for (kind, legacy_private, legacy_public) in [
        (KeyKind::Encryption, LEGACY_ENCRYPTION_PRIVATE, LEGACY_ENCRYPTION_PUBLIC),
        (KeyKind::Signing, LEGACY_SIGNING_PRIVATE, LEGACY_SIGNING_PUBLIC),
    ] {
        let (private_account, public_account) = accounts_for(kind);

        if let Some(bytes) = records.get(legacy_private)? {
            let private = KeyManager::<P>::import_private(kind, &bytes)
                .or_else(|_| KeyManager::<P>::import_raw_private(kind, &bytes));
            match private {
                Ok(private) => {
                    let exported = KeyManager::<P>::export_private_key(&private);
                    if store_if_absent(
                        protected,
                        private_account,
                        &exported,
                        AccessTier::WhenUnlockedThisDeviceOnly,
                    )? {
                        records.remove(legacy_private)?;
                        report.migrated.push(legacy_private.to_string());
                    } else {
                        tracing::warn!(%kind, "legacy private key conflicts with stored key, left in place");
                        report.skipped.push(legacy_private.to_string());
                    }
                }
                Err(e) => {
                    tracing::warn!(%kind, error = %e, "legacy private key unreadable, left in place");
                    report.skipped.push(legacy_private.to_string());
                }
            }
        }

        if let Some(bytes) = records.get(legacy_public)? {
            match KeyManager::<P>::import_public(kind, &bytes) {
                Ok(public) => {
                    if store_if_absent(
                        protected,
                        public_account,
                        public.as_bytes(),
                        AccessTier::AfterFirstUnlockThisDeviceOnly,
                    )? {
                        records.remove(legacy_public)?;
                        report.migrated.push(legacy_public.to_string());
                    } else {
                        tracing::warn!(%kind, "legacy public key conflicts with stored key, left in place");
                        report.skipped.push(legacy_public.to_string());
                    }
                }
                Err(e) => {
                    tracing::warn!(%kind, error = %e, "legacy public key unreadable, left in place");
                    report.skipped.push(legacy_public.to_string());
                }
            }
        }
    }

    if !report.is_noop() {
        tracing::info!(
            migrated = report.migrated.len(),
            skipped = report.skipped.len(),
            "legacy key migration finished"
        );
    }
    Ok(report)
}

/// `false` if the account already holds different bytes
fn store_if_absent(
    protected: &dyn ProtectedStore,
    account: &str,
    data: &[u8],
    tier: AccessTier,
) -> Result<bool> {
    match protected.load(account)? {
        Some(existing) => Ok(existing.as_slice() == data),
        None => {
            protected.save(account, data, tier)?;
            Ok(true)
        }
    }
}
