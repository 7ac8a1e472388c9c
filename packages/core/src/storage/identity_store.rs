// Хранилище собственной идентичности
// Приватные ключи: unlocked-only tier, публичные: after-first-unlock tier,
// профиль: обычная JSON-запись

use crate::config::Config;
use crate::crypto::keys::{KeyKind, KeyManager, KeyPair};
use crate::crypto::CryptoProvider;
use crate::storage::models::IdentityProfile;
use crate::storage::protected::{AccessTier, ProtectedStore};
use crate::storage::records::RecordStore;
use crate::utils::error::Result;
use std::marker::PhantomData;
use std::sync::Arc;

pub const ENCRYPTION_PRIVATE_ACCOUNT: &str = "identity.encryption.private";
pub const ENCRYPTION_PUBLIC_ACCOUNT: &str = "identity.encryption.public";
pub const SIGNING_PRIVATE_ACCOUNT: &str = "identity.signing.private";
pub const SIGNING_PUBLIC_ACCOUNT: &str = "identity.signing.public";
pub const PROFILE_RECORD: &str = "identity";

pub(crate) fn accounts_for(kind: KeyKind) -> (&'static str, &'static str) {
    match kind {
        KeyKind::Encryption => (ENCRYPTION_PRIVATE_ACCOUNT, ENCRYPTION_PUBLIC_ACCOUNT),
        KeyKind::Signing => (SIGNING_PRIVATE_ACCOUNT, SIGNING_PUBLIC_ACCOUNT),
    }
}

/// Локальный владелец: профиль и ноль, одна или две пары ключей
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub profile: IdentityProfile,
    pub encryption: Option<KeyPair>,
    pub signing: Option<KeyPair>,
}

impl Identity {
    /// `"name <email>"`, иначе то, что есть, иначе плейсхолдер
    pub fn label(&self) -> String {
        let name = self.profile.display_name.trim();
        let email = self.profile.email.trim();
        match (name.is_empty(), email.is_empty()) {
            (false, false) => format!("{} <{}>", name, email),
            (false, true) => name.to_string(),
            (true, false) => email.to_string(),
            (true, true) => Config::global().default_identity_label.clone(),
        }
    }

    pub fn has_encryption_keys(&self) -> bool {
        self.encryption.is_some()
    }

    pub fn has_signing_keys(&self) -> bool {
        self.signing.is_some()
    }
}

pub struct IdentityStore<P: CryptoProvider> {
    protected: Arc<dyn ProtectedStore>,
    records: Arc<dyn RecordStore>,
    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> IdentityStore<P> {
    pub fn new(protected: Arc<dyn ProtectedStore>, records: Arc<dyn RecordStore>) -> Self {
        Self {
            protected,
            records,
            _phantom: PhantomData,
        }
    }

    /// Загрузить профиль и обе пары.
    /// Stored keys that fail their integrity check are an error, not "absent".
    pub fn load(&self) -> Result<Identity> {
        Ok(Identity {
            profile: self.load_profile(),
            encryption: self.load_pair(KeyKind::Encryption)?,
            signing: self.load_pair(KeyKind::Signing)?,
        })
    }

    pub fn load_profile(&self) -> IdentityProfile {
        let bytes = match self.records.get(PROFILE_RECORD) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return IdentityProfile::default(),
            Err(e) => {
                tracing::warn!(error = %e, "identity profile unreadable, using empty profile");
                return IdentityProfile::default();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "identity profile corrupt, using empty profile");
            IdentityProfile::default()
        })
    }

    pub fn load_pair(&self, kind: KeyKind) -> Result<Option<KeyPair>> {
        let (private_account, public_account) = accounts_for(kind);
        let private = self.protected.load(private_account)?;
        let public = self.protected.load(public_account)?;

        match (private, public) {
            (None, None) => Ok(None),
            (Some(private), Some(public)) => {
                let private = KeyManager::<P>::import_private(kind, &private)?;
                let public = KeyManager::<P>::import_public(kind, &public)?;
                Ok(Some(KeyManager::<P>::pair_from_parts(private, public)?))
            }
            (Some(private), None) if kind == KeyKind::Encryption => {
                let private = KeyManager::<P>::import_private(kind, &private)?;
                let public = KeyManager::<P>::encryption_public_from_private(&private)?;
                tracing::warn!(%kind, "public half missing, restored from private key");
                self.protected.save(
                    public_account,
                    public.as_bytes(),
                    AccessTier::AfterFirstUnlockThisDeviceOnly,
                )?;
                Ok(Some(KeyManager::<P>::pair_from_parts(private, public)?))
            }
            (private, _) => {
                tracing::warn!(
                    %kind,
                    private_present = private.is_some(),
                    "incomplete key pair in protected store, treating as absent"
                );
                Ok(None)
            }
        }
    }

    /// Сохранить пару: приватную половину в unlocked-only tier
    pub fn save_pair(&self, pair: &KeyPair) -> Result<()> {
        let (private_account, public_account) = accounts_for(pair.kind);
        let exported = KeyManager::<P>::export_private(pair);
        self.protected.save(
            private_account,
            &exported,
            AccessTier::WhenUnlockedThisDeviceOnly,
        )?;
        self.protected.save(
            public_account,
            &KeyManager::<P>::export_public(pair),
            AccessTier::AfterFirstUnlockThisDeviceOnly,
        )?;
        Ok(())
    }

    pub fn save_profile(&self, profile: &IdentityProfile) -> Result<()> {
        let bytes = serde_json::to_vec(profile)?;
        self.records.put(PROFILE_RECORD, &bytes)
    }

    /// Удалить пару. Отсутствующая пара не ошибка.
    pub fn delete_pair(&self, kind: KeyKind) -> Result<()> {
        let (private_account, public_account) = accounts_for(kind);
        self.protected.delete(private_account)?;
        self.protected.delete(public_account)?;
        Ok(())
    }

    /// Удалить ключи и профиль целиком
    pub fn delete(&self) -> Result<()> {
        self.delete_pair(KeyKind::Encryption)?;
        self.delete_pair(KeyKind::Signing)?;
        self.records.remove(PROFILE_RECORD)?;
        tracing::info!("identity deleted");
        Ok(())
    }
}
