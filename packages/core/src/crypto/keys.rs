// Управление ключами
// Генерация, экспорт/импорт и идентификаторы ключей

use crate::config::Config;
use crate::crypto::CryptoProvider;
use crate::error::CryptoError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::marker::PhantomData;
use zeroize::Zeroizing;

/// Заголовок экспортированного приватного ключа
const PRIVATE_EXPORT_MAGIC: &[u8; 3] = b"PQK";
const PRIVATE_EXPORT_VERSION: u8 = 1;
const PRIVATE_EXPORT_HEADER_LEN: usize = 5;
const PRIVATE_EXPORT_CHECKSUM_LEN: usize = 32;

/// Назначение пары ключей
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    Encryption,
    Signing,
}

impl KeyKind {
    fn tag(self) -> u8 {
        match self {
            KeyKind::Encryption => 0x01,
            KeyKind::Signing => 0x02,
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Encryption => write!(f, "encryption"),
            KeyKind::Signing => write!(f, "signing"),
        }
    }
}

/// Публичный ключ (сырые байты провайдера)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    kind: KeyKind,
    bytes: Vec<u8>,
}

impl PublicKey {
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Приватный ключ. Байты обнуляются при drop и не попадают в Debug.
#[derive(Clone)]
pub struct PrivateKey {
    kind: KeyKind,
    bytes: Zeroizing<Vec<u8>>,
}

impl PrivateKey {
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("kind", &self.kind)
            .field("bytes", &"<redacted>")
            .finish()
    }
}

/// Пара ключей одного назначения
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub kind: KeyKind,
    pub private: PrivateKey,
    pub public: PublicKey,
}

/// Менеджер криптографических ключей
pub struct KeyManager<P: CryptoProvider> {
    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> KeyManager<P> {
    /// Сгенерировать пару для шифрования (hybrid KEM)
    pub fn generate_encryption_key_pair() -> Result<KeyPair, CryptoError> {
        let (private, public) =
            P::generate_kem_keys().map_err(|_| CryptoError::KeyGenerationFailed)?;
        let pair = Self::assemble(KeyKind::Encryption, private, public)?;
        tracing::info!(key_id = %key_id(pair.public.as_bytes()), "generated encryption key pair");
        Ok(pair)
    }

    /// Сгенерировать пару для подписи
    pub fn generate_signing_key_pair() -> Result<KeyPair, CryptoError> {
        let (private, public) =
            P::generate_signature_keys().map_err(|_| CryptoError::KeyGenerationFailed)?;
        let pair = Self::assemble(KeyKind::Signing, private, public)?;
        tracing::info!(key_id = %key_id(pair.public.as_bytes()), "generated signing key pair");
        Ok(pair)
    }

    /// Both halves or neither: a pair the provider would reject is never returned.
    fn assemble(
        kind: KeyKind,
        private: Zeroizing<Vec<u8>>,
        public: Vec<u8>,
    ) -> Result<KeyPair, CryptoError> {
        let checked = match kind {
            KeyKind::Encryption => {
                P::check_kem_private_key(&private).and_then(|_| P::check_kem_public_key(&public))
            }
            KeyKind::Signing => P::check_signature_private_key(&private)
                .and_then(|_| P::check_signature_public_key(&public)),
        };
        checked.map_err(|_| CryptoError::KeyGenerationFailed)?;

        Ok(KeyPair {
            kind,
            private: PrivateKey { kind, bytes: private },
            public: PublicKey { kind, bytes: public },
        })
    }

    /// Экспорт публичного ключа: сырые байты фиксированной длины, без обрамления
    pub fn export_public(pair: &KeyPair) -> Vec<u8> {
        pair.public.bytes.clone()
    }

    /// Экспорт приватного ключа с контрольной суммой:
    /// `"PQK" || version || kind || raw || SHA-256(всё предыдущее)`
    pub fn export_private(pair: &KeyPair) -> Zeroizing<Vec<u8>> {
        Self::export_private_key(&pair.private)
    }

    pub fn export_private_key(key: &PrivateKey) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(
            PRIVATE_EXPORT_HEADER_LEN + key.bytes.len() + PRIVATE_EXPORT_CHECKSUM_LEN,
        ));
        out.extend_from_slice(PRIVATE_EXPORT_MAGIC);
        out.push(PRIVATE_EXPORT_VERSION);
        out.push(key.kind.tag());
        out.extend_from_slice(&key.bytes);
        let checksum = Sha256::digest(out.as_slice());
        out.extend_from_slice(&checksum);
        out
    }

    /// Импорт публичного ключа
    pub fn import_public(kind: KeyKind, bytes: &[u8]) -> Result<PublicKey, CryptoError> {
        match kind {
            KeyKind::Encryption => P::check_kem_public_key(bytes),
            KeyKind::Signing => P::check_signature_public_key(bytes),
        }
        .map_err(|_| CryptoError::InvalidPublicKeyData)?;

        Ok(PublicKey {
            kind,
            bytes: bytes.to_vec(),
        })
    }

    /// Импорт приватного ключа из формата [`KeyManager::export_private`]
    pub fn import_private(kind: KeyKind, bytes: &[u8]) -> Result<PrivateKey, CryptoError> {
        let expected_raw = match kind {
            KeyKind::Encryption => P::kem_private_key_len(),
            KeyKind::Signing => P::signature_private_key_len(),
        };
        if bytes.len() != PRIVATE_EXPORT_HEADER_LEN + expected_raw + PRIVATE_EXPORT_CHECKSUM_LEN {
            return Err(CryptoError::InvalidPrivateKeyData);
        }
        if &bytes[..3] != PRIVATE_EXPORT_MAGIC
            || bytes[3] != PRIVATE_EXPORT_VERSION
            || bytes[4] != kind.tag()
        {
            return Err(CryptoError::InvalidPrivateKeyData);
        }

        let (body, checksum) = bytes.split_at(bytes.len() - PRIVATE_EXPORT_CHECKSUM_LEN);
        if Sha256::digest(body).as_slice() != checksum {
            tracing::warn!(%kind, "private key checksum mismatch");
            return Err(CryptoError::InvalidPrivateKeyData);
        }

        Self::import_raw_private(kind, &body[PRIVATE_EXPORT_HEADER_LEN..])
    }

    /// Raw provider bytes without the integrity envelope. Only the legacy
    /// migration path reads keys in this form.
    pub(crate) fn import_raw_private(kind: KeyKind, raw: &[u8]) -> Result<PrivateKey, CryptoError> {
        match kind {
            KeyKind::Encryption => P::check_kem_private_key(raw),
            KeyKind::Signing => P::check_signature_private_key(raw),
        }
        .map_err(|_| CryptoError::InvalidPrivateKeyData)?;

        Ok(PrivateKey {
            kind,
            bytes: Zeroizing::new(raw.to_vec()),
        })
    }

    /// Собрать пару из импортированных половин
    pub fn pair_from_parts(private: PrivateKey, public: PublicKey) -> Result<KeyPair, CryptoError> {
        if private.kind != public.kind {
            return Err(CryptoError::InvalidPrivateKeyData);
        }
        if private.kind == KeyKind::Encryption
            && P::kem_public_from_private(&private.bytes)? != public.bytes
        {
            return Err(CryptoError::InvalidPublicKeyData);
        }
        Ok(KeyPair {
            kind: private.kind,
            private,
            public,
        })
    }

    /// Восстановить публичную половину пары шифрования по приватной
    pub fn encryption_public_from_private(private: &PrivateKey) -> Result<PublicKey, CryptoError> {
        if private.kind != KeyKind::Encryption {
            return Err(CryptoError::InvalidPrivateKeyData);
        }
        let bytes = P::kem_public_from_private(&private.bytes)?;
        Ok(PublicKey {
            kind: KeyKind::Encryption,
            bytes,
        })
    }
}

fn truncated_sha512(public_bytes: &[u8], len: usize) -> Vec<u8> {
    let digest = Sha512::digest(public_bytes);
    digest[..len.min(digest.len())].to_vec()
}

/// Короткий идентификатор ключа (hex), только для отображения и сопоставления
pub fn key_id(public_bytes: &[u8]) -> String {
    hex::encode(truncated_sha512(public_bytes, Config::global().key_id_bytes))
}

/// Fingerprint для сверки вне канала: `ABCD EF01 ...`
pub fn fingerprint(public_bytes: &[u8]) -> String {
    let cfg = Config::global();
    let hex = hex::encode_upper(truncated_sha512(public_bytes, cfg.fingerprint_bytes));
    hex.as_bytes()
        .chunks(cfg.fingerprint_group_size.max(1))
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
