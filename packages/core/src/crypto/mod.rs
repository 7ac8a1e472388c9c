//! Криптографический модуль
//!
//! # Архитектура
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   AppState (state::app)                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │   KeyManager (keys)       │  │  MessageCrypto           │
//! │  - keygen                 │  │  - encrypt(+sign)        │
//! │  - export / import        │  │  - decrypt(+verify)      │
//! │  - key id, fingerprint    │  │  - signature policy      │
//! └───────────────────────────┘  └──────────────────────────┘
//!                │                           │
//!                └─────────────┬─────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              CryptoProvider (Crypto-Agility)                │
//! │  - KEM (X25519 + Kyber-768)                                 │
//! │  - Signatures (Dilithium3)                                  │
//! │  - AEAD (ChaCha20-Poly1305)                                 │
//! │  - KDF (HKDF-SHA256)                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

/// CryptoProvider trait для crypto-agility
pub mod provider;

/// Криптографические наборы
pub mod suites;

/// KeyManager: генерация и форматы ключей
pub mod keys;

/// Шифрование/подпись конвертов
pub mod message_crypto;

pub use keys::{KeyKind, KeyManager, KeyPair, PrivateKey, PublicKey};
pub use message_crypto::{DecryptedMessage, MessageCrypto, SignatureStatus};
pub use provider::CryptoProvider;
