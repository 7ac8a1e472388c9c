// pqmsg core
// Постквантовые конверты сообщений и жизненный цикл ключей

#![warn(clippy::all)]

// Модули
pub mod config;
pub mod crypto;
pub mod error;
pub mod protocol;
pub mod state;
pub mod storage;
pub mod utils;

// Re-exports для удобства
pub use crypto::suites::hybrid::{HybridSuiteProvider, HYBRID_SUITE_ID};
pub use crypto::{
    CryptoProvider, DecryptedMessage, KeyKind, KeyManager, KeyPair, MessageCrypto, PrivateKey,
    PublicKey, SignatureStatus,
};
pub use error::CryptoError;
pub use protocol::{AuthenticatedMetadata, EncryptedEnvelope, EnvelopeCodec};
pub use state::{AppState, UiState};
pub use utils::error::{MessengerError, Result};

/// Состояние приложения на единственном поддерживаемом наборе
pub type DefaultAppState = AppState<HybridSuiteProvider>;
