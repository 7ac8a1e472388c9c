//! Криптографические наборы (Crypto Suites)
//!
//! Этот модуль содержит реализации CryptoProvider trait.
//!
//! ## Hybrid Suite
//! - **KEM**: X25519 + Kyber-768
//! - **Signatures**: Dilithium3
//! - **AEAD**: ChaCha20-Poly1305
//! - **KDF**: HKDF-SHA256
//! - **Suite ID**: [`hybrid::HYBRID_SUITE_ID`]
//!
//! ```rust
//! use pqmsg_core::crypto::suites::hybrid::HybridSuiteProvider;
//! use pqmsg_core::crypto::provider::CryptoProvider;
//!
//! let (private_key, public_key) = HybridSuiteProvider::generate_kem_keys().unwrap();
//! let (enc, ct) = HybridSuiteProvider::seal(&public_key, b"hi", b"aad").unwrap();
//! let pt = HybridSuiteProvider::open(&private_key, &enc, &ct, b"aad").unwrap();
//! assert_eq!(pt.as_slice(), b"hi");
//! ```

pub mod hybrid;
