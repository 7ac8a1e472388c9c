//! Tests for the hybrid suite and the envelope protocol
//!
//! This test suite covers:
//! - Hybrid Suite Provider (X25519 + Kyber-768, Dilithium3, ChaCha20-Poly1305)
//! - KeyManager export/import
//! - MessageCrypto encrypt/sign and decrypt/verify
//! - Envelope wire format
//! - Error Handling

use pqmsg_core::crypto::CryptoProvider;
use pqmsg_core::{
    CryptoError, EncryptedEnvelope, EnvelopeCodec, HybridSuiteProvider, KeyKind, KeyManager,
    MessageCrypto, SignatureStatus, HYBRID_SUITE_ID,
};

type Keys = KeyManager<HybridSuiteProvider>;
type Messages = MessageCrypto<HybridSuiteProvider>;

fn codec() -> EnvelopeCodec {
    EnvelopeCodec::new(HYBRID_SUITE_ID)
}

fn with_ciphertext(envelope: &EncryptedEnvelope, ciphertext: Vec<u8>) -> EncryptedEnvelope {
    EncryptedEnvelope::new(
        envelope.encapsulated_key().to_vec(),
        ciphertext,
        envelope.authenticated_metadata().to_vec(),
        envelope.ciphersuite_id(),
        envelope.signature().map(<[u8]>::to_vec),
    )
}

fn with_signature(envelope: &EncryptedEnvelope, signature: Vec<u8>) -> EncryptedEnvelope {
    EncryptedEnvelope::new(
        envelope.encapsulated_key().to_vec(),
        envelope.ciphertext().to_vec(),
        envelope.authenticated_metadata().to_vec(),
        envelope.ciphersuite_id(),
        Some(signature),
    )
}

/// Test that HybridSuiteProvider produces keys of the advertised sizes
#[test]
fn test_hybrid_suite_generate_kem_keys() {
    let (private_key, public_key) = HybridSuiteProvider::generate_kem_keys().unwrap();

    assert_eq!(private_key.len(), HybridSuiteProvider::kem_private_key_len());
    assert_eq!(public_key.len(), HybridSuiteProvider::kem_public_key_len());
    assert_eq!(public_key.len(), 32 + 1184, "X25519 || Kyber-768 public key");
}

/// Test signature creation and verification
#[test]
fn test_hybrid_suite_sign_verify() {
    let (signing_key, verifying_key) = HybridSuiteProvider::generate_signature_keys().unwrap();
    let message = b"Hello, Construct Messenger!";

    let signature = HybridSuiteProvider::sign(&signing_key, message).unwrap();
    assert_eq!(signature.len(), HybridSuiteProvider::signature_len());

    assert!(HybridSuiteProvider::verify(&verifying_key, message, &signature).is_ok());

    let wrong_message = b"Wrong message";
    assert!(
        HybridSuiteProvider::verify(&verifying_key, wrong_message, &signature).is_err(),
        "Signature should not verify a different message"
    );
}

/// Test that every plaintext survives encrypt then decrypt
#[test]
fn test_round_trip_various_plaintexts() {
    let recipient = Keys::generate_encryption_key_pair().unwrap();
    let long = "x".repeat(64 * 1024);

    for plaintext in ["a", "Привет, мир", "emoji 🔐 ok", long.as_str()] {
        let envelope = Messages::encrypt(plaintext.as_bytes(), &recipient.public, b"{}").unwrap();
        let decrypted = Messages::decrypt(&envelope, &recipient.private).unwrap();
        assert_eq!(decrypted.plaintext.as_str(), plaintext);
        assert_eq!(decrypted.signature_status, SignatureStatus::None);
    }
}

/// The fixed self-test scenario
#[test]
fn test_encrypt_sign_decrypt_verify_scenario() {
    let encryption = Keys::generate_encryption_key_pair().unwrap();
    let signing = Keys::generate_signing_key_pair().unwrap();
    let message = "Hello, post-quantum world!";

    let envelope =
        Messages::encrypt_and_sign(message.as_bytes(), &encryption.public, b"meta", &signing.private)
            .unwrap();
    assert!(envelope.is_signed());

    let decrypted =
        Messages::decrypt_and_verify(&envelope, &encryption.private, Some(&signing.public)).unwrap();
    assert_eq!(decrypted.plaintext.as_str(), message);
    assert_eq!(decrypted.signature_status, SignatureStatus::Verified);
}

/// Flipping any ciphertext byte is caught, by the signature or by the AEAD
#[test]
fn test_tamper_detection_ciphertext() {
    let encryption = Keys::generate_encryption_key_pair().unwrap();
    let signing = Keys::generate_signing_key_pair().unwrap();
    let envelope =
        Messages::encrypt_and_sign(b"attack at dawn", &encryption.public, b"m", &signing.private)
            .unwrap();

    let len = envelope.ciphertext().len();
    for index in [0, len / 2, len - 1] {
        let mut ciphertext = envelope.ciphertext().to_vec();
        ciphertext[index] ^= 0x80;
        let tampered = with_ciphertext(&envelope, ciphertext);

        let verified =
            Messages::decrypt_and_verify(&tampered, &encryption.private, Some(&signing.public));
        assert!(matches!(verified, Err(CryptoError::VerificationFailed(_))));

        let unverified = Messages::decrypt(&tampered, &encryption.private);
        assert!(matches!(unverified, Err(CryptoError::DecryptionFailed(_))));
    }
}

/// Flipping a signature byte fails closed
#[test]
fn test_tamper_detection_signature() {
    let encryption = Keys::generate_encryption_key_pair().unwrap();
    let signing = Keys::generate_signing_key_pair().unwrap();
    let envelope =
        Messages::encrypt_and_sign(b"attack at dawn", &encryption.public, b"m", &signing.private)
            .unwrap();

    let mut signature = envelope.signature().unwrap().to_vec();
    signature[7] ^= 0x01;
    let tampered = with_signature(&envelope, signature);

    let result = Messages::decrypt_and_verify(&tampered, &encryption.private, Some(&signing.public));
    assert!(matches!(result, Err(CryptoError::VerificationFailed(_))));
}

/// Metadata is authenticated even though it travels in the clear
#[test]
fn test_metadata_is_authenticated() {
    let recipient = Keys::generate_encryption_key_pair().unwrap();
    let envelope = Messages::encrypt(b"hello", &recipient.public, b"from alice").unwrap();

    let forged = EncryptedEnvelope::new(
        envelope.encapsulated_key().to_vec(),
        envelope.ciphertext().to_vec(),
        b"from mallory".to_vec(),
        envelope.ciphersuite_id(),
        None,
    );
    assert!(matches!(
        Messages::decrypt(&forged, &recipient.private),
        Err(CryptoError::DecryptionFailed(_))
    ));
}

/// Decrypting with someone else's key fails
#[test]
fn test_wrong_private_key() {
    let alice = Keys::generate_encryption_key_pair().unwrap();
    let bob = Keys::generate_encryption_key_pair().unwrap();
    let envelope = Messages::encrypt(b"for alice", &alice.public, b"").unwrap();

    assert!(matches!(
        Messages::decrypt(&envelope, &bob.private),
        Err(CryptoError::DecryptionFailed(_))
    ));
}

/// Unsigned, verified and signed-but-unverifiable stay distinct
#[test]
fn test_three_signature_states_are_distinct() {
    let encryption = Keys::generate_encryption_key_pair().unwrap();
    let signing = Keys::generate_signing_key_pair().unwrap();

    let unsigned = Messages::encrypt(b"m", &encryption.public, b"").unwrap();
    let signed = Messages::encrypt_and_sign(b"m", &encryption.public, b"", &signing.private).unwrap();

    let a = Messages::decrypt_and_verify(&unsigned, &encryption.private, Some(&signing.public))
        .unwrap()
        .signature_status;
    let b = Messages::decrypt_and_verify(&signed, &encryption.private, Some(&signing.public))
        .unwrap()
        .signature_status;
    let c = Messages::decrypt_and_verify(&signed, &encryption.private, None)
        .unwrap()
        .signature_status;

    assert_eq!(a, SignatureStatus::None);
    assert_eq!(b, SignatureStatus::Verified);
    assert_eq!(c, SignatureStatus::PresentButKeyUnknown);
}

/// Truncated, oversized and random key bytes are always rejected
#[test]
fn test_malformed_key_import() {
    let encryption = Keys::generate_encryption_key_pair().unwrap();
    let public = Keys::export_public(&encryption);
    let private = Keys::export_private(&encryption);

    let mut oversized = public.clone();
    oversized.push(0);
    for bad in [&public[..public.len() - 1], &oversized[..], &[0x42u8; 17][..], &[][..]] {
        assert_eq!(
            Keys::import_public(KeyKind::Encryption, bad),
            Err(CryptoError::InvalidPublicKeyData)
        );
    }

    let mut corrupted = private.to_vec();
    let middle = corrupted.len() / 2;
    corrupted[middle] ^= 0x01;
    assert!(matches!(
        Keys::import_private(KeyKind::Encryption, &corrupted),
        Err(CryptoError::InvalidPrivateKeyData)
    ));
    assert!(matches!(
        Keys::import_private(KeyKind::Encryption, &private[..private.len() - 1]),
        Err(CryptoError::InvalidPrivateKeyData)
    ));
    assert!(matches!(
        Keys::import_private(KeyKind::Signing, &private),
        Err(CryptoError::InvalidPrivateKeyData)
    ));

    let restored = Keys::import_private(KeyKind::Encryption, &private).unwrap();
    assert_eq!(restored.as_bytes(), encryption.private.as_bytes());
}

/// Envelope survives the transmissible form, signed or not
#[test]
fn test_envelope_transmissible_round_trip() {
    let encryption = Keys::generate_encryption_key_pair().unwrap();
    let signing = Keys::generate_signing_key_pair().unwrap();
    let codec = codec();

    let unsigned = Messages::encrypt(b"one", &encryption.public, b"{}").unwrap();
    let signed = Messages::encrypt_and_sign(b"two", &encryption.public, b"{}", &signing.private).unwrap();

    for envelope in [unsigned, signed] {
        let text = codec.to_transmissible(&envelope).unwrap();
        assert_eq!(codec.from_transmissible(&text).unwrap(), envelope);
    }
}

/// Garbage and foreign suites are rejected as InvalidMessageFormat
#[test]
fn test_envelope_rejects_garbage() {
    let codec = codec();
    assert_eq!(
        codec.from_transmissible("not base64 at all!").unwrap_err(),
        CryptoError::InvalidMessageFormat
    );

    let foreign = EncryptedEnvelope::new(vec![1], vec![2], vec![3], "ROT13-None", None);
    let text = EnvelopeCodec::new("ROT13-None").to_transmissible(&foreign).unwrap();
    assert_eq!(
        codec.from_transmissible(&text).unwrap_err(),
        CryptoError::InvalidMessageFormat
    );
}
