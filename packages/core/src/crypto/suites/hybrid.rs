use crate::crypto::provider::{CryptoProvider, AEAD_KEY_LEN, AEAD_NONCE_LEN};
use crate::error::CryptoError;
use chacha20poly1305::{
    aead::{Aead, Payload},
    ChaCha20Poly1305, Key as AeadKeyChacha, KeyInit, Nonce,
};
use hkdf::Hkdf;
use pqcrypto_dilithium::dilithium3;
use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::{
    Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _,
};
use pqcrypto_traits::sign::{
    DetachedSignature as _, PublicKey as _, SecretKey as _,
};
use rand::rngs::OsRng;
use rand_core::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

/// Ciphersuite literal carried in the envelope `scheme` field.
pub const HYBRID_SUITE_ID: &str = "X25519Kyber768-HKDF-SHA256-ChaCha20Poly1305";

const X25519_LEN: usize = 32;
// Kyber secret key = indcpa_sk || pk || H(pk) || z
const KYBER768_INDCPA_SECRET_LEN: usize = 1152;
const COMBINE_LABEL: &[u8] = b"pqmsg/v1 hybrid combine";

/// X25519 + Kyber-768 KEM, ChaCha20-Poly1305, Dilithium3.
pub struct HybridSuiteProvider;

impl HybridSuiteProvider {
    fn x25519_secret(bytes: &[u8]) -> Result<StaticSecret, CryptoError> {
        let raw: [u8; X25519_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPrivateKeyData)?;
        Ok(StaticSecret::from(raw))
    }

    fn x25519_public(bytes: &[u8]) -> Result<X25519Public, CryptoError> {
        let raw: [u8; X25519_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKeyData)?;
        Ok(X25519Public::from(raw))
    }

    /// Combine both shared secrets; the transcript binds the encapsulated key
    /// and the recipient key so a component cannot be swapped out.
    fn combine(
        dh: &[u8],
        kyber_ss: &[u8],
        encapsulated_key: &[u8],
        recipient_public: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let mut ikm = Zeroizing::new(Vec::with_capacity(dh.len() + kyber_ss.len()));
        ikm.extend_from_slice(dh);
        ikm.extend_from_slice(kyber_ss);

        let mut info = COMBINE_LABEL.to_vec();
        info.extend_from_slice(encapsulated_key);
        info.extend_from_slice(recipient_public);

        Self::hkdf_derive_key(HYBRID_SUITE_ID.as_bytes(), &ikm, &info, 32)
    }
}

impl CryptoProvider for HybridSuiteProvider {
    fn suite_id() -> &'static str {
        HYBRID_SUITE_ID
    }

    fn kem_public_key_len() -> usize {
        X25519_LEN + kyber768::public_key_bytes()
    }

    fn kem_private_key_len() -> usize {
        X25519_LEN + kyber768::secret_key_bytes()
    }

    fn signature_public_key_len() -> usize {
        dilithium3::public_key_bytes()
    }

    fn signature_private_key_len() -> usize {
        dilithium3::secret_key_bytes()
    }

    fn signature_len() -> usize {
        dilithium3::signature_bytes()
    }

    fn generate_kem_keys() -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), CryptoError> {
        let mut seed = Zeroizing::new([0u8; X25519_LEN]);
        OsRng.try_fill_bytes(&mut seed[..])?;
        let x_secret = StaticSecret::from(*seed);
        let x_public = X25519Public::from(&x_secret);

        let (k_public, k_secret) = kyber768::keypair();

        let mut private_key = Zeroizing::new(Vec::with_capacity(Self::kem_private_key_len()));
        private_key.extend_from_slice(x_secret.as_bytes());
        private_key.extend_from_slice(k_secret.as_bytes());

        let mut public_key = Vec::with_capacity(Self::kem_public_key_len());
        public_key.extend_from_slice(x_public.as_bytes());
        public_key.extend_from_slice(k_public.as_bytes());

        if private_key.len() != Self::kem_private_key_len()
            || public_key.len() != Self::kem_public_key_len()
        {
            return Err(CryptoError::KeyGenerationFailed);
        }
        Ok((private_key, public_key))
    }

    fn generate_signature_keys() -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), CryptoError> {
        let (public_key, secret_key) = dilithium3::keypair();
        let private_bytes = Zeroizing::new(secret_key.as_bytes().to_vec());
        let public_bytes = public_key.as_bytes().to_vec();

        if private_bytes.len() != Self::signature_private_key_len()
            || public_bytes.len() != Self::signature_public_key_len()
        {
            return Err(CryptoError::KeyGenerationFailed);
        }
        Ok((private_bytes, public_bytes))
    }

    fn check_kem_public_key(bytes: &[u8]) -> Result<(), CryptoError> {
        if bytes.len() != Self::kem_public_key_len() {
            return Err(CryptoError::InvalidPublicKeyData);
        }
        kyber768::PublicKey::from_bytes(&bytes[X25519_LEN..])
            .map_err(|_| CryptoError::InvalidPublicKeyData)?;
        Ok(())
    }

    fn check_kem_private_key(bytes: &[u8]) -> Result<(), CryptoError> {
        if bytes.len() != Self::kem_private_key_len() {
            return Err(CryptoError::InvalidPrivateKeyData);
        }
        kyber768::SecretKey::from_bytes(&bytes[X25519_LEN..])
            .map_err(|_| CryptoError::InvalidPrivateKeyData)?;
        Ok(())
    }

    fn check_signature_public_key(bytes: &[u8]) -> Result<(), CryptoError> {
        if bytes.len() != Self::signature_public_key_len() {
            return Err(CryptoError::InvalidPublicKeyData);
        }
        dilithium3::PublicKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKeyData)?;
        Ok(())
    }

    fn check_signature_private_key(bytes: &[u8]) -> Result<(), CryptoError> {
        if bytes.len() != Self::signature_private_key_len() {
            return Err(CryptoError::InvalidPrivateKeyData);
        }
        dilithium3::SecretKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPrivateKeyData)?;
        Ok(())
    }

    fn kem_public_from_private(private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Self::check_kem_private_key(private_key)?;
        let x_secret = Self::x25519_secret(&private_key[..X25519_LEN])?;
        let x_public = X25519Public::from(&x_secret);

        let kyber_pk_start = X25519_LEN + KYBER768_INDCPA_SECRET_LEN;
        let kyber_pk_end = kyber_pk_start + kyber768::public_key_bytes();

        let mut public_key = Vec::with_capacity(Self::kem_public_key_len());
        public_key.extend_from_slice(x_public.as_bytes());
        public_key.extend_from_slice(&private_key[kyber_pk_start..kyber_pk_end]);
        Ok(public_key)
    }

    fn kem_encapsulate(public_key: &[u8]) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), CryptoError> {
        Self::check_kem_public_key(public_key)?;
        let recipient_x = Self::x25519_public(&public_key[..X25519_LEN])?;
        let recipient_k = kyber768::PublicKey::from_bytes(&public_key[X25519_LEN..])
            .map_err(|_| CryptoError::InvalidPublicKeyData)?;

        let mut seed = Zeroizing::new([0u8; X25519_LEN]);
        OsRng
            .try_fill_bytes(&mut seed[..])
            .map_err(|e| CryptoError::EncryptionFailed(format!("rng: {}", e)))?;
        let ephemeral = StaticSecret::from(*seed);
        let ephemeral_public = X25519Public::from(&ephemeral);

        let dh = ephemeral.diffie_hellman(&recipient_x);
        if !dh.was_contributory() {
            return Err(CryptoError::EncryptionFailed(
                "non-contributory X25519 exchange".to_string(),
            ));
        }

        let (kyber_ss, kyber_ct) = kyber768::encapsulate(&recipient_k);

        let mut encapsulated_key = Vec::with_capacity(X25519_LEN + kyber768::ciphertext_bytes());
        encapsulated_key.extend_from_slice(ephemeral_public.as_bytes());
        encapsulated_key.extend_from_slice(kyber_ct.as_bytes());

        let shared = Self::combine(
            dh.as_bytes(),
            kyber_ss.as_bytes(),
            &encapsulated_key,
            public_key,
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        Ok((encapsulated_key, shared))
    }

    fn kem_decapsulate(
        private_key: &[u8],
        encapsulated_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if encapsulated_key.len() != X25519_LEN + kyber768::ciphertext_bytes() {
            return Err(CryptoError::DecryptionFailed(
                "malformed encapsulated key".to_string(),
            ));
        }
        let public_key = Self::kem_public_from_private(private_key)
            .map_err(|_| CryptoError::DecryptionFailed("unusable private key".to_string()))?;

        let x_secret = Self::x25519_secret(&private_key[..X25519_LEN])
            .map_err(|_| CryptoError::DecryptionFailed("unusable private key".to_string()))?;
        let k_secret = kyber768::SecretKey::from_bytes(&private_key[X25519_LEN..])
            .map_err(|_| CryptoError::DecryptionFailed("unusable private key".to_string()))?;

        let ephemeral_public = Self::x25519_public(&encapsulated_key[..X25519_LEN])
            .map_err(|_| CryptoError::DecryptionFailed("malformed encapsulated key".to_string()))?;
        let kyber_ct = kyber768::Ciphertext::from_bytes(&encapsulated_key[X25519_LEN..])
            .map_err(|_| CryptoError::DecryptionFailed("malformed encapsulated key".to_string()))?;

        let dh = x_secret.diffie_hellman(&ephemeral_public);
        if !dh.was_contributory() {
            return Err(CryptoError::DecryptionFailed(
                "non-contributory X25519 exchange".to_string(),
            ));
        }
        let kyber_ss = kyber768::decapsulate(&kyber_ct, &k_secret);

        Self::combine(dh.as_bytes(), kyber_ss.as_bytes(), encapsulated_key, &public_key)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }

    fn aead_encrypt(
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        if key.len() != AEAD_KEY_LEN || nonce.len() != AEAD_NONCE_LEN {
            return Err(CryptoError::EncryptionFailed("bad AEAD key or nonce length".to_string()));
        }
        let cipher = ChaCha20Poly1305::new(AeadKeyChacha::from_slice(key));
        let payload = Payload {
            msg: plaintext,
            aad: associated_data.unwrap_or(b""),
        };

        cipher
            .encrypt(Nonce::from_slice(nonce), payload)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    }

    fn aead_decrypt(
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if key.len() != AEAD_KEY_LEN || nonce.len() != AEAD_NONCE_LEN {
            return Err(CryptoError::DecryptionFailed("bad AEAD key or nonce length".to_string()));
        }
        let cipher = ChaCha20Poly1305::new(AeadKeyChacha::from_slice(key));
        let payload = Payload {
            msg: ciphertext,
            aad: associated_data.unwrap_or(b""),
        };

        cipher
            .decrypt(Nonce::from_slice(nonce), payload)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::DecryptionFailed("authentication failed".to_string()))
    }

    fn hkdf_derive_key(
        salt: &[u8],
        ikm: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
        let mut okm = Zeroizing::new(vec![0u8; len]);
        hkdf.expand(info, &mut okm)
            .map_err(|e| CryptoError::EncryptionFailed(format!("hkdf: {}", e)))?;
        Ok(okm)
    }

    fn sign(private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if private_key.len() != Self::signature_private_key_len() {
            return Err(CryptoError::SigningFailed("invalid signing key length".to_string()));
        }
        let secret_key = dilithium3::SecretKey::from_bytes(private_key)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        let signature = dilithium3::detached_sign(message, &secret_key);
        Ok(signature.as_bytes().to_vec())
    }

    fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        Self::check_signature_public_key(public_key)?;
        if signature.len() != Self::signature_len() {
            return Err(CryptoError::InvalidSignatureData);
        }
        let verifying_key = dilithium3::PublicKey::from_bytes(public_key)
            .map_err(|_| CryptoError::InvalidPublicKeyData)?;
        let signature_obj = dilithium3::DetachedSignature::from_bytes(signature)
            .map_err(|_| CryptoError::InvalidSignatureData)?;

        dilithium3::verify_detached_signature(&signature_obj, message, &verifying_key)
            .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kem_key_lengths() {
        let (private_key, public_key) = HybridSuiteProvider::generate_kem_keys().unwrap();
        assert_eq!(public_key.len(), 32 + 1184);
        assert_eq!(private_key.len(), 32 + 2400);
    }

    #[test]
    fn test_encapsulate_decapsulate_agree() {
        let (private_key, public_key) = HybridSuiteProvider::generate_kem_keys().unwrap();
        let (enc, ss_sender) = HybridSuiteProvider::kem_encapsulate(&public_key).unwrap();
        let ss_recipient = HybridSuiteProvider::kem_decapsulate(&private_key, &enc).unwrap();
        assert_eq!(ss_sender.as_slice(), ss_recipient.as_slice());
        assert_eq!(enc.len(), 32 + 1088);
    }

    #[test]
    fn test_public_recovered_from_private() {
        let (private_key, public_key) = HybridSuiteProvider::generate_kem_keys().unwrap();
        let derived = HybridSuiteProvider::kem_public_from_private(&private_key).unwrap();
        assert_eq!(derived, public_key);
    }

    #[test]
    fn test_open_with_other_key_fails() {
        let (_sk_a, pk_a) = HybridSuiteProvider::generate_kem_keys().unwrap();
        let (sk_b, _pk_b) = HybridSuiteProvider::generate_kem_keys().unwrap();
        let (enc, ct) = HybridSuiteProvider::seal(&pk_a, b"for a only", b"").unwrap();
        let result = HybridSuiteProvider::open(&sk_b, &enc, &ct, b"");
        assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_open_with_other_aad_fails() {
        let (sk, pk) = HybridSuiteProvider::generate_kem_keys().unwrap();
        let (enc, ct) = HybridSuiteProvider::seal(&pk, b"payload", b"meta-1").unwrap();
        assert!(HybridSuiteProvider::open(&sk, &enc, &ct, b"meta-2").is_err());
    }

    #[test]
    fn test_truncated_encapsulated_key_rejected() {
        let (sk, pk) = HybridSuiteProvider::generate_kem_keys().unwrap();
        let (enc, ct) = HybridSuiteProvider::seal(&pk, b"payload", b"").unwrap();
        let result = HybridSuiteProvider::open(&sk, &enc[..enc.len() - 1], &ct, b"");
        assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_sign_verify() {
        let (sk, pk) = HybridSuiteProvider::generate_signature_keys().unwrap();
        let sig = HybridSuiteProvider::sign(&sk, b"ciphertext bytes").unwrap();
        assert_eq!(sig.len(), HybridSuiteProvider::signature_len());
        assert!(HybridSuiteProvider::verify(&pk, b"ciphertext bytes", &sig).is_ok());
        assert!(matches!(
            HybridSuiteProvider::verify(&pk, b"other bytes", &sig),
            Err(CryptoError::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_verify_rejects_short_signature() {
        let (_sk, pk) = HybridSuiteProvider::generate_signature_keys().unwrap();
        assert_eq!(
            HybridSuiteProvider::verify(&pk, b"m", &[0u8; 10]),
            Err(CryptoError::InvalidSignatureData)
        );
    }
}
