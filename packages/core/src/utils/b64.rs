// Base64 утилиты

use base64::{engine::general_purpose, Engine};

pub fn encode(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

pub fn decode(data: &str) -> Result<Vec<u8>, String> {
    general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| format!("Base64 decode failed: {}", e))
}

/// serde-адаптер: `Vec<u8>` как Base64 строка в JSON
pub mod serde_bytes_b64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// То же самое для `Option<Vec<u8>>`
pub mod serde_opt_bytes_b64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&super::encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| super::decode(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tolerates_surrounding_whitespace() {
        let encoded = format!("  {}\n", encode(b"pasted"));
        assert_eq!(decode(&encoded).unwrap(), b"pasted");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not base64 !!!").is_err());
    }
}
