// Модели данных для хранилища
// Только то, что может лежать в обычном (незащищённом) хранилище

use crate::protocol::envelope::EncryptedEnvelope;
use serde::{Deserialize, Serialize};

/// Профиль владельца. Ключи хранятся отдельно, в защищённом хранилище.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityProfile {
    pub display_name: String,
    pub email: String,
    /// Unix seconds. Set once at generation.
    pub created_at: Option<i64>,
}

/// Контакт в хранилище (без ключей)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    pub added_at: i64,
}

/// Сообщение в хранилище.
///
/// Has no plaintext or signature status field. Every message write goes
/// through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub sender_label: String,
    pub received_at: i64,
    pub envelope: EncryptedEnvelope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_record_json_has_no_plaintext() {
        let record = MessageRecord {
            id: "m1".to_string(),
            sender_label: "Alice".to_string(),
            received_at: 1_700_000_000,
            envelope: EncryptedEnvelope::new(vec![1], vec![2], vec![3], "suite", None),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"senderLabel\":\"Alice\""));
        assert!(!json.contains("plaintext"));
        assert!(!json.contains("signatureStatus"));

        let back: MessageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_profile_defaults_when_fields_missing() {
        let empty: IdentityProfile = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, IdentityProfile::default());

        let partial: IdentityProfile = serde_json::from_str(r#"{"displayName":"Alice"}"#).unwrap();
        assert_eq!(partial.display_name, "Alice");
        assert_eq!(partial.email, "");
        assert_eq!(partial.created_at, None);
    }
}
