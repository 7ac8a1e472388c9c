// Валидация входящих данных

use crate::config::Config;
use crate::utils::error::{MessengerError, Result};

/// Валидация имени контакта
pub fn validate_contact_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(MessengerError::InvalidInput(
            "Contact name cannot be empty".to_string(),
        ));
    }

    let max = Config::global().contact_name_max_length;
    if trimmed.chars().count() > max {
        return Err(MessengerError::InvalidInput(format!(
            "Contact name must be at most {} characters",
            max
        )));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(MessengerError::InvalidInput(
            "Contact name cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Валидация метки отправителя при приёме сообщения
pub fn validate_sender_label(label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(MessengerError::InvalidInput(
            "Sender label cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Валидация текста сообщения перед шифрованием
pub fn validate_plaintext(plaintext: &str) -> Result<()> {
    if plaintext.is_empty() {
        return Err(MessengerError::InvalidInput(
            "Message cannot be empty".to_string(),
        ));
    }
    Ok(())
}
