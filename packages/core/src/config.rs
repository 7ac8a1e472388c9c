//! Централизованная конфигурация для pqmsg core
//!
//! Все константы и настройки должны быть определены здесь,
//! чтобы избежать хардкода по всему проекту.

use std::sync::OnceLock;

/// Глобальная конфигурация приложения (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // КРИПТОГРАФИЧЕСКИЕ ПАРАМЕТРЫ
    // ============================================

    /// Длина key id в байтах (SHA-512, усечённый), в hex в два раза длиннее
    pub key_id_bytes: usize,

    /// Длина fingerprint в байтах (SHA-512, усечённый)
    pub fingerprint_bytes: usize,

    /// Размер группы символов в отображаемом fingerprint
    pub fingerprint_group_size: usize,

    /// Версия формата authenticated metadata
    pub metadata_version: u32,

    // ============================================
    // ВАЛИДАЦИЯ
    // ============================================

    /// Максимальный размер Base64-строки конверта (DoS защита)
    pub max_envelope_bytes: usize,

    /// Максимальная длина имени контакта
    pub contact_name_max_length: usize,

    /// Подпись для identity без имени и email
    pub default_identity_label: String,

    // ============================================
    // ЛОГИРОВАНИЕ
    // ============================================

    /// Фильтр tracing, если RUST_LOG не задан
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_id_bytes: 8,
            fingerprint_bytes: 20,
            fingerprint_group_size: 4,
            metadata_version: 1,

            max_envelope_bytes: 1024 * 1024, // 1 MiB
            contact_name_max_length: 128,
            default_identity_label: "Anonymous".to_string(),

            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Переопределяем значения из env, если они заданы
        if let Ok(val) = std::env::var("PQMSG_MAX_ENVELOPE_BYTES") {
            if let Ok(parsed) = val.parse() {
                config.max_envelope_bytes = parsed;
            }
        }

        if let Ok(val) = std::env::var("PQMSG_KEY_ID_BYTES") {
            if let Ok(parsed) = val.parse::<usize>() {
                config.key_id_bytes = parsed.clamp(4, 64);
            }
        }

        if let Ok(val) = std::env::var("PQMSG_FINGERPRINT_BYTES") {
            if let Ok(parsed) = val.parse::<usize>() {
                config.fingerprint_bytes = parsed.clamp(8, 64);
            }
        }

        if let Ok(val) = std::env::var("PQMSG_LOG") {
            config.log_filter = val;
        }

        config
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// Автоматически инициализирует конфигурацию со значениями по умолчанию при первом вызове
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// Инициализировать глобальную конфигурацию из переменных окружения
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_from_env() -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::from_env())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| "Config already initialized")
    }

    /// Проверить, инициализирована ли глобальная конфигурация
    pub fn is_initialized() -> bool {
        GLOBAL_CONFIG.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.key_id_bytes, 8);
        assert_eq!(config.fingerprint_bytes, 20);
        assert_eq!(config.max_envelope_bytes, 1024 * 1024);
        assert_eq!(config.default_identity_label, "Anonymous");
    }

    #[test]
    fn test_global_is_stable() {
        let a = Config::global() as *const Config;
        let b = Config::global() as *const Config;
        assert_eq!(a, b);
        assert!(Config::is_initialized());
    }
}
