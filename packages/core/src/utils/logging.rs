// Логирование

use tracing_subscriber::EnvFilter;

/// Установить fmt-подписчик `tracing`.
///
/// Filter comes from `RUST_LOG`, falling back to `Config::log_filter`.
/// Calling it more than once is harmless; later calls are ignored.
pub fn init() {
    let fallback = crate::config::Config::global().log_filter.clone();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .try_init();
}
