// Состояние приложения: единственный владелец идентичности, контактов и сообщений

pub mod app;

pub use app::{AppState, ExportedPrivateKeys, ExportedPublicKeys, SelfTestReport, UiState};
