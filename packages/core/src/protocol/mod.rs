// Протокол: конверт сообщения и его wire format

pub mod envelope;
pub mod validation;
pub mod wire;

pub use envelope::{AuthenticatedMetadata, EncryptedEnvelope};
pub use wire::EnvelopeCodec;
