// ispdesk-api: wire clients for MikroTik RouterOS and the Gemini insight endpoint

pub mod error;
pub mod gemini;
pub mod routeros;
pub mod transport;

pub use error::Error;
pub use gemini::GeminiClient;
pub use routeros::{ConnectConfig, RouterOsClient};
pub use transport::TransportConfig;
