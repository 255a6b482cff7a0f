//! MikroTik RouterOS API client.
//!
//! The binary API on TCP 8728: length-prefixed words grouped into
//! sentences, `/login` with name and password, then menu commands.

mod client;
mod codec;
mod commands;
mod models;
mod reply;

pub use client::{ConnectConfig, DEFAULT_API_PORT, Response, RouterOsClient};
pub use codec::{Sentence, SentenceCodec};
pub use models::{
    ActiveSession, ClockReading, FilterRuleEntry, FilterRuleUpdate, NtpClientSettings,
    QueueRate, RouterOsMajor, SessionSource, SystemResource,
};
pub use reply::{Attributes, Reply};
