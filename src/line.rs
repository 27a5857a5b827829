//! LINE Messaging API: webhook verification, event parsing and the HTTP client.

mod client;
mod signature;
mod webhook;

pub use client::{LineClient, OutgoingMessage};
pub use signature::{SIGNATURE_HEADER, verify_signature};
#[cfg(test)]
pub(crate) use signature::sign;
pub use webhook::{
    ContentProvider, EventSource, MessageContent, MessageEvent, WebhookEvent, WebhookPayload,
    parse_payload,
};
