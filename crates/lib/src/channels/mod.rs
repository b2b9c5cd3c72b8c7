//! Communication channels (LINE Messaging API).
//!
//! Webhook payload types, signature verification, and the reply client.
//! Inbound events are handed to the dispatcher for classification and reply.

mod line;

pub use line::{
    verify_signature, LineChannel, LineError, LineEvent, LineMessage, WebhookRequest,
};
