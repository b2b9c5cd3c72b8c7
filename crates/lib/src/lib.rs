//! Autopost core library — config, LINE channel, Gemini client, event
//! dispatch, and the webhook gateway used by the CLI.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod llm;
