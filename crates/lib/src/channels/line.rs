//! LINE channel: webhook payload types, x-line-signature verification,
//! and one-shot replies via the Messaging API reply endpoint.

use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

const LINE_API_BASE: &str = "https://api.line.me";

type HmacSha256 = Hmac<Sha256>;

/// Webhook POST body: a batch of events.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    #[serde(default)]
    pub events: Vec<LineEvent>,
}

/// One webhook event. Only `type == "message"` with a text message is handled.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEvent {
    #[serde(rename = "type")]
    pub typ: String,
    /// One-time token for the reply API. Absent on events that cannot be replied to.
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub message: Option<LineMessage>,
}

#[derive(Debug, Deserialize)]
pub struct LineMessage {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Verify the x-line-signature header: base64-encoded HMAC-SHA256 of the raw
/// request body keyed with the channel secret.
pub fn verify_signature(channel_secret: &str, signature: &str, body: &[u8]) -> bool {
    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    let computed = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
    constant_time_eq(&computed, signature)
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("line channel access token not configured")]
    MissingToken,
    #[error("line request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("line api error: {0} {1}")]
    Api(reqwest::StatusCode, String),
}

/// LINE channel connector: sends replies via the one-shot reply API.
#[derive(Clone)]
pub struct LineChannel {
    access_token: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl LineChannel {
    pub fn new(access_token: Option<String>, api_base: Option<String>) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| LINE_API_BASE.to_string());
        Self {
            access_token,
            api_base,
            client: reqwest::Client::new(),
        }
    }

    /// True when a channel access token is configured.
    pub fn has_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// Send a text reply with a one-time reply token. The token is consumed
    /// by the platform on first use; the caller must not reuse it.
    pub async fn reply(&self, reply_token: &str, text: &str) -> Result<(), LineError> {
        let token = self.access_token.as_ref().ok_or(LineError::MissingToken)?;
        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let body = json!({
            "replyToken": reply_token,
            "messages": [{ "type": "text", "text": text }],
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LineError::Api(status, body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
        mac.update(body);
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn signature_accepts_matching_mac() {
        let body = br#"{"events":[]}"#;
        let sig = sign("secret", body);
        assert!(verify_signature("secret", &sig, body));
    }

    #[test]
    fn signature_rejects_wrong_secret_or_body() {
        let body = br#"{"events":[]}"#;
        let sig = sign("secret", body);
        assert!(!verify_signature("other", &sig, body));
        assert!(!verify_signature("secret", &sig, br#"{"events":[{}]}"#));
        assert!(!verify_signature("secret", "not-base64", body));
    }

    #[test]
    fn parse_webhook_event() {
        let req: WebhookRequest = serde_json::from_str(
            r#"{
                "events": [{
                    "type": "message",
                    "replyToken": "abc",
                    "message": { "type": "text", "text": "hello" }
                }]
            }"#,
        )
        .expect("parse webhook");
        assert_eq!(req.events.len(), 1);
        let event = &req.events[0];
        assert_eq!(event.typ, "message");
        assert_eq!(event.reply_token.as_deref(), Some("abc"));
        let msg = event.message.as_ref().expect("message");
        assert_eq!(msg.typ, "text");
        assert_eq!(msg.text.as_deref(), Some("hello"));
    }

    #[test]
    fn parse_webhook_without_events() {
        let req: WebhookRequest = serde_json::from_str("{}").expect("parse empty webhook");
        assert!(req.events.is_empty());
    }
}
