//! Inbound event dispatch: filter webhook events to text messages, classify
//! by marker substrings, and reply via the LINE reply API.
//!
//! Events in one batch are processed strictly sequentially; a fault aborts
//! the remaining events and the webhook answers 500 (LINE redelivers).

use crate::channels::LineEvent;
use crate::gateway::AppState;
use anyhow::Result;

/// Intent of one inbound text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Text contains the image marker; acknowledge the future image pipeline.
    ImageRequest,
    /// Text contains the publish marker; acknowledge the future publish pipeline.
    PublishRequest,
    /// Anything else: forward to the generation helper.
    GeneralText,
}

/// Marker substrings checked in order; first match wins.
const INTENT_MARKERS: &[(&str, Intent)] = &[
    ("生產圖片", Intent::ImageRequest),
    ("發佈到社群", Intent::PublishRequest),
];

/// Canned acknowledgment for the image intent (pipeline not wired up yet).
pub const IMAGE_ACK: &str = "收到「生產圖片」指令！接下來的流程：\n\
1. 產生文生圖提示詞\n\
2. 生成圖片\n\
3. 上傳圖片\n\
4. 合併回覆給你\n\
（此流程尚未開通，敬請期待。）";

/// Canned acknowledgment for the publish intent (pipeline not wired up yet).
pub const PUBLISH_ACK: &str = "收到「發佈到社群」指令！接下來的流程：\n\
1. 保存上一次產生的內容\n\
2. 發佈到外部社群平台\n\
（此流程尚未開通，敬請期待。）";

/// LINE rejects text messages over 5000 characters; leave headroom.
pub const MAX_REPLY_CHARS: usize = 4900;

/// Classify a trimmed message text by marker containment, in fixed order.
pub fn classify(text: &str) -> Intent {
    INTENT_MARKERS
        .iter()
        .find(|(marker, _)| text.contains(marker))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::GeneralText)
}

/// Truncate reply text to at most `max_chars` characters (not bytes).
pub fn truncate_reply(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// Process one webhook batch. Non-message events and non-text messages are
/// skipped. Each reply is awaited before the next event; any reply failure
/// or transport fault aborts the remaining events.
pub async fn handle_events(state: &AppState, events: Vec<LineEvent>) -> Result<()> {
    for event in events {
        if event.typ != "message" {
            continue;
        }
        let Some(msg) = event.message else { continue };
        if msg.typ != "text" {
            continue;
        }
        let Some(text) = msg.text else { continue };
        let Some(reply_token) = event.reply_token else {
            log::warn!("text message event without reply token, skipping");
            continue;
        };
        let trimmed = text.trim();
        let reply = match classify(trimmed) {
            Intent::ImageRequest => IMAGE_ACK.to_string(),
            Intent::PublishRequest => PUBLISH_ACK.to_string(),
            Intent::GeneralText => generation_reply(state, trimmed).await?,
        };
        state.line.reply(&reply_token, &reply).await?;
    }
    Ok(())
}

/// Run the generation helper and turn its outcome into reply text.
/// Missing key, upstream non-2xx, and empty responses become warning replies;
/// transport errors propagate as a fault.
async fn generation_reply(state: &AppState, text: &str) -> Result<String> {
    match state.gemini.generate(text).await {
        Ok(generated) => Ok(truncate_reply(&generated, MAX_REPLY_CHARS)),
        Err(e) => match e.user_message() {
            Some(warning) => {
                log::warn!("generation failed, replying with warning: {}", e);
                Ok(warning)
            }
            None => Err(e.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_image_marker() {
        assert_eq!(classify("幫我生產圖片：一隻貓"), Intent::ImageRequest);
        assert_eq!(classify("生產圖片"), Intent::ImageRequest);
    }

    #[test]
    fn classify_publish_marker() {
        assert_eq!(classify("發佈到社群吧"), Intent::PublishRequest);
    }

    #[test]
    fn classify_first_match_wins_when_both_markers_present() {
        assert_eq!(
            classify("先生產圖片再發佈到社群"),
            Intent::ImageRequest
        );
        assert_eq!(
            classify("發佈到社群之前要先生產圖片"),
            Intent::ImageRequest
        );
    }

    #[test]
    fn classify_default_intent() {
        assert_eq!(classify("hello"), Intent::GeneralText);
        assert_eq!(classify(""), Intent::GeneralText);
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let short = "你好";
        assert_eq!(truncate_reply(short, 4900), short);
        let long: String = std::iter::repeat('嗨').take(5000).collect();
        let truncated = truncate_reply(&long, MAX_REPLY_CHARS);
        assert_eq!(truncated.chars().count(), 4900);
    }
}
