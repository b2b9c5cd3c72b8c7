//! Gemini API client (generativelanguage.googleapis.com).
//! Single non-streaming generateContent call; the system prompt asks for a
//! bulleted summary, a ready-to-post caption, and an optional references section.

use serde::{Deserialize, Serialize};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const TEMPERATURE: f64 = 0.4;
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Persona/format prompt prepended to the user's text.
const SYSTEM_PROMPT: &str = "你是一位社群媒體小編。請將使用者提供的內容整理成：\n\
1. 條列式摘要（3 至 5 點）\n\
2. 一段可以直接發佈的社群貼文文案\n\
3. 如果內容包含網址或出處，最後附上「參考資料」區塊；沒有就省略。\n\
請使用繁體中文回覆。\n\n";

/// Reply sent when no API key is configured.
pub const MISSING_KEY_WARNING: &str =
    "⚠️ 尚未設定 GEMINI_API_KEY，請先設定金鑰後再試一次。";

/// Reply sent when the API answered 2xx but returned no usable text.
pub const NO_CONTENT_WARNING: &str = "⚠️ 生成服務沒有回傳可用的內容，請稍後再試。";

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("gemini api key not configured")]
    MissingApiKey,
    #[error("gemini request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gemini api error: {status} {body}")]
    Api { status: reqwest::StatusCode, body: String },
    #[error("gemini returned no usable content")]
    NoContent,
}

impl GeminiError {
    /// Human-readable chat message for failures that are reported to the end
    /// user instead of failing the batch. Transport errors have none: they
    /// propagate as a fault and the webhook answers 500.
    pub fn user_message(&self) -> Option<String> {
        match self {
            GeminiError::MissingApiKey => Some(MISSING_KEY_WARNING.to_string()),
            GeminiError::Api { status, body } => Some(format!(
                "⚠️ 生成服務回應錯誤（HTTP {}）：{}",
                status.as_u16(),
                body
            )),
            GeminiError::NoContent => Some(NO_CONTENT_WARNING.to_string()),
            GeminiError::Request(_) => None,
        }
    }
}

/// Client for the Gemini generateContent API.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: Option<String>,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: Option<String>, api_base: Option<String>) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Self {
            api_key,
            model,
            api_base,
            client: reqwest::Client::new(),
        }
    }

    /// POST models/{model}:generateContent with the system prompt and the
    /// user's text. Returns the concatenated text parts of the first candidate.
    pub async fn generate(&self, text: &str) -> Result<String, GeminiError> {
        let api_key = self.api_key.as_ref().ok_or(GeminiError::MissingApiKey)?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_base, self.model, api_key
        );
        let body = build_request(text);
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GeminiError::Api { status, body });
        }
        let data: GenerateContentResponse =
            res.json().await.map_err(|_| GeminiError::NoContent)?;
        extract_text(&data).ok_or(GeminiError::NoContent)
    }
}

/// Build the generateContent request body for a user message.
fn build_request(text: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: format!("{}{}", SYSTEM_PROMPT, text),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

/// Concatenated text parts of the first candidate, or None when absent/empty.
fn extract_text(res: &GenerateContentResponse) -> Option<String> {
    let candidate = res.candidates.as_deref()?.first()?;
    let parts = &candidate.content.as_ref()?.parts;
    let text: String = parts.iter().map(|p| p.text.as_str()).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}
