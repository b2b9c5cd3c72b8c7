//! Gemini generateContent client used for the default (general text) intent.

mod gemini;

pub use gemini::{GeminiClient, GeminiError, MISSING_KEY_WARNING, NO_CONTENT_WARNING};
