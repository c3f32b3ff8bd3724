//! Song recognition via the Gemini `generateContent` REST API.
//!
//! One request per identification: the base64 audio payload plus a fixed
//! instruction prompt, with a strict JSON response schema so the reply
//! parses straight into [`SongMetadata`]. No retries; callers surface the
//! error and let the user restart the action.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::song::SongMetadata;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const IDENTIFY_PROMPT: &str = "\
Analyze the provided audio.
1. Identify the song title, artist, and album if it's a known song.
2. If it is an instrumental or unknown, describe the genre and mood as the title/artist.
3. EXTRACT THE LYRICS accurately in the original language. Format the lyrics with proper line breaks.
4. If there are no lyrics, state \"[Instrumental]\" in the lyrics field.";

#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("no API key configured; set gemini.api_key in config.toml or the GEMINI_API_KEY environment variable")]
    MissingApiKey,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("recognition API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("no response text from the model")]
    EmptyResponse,
    #[error("model response was not valid song metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

pub struct RecognitionClient {
    http: reqwest::Client,
    model: String,
    api_key: String,
}

impl RecognitionClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, RecognizeError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RecognizeError::MissingApiKey);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            model: model.into(),
            api_key,
        })
    }

    /// Build a client from config; `GEMINI_API_KEY` overrides the file value.
    pub fn from_config(config: &Config) -> Result<Self, RecognizeError> {
        let api_key = config.gemini_api_key().ok_or(RecognizeError::MissingApiKey)?;
        Self::new(api_key, config.gemini.model.clone())
    }

    /// Identify the song in `base64_audio` (declared as `mime_type`).
    ///
    /// Network and auth failures propagate unchanged; an OK response with no
    /// candidate text is [`RecognizeError::EmptyResponse`]; candidate text
    /// that doesn't match the schema is [`RecognizeError::Parse`].
    pub async fn identify(
        &self,
        base64_audio: &str,
        mime_type: &str,
    ) -> Result<SongMetadata, RecognizeError> {
        let url = format!("{}/{}:generateContent", API_BASE, self.model);
        debug!("[recognize] POST {} ({} b64 chars, {})", url, base64_audio.len(), mime_type);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(base64_audio, mime_type))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("[recognize] API error {}: {}", status, message.trim());
            return Err(RecognizeError::Api {
                status: status.as_u16(),
                message: api_error_message(&message),
            });
        }

        let reply: GenerateContentResponse = response.json().await?;
        let text = reply.first_text().ok_or(RecognizeError::EmptyResponse)?;
        let metadata: SongMetadata = serde_json::from_str(text.trim())?;
        debug!("[recognize] identified: {} \u{2013} {}", metadata.artist, metadata.title);
        Ok(metadata)
    }
}

/// Request payload: one content with an inline audio part and the prompt,
/// plus a generation config demanding schema-conforming JSON.
fn request_body(base64_audio: &str, mime_type: &str) -> serde_json::Value {
    json!({
        "contents": [{
            "parts": [
                {
                    "inlineData": {
                        "mimeType": mime_type,
                        "data": base64_audio,
                    }
                },
                { "text": IDENTIFY_PROMPT },
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "title":    { "type": "STRING", "description": "Title of the song" },
                    "artist":   { "type": "STRING", "description": "Artist name" },
                    "album":    { "type": "STRING", "description": "Album name" },
                    "year":     { "type": "STRING", "description": "Release year" },
                    "genre":    { "type": "STRING", "description": "Music genre" },
                    "mood":     { "type": "STRING", "description": "Mood of the track" },
                    "lyrics":   { "type": "STRING", "description": "Full lyrics with line breaks" },
                    "language": { "type": "STRING", "description": "Language of the lyrics" },
                },
                "required": ["title", "artist", "lyrics"],
            },
        },
    })
}

/// Pull a short human-readable message out of an API error body, falling
/// back to the raw (truncated) text.
fn api_error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = v["error"]["message"].as_str() {
            return msg.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > 200 {
        let cut: String = trimmed.chars().take(200).collect();
        format!("{}\u{2026}", cut)
    } else {
        trimmed.to_string()
    }
}

// ── Response shape ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .find(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = request_body("QUJD", "audio/mpeg");
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "audio/mpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert!(parts[1]["text"]
            .as_str()
            .unwrap()
            .contains("[Instrumental]"));

        let cfg = &body["generationConfig"];
        assert_eq!(cfg["responseMimeType"], "application/json");
        let required: Vec<&str> = cfg["responseSchema"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, ["title", "artist", "lyrics"]);
    }

    #[test]
    fn test_response_text_extraction() {
        let reply: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"title\":\"Test Song\",\"artist\":\"Test Artist\",\"lyrics\":\"Line1\\nLine2\"}"}]}}]}"#,
        )
        .unwrap();
        let text = reply.first_text().unwrap();
        let metadata: SongMetadata = serde_json::from_str(text).unwrap();
        assert_eq!(metadata.title, "Test Song");
        assert_eq!(metadata.artist, "Test Artist");
        assert_eq!(metadata.lyrics, "Line1\nLine2");
        assert!(!metadata.title.is_empty() && !metadata.artist.is_empty() && !metadata.lyrics.is_empty());
    }

    #[test]
    fn test_empty_response_detected() {
        let reply: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(reply.first_text().is_none());

        let blank: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#,
        )
        .unwrap();
        assert!(blank.first_text().is_none());
    }

    #[test]
    fn test_schema_violation_is_parse_error() {
        let err = serde_json::from_str::<SongMetadata>("{\"title\":\"only\"}").unwrap_err();
        let err: RecognizeError = err.into();
        assert!(matches!(err, RecognizeError::Parse(_)));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        assert!(matches!(
            RecognitionClient::new("  ", DEFAULT_MODEL),
            Err(RecognizeError::MissingApiKey)
        ));
    }

    #[test]
    fn test_api_error_message_extraction() {
        let body = r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(api_error_message(body), "API key not valid");
        assert_eq!(api_error_message("plain text"), "plain text");
    }
}
