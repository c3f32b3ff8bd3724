//! Song metadata and history records.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Sentinel the model is instructed to place in `lyrics` when a track has
/// no lyrics at all.
pub const INSTRUMENTAL_SENTINEL: &str = "[Instrumental]";

/// Structured result of asking the model to identify a song and extract
/// lyrics. `title`, `artist` and `lyrics` are mandatory in the response
/// schema; everything else is best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongMetadata {
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// Full lyrics, newline-delimited, or [`INSTRUMENTAL_SENTINEL`].
    pub lyrics: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl SongMetadata {
    pub fn is_instrumental(&self) -> bool {
        self.lyrics.trim() == INSTRUMENTAL_SENTINEL
    }

    /// "Album • Year" style subtitle, whichever parts exist.
    pub fn album_line(&self) -> Option<String> {
        match (&self.album, &self.year) {
            (Some(a), Some(y)) => Some(format!("{} \u{2022} {}", a, y)),
            (Some(a), None) => Some(a.clone()),
            (None, Some(y)) => Some(y.clone()),
            (None, None) => None,
        }
    }
}

/// A persisted recognition record: the metadata plus identity and creation
/// time. Stored audio is never attached — history items reloaded from disk
/// carry metadata only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub timestamp: DateTime<Local>,
    #[serde(flatten)]
    pub song: SongMetadata,
}

/// Where the current session's audio came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKind {
    File,
    Recording,
}

/// The audio payload behind the current result view. Transient — held for
/// the session only, never persisted alongside history.
#[derive(Debug, Clone)]
pub struct AudioSource {
    pub kind: AudioKind,
    /// Base64 payload as sent to the recognition endpoint.
    pub data: String,
    pub mime_type: String,
    pub file_name: Option<String>,
}

/// Deterministic string → RGB mapping for history tile colors.
/// Cosmetic only; the contract is determinism per input.
pub fn tile_color(s: &str) -> (u8, u8, u8) {
    let mut hash: i32 = 0;
    for c in s.chars() {
        hash = (c as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash));
    }
    let c = (hash & 0x00ff_ffff) as u32;
    (((c >> 16) & 0xff) as u8, ((c >> 8) & 0xff) as u8, (c & 0xff) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SongMetadata {
        SongMetadata {
            title: "Test Song".into(),
            artist: "Test Artist".into(),
            album: Some("Test Album".into()),
            year: Some("2001".into()),
            genre: None,
            mood: None,
            lyrics: "Line1\nLine2".into(),
            language: Some("en".into()),
        }
    }

    #[test]
    fn test_instrumental_sentinel() {
        let mut m = sample();
        assert!(!m.is_instrumental());
        m.lyrics = " [Instrumental] ".into();
        assert!(m.is_instrumental());
    }

    #[test]
    fn test_album_line() {
        let mut m = sample();
        assert_eq!(m.album_line().as_deref(), Some("Test Album \u{2022} 2001"));
        m.year = None;
        assert_eq!(m.album_line().as_deref(), Some("Test Album"));
        m.album = None;
        assert_eq!(m.album_line(), None);
    }

    #[test]
    fn test_metadata_requires_mandatory_fields() {
        // album/year/etc may be absent, title/artist/lyrics may not.
        let ok: Result<SongMetadata, _> =
            serde_json::from_str(r#"{"title":"T","artist":"A","lyrics":"L"}"#);
        assert!(ok.is_ok());
        let missing: Result<SongMetadata, _> =
            serde_json::from_str(r#"{"title":"T","artist":"A"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_history_item_flattens_metadata() {
        let item = HistoryItem {
            id: "abc123".into(),
            timestamp: Local::now(),
            song: sample(),
        };
        let json = serde_json::to_value(&item).unwrap();
        // Flattened: song fields sit next to id/timestamp in the store file.
        assert_eq!(json["id"], "abc123");
        assert_eq!(json["title"], "Test Song");
        assert!(json.get("song").is_none());
        let back: HistoryItem = serde_json::from_value(json).unwrap();
        assert_eq!(back.song, item.song);
    }

    #[test]
    fn test_tile_color_deterministic() {
        assert_eq!(tile_color("Hey Jude"), tile_color("Hey Jude"));
        assert_ne!(tile_color("Hey Jude"), tile_color("Let It Be"));
        // Empty input is fine too.
        let _ = tile_color("");
    }
}
