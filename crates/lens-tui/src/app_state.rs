//! AppState — shared read-only data passed to all components during render/event.
//!
//! Components read this for session state, but never mutate it.
//! The App event-loop is the only thing that writes to AppState.

use std::path::PathBuf;

use lens_core::history::HistoryStore;
use lens_core::song::{AudioSource, SongMetadata};

use crate::action::View;
use crate::spectrum::NUM_BINS;

/// Whether a long-running step (encode, recognition request) is in flight,
/// and what to tell the user about it. Input is ignored while active — an
/// issued recognition request cannot be cancelled.
#[derive(Debug, Clone, Default)]
pub struct Processing {
    pub active: bool,
    pub message: String,
}

/// The full shared state of the application.
/// Components read this; only the App event-loop writes to it.
pub struct AppState {
    // ── View ────────────────────────────────────────────────────────────────
    pub view: View,
    pub processing: Processing,
    pub error_message: Option<String>,

    // ── Current result ──────────────────────────────────────────────────────
    pub result: Option<SongMetadata>,
    /// Audio behind the current result; None when opened from history.
    pub audio_source: Option<AudioSource>,

    // ── History ─────────────────────────────────────────────────────────────
    pub history: HistoryStore,

    // ── Recording session ───────────────────────────────────────────────────
    pub recording: bool,
    pub recording_secs: u64,
    /// Latest frequency-bin magnitudes (0..1), refreshed each viz frame.
    pub spectrum_bins: Vec<f32>,

    // ── Library (upload browser) ────────────────────────────────────────────
    pub music_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(history: HistoryStore, music_dir: PathBuf, max_upload_mb: u64) -> Self {
        Self {
            view: View::Home,
            processing: Processing::default(),
            error_message: None,
            result: None,
            audio_source: None,
            history,
            recording: false,
            recording_secs: 0,
            spectrum_bins: vec![0.0; NUM_BINS],
            music_dir,
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
        }
    }

    /// "00:07"-style elapsed recording time.
    pub fn recording_clock(&self) -> String {
        format!("{:02}:{:02}", self.recording_secs / 60, self.recording_secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_clock() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(
            HistoryStore::load(dir.path().join("h.json")),
            dir.path().to_path_buf(),
            100,
        );
        assert_eq!(state.recording_clock(), "00:00");
        state.recording_secs = 7;
        assert_eq!(state.recording_clock(), "00:07");
        state.recording_secs = 83;
        assert_eq!(state.recording_clock(), "01:23");
    }
}
