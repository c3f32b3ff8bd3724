//! Action enum — all user-initiated intents flowing through the app.

use std::path::PathBuf;

/// Which full-screen view is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Record,
    Result,
    Error,
    History,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Recognition flow ─────────────────────────────────────────────────────
    /// Start listening on the microphone.
    StartRecording,
    /// Stop the active recording and send it for identification.
    StopAndIdentify,
    /// Encode a validated local file and send it for identification.
    IdentifyFile(PathBuf),

    // ── History ──────────────────────────────────────────────────────────────
    OpenHistory,
    /// Show a stored item as a result view (no audio attached).
    OpenHistoryItem(String),
    DeleteHistoryItem(String),
    ClearHistory,

    // ── UI ───────────────────────────────────────────────────────────────────
    CopyToClipboard(String),
    /// Back to HOME; force-stops any in-progress recording.
    Reset,
    Quit,
}
