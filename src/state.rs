use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

pub const PLAYBACK_STATE_FILE: &str = "playback.json";
pub const CHUNK_META_FILE: &str = "paragraphs.json";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Generating,
    Ready,
    Playing,
    Completed,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlaybackStatus::Generating => "generating",
            PlaybackStatus::Ready => "ready",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Completed => "completed",
        })
    }
}

/// Resumable playback cursor. Owned by the playback engine; this module only
/// persists and retrieves it. Invariant: `current_chunk <= total_chunks`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub current_chunk: usize,
    pub total_chunks: usize,
    pub status: PlaybackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl PlaybackState {
    pub fn new(current_chunk: usize, total_chunks: usize, status: PlaybackStatus) -> Self {
        Self {
            current_chunk,
            total_chunks,
            status,
            last_updated: None,
        }
    }
}

/// Snapshot of one generation run, written once when generation starts.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChunkSetMeta {
    pub total: usize,
    pub paragraphs: Vec<String>,
    pub voice: String,
    pub model: String,
    pub generated: String,
}

/// A missing file, unreadable content and an out-of-range cursor all mean
/// "no prior state". Never fails.
pub fn load_playback_state(dir: &Path) -> Option<PlaybackState> {
    let content = fs::read_to_string(dir.join(PLAYBACK_STATE_FILE)).ok()?;
    let state: PlaybackState = serde_json::from_str(&content).ok()?;
    if state.current_chunk > state.total_chunks {
        return None;
    }
    Some(state)
}

/// Stamps `last_updated` and overwrites the state file. A failed write is
/// fatal to the operation in progress.
pub fn save_playback_state(dir: &Path, state: &PlaybackState) -> Result<()> {
    let mut stamped = state.clone();
    stamped.last_updated = Some(Utc::now().to_rfc3339());
    let content = serde_json::to_string_pretty(&stamped)?;
    fs::write(dir.join(PLAYBACK_STATE_FILE), content).context("Failed to write playback state")?;
    Ok(())
}

pub fn load_chunk_meta(dir: &Path) -> Option<ChunkSetMeta> {
    let content = fs::read_to_string(dir.join(CHUNK_META_FILE)).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn save_chunk_meta(dir: &Path, paragraphs: &[String], voice: &str, model: &str) -> Result<()> {
    let meta = ChunkSetMeta {
        total: paragraphs.len(),
        paragraphs: paragraphs.to_vec(),
        voice: voice.to_string(),
        model: model.to_string(),
        generated: Utc::now().to_rfc3339(),
    };
    let content = serde_json::to_string_pretty(&meta)?;
    fs::write(dir.join(CHUNK_META_FILE), content).context("Failed to write paragraph metadata")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_state_returns_none() {
        let dir = tempdir().unwrap();
        assert!(load_playback_state(dir.path()).is_none());
    }

    #[test]
    fn test_load_malformed_state_returns_none() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(PLAYBACK_STATE_FILE), "not json at all").unwrap();
        assert!(load_playback_state(dir.path()).is_none());
    }

    #[test]
    fn test_load_out_of_range_cursor_returns_none() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(PLAYBACK_STATE_FILE),
            r#"{"current_chunk": 9, "total_chunks": 5, "status": "playing"}"#,
        )
        .unwrap();
        assert!(load_playback_state(dir.path()).is_none());
    }

    #[test]
    fn test_save_stamps_last_updated() {
        let dir = tempdir().unwrap();
        let state = PlaybackState::new(3, 7, PlaybackStatus::Generating);
        save_playback_state(dir.path(), &state).unwrap();

        let loaded = load_playback_state(dir.path()).unwrap();
        assert_eq!(loaded.current_chunk, 3);
        assert_eq!(loaded.total_chunks, 7);
        assert_eq!(loaded.status, PlaybackStatus::Generating);
        assert!(loaded.last_updated.is_some());
    }

    #[test]
    fn test_save_overwrites_previous_state() {
        let dir = tempdir().unwrap();
        save_playback_state(dir.path(), &PlaybackState::new(1, 10, PlaybackStatus::Playing))
            .unwrap();
        save_playback_state(dir.path(), &PlaybackState::new(5, 10, PlaybackStatus::Playing))
            .unwrap();

        let loaded = load_playback_state(dir.path()).unwrap();
        assert_eq!(loaded.current_chunk, 5);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let state = PlaybackState::new(10, 10, PlaybackStatus::Completed);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains(r#""status":"completed""#));
    }

    #[test]
    fn test_chunk_meta_roundtrip() {
        let dir = tempdir().unwrap();
        let paragraphs = vec!["First.".to_string(), "Second.".to_string()];
        save_chunk_meta(dir.path(), &paragraphs, "echo", "tts-1-hd").unwrap();

        let meta = load_chunk_meta(dir.path()).unwrap();
        assert_eq!(meta.total, 2);
        assert_eq!(meta.paragraphs, paragraphs);
        assert_eq!(meta.voice, "echo");
        assert_eq!(meta.model, "tts-1-hd");
        assert!(!meta.generated.is_empty());
    }

    #[test]
    fn test_load_missing_meta_returns_none() {
        let dir = tempdir().unwrap();
        assert!(load_chunk_meta(dir.path()).is_none());
    }
}
