use thiserror::Error;

/// Failure classes of the narration engine. State-file corruption is not
/// represented here: unreadable state loads as "no prior state" instead of
/// failing (see `state::load_playback_state`).
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Synthesis failed for paragraph {chunk}: {message}")]
    Synthesis { chunk: usize, message: String },

    #[error("Playback error: {0}")]
    Playback(String),
}
