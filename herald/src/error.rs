use thiserror::Error;

/// All errors produced by the herald engine.
#[derive(Debug, Error)]
pub enum HeraldError {
    #[error("no speech engine found (tried espeak-ng, espeak)")]
    SpeechUnavailable,

    #[error("speech engine error: {0}")]
    Speech(String),

    #[error("audio output error: {0}")]
    AudioOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HeraldError>;
