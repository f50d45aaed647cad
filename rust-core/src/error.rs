//! Errors for the fallible edges of the engine.
//!
//! Frame analysis itself never fails: low-visibility or malformed landmarks
//! surface as `ExerciseState::Invalid`. Errors only come from building frames
//! strictly, parsing exercise names and loading configuration.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("expected {expected} landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },

    #[error("unknown exercise type: {0}")]
    UnknownExercise(String),

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid {exercise} thresholds: {reason}")]
    InvalidThresholds {
        exercise: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
