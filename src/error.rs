//! Error type shared by the loaders, models and the generator.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by this crate.
///
/// Shape mismatches and device failures inside candle surface as
/// [`NsynthError::Candle`]; the remaining variants are the conditions the
/// crate checks for itself.
#[derive(Debug, Error)]
pub enum NsynthError {
    /// Input audio is not at the rate the model was trained on. There is no
    /// resampling fallback.
    #[error("unsupported sample rate: expected {expected} Hz, found {found} Hz")]
    UnsupportedSampleRate { expected: u32, found: u32 },

    /// Restoring a checkpoint for resumed training was requested.
    #[error("restoring a checkpoint in training mode is not supported")]
    TrainingResumeUnsupported,

    /// Seed signal is shorter than the decoder's receptive field.
    #[error("input of {length} samples is shorter than the receptive field ({receptive_field})")]
    InputTooShort {
        length: usize,
        receptive_field: usize,
    },

    /// An upsampled conditioning sequence does not cover the full output.
    #[error(
        "conditioning sequence {index} covers {available} steps, generation needs {required}"
    )]
    ConditioningTooShort {
        index: usize,
        available: usize,
        required: usize,
    },

    /// The decoder received a different number of conditioning sequences than
    /// it has layers for.
    #[error("expected {expected} conditioning sequences, got {found}")]
    ConditioningMismatch { expected: usize, found: usize },

    /// A tensor has a shape the crate cannot work with, such as a batched
    /// seed or decoder scores with no time steps.
    #[error("expected {expected}, found shape {found:?}")]
    InvalidShape {
        expected: &'static str,
        found: Vec<usize>,
    },

    /// Architecture hyperparameters that cannot describe a working model.
    #[error("invalid model config: {0}")]
    InvalidConfig(String),

    /// Device selector is malformed or its backend was not compiled in.
    #[error("unsupported device: {0}")]
    UnsupportedDevice(String),

    #[error("failed to read checkpoint {path}: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: candle_core::Error,
    },

    #[error("failed to open WAV file {path}: {source}")]
    WavOpen {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, NsynthError>;
