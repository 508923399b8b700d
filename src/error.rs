//! VoiceGate Error Types
//!
//! Per-sample failures (`CaptureFailure`, `FeatureExtractionError`) are kept apart from
//! the crate-wide `VoiceError` so enrollment and verification can contain them.

use std::path::PathBuf;
use thiserror::Error;

/// The recorder could not produce a waveform
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureFailure {
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("capture ended early: got {captured} of {expected} samples")]
    Incomplete { captured: usize, expected: usize },

    #[error("unsupported audio format: {0}")]
    Format(String),

    #[error("no more recordings to replay")]
    Exhausted,
}

/// A waveform is unusable for feature computation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureExtractionError {
    #[error("signal is empty")]
    EmptySignal,

    #[error("signal too short: {samples} samples, need at least {required}")]
    TooShort { samples: usize, required: usize },

    #[error("signal is silent (rms {rms:.2e} below floor {floor:.2e})")]
    Silent { rms: f64, floor: f64 },

    #[error("cepstral coefficients are not finite")]
    NonFinite,

    #[error("sample rate mismatch: extractor built for {expected} Hz, got {found} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },
}

/// Central error type for VoiceGate
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureFailure),

    #[error("no usable samples out of {attempted}")]
    InsufficientSamples { attempted: usize },

    #[error("user id must not be empty")]
    InvalidUserId,

    #[error("voiceprint store {} is unreadable: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },

    #[error("feature dimensions differ: template has {expected}, probe has {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for VoiceGate operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for VoiceError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        VoiceError::Lock(err.to_string())
    }
}
