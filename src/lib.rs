//! VoiceGate Library
//!
//! Speaker verification from short spoken samples: denoise, fingerprint with
//! time-averaged MFCCs, enroll by averaging, verify by Euclidean distance.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod enrollment;
pub mod error;
pub mod session;
pub mod tts;
pub mod verification;
pub mod voiceprint;

pub use audio::{AudioRecorder, RawAudio};
pub use config::Config;
pub use dsp::{FeaturePipeline, FeatureVector, MfccPipeline};
pub use enrollment::EnrollmentManager;
pub use error::{CaptureFailure, FeatureExtractionError, VoiceError, VoiceResult};
pub use session::{AuthOutcome, VoiceAuth};
pub use tts::Speaker;
pub use verification::{Decision, Verdict, VerificationEngine, VerifyOutcome};
pub use voiceprint::{Voiceprint, VoiceprintDatabase, VoiceprintStore};
