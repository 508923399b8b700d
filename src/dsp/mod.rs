//! Acoustic feature pipeline
//!
//! - `denoise`: stationary noise reduction and pre-emphasis
//! - `mfcc`: time-averaged cepstral fingerprint
//! - `stft`: shared spectral transform

pub mod denoise;
pub mod mfcc;
pub mod stft;

use crate::audio::RawAudio;
use crate::config::Config;
use crate::error::FeatureExtractionError;
use serde::{Deserialize, Serialize};

pub use denoise::Preprocessor;
pub use mfcc::MfccExtractor;

/// Default fingerprint dimensionality
pub const FEATURE_DIMS: usize = 40;

/// Fixed-length acoustic fingerprint. Always non-empty and finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Result<Self, FeatureExtractionError> {
        if values.is_empty() {
            return Err(FeatureExtractionError::EmptySignal);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FeatureExtractionError::NonFinite);
        }
        Ok(Self(values))
    }

    pub fn dims(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean distance, `None` when dimensions differ
    pub fn distance(&self, other: &FeatureVector) -> Option<f64> {
        if self.dims() != other.dims() {
            return None;
        }
        let sum: f64 = self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Some(sum.sqrt())
    }

    /// Unweighted elementwise mean; `None` for an empty or ragged set
    pub fn mean(vectors: &[FeatureVector]) -> Option<FeatureVector> {
        let dims = vectors.first()?.dims();
        if vectors.iter().any(|v| v.dims() != dims) {
            return None;
        }
        let mut acc = vec![0.0; dims];
        for v in vectors {
            for (a, x) in acc.iter_mut().zip(&v.0) {
                *a += x;
            }
        }
        let n = vectors.len() as f64;
        Some(FeatureVector(acc.into_iter().map(|a| a / n).collect()))
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = FeatureExtractionError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(v: FeatureVector) -> Self {
        v.0
    }
}

/// Raw audio in, fingerprint out
pub trait FeaturePipeline: Send + Sync {
    fn features(&self, audio: &RawAudio) -> Result<FeatureVector, FeatureExtractionError>;

    /// Dimensionality of every vector this pipeline produces
    fn dims(&self) -> usize;
}

/// Denoise + MFCC, the production pipeline
#[derive(Debug)]
pub struct MfccPipeline {
    preprocessor: Preprocessor,
    extractor: MfccExtractor,
}

impl MfccPipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            preprocessor: Preprocessor::new(config),
            extractor: MfccExtractor::new(config),
        }
    }
}

impl FeaturePipeline for MfccPipeline {
    fn features(&self, audio: &RawAudio) -> Result<FeatureVector, FeatureExtractionError> {
        let cleaned = self
            .preprocessor
            .denoise(&audio.to_f64(), audio.sample_rate());
        self.extractor.extract(&cleaned, audio.sample_rate())
    }

    fn dims(&self) -> usize {
        self.extractor.dims()
    }
}
