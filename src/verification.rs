//! Accept/reject decisions for a probe utterance

use crate::audio::RawAudio;
use crate::dsp::{FeaturePipeline, FeatureVector};
use crate::error::{FeatureExtractionError, VoiceError, VoiceResult};
use crate::voiceprint::VoiceprintDatabase;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

/// A verdict together with the numbers that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub verdict: Verdict,
    pub distance: f64,
    pub threshold: f64,
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        self.verdict == Verdict::Accept
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} (distance {:.3}, threshold {:.3})",
            self.verdict, self.distance, self.threshold
        )
    }
}

/// Result of one verification attempt
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    Decided(Decision),
    /// No template for this user; the caller should enroll instead
    UnknownUser,
    /// The probe could not be fingerprinted; says nothing about the speaker
    Indeterminate(FeatureExtractionError),
}

pub struct VerificationEngine<'a> {
    pipeline: &'a dyn FeaturePipeline,
    threshold: f64,
}

impl<'a> VerificationEngine<'a> {
    pub fn new(pipeline: &'a dyn FeaturePipeline, threshold: f64) -> Self {
        Self {
            pipeline,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare a probe clip against the stored template for `user_id`
    pub fn verify(
        &self,
        db: &VoiceprintDatabase,
        user_id: &str,
        probe: &RawAudio,
    ) -> VoiceResult<VerifyOutcome> {
        let Some(voiceprint) = db.get(user_id) else {
            info!("❓ No voiceprint enrolled for '{}'", user_id);
            return Ok(VerifyOutcome::UnknownUser);
        };

        let features = match self.pipeline.features(probe) {
            Ok(features) => features,
            Err(e) => {
                warn!("⚠️ Probe for '{}' unusable: {}", user_id, e);
                return Ok(VerifyOutcome::Indeterminate(e));
            }
        };

        let decision = self.decide(&features, &voiceprint.features)?;
        info!("🔐 Verification for '{}': {}", user_id, decision);
        Ok(VerifyOutcome::Decided(decision))
    }

    /// Accept iff the distance is strictly below the threshold
    pub fn decide(&self, probe: &FeatureVector, template: &FeatureVector) -> VoiceResult<Decision> {
        let distance = probe
            .distance(template)
            .ok_or(VoiceError::DimensionMismatch {
                expected: template.dims(),
                found: probe.dims(),
            })?;

        let verdict = if distance < self.threshold {
            Verdict::Accept
        } else {
            Verdict::Reject
        };
        Ok(Decision {
            verdict,
            distance,
            threshold: self.threshold,
        })
    }
}
