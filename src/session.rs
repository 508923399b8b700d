//! Interactive flow around the core: prompts, captures, and routing unknown users
//! to enrollment.

use crate::audio::{AudioRecorder, RawAudio, RecordingArchive};
use crate::config::Config;
use crate::dsp::{FeaturePipeline, MfccPipeline};
use crate::enrollment::EnrollmentManager;
use crate::error::{CaptureFailure, VoiceError, VoiceResult};
use crate::tts::Speaker;
use crate::verification::{VerificationEngine, VerifyOutcome};
use crate::voiceprint::{VoiceprintDatabase, VoiceprintStore};
use std::sync::Arc;
use tracing::{info, warn};

/// What the user experienced
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated {
        distance: f64,
    },
    Rejected {
        distance: f64,
    },
    Enrolled {
        samples_used: usize,
        samples_attempted: usize,
    },
    EnrollmentFailed {
        samples_attempted: usize,
    },
    Indeterminate {
        reason: String,
    },
    CaptureFailed {
        reason: String,
    },
}

pub struct VoiceAuth {
    config: Config,
    recorder: Arc<dyn AudioRecorder>,
    speaker: Arc<dyn Speaker>,
    pipeline: Arc<dyn FeaturePipeline>,
    store: VoiceprintStore,
    db: VoiceprintDatabase,
    archive: Option<RecordingArchive>,
}

impl VoiceAuth {
    /// Load the voiceprint database and build the MFCC pipeline.
    ///
    /// A corrupt store aborts here rather than starting from an empty database.
    pub fn new(
        config: Config,
        recorder: Arc<dyn AudioRecorder>,
        speaker: Arc<dyn Speaker>,
    ) -> VoiceResult<Self> {
        config.validate()?;
        let store = VoiceprintStore::new(&config.voiceprint_db_path);
        let db = store.load()?;
        let pipeline: Arc<dyn FeaturePipeline> = Arc::new(MfccPipeline::new(&config));
        let archive = RecordingArchive::from_config(&config);

        Ok(Self {
            config,
            recorder,
            speaker,
            pipeline,
            store,
            db,
            archive,
        })
    }

    /// Swap the feature pipeline
    pub fn with_pipeline(mut self, pipeline: Arc<dyn FeaturePipeline>) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn database(&self) -> &VoiceprintDatabase {
        &self.db
    }

    pub fn is_enrolled(&self, user_id: &str) -> bool {
        self.db.contains(user_id)
    }

    /// Verify `user_id`, enrolling them first if no voiceprint exists
    pub async fn authenticate(&mut self, user_id: &str) -> VoiceResult<AuthOutcome> {
        if !self.db.contains(user_id) {
            self.say("No registered voice found. Setting up authentication.")
                .await;
            return self.enroll_user(user_id).await;
        }

        self.say("Speak to verify your identity.").await;
        let probe = match self.record().await {
            Ok(audio) => audio,
            Err(e) => {
                warn!("❌ Probe capture failed: {}", e);
                self.say("Recording failed. Please try again.").await;
                return Ok(AuthOutcome::CaptureFailed {
                    reason: e.to_string(),
                });
            }
        };
        if let Some(archive) = &self.archive {
            if let Err(e) = archive.save_probe(user_id, &probe) {
                warn!("Could not archive probe: {}", e);
            }
        }

        let engine = VerificationEngine::new(self.pipeline.as_ref(), self.config.threshold);
        match engine.verify(&self.db, user_id, &probe)? {
            VerifyOutcome::Decided(decision) if decision.is_accept() => {
                self.say("Authentication successful!").await;
                Ok(AuthOutcome::Authenticated {
                    distance: decision.distance,
                })
            }
            VerifyOutcome::Decided(decision) => {
                self.say("Authentication unsuccessful! Please try again.")
                    .await;
                Ok(AuthOutcome::Rejected {
                    distance: decision.distance,
                })
            }
            VerifyOutcome::Indeterminate(e) => {
                self.say("Verification failed due to noise. Please try again in a quieter environment.")
                    .await;
                Ok(AuthOutcome::Indeterminate {
                    reason: e.to_string(),
                })
            }
            VerifyOutcome::UnknownUser => self.enroll_user(user_id).await,
        }
    }

    /// Record the configured number of samples and (re-)enroll `user_id`
    pub async fn enroll_user(&mut self, user_id: &str) -> VoiceResult<AuthOutcome> {
        if user_id.trim().is_empty() {
            return Err(VoiceError::InvalidUserId);
        }

        let attempts = self.config.enrollment_samples;
        self.say(&format!(
            "Setting up voice authentication for {}. Please speak multiple times.",
            user_id
        ))
        .await;

        let mut waveforms = Vec::with_capacity(attempts);
        for i in 0..attempts {
            self.say(&format!("Sample {}: Please speak now.", i + 1))
                .await;
            match self.record().await {
                Ok(audio) => {
                    if let Some(archive) = &self.archive {
                        if let Err(e) = archive.save_sample(user_id, i, &audio) {
                            warn!("Could not archive sample {}: {}", i + 1, e);
                        }
                    }
                    waveforms.push(audio);
                }
                Err(e) => warn!("⚠️ Sample {} not captured: {}", i + 1, e),
            }
        }

        let manager = EnrollmentManager::new(self.pipeline.as_ref(), &self.store);
        match manager.enroll(&mut self.db, user_id, &waveforms) {
            Ok(voiceprint) => {
                self.say("Voice authentication setup complete.").await;
                Ok(AuthOutcome::Enrolled {
                    samples_used: voiceprint.samples,
                    samples_attempted: attempts,
                })
            }
            Err(VoiceError::InsufficientSamples { .. }) => {
                self.say("Setup failed due to noise issues. Please try again in a quieter environment.")
                    .await;
                Ok(AuthOutcome::EnrollmentFailed {
                    samples_attempted: attempts,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// One capture, run off the async runtime since recorders block
    async fn record(&self) -> Result<RawAudio, CaptureFailure> {
        self.say("Recording... Please speak clearly.").await;

        let recorder = Arc::clone(&self.recorder);
        let seconds = self.config.record_seconds;
        let audio = tokio::task::spawn_blocking(move || recorder.capture(seconds))
            .await
            .map_err(|e| CaptureFailure::Stream(e.to_string()))??;

        info!(
            "🎙️ Got {:.1}s clip from '{}'",
            audio.duration_secs(),
            self.recorder.name()
        );
        Ok(audio)
    }

    async fn say(&self, text: &str) {
        if let Err(e) = self.speaker.say(text).await {
            warn!("🔇 Speaker '{}' failed: {}", self.speaker.name(), e);
        }
    }
}
