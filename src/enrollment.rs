//! Builds a user's template from several spoken samples

use crate::audio::RawAudio;
use crate::dsp::{FeaturePipeline, FeatureVector};
use crate::error::{VoiceError, VoiceResult};
use crate::voiceprint::{Voiceprint, VoiceprintDatabase, VoiceprintStore};
use chrono::Local;
use std::thread;
use tracing::{info, warn};

/// Upper bound on threads used to fingerprint one enrollment batch
pub const MAX_EXTRACTION_THREADS: usize = 4;

pub struct EnrollmentManager<'a> {
    pipeline: &'a dyn FeaturePipeline,
    store: &'a VoiceprintStore,
}

impl<'a> EnrollmentManager<'a> {
    pub fn new(pipeline: &'a dyn FeaturePipeline, store: &'a VoiceprintStore) -> Self {
        Self { pipeline, store }
    }

    /// Average the usable samples into a template and persist it, replacing any
    /// earlier enrollment for `user_id`.
    ///
    /// Samples that fail feature extraction are skipped. With no usable sample the
    /// database is left untouched and `InsufficientSamples` is returned. If the
    /// store cannot be written the previous in-memory entry is restored.
    pub fn enroll(
        &self,
        db: &mut VoiceprintDatabase,
        user_id: &str,
        waveforms: &[RawAudio],
    ) -> VoiceResult<Voiceprint> {
        if user_id.trim().is_empty() {
            return Err(VoiceError::InvalidUserId);
        }

        let vectors = self.extract_all(waveforms);
        let template = FeatureVector::mean(&vectors).ok_or(VoiceError::InsufficientSamples {
            attempted: waveforms.len(),
        })?;

        let voiceprint = Voiceprint {
            user_id: user_id.to_string(),
            features: template,
            samples: vectors.len(),
            enrolled_at: Local::now().to_rfc3339(),
        };

        let previous = db.insert(voiceprint.clone());
        if let Err(e) = self.store.save(db) {
            match previous {
                Some(old) => {
                    db.insert(old);
                }
                None => {
                    db.remove(user_id);
                }
            }
            return Err(e);
        }

        info!(
            "📝 Enrolled '{}' from {}/{} samples{}",
            user_id,
            vectors.len(),
            waveforms.len(),
            if previous.is_some() { " (replaced previous)" } else { "" }
        );
        Ok(voiceprint)
    }

    /// Extract samples on a bounded set of scoped threads; results follow input order
    fn extract_all(&self, waveforms: &[RawAudio]) -> Vec<FeatureVector> {
        let pipeline = self.pipeline;
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .clamp(1, MAX_EXTRACTION_THREADS);
        let chunk_len = waveforms.len().div_ceil(workers).max(1);

        let results: Vec<Result<FeatureVector, String>> = thread::scope(|scope| {
            let handles: Vec<_> = waveforms
                .chunks(chunk_len)
                .map(|chunk| {
                    let handle = scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|audio| pipeline.features(audio).map_err(|e| e.to_string()))
                            .collect::<Vec<_>>()
                    });
                    (chunk.len(), handle)
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|(len, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| vec![Err("extraction panicked".to_string()); len])
                })
                .collect()
        });

        results
            .into_iter()
            .enumerate()
            .filter_map(|(i, result)| match result {
                Ok(vector) => Some(vector),
                Err(reason) => {
                    warn!("⚠️ Skipping sample {}: {}", i + 1, reason);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureExtractionError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps the first sample of a clip to a known vector; zero means unusable
    struct LookupPipeline;

    impl FeaturePipeline for LookupPipeline {
        fn features(&self, audio: &RawAudio) -> Result<FeatureVector, FeatureExtractionError> {
            match audio.samples().first() {
                Some(0) | None => Err(FeatureExtractionError::Silent {
                    rms: 0.0,
                    floor: 1e-5,
                }),
                Some(&s) => FeatureVector::new(vec![s as f64; 4]),
            }
        }

        fn dims(&self) -> usize {
            4
        }
    }

    fn clip(marker: i16) -> RawAudio {
        RawAudio::new(vec![marker; 8], 22050)
    }

    #[test]
    fn test_template_is_mean_of_valid_samples() {
        let dir = tempfile::tempdir().unwrap();
        let store = VoiceprintStore::new(dir.path().join("db.json"));
        let manager = EnrollmentManager::new(&LookupPipeline, &store);
        let mut db = VoiceprintDatabase::new();

        let vp = manager
            .enroll(&mut db, "alice", &[clip(3), clip(0), clip(9)])
            .unwrap();
        assert_eq!(vp.features.as_slice(), &[6.0; 4]);
        assert_eq!(vp.samples, 2);
        assert_eq!(db.get("alice"), Some(&vp));
        assert_eq!(store.load().unwrap(), db);
    }

    #[test]
    fn test_all_failed_samples_leave_db_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = VoiceprintStore::new(dir.path().join("db.json"));
        let manager = EnrollmentManager::new(&LookupPipeline, &store);
        let mut db = VoiceprintDatabase::new();

        let err = manager
            .enroll(&mut db, "bob", &[clip(0), clip(0)])
            .unwrap_err();
        assert!(matches!(err, VoiceError::InsufficientSamples { attempted: 2 }));
        assert!(!db.contains("bob"));
        assert!(!store.path().exists());

        assert!(matches!(
            manager.enroll(&mut db, "bob", &[]),
            Err(VoiceError::InsufficientSamples { attempted: 0 })
        ));
    }

    #[test]
    fn test_reenrollment_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = VoiceprintStore::new(dir.path().join("db.json"));
        let manager = EnrollmentManager::new(&LookupPipeline, &store);
        let mut db = VoiceprintDatabase::new();

        manager.enroll(&mut db, "alice", &[clip(2)]).unwrap();
        manager.enroll(&mut db, "alice", &[clip(10), clip(20)]).unwrap();

        let stored = store.load().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.get("alice").unwrap().features.as_slice(), &[15.0; 4]);
    }

    /// Tracks how many extractions run at once
    struct CountingPipeline {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FeaturePipeline for CountingPipeline {
        fn features(&self, audio: &RawAudio) -> Result<FeatureVector, FeatureExtractionError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            self.active.fetch_sub(1, Ordering::SeqCst);
            LookupPipeline.features(audio)
        }

        fn dims(&self) -> usize {
            4
        }
    }

    #[test]
    fn test_large_batch_uses_bounded_threads() {
        let dir = tempfile::tempdir().unwrap();
        let store = VoiceprintStore::new(dir.path().join("db.json"));
        let pipeline = CountingPipeline {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let manager = EnrollmentManager::new(&pipeline, &store);
        let clips: Vec<RawAudio> = (1..=60).map(|i| clip(if i % 10 == 0 { 0 } else { 2 })).collect();

        let vp = manager
            .enroll(&mut VoiceprintDatabase::new(), "alice", &clips)
            .unwrap();
        assert_eq!(vp.samples, 54);
        assert_eq!(vp.features.as_slice(), &[2.0; 4]);
        assert!(pipeline.peak.load(Ordering::SeqCst) <= MAX_EXTRACTION_THREADS);
    }

    #[test]
    fn test_empty_user_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = VoiceprintStore::new(dir.path().join("db.json"));
        let manager = EnrollmentManager::new(&LookupPipeline, &store);
        assert!(matches!(
            manager.enroll(&mut VoiceprintDatabase::new(), "  ", &[clip(1)]),
            Err(VoiceError::InvalidUserId)
        ));
    }

    #[test]
    fn test_failed_save_restores_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let good = VoiceprintStore::new(dir.path().join("db.json"));
        let mut db = VoiceprintDatabase::new();
        EnrollmentManager::new(&LookupPipeline, &good)
            .enroll(&mut db, "alice", &[clip(4)])
            .unwrap();

        // Parent path is a regular file, so the save cannot create its directory
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let broken = VoiceprintStore::new(blocker.join("db.json"));
        let manager = EnrollmentManager::new(&LookupPipeline, &broken);

        assert!(manager.enroll(&mut db, "alice", &[clip(8)]).is_err());
        assert_eq!(db.get("alice").unwrap().features.as_slice(), &[4.0; 4]);

        assert!(manager.enroll(&mut db, "carol", &[clip(8)]).is_err());
        assert!(!db.contains("carol"));
    }
}
