mod common;

use common::signals::{alice, bob, silence, SR};
use voicegate::dsp::FEATURE_DIMS;
use voicegate::{
    Config, EnrollmentManager, FeatureExtractionError, FeaturePipeline, FeatureVector,
    MfccPipeline, RawAudio, Verdict, VerificationEngine, VerifyOutcome, VoiceError, Voiceprint,
    VoiceprintDatabase, VoiceprintStore,
};

fn pipeline() -> MfccPipeline {
    MfccPipeline::new(&Config::default())
}

#[test]
fn test_nominal_clip_gives_forty_finite_values() {
    let features = pipeline().features(&alice(5.0, 1)).expect("voiced clip");
    assert_eq!(features.dims(), FEATURE_DIMS);
    assert_eq!(features.dims(), 40);
    assert!(features.as_slice().iter().all(|v| v.is_finite()));
}

#[test]
fn test_silent_clip_fails_extraction() {
    let err = pipeline().features(&silence(5.0)).unwrap_err();
    assert!(matches!(err, FeatureExtractionError::Silent { .. }));
}

#[test]
fn test_template_is_mean_of_three_samples() {
    let dir = tempfile::tempdir().unwrap();
    let store = VoiceprintStore::new(dir.path().join("voiceprints.json"));
    let pipeline = pipeline();
    let clips = [alice(3.0, 1), alice(3.0, 2), alice(3.0, 3)];

    let individual: Vec<FeatureVector> = clips
        .iter()
        .map(|c| pipeline.features(c).unwrap())
        .collect();

    let mut db = VoiceprintDatabase::new();
    let vp = EnrollmentManager::new(&pipeline, &store)
        .enroll(&mut db, "alice", &clips)
        .unwrap();

    assert_eq!(vp.samples, 3);
    for (k, value) in vp.features.as_slice().iter().enumerate() {
        let expected = (individual[0].as_slice()[k]
            + individual[1].as_slice()[k]
            + individual[2].as_slice()[k])
            / 3.0;
        assert!((value - expected).abs() < 1e-9, "coefficient {}", k);
    }
}

#[test]
fn test_all_silent_enrollment_is_insufficient() {
    let dir = tempfile::tempdir().unwrap();
    let store = VoiceprintStore::new(dir.path().join("voiceprints.json"));
    let pipeline = pipeline();
    let mut db = VoiceprintDatabase::new();

    let err = EnrollmentManager::new(&pipeline, &store)
        .enroll(&mut db, "alice", &[silence(5.0), silence(5.0)])
        .unwrap_err();

    assert!(matches!(err, VoiceError::InsufficientSamples { attempted: 2 }));
    assert!(!db.contains("alice"));
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_one_good_sample_is_enough() {
    let dir = tempfile::tempdir().unwrap();
    let store = VoiceprintStore::new(dir.path().join("voiceprints.json"));
    let pipeline = pipeline();
    let mut db = VoiceprintDatabase::new();

    let vp = EnrollmentManager::new(&pipeline, &store)
        .enroll(&mut db, "alice", &[silence(2.0), alice(2.0, 5), silence(2.0)])
        .unwrap();
    assert_eq!(vp.samples, 1);
    assert_eq!(vp.features, pipeline.features(&alice(2.0, 5)).unwrap());
}

#[test]
fn test_enrolled_clip_verifies_at_zero_distance() {
    let dir = tempfile::tempdir().unwrap();
    let store = VoiceprintStore::new(dir.path().join("voiceprints.json"));
    let pipeline = pipeline();
    let mut db = VoiceprintDatabase::new();
    let clip = alice(3.0, 9);

    EnrollmentManager::new(&pipeline, &store)
        .enroll(&mut db, "alice", std::slice::from_ref(&clip))
        .unwrap();
    let outcome = VerificationEngine::new(&pipeline, 25.0)
        .verify(&db, "alice", &clip)
        .unwrap();

    match outcome {
        VerifyOutcome::Decided(decision) => {
            assert_eq!(decision.verdict, Verdict::Accept);
            assert_eq!(decision.distance, 0.0);
        }
        other => panic!("expected a decision, got {:?}", other),
    }
}

#[test]
fn test_same_speaker_closer_than_other_speaker() {
    let pipeline = pipeline();
    let template = pipeline.features(&alice(3.0, 11)).unwrap();
    let again = pipeline.features(&alice(3.0, 12)).unwrap();
    let other = pipeline.features(&bob(3.0, 11)).unwrap();

    let same = template.distance(&again).unwrap();
    let different = template.distance(&other).unwrap();
    assert!(same < different, "same {} vs different {}", same, different);

    let engine = VerificationEngine::new(&pipeline, 25.0);
    assert_eq!(engine.decide(&again, &template).unwrap().verdict, Verdict::Accept);
    assert_eq!(engine.decide(&other, &template).unwrap().verdict, Verdict::Reject);
}

#[test]
fn test_offsets_at_and_beyond_threshold_reject() {
    let pipeline = pipeline();
    let engine = VerificationEngine::new(&pipeline, 25.0);
    let template = FeatureVector::new((0..40).map(|i| i as f64 * 0.5 - 10.0).collect()).unwrap();

    let shifted = |offset: &[(usize, f64)]| {
        let mut values = template.as_slice().to_vec();
        for &(k, d) in offset {
            values[k] += d;
        }
        FeatureVector::new(values).unwrap()
    };

    // 18^2 + 24^2 = 30^2
    let far = engine.decide(&shifted(&[(0, 18.0), (5, 24.0)]), &template).unwrap();
    assert_eq!(far.distance, 30.0);
    assert_eq!(far.verdict, Verdict::Reject);

    // 15^2 + 20^2 = 25^2
    let tie = engine.decide(&shifted(&[(2, 15.0), (9, -20.0)]), &template).unwrap();
    assert_eq!(tie.distance, 25.0);
    assert_eq!(tie.verdict, Verdict::Reject);

    let inside = engine.decide(&shifted(&[(2, 15.0), (9, -19.5)]), &template).unwrap();
    assert_eq!(inside.verdict, Verdict::Accept);
}

#[test]
fn test_unknown_user_is_not_a_decision() {
    let dir = tempfile::tempdir().unwrap();
    let store = VoiceprintStore::new(dir.path().join("voiceprints.json"));
    let pipeline = pipeline();
    let mut db = VoiceprintDatabase::new();
    db.insert(Voiceprint {
        user_id: "alice".to_string(),
        features: FeatureVector::new(vec![1.0; 40]).unwrap(),
        samples: 3,
        enrolled_at: String::new(),
    });
    store.save(&db).unwrap();
    let before = db.clone();

    let outcome = VerificationEngine::new(&pipeline, 25.0)
        .verify(&db, "mallory", &alice(2.0, 1))
        .unwrap();

    assert_eq!(outcome, VerifyOutcome::UnknownUser);
    assert_eq!(db, before);
    assert_eq!(store.load().unwrap(), before);
}

#[test]
fn test_store_round_trip_preserves_extracted_templates() {
    let dir = tempfile::tempdir().unwrap();
    let store = VoiceprintStore::new(dir.path().join("voiceprints.json"));
    let pipeline = pipeline();
    let mut db = VoiceprintDatabase::new();

    let manager = EnrollmentManager::new(&pipeline, &store);
    manager.enroll(&mut db, "alice", &[alice(2.0, 1), alice(2.0, 2)]).unwrap();
    manager.enroll(&mut db, "bob", &[bob(2.0, 1)]).unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded, db);
    for vp in db.iter() {
        let restored = loaded.get(&vp.user_id).unwrap();
        assert_eq!(restored.features.as_slice(), vp.features.as_slice());
    }
}

#[test]
fn test_wrong_sample_rate_is_indeterminate() {
    let pipeline = pipeline();
    let mut db = VoiceprintDatabase::new();
    db.insert(Voiceprint {
        user_id: "alice".to_string(),
        features: pipeline.features(&alice(2.0, 1)).unwrap(),
        samples: 1,
        enrolled_at: String::new(),
    });

    let resampled = RawAudio::new(alice(2.0, 1).samples().to_vec(), SR / 2);
    let outcome = VerificationEngine::new(&pipeline, 25.0)
        .verify(&db, "alice", &resampled)
        .unwrap();
    assert!(matches!(
        outcome,
        VerifyOutcome::Indeterminate(FeatureExtractionError::SampleRateMismatch { .. })
    ));
}
