//! Synthetic speech-like clips

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use voicegate::RawAudio;

pub const SR: u32 = 22050;

/// Voiced bursts (0.18 s every 0.6 s) over low background hiss.
///
/// `f0` sets the pitch, `formant` the resonance peak that shapes the harmonics.
pub fn voice(seconds: f64, f0: f64, formant: f64, amplitude: f64, seed: u64) -> RawAudio {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = (seconds * SR as f64) as usize;
    let weights: Vec<f64> = (1..=12)
        .map(|h| {
            let hz = f0 * h as f64;
            (1.0 / h as f64) * (1.0 + 3.0 * (-((hz - formant) / 250.0).powi(2)).exp())
        })
        .collect();
    let norm: f64 = weights.iter().sum();

    let samples = (0..n)
        .map(|i| {
            let t = i as f64 / SR as f64;
            let phase = t % 0.6;
            let voiced = if phase < 0.18 {
                let envelope = (PI * phase / 0.18).sin();
                weights
                    .iter()
                    .enumerate()
                    .map(|(h, w)| w * (2.0 * PI * f0 * (h + 1) as f64 * t).sin())
                    .sum::<f64>()
                    / norm
                    * envelope
            } else {
                0.0
            };
            let hiss = rng.gen_range(-0.004..0.004);
            let x = amplitude * (voiced + hiss);
            (x.clamp(-1.0, 1.0) * 32767.0) as i16
        })
        .collect();
    RawAudio::new(samples, SR)
}

/// Default test speaker
pub fn alice(seconds: f64, seed: u64) -> RawAudio {
    voice(seconds, 210.0, 900.0, 0.6, seed)
}

/// A lower, much quieter speaker
pub fn bob(seconds: f64, seed: u64) -> RawAudio {
    voice(seconds, 105.0, 450.0, 0.06, seed)
}

pub fn silence(seconds: f64) -> RawAudio {
    RawAudio::new(vec![0; (seconds * SR as f64) as usize], SR)
}
