//! Mel-frequency cepstral coefficients averaged over time
//!
//! Power spectrogram -> Slaney mel filterbank -> dB (80 dB dynamic range) -> orthonormal
//! DCT-II. The per-frame cepstra are averaged so clips of any length map onto the same
//! number of dimensions.

use super::stft::Stft;
use super::FeatureVector;
use crate::config::Config;
use crate::error::FeatureExtractionError;
use std::f64::consts::PI;
use tracing::debug;

const POWER_FLOOR: f64 = 1e-10;
const TOP_DB: f64 = 80.0;

#[derive(Debug)]
pub struct MfccExtractor {
    sample_rate: u32,
    n_mfcc: usize,
    stft: Stft,
    /// `n_mels` rows of `n_fft / 2 + 1` weights
    filterbank: Vec<Vec<f64>>,
    /// First `n_mfcc` rows of the orthonormal DCT-II matrix
    dct: Vec<Vec<f64>>,
    silence_floor: f64,
}

impl MfccExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            sample_rate: config.sample_rate,
            n_mfcc: config.n_mfcc,
            stft: Stft::new(config.n_fft, config.hop_length),
            filterbank: mel_filterbank(config.sample_rate, config.n_fft, config.n_mels),
            dct: dct_matrix(config.n_mfcc, config.n_mels),
            silence_floor: config.silence_rms_floor,
        }
    }

    pub fn dims(&self) -> usize {
        self.n_mfcc
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Reduce a cleaned waveform to its time-averaged MFCC vector.
    pub fn extract(
        &self,
        signal: &[f64],
        sample_rate: u32,
    ) -> Result<FeatureVector, FeatureExtractionError> {
        if sample_rate != self.sample_rate {
            return Err(FeatureExtractionError::SampleRateMismatch {
                expected: self.sample_rate,
                found: sample_rate,
            });
        }
        if signal.is_empty() {
            return Err(FeatureExtractionError::EmptySignal);
        }
        if signal.len() < self.stft.n_fft() {
            return Err(FeatureExtractionError::TooShort {
                samples: signal.len(),
                required: self.stft.n_fft(),
            });
        }

        let rms = (signal.iter().map(|x| x * x).sum::<f64>() / signal.len() as f64).sqrt();
        if !rms.is_finite() {
            return Err(FeatureExtractionError::NonFinite);
        }
        if rms <= self.silence_floor {
            return Err(FeatureExtractionError::Silent {
                rms,
                floor: self.silence_floor,
            });
        }

        let log_mel: Vec<Vec<f64>> = self
            .stft
            .forward(signal)
            .iter()
            .map(|frame| {
                let power: Vec<f64> = frame.iter().map(|c| c.norm_sqr()).collect();
                self.filterbank
                    .iter()
                    .map(|weights| {
                        let energy: f64 = weights.iter().zip(&power).map(|(w, p)| w * p).sum();
                        10.0 * energy.max(POWER_FLOOR).log10()
                    })
                    .collect()
            })
            .collect();

        let peak = log_mel
            .iter()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let floor = peak - TOP_DB;

        let mut mean = vec![0.0; self.n_mfcc];
        for frame in &log_mel {
            for (acc, basis) in mean.iter_mut().zip(&self.dct) {
                *acc += basis
                    .iter()
                    .zip(frame)
                    .map(|(b, v)| b * v.max(floor))
                    .sum::<f64>();
            }
        }
        let n_frames = log_mel.len() as f64;
        for v in mean.iter_mut() {
            *v /= n_frames;
        }

        debug!(
            "🎛️ {} MFCCs averaged over {} frames (c0 = {:.2})",
            self.n_mfcc,
            log_mel.len(),
            mean.first().copied().unwrap_or_default()
        );

        FeatureVector::new(mean).map_err(|_| FeatureExtractionError::NonFinite)
    }
}

/// Slaney-style mel scale: linear below 1 kHz, logarithmic above
pub fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        mel * F_SP
    }
}

/// Triangular filters spanning 0 Hz to Nyquist, area-normalized
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f64>> {
    let n_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect();

    let mel_max = hz_to_mel(nyquist);
    let edges: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (lower, center, upper) = (edges[m], edges[m + 1], edges[m + 2]);
            let enorm = 2.0 / (upper - lower);
            fft_freqs
                .iter()
                .map(|&f| {
                    let rising = (f - lower) / (center - lower);
                    let falling = (upper - f) / (upper - center);
                    rising.min(falling).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}

/// Rows `0..n_out` of the orthonormal DCT-II over `n_in` inputs
fn dct_matrix(n_out: usize, n_in: usize) -> Vec<Vec<f64>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}
