//! Stationary spectral-gate noise reduction followed by pre-emphasis

use super::stft::Stft;
use crate::config::Config;
use tracing::debug;

/// Magnitude floor before converting to dB
const AMIN: f64 = 1e-10;

/// Cleans a raw waveform before feature extraction.
///
/// One noise profile is estimated per clip and applied to the whole signal. Bins that do
/// not rise `std_threshold` standard deviations above the profile are attenuated by
/// `prop_decrease`.
///
/// The profile comes from the quietest `profile_fraction` of frames. At 1.0 every frame
/// counts, which is the classic whole-clip stationary estimate. The default of 0.5 keeps
/// voiced frames out of the profile so short, speech-dense clips are not gated away.
#[derive(Debug)]
pub struct Preprocessor {
    stft: Stft,
    enabled: bool,
    std_threshold: f64,
    profile_fraction: f64,
    prop_decrease: f64,
    freq_smooth_hz: f64,
    time_smooth_ms: f64,
    pre_emphasis: f64,
}

impl Preprocessor {
    pub fn new(config: &Config) -> Self {
        Self {
            stft: Stft::new(config.noise_n_fft, config.noise_hop_length),
            enabled: config.noise_reduction,
            std_threshold: config.noise_std_threshold,
            profile_fraction: config.noise_profile_fraction,
            prop_decrease: config.noise_prop_decrease,
            freq_smooth_hz: config.freq_mask_smooth_hz,
            time_smooth_ms: config.time_mask_smooth_ms,
            pre_emphasis: config.pre_emphasis,
        }
    }

    /// Suppress stationary noise, then boost high frequencies.
    ///
    /// Never fails: silent input comes back silent.
    pub fn denoise(&self, signal: &[f64], sample_rate: u32) -> Vec<f64> {
        let reduced = if self.enabled && signal.len() >= self.stft.n_fft() {
            self.reduce_noise(signal, sample_rate)
        } else {
            debug!(
                "Skipping noise reduction ({} samples, enabled: {})",
                signal.len(),
                self.enabled
            );
            signal.to_vec()
        };
        pre_emphasis(&reduced, self.pre_emphasis)
    }

    fn reduce_noise(&self, signal: &[f64], sample_rate: u32) -> Vec<f64> {
        let mut spectrum = self.stft.forward(signal);
        let db: Vec<Vec<f64>> = spectrum
            .iter()
            .map(|frame| frame.iter().map(|c| amp_to_db(c.norm())).collect())
            .collect();

        let thresholds = self.noise_thresholds(&db);

        let mut mask: Vec<Vec<f64>> = db
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .zip(&thresholds)
                    .map(|(v, t)| if v > t { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect();

        let freq_radius = half_width(self.freq_smooth_hz / self.stft.bin_hz(sample_rate));
        let frame_ms = self.stft.hop() as f64 * 1000.0 / sample_rate as f64;
        let time_radius = half_width(self.time_smooth_ms / frame_ms);
        smooth_mask(&mut mask, time_radius, freq_radius);

        let kept: f64 = mask.iter().flatten().sum();
        debug!(
            "🔇 Noise gate keeps {:.1}% of time-frequency bins",
            100.0 * kept / (mask.len() * self.stft.n_bins()).max(1) as f64
        );

        for (frame, gains) in spectrum.iter_mut().zip(&mask) {
            for (c, m) in frame.iter_mut().zip(gains) {
                *c *= m * self.prop_decrease + (1.0 - self.prop_decrease);
            }
        }

        self.stft.inverse(&spectrum, signal.len())
    }

    /// Per-bin gate level: mean + k * std of the dB spectrum over the quietest frames
    fn noise_thresholds(&self, db: &[Vec<f64>]) -> Vec<f64> {
        let n_bins = self.stft.n_bins();
        let mut order: Vec<usize> = (0..db.len()).collect();
        let energy = |t: usize| db[t].iter().sum::<f64>();
        order.sort_by(|&a, &b| energy(a).total_cmp(&energy(b)));

        let take = ((db.len() as f64 * self.profile_fraction).ceil() as usize).clamp(1, db.len());
        let quiet = &order[..take];

        (0..n_bins)
            .map(|k| {
                let n = quiet.len() as f64;
                let mean = quiet.iter().map(|&t| db[t][k]).sum::<f64>() / n;
                let var = quiet.iter().map(|&t| (db[t][k] - mean).powi(2)).sum::<f64>() / n;
                mean + self.std_threshold * var.sqrt()
            })
            .collect()
    }
}

/// First-order high-pass: `y[n] = x[n] - coeff * x[n-1]`, `y[0] = x[0]`
pub fn pre_emphasis(signal: &[f64], coeff: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(signal.len());
    let mut prev = None;
    for &x in signal {
        out.push(match prev {
            Some(p) => x - coeff * p,
            None => x,
        });
        prev = Some(x);
    }
    out
}

fn amp_to_db(magnitude: f64) -> f64 {
    20.0 * magnitude.max(AMIN).log10()
}

fn half_width(span_in_steps: f64) -> usize {
    (span_in_steps.max(0.0) / 2.0).round() as usize
}

/// Separable triangular smoothing over frequency then time
fn smooth_mask(mask: &mut [Vec<f64>], time_radius: usize, freq_radius: usize) {
    if mask.is_empty() {
        return;
    }
    if freq_radius > 0 {
        for frame in mask.iter_mut() {
            *frame = triangular_smooth(frame, freq_radius);
        }
    }
    if time_radius > 0 {
        let n_bins = mask[0].len();
        for k in 0..n_bins {
            let column: Vec<f64> = mask.iter().map(|frame| frame[k]).collect();
            for (frame, v) in mask.iter_mut().zip(triangular_smooth(&column, time_radius)) {
                frame[k] = v;
            }
        }
    }
}

/// Centered triangular-weighted average; weights renormalize at the edges
fn triangular_smooth(values: &[f64], radius: usize) -> Vec<f64> {
    let len = values.len();
    (0..len)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(len.saturating_sub(1));
            let mut acc = 0.0;
            let mut total = 0.0;
            for (j, v) in values.iter().enumerate().take(hi + 1).skip(lo) {
                let w = 1.0 - i.abs_diff(j) as f64 / (radius + 1) as f64;
                acc += w * v;
                total += w;
            }
            acc / total
        })
        .collect()
}
