//! Short-time Fourier transform shared by noise reduction and MFCC extraction

use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Centered STFT with a periodic Hann window and zero padding at the edges.
pub struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for Stft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stft")
            .field("n_fft", &self.n_fft)
            .field("hop", &self.hop)
            .finish()
    }
}

impl Stft {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            n_fft,
            hop,
            window: hann_window(n_fft),
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Number of non-negative frequency bins per frame
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frequency resolution in Hz
    pub fn bin_hz(&self, sample_rate: u32) -> f64 {
        sample_rate as f64 / self.n_fft as f64
    }

    /// Transform a signal into `frames x n_bins` complex coefficients.
    pub fn forward(&self, signal: &[f64]) -> Vec<Vec<Complex64>> {
        let pad = self.n_fft / 2;
        let mut padded = vec![0.0; signal.len() + 2 * pad];
        padded[pad..pad + signal.len()].copy_from_slice(signal);

        if padded.len() < self.n_fft {
            return Vec::new();
        }
        let n_frames = 1 + (padded.len() - self.n_fft) / self.hop;
        let n_bins = self.n_bins();

        let mut buf = vec![Complex64::new(0.0, 0.0); self.n_fft];
        let mut frames = Vec::with_capacity(n_frames);
        for t in 0..n_frames {
            let start = t * self.hop;
            for (i, (c, w)) in buf.iter_mut().zip(&self.window).enumerate() {
                *c = Complex64::new(padded[start + i] * w, 0.0);
            }
            self.forward.process(&mut buf);
            frames.push(buf[..n_bins].to_vec());
        }
        frames
    }

    /// Overlap-add resynthesis of `length` samples from `forward` output.
    pub fn inverse(&self, frames: &[Vec<Complex64>], length: usize) -> Vec<f64> {
        let pad = self.n_fft / 2;
        let n_bins = self.n_bins();
        let total = self.n_fft + self.hop * frames.len().saturating_sub(1);
        let mut out = vec![0.0; total.max(pad + length)];
        let mut norm = vec![0.0; out.len()];

        let scale = 1.0 / self.n_fft as f64;
        let mut buf = vec![Complex64::new(0.0, 0.0); self.n_fft];
        for (t, frame) in frames.iter().enumerate() {
            // Rebuild the full Hermitian spectrum
            for k in 0..self.n_fft {
                buf[k] = if k < n_bins {
                    frame[k]
                } else {
                    frame[self.n_fft - k].conj()
                };
            }
            buf[0].im = 0.0;
            if self.n_fft % 2 == 0 {
                buf[self.n_fft / 2].im = 0.0;
            }
            self.inverse.process(&mut buf);

            let start = t * self.hop;
            for (i, w) in self.window.iter().enumerate() {
                out[start + i] += buf[i].re * scale * w;
                norm[start + i] += w * w;
            }
        }

        for (sample, n) in out.iter_mut().zip(&norm) {
            if *n > 1e-11 {
                *sample /= n;
            }
        }
        out[pad..pad + length].to_vec()
    }
}

/// Periodic Hann window
pub fn hann_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}
