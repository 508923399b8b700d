//! Audio capture module using cpal

pub mod wav;

pub use wav::{RecordingArchive, WavRecorder};

use crate::config::Config;
use crate::error::CaptureFailure;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Extra time allowed for the device to deliver the last buffers
const CAPTURE_GRACE: Duration = Duration::from_secs(2);

/// Mono 16-bit PCM clip. Immutable once captured.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAudio {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl RawAudio {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Samples scaled to [-1.0, 1.0)
    pub fn to_f64(&self) -> Vec<f64> {
        self.samples.iter().map(|&s| s as f64 / 32768.0).collect()
    }

    /// RMS level in raw sample units
    pub fn energy(&self) -> f32 {
        calculate_energy(&self.samples)
    }
}

/// Port for anything that can record a clip of fixed duration
pub trait AudioRecorder: Send + Sync {
    fn capture(&self, duration_secs: u32) -> Result<RawAudio, CaptureFailure>;

    fn name(&self) -> &str;
}

/// Microphone recorder. One capture at a time per recorder.
#[derive(Debug)]
pub struct CpalRecorder {
    device_index: Option<usize>,
    sample_rate: u32,
    in_flight: Mutex<()>,
}

impl CpalRecorder {
    pub fn new(config: &Config) -> Self {
        Self {
            device_index: config.audio_device,
            sample_rate: config.sample_rate,
            in_flight: Mutex::new(()),
        }
    }

    fn select_device(&self) -> Result<cpal::Device, CaptureFailure> {
        let host = cpal::default_host();
        let unavailable = |e: &dyn std::fmt::Display| CaptureFailure::DeviceUnavailable(e.to_string());

        debug!("Available audio input devices:");
        for (i, device) in host.input_devices().map_err(|e| unavailable(&e))?.enumerate() {
            let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
            let marker = if self.device_index == Some(i) { "*" } else { " " };
            debug!("  {} [{}] {}", marker, i, name);
        }

        let device = if let Some(idx) = self.device_index {
            host.input_devices()
                .map_err(|e| unavailable(&e))?
                .nth(idx)
                .ok_or_else(|| unavailable(&format!("device index {} out of range", idx)))?
        } else {
            host.default_input_device()
                .ok_or_else(|| unavailable(&"no default input device"))?
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("🎙️ Using audio device: {}", device_name);
        Ok(device)
    }
}

impl AudioRecorder for CpalRecorder {
    fn capture(&self, duration_secs: u32) -> Result<RawAudio, CaptureFailure> {
        let _guard = self
            .in_flight
            .lock()
            .map_err(|e| CaptureFailure::DeviceUnavailable(e.to_string()))?;

        let device = self.select_device()?;
        let expected = self.sample_rate as usize * duration_secs as usize;

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        type Chunk = Result<Vec<i16>, String>;
        let (tx, rx): (Sender<Chunk>, Receiver<Chunk>) = mpsc::channel();
        let err_tx = tx.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    // Receiver is gone once the clip is complete
                    let _ = tx.send(Ok(data.to_vec()));
                },
                move |err| {
                    warn!("Audio stream error: {}", err);
                    let _ = err_tx.send(Err(err.to_string()));
                },
                None,
            )
            .map_err(|e| CaptureFailure::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| CaptureFailure::Stream(e.to_string()))?;

        let deadline = Instant::now() + Duration::from_secs(duration_secs as u64) + CAPTURE_GRACE;
        let mut samples = Vec::with_capacity(expected);
        while samples.len() < expected {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(Ok(chunk)) => samples.extend_from_slice(&chunk),
                Ok(Err(e)) => return Err(CaptureFailure::Stream(e)),
                Err(_) => {
                    return Err(CaptureFailure::Incomplete {
                        captured: samples.len(),
                        expected,
                    })
                }
            }
        }
        drop(stream);

        samples.truncate(expected);
        let audio = RawAudio::new(samples, self.sample_rate);
        info!(
            "✅ Captured {:.1}s of audio (rms {:.0})",
            audio.duration_secs(),
            audio.energy()
        );
        Ok(audio)
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

/// Calculate audio energy (RMS)
pub fn calculate_energy(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: i64 = samples.iter().map(|&s| (s as i64).pow(2)).sum();
    (sum as f32 / samples.len() as f32).sqrt()
}
