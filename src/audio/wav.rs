//! WAV file support: archiving captured clips and replaying recordings as captures

use super::{AudioRecorder, RawAudio};
use crate::config::Config;
use crate::error::CaptureFailure;
use anyhow::{Context, Result};
use chrono::Local;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Write a clip as 16-bit mono PCM
pub fn write_wav(path: &Path, audio: &RawAudio) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for &sample in audio.samples() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read a mono WAV file (16-bit integer or 32-bit float)
pub fn read_wav(path: &Path) -> Result<RawAudio, CaptureFailure> {
    let bad = |e: &dyn std::fmt::Display| CaptureFailure::Format(format!("{}: {}", path.display(), e));

    let mut reader = WavReader::open(path).map_err(|e| bad(&e))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(bad(&format!("expected mono, found {} channels", spec.channels)));
    }

    let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<Result<_, _>>()
            .map_err(|e| bad(&e))?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<Result<_, _>>()
            .map_err(|e| bad(&e))?,
        (fmt, bits) => {
            return Err(bad(&format!("unsupported sample format {:?}/{} bits", fmt, bits)))
        }
    };

    Ok(RawAudio::new(samples, spec.sample_rate))
}

/// Keeps a copy of every captured clip on disk
#[derive(Debug, Clone)]
pub struct RecordingArchive {
    dir: PathBuf,
}

impl RecordingArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `None` when archiving is switched off
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .save_recordings
            .then(|| Self::new(&config.recordings_dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Archive an enrollment sample as `<user>_<index>.wav`
    pub fn save_sample(&self, user_id: &str, index: usize, audio: &RawAudio) -> Result<PathBuf> {
        self.save(&format!("{}_{}.wav", sanitize(user_id), index), audio)
    }

    /// Archive a verification probe with a timestamp
    pub fn save_probe(&self, user_id: &str, audio: &RawAudio) -> Result<PathBuf> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        self.save(&format!("verify_{}_{}.wav", sanitize(user_id), timestamp), audio)
    }

    fn save(&self, file_name: &str, audio: &RawAudio) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        write_wav(&path, audio)?;
        info!("💾 Recording saved to {}", path.display());
        Ok(path)
    }
}

/// Replays WAV files in order, one per capture
#[derive(Debug)]
pub struct WavRecorder {
    queue: Mutex<VecDeque<PathBuf>>,
    sample_rate: u32,
}

impl WavRecorder {
    pub fn new(files: impl IntoIterator<Item = PathBuf>, sample_rate: u32) -> Self {
        Self {
            queue: Mutex::new(files.into_iter().collect()),
            sample_rate,
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl AudioRecorder for WavRecorder {
    fn capture(&self, duration_secs: u32) -> Result<RawAudio, CaptureFailure> {
        let next = self
            .queue
            .lock()
            .map_err(|e| CaptureFailure::DeviceUnavailable(e.to_string()))?
            .pop_front();
        let path = next.ok_or(CaptureFailure::Exhausted)?;

        let audio = read_wav(&path)?;
        if audio.sample_rate() != self.sample_rate {
            return Err(CaptureFailure::Format(format!(
                "{} is {} Hz, expected {} Hz",
                path.display(),
                audio.sample_rate(),
                self.sample_rate
            )));
        }

        let limit = self.sample_rate as usize * duration_secs as usize;
        if audio.len() > limit {
            debug!("Trimming {} to {}s", path.display(), duration_secs);
            let mut samples = audio.samples().to_vec();
            samples.truncate(limit);
            return Ok(RawAudio::new(samples, self.sample_rate));
        }
        Ok(audio)
    }

    fn name(&self) -> &str {
        "wav-replay"
    }
}

/// Keep file names to alphanumerics and underscores
fn sanitize(user_id: &str) -> String {
    let safe = user_id
        .replace(' ', "_")
        .replace(|c: char| !c.is_alphanumeric() && c != '_', "");
    if safe.is_empty() {
        "user".to_string()
    } else {
        safe
    }
}
