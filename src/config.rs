use crate::error::{VoiceError, VoiceResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Capture
    pub sample_rate: u32,
    pub record_seconds: u32,
    pub audio_device: Option<usize>,
    pub enrollment_samples: usize,
    pub save_recordings: bool,
    pub recordings_dir: String,

    // Noise reduction
    pub noise_reduction: bool,
    pub noise_n_fft: usize,
    pub noise_hop_length: usize,
    pub noise_std_threshold: f64,
    /// Share of the quietest frames forming the noise profile; 1.0 uses the whole clip
    pub noise_profile_fraction: f64,
    pub noise_prop_decrease: f64,
    pub freq_mask_smooth_hz: f64,
    pub time_mask_smooth_ms: f64,
    pub pre_emphasis: f64,

    // Features
    pub n_mfcc: usize,
    pub n_mels: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub silence_rms_floor: f64,

    // Verification
    pub threshold: f64,

    // Storage
    pub voiceprint_db_path: String,

    // Speech
    pub tts_engine: String,

    // Meta
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            record_seconds: 5,
            audio_device: None,
            enrollment_samples: 3,
            save_recordings: true,
            recordings_dir: data_dir().join("recordings").to_string_lossy().to_string(),
            noise_reduction: true,
            noise_n_fft: 1024,
            noise_hop_length: 256,
            noise_std_threshold: 1.5,
            noise_profile_fraction: 0.5,
            noise_prop_decrease: 1.0,
            freq_mask_smooth_hz: 500.0,
            time_mask_smooth_ms: 50.0,
            pre_emphasis: 0.97,
            n_mfcc: 40,
            n_mels: 128,
            n_fft: 2048,
            hop_length: 512,
            silence_rms_floor: 1e-5,
            threshold: 25.0,
            voiceprint_db_path: data_dir()
                .join("voiceprints.json")
                .to_string_lossy()
                .to_string(),
            tts_engine: "system".to_string(),
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, or create default
    pub fn load() -> VoiceResult<Self> {
        Self::load_from(&config_path())
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> VoiceResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                // Keep the broken file around for inspection
                let backup_path = path.with_extension("json.corrupt");
                let _ = std::fs::rename(path, &backup_path);
                Ok(Self::default())
            }
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> VoiceResult<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> VoiceResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> VoiceResult<()> {
        let fail = |msg: String| Err(VoiceError::Config(msg));

        if self.sample_rate == 0 || self.record_seconds == 0 {
            return fail("sample_rate and record_seconds must be positive".into());
        }
        if self.enrollment_samples == 0 {
            return fail("enrollment_samples must be at least 1".into());
        }
        if self.n_mfcc == 0 || self.n_mfcc > self.n_mels {
            return fail(format!(
                "n_mfcc must be in 1..={} (n_mels), got {}",
                self.n_mels, self.n_mfcc
            ));
        }
        if self.n_fft < 2 || self.hop_length == 0 {
            return fail("n_fft must be >= 2 and hop_length positive".into());
        }
        if self.hop_length > self.n_fft {
            return fail(format!(
                "hop_length {} exceeds n_fft {}; frames would skip samples",
                self.hop_length, self.n_fft
            ));
        }
        if self.noise_n_fft < 2 || self.noise_hop_length == 0 {
            return fail("noise_n_fft must be >= 2 and noise_hop_length positive".into());
        }
        // Hann overlap-add only rebuilds the clip with at least 50% overlap
        if self.noise_hop_length > self.noise_n_fft / 2 {
            return fail(format!(
                "noise_hop_length must be at most noise_n_fft / 2 ({}), got {}",
                self.noise_n_fft / 2,
                self.noise_hop_length
            ));
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return fail(format!("threshold must be positive, got {}", self.threshold));
        }
        if !(0.0..1.0).contains(&self.pre_emphasis) {
            return fail(format!("pre_emphasis must be in [0, 1), got {}", self.pre_emphasis));
        }
        if !(0.0..=1.0).contains(&self.noise_prop_decrease) {
            return fail("noise_prop_decrease must be in [0, 1]".into());
        }
        if !(self.noise_profile_fraction > 0.0 && self.noise_profile_fraction <= 1.0) {
            return fail("noise_profile_fraction must be in (0, 1]".into());
        }
        if self.noise_std_threshold < 0.0 || self.silence_rms_floor < 0.0 {
            return fail("noise_std_threshold and silence_rms_floor must not be negative".into());
        }
        Ok(())
    }

    /// Number of samples in one nominal capture
    pub fn samples_per_capture(&self) -> usize {
        self.sample_rate as usize * self.record_seconds as usize
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voicegate")
        .join("config.json")
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voicegate")
}
