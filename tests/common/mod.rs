pub mod mock_recorder;
pub mod mock_tts;
pub mod signals;

use std::path::PathBuf;
use tempfile::TempDir;
use voicegate::Config;

/// Isolated config pointing all files into a temp dir
pub struct TestContext {
    pub temp_dir: TempDir,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = Config::default();
        config.voiceprint_db_path = temp_dir
            .path()
            .join("voiceprints.json")
            .to_string_lossy()
            .to_string();
        config.recordings_dir = temp_dir
            .path()
            .join("recordings")
            .to_string_lossy()
            .to_string();
        config.save_recordings = false;
        config.tts_engine = "none".to_string();
        config.record_seconds = 2;

        Self { temp_dir, config }
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.config.voiceprint_db_path)
    }
}
