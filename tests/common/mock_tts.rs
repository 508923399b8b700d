//! Mock Speaker for Testing
//!
//! Records all spoken text for verification.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Mock speaker that records spoken text
#[derive(Debug)]
pub struct MockSpeaker {
    /// All text that was "spoken"
    pub spoken: Arc<Mutex<Vec<String>>>,
    /// Fail every call after recording the text
    pub should_fail: Arc<Mutex<bool>>,
}

impl MockSpeaker {
    pub fn new() -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn failing() -> Self {
        let mock = Self::new();
        *mock.should_fail.lock().unwrap() = true;
        mock
    }

    /// Get all spoken phrases
    pub fn get_spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    /// Check if a phrase was spoken
    pub fn was_spoken(&self, text: &str) -> bool {
        self.spoken.lock().unwrap().iter().any(|s| s.contains(text))
    }
}

impl Default for MockSpeaker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl voicegate::tts::Speaker for MockSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        if *self.should_fail.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock TTS failure"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
