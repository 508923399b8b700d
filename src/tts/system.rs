//! System TTS via speech-dispatcher or espeak-ng

use super::Speaker;
use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug)]
pub struct SystemSpeaker;

impl Default for SystemSpeaker {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSpeaker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Speaker for SystemSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        debug!("System speaking: {}", text);

        // spd-say -w blocks until the utterance is finished
        if let Ok(status) = Command::new("spd-say").arg("-w").arg(text).status().await {
            if status.success() {
                return Ok(());
            }
        }

        if let Ok(status) = Command::new("espeak-ng").arg(text).status().await {
            if status.success() {
                return Ok(());
            }
        }

        Err(anyhow::anyhow!(
            "No system TTS command found (tried spd-say, espeak-ng)"
        ))
    }

    fn name(&self) -> &str {
        "system"
    }
}
