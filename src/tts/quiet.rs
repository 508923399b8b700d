//! Speaker that only logs, for headless runs

use super::Speaker;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Default)]
pub struct QuietSpeaker;

#[async_trait]
impl Speaker for QuietSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        info!("🗣️ {}", text);
        Ok(())
    }

    fn name(&self) -> &str {
        "quiet"
    }
}
