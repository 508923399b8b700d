//! TTS (Text-to-Speech) Module
//!
//! Spoken prompts are fire-and-forget: a failing speaker never changes an
//! enrollment or verification result.

use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub mod quiet;
pub mod system;

pub use quiet::QuietSpeaker;
pub use system::SystemSpeaker;

/// Port for speaking prompts to the user
#[async_trait]
pub trait Speaker: Send + Sync + std::fmt::Debug {
    /// Speak the given text, returning once it has been handed off or played
    async fn say(&self, text: &str) -> Result<()>;

    /// Get the engine name
    fn name(&self) -> &str;
}

/// Factory to create the configured speaker
pub fn create_speaker(config: &Config) -> Arc<dyn Speaker> {
    let speaker: Arc<dyn Speaker> = match config.tts_engine.as_str() {
        "system" => Arc::new(SystemSpeaker::new()),
        "none" | "quiet" => Arc::new(QuietSpeaker),
        other => {
            warn!("  - Unknown TTS engine '{}', falling back to System", other);
            Arc::new(SystemSpeaker::new())
        }
    };
    info!("🔊 Speaker '{}' initialized", speaker.name());
    speaker
}
