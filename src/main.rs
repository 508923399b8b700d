//! VoiceGate - speaker verification from the terminal

use anyhow::{bail, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voicegate::audio::{AudioRecorder, CpalRecorder, WavRecorder};
use voicegate::tts::{self, QuietSpeaker, Speaker};
use voicegate::{AuthOutcome, Config, VoiceAuth};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Audio input device index
    #[arg(short, long)]
    device: Option<usize>,

    /// Config file (defaults to the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User to verify; prompts when omitted
    #[arg(short, long)]
    user: Option<String>,

    /// Re-enroll the user instead of verifying
    #[arg(long)]
    enroll: bool,

    /// Do not speak prompts
    #[arg(short, long)]
    quiet: bool,

    /// Replay these WAV files instead of recording from the microphone
    #[arg(long, num_args = 1..)]
    replay: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if args.device.is_some() {
        config.audio_device = args.device;
    }

    // Setup logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🔐 VoiceGate v{} starting...", env!("CARGO_PKG_VERSION"));

    let recorder: Arc<dyn AudioRecorder> = if args.replay.is_empty() {
        Arc::new(CpalRecorder::new(&config))
    } else {
        info!("📼 Replaying {} recording(s)", args.replay.len());
        Arc::new(WavRecorder::new(args.replay.clone(), config.sample_rate))
    };
    let speaker: Arc<dyn Speaker> = if args.quiet {
        Arc::new(QuietSpeaker)
    } else {
        tts::create_speaker(&config)
    };

    let user_id = match args.user {
        Some(user) => user,
        None => prompt_username()?,
    };
    if user_id.is_empty() {
        bail!("a username is required");
    }

    let mut auth = VoiceAuth::new(config, recorder, speaker)?;
    let outcome = if args.enroll {
        auth.enroll_user(&user_id).await?
    } else {
        auth.authenticate(&user_id).await?
    };

    match outcome {
        AuthOutcome::Authenticated { .. } => println!("✅ Authentication successful!"),
        AuthOutcome::Rejected { .. } => println!("❌ Authentication unsuccessful!"),
        AuthOutcome::Enrolled {
            samples_used,
            samples_attempted,
        } => println!(
            "📝 Voice enrolled for {} ({}/{} samples usable)",
            user_id, samples_used, samples_attempted
        ),
        AuthOutcome::EnrollmentFailed { .. } => {
            println!("⚠️ Enrollment failed: no usable samples. Try a quieter room.")
        }
        AuthOutcome::Indeterminate { reason } => {
            println!("⚠️ Could not verify (unusable recording: {})", reason)
        }
        AuthOutcome::CaptureFailed { reason } => println!("⚠️ Recording failed: {}", reason),
    }

    Ok(())
}

fn prompt_username() -> Result<String> {
    println!("Waiting for username input...");
    print!("Enter your username: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let user = line.trim().to_string();
    info!("Username entered: {}", user);
    Ok(user)
}
