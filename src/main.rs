use anyhow::Result;
use clap::Parser;
use live_scribe::session::SessionConfig;
use live_scribe::{Config, FfmpegRecorder, SessionError, SessionManager, TranscriberFactory};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "live-scribe", about = "Capture system audio and transcribe it live")]
struct Args {
    /// Configuration file (optional; built-in defaults apply)
    #[arg(long, default_value = "config/live-scribe")]
    config: String,

    /// Override the chunk duration in seconds
    #[arg(long)]
    chunk_secs: Option<u64>,

    /// Override the transcriber mode (gemini or whisper)
    #[arg(long)]
    mode: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;

    if let Some(chunk_secs) = args.chunk_secs {
        cfg.session.chunk_secs = chunk_secs;
    }
    if let Some(mode) = args.mode {
        cfg.transcriber.mode = mode;
    }

    info!(
        "live-scribe v{} ({} mode, {}s chunks)",
        env!("CARGO_PKG_VERSION"),
        cfg.transcriber.mode,
        cfg.session.chunk_secs
    );

    let transcriber = TranscriberFactory::create(&cfg.transcriber)?;
    let recorder = Arc::new(FfmpegRecorder::new());

    let session_config = SessionConfig {
        scratch_dir: PathBuf::from(&cfg.session.scratch_dir),
        output_dir: PathBuf::from(&cfg.session.output_dir),
        ..SessionConfig::default()
    };

    let manager = SessionManager::new(recorder, transcriber, session_config);
    let mut stream = manager
        .start(Duration::from_secs(cfg.session.chunk_secs))
        .await?;

    info!("Session running; press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            fragment = stream.recv() => match fragment {
                Some(text) => {
                    print!("{text}");
                    std::io::stdout().flush().ok();
                }
                // Stream closed: the session ended on its own.
                None => break,
            },
        }
    }

    println!();

    match manager.stop().await {
        Ok(path) => info!("Transcript saved to {}", path.display()),
        Err(SessionError::NoActiveSession) => {
            warn!("Session already ended; no transcript persisted")
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
