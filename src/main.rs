// tubepipe - terminal YouTube audio player
// Paste a link, it gets resolved with yt-dlp and queued; rodio does the playing

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use tubepipe::audio::{AudioConfig, Player, RodioEngine};
use tubepipe::config::{Config, LoggingConfig};
use tubepipe::resolver::{TrackResolver, YtDlp};
use tubepipe::ui::App;

#[derive(Parser)]
#[command(name = "tubepipe", version)]
#[command(about = "Play YouTube audio from the terminal")]
struct Args {
    /// YouTube URLs to queue at startup
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Config file to use instead of ~/.config/tubepipe/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keep stderr and log at debug level
    #[arg(long)]
    dev: bool,
}

fn init_logging(config: &LoggingConfig, dev: bool) -> Result<()> {
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("could not create log directory {}", config.directory.display()))?;

    let file_appender = tracing_appender::rolling::daily(&config.directory, "tubepipe.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = if dev { "debug" } else { config.filter.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // The writer thread has to outlive main
    std::mem::forget(guard);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    init_logging(&config.logging, args.dev)?;
    info!("tubepipe starting up");

    let extractor = YtDlp::new(&config.extractor);
    if !extractor.is_available() {
        error!("{} is not runnable", config.extractor.program.display());
        bail!(
            "could not run {}; install yt-dlp or set [extractor] program in the config file",
            config.extractor.program.display()
        );
    }

    // ALSA and friends write straight to stderr, which tears up the TUI
    if !args.dev {
        debug!("Redirecting stderr to /dev/null");
        if let Err(e) = redirect_stderr_to_null() {
            error!("{}", e);
        }
    }

    let (engine_tx, engine_rx) = mpsc::unbounded_channel();
    let engine = match RodioEngine::new(AudioConfig::from(&config), engine_tx) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Audio output unavailable: {}", e);
            return Err(e).context("could not open the audio output");
        }
    };

    let mut app = App::new(config, Player::new(engine), TrackResolver::new(extractor), engine_rx);
    for url in &args.urls {
        app.enqueue(url);
    }

    app.run().await?;

    info!("tubepipe exiting");
    Ok(())
}

fn redirect_stderr_to_null() -> Result<()> {
    unsafe {
        let null_fd = libc::open(b"/dev/null\0".as_ptr() as *const libc::c_char, libc::O_WRONLY);
        if null_fd == -1 {
            bail!("failed to open /dev/null");
        }

        if libc::dup2(null_fd, libc::STDERR_FILENO) == -1 {
            libc::close(null_fd);
            bail!("failed to redirect stderr");
        }

        libc::close(null_fd);
    }

    Ok(())
}
