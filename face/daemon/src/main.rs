//! Face Daemon - Headless host for the Sunshine watch face
//!
//! Drives `face-core` the way a wearable host would: lifecycle callbacks and
//! data events come from a JSON-lines script, assets are read from a local
//! directory and every frame is painted into the log.
//!
//! # Usage
//!
//! ```bash
//! # Events from a file, icons from ./assets
//! face-daemon --script demo.jsonl --asset-dir ./assets
//!
//! # Events typed on stdin
//! face-daemon
//!
//! # Exit as soon as the script ends
//! face-daemon --script demo.jsonl --exit-after-script
//!
//! # Verbose logging
//! RUST_LOG=debug face-daemon --script demo.jsonl
//! ```
//!
//! # Signals
//!
//! - `SIGINT` (Ctrl-C): Graceful shutdown

mod assets;
mod render;
mod script;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

use face_core::{
    default_config_path, load_config_from_path, Collaborators, ConfigOverrides, Engine,
    FaceConfig, ImageIconDecoder, RedrawSignal, RenderDriver, SystemClock,
};

use assets::DirAssetResolver;
use render::LogRenderPass;
use script::{offset_from_minutes, ScriptAction, ScriptReader};

/// Face Daemon - Headless host for the Sunshine watch face
#[derive(Parser, Debug)]
#[command(name = "face-daemon")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "FACE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON-lines event script (stdin when omitted)
    #[arg(short = 's', long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Directory asset references are resolved against
    #[arg(short = 'a', long, env = "FACE_ASSET_DIR", value_name = "DIR", default_value = ".")]
    asset_dir: PathBuf,

    /// Icon edge length in pixels
    #[arg(long, value_name = "PX")]
    icon_size: Option<u32>,

    /// Data topic carrying weather updates
    #[arg(long, value_name = "TOPIC")]
    topic: Option<String>,

    /// Exit when the script ends instead of waiting for Ctrl-C
    #[arg(long)]
    exit_after_script: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "FACE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(size) = self.icon_size {
            overrides = overrides.with_icon_size(size);
        }
        if let Some(ref topic) = self.topic {
            overrides = overrides.with_topic(topic.clone());
        }
        overrides
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("face_daemon={level},face_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Load file and environment config, then apply CLI overrides
fn resolve_config(args: &Args) -> Result<FaceConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid command-line override")?;
    Ok(config)
}

/// Deliver one scripted action to the engine
fn dispatch(engine: &Engine, line: usize, action: &ScriptAction) -> Result<()> {
    match action {
        ScriptAction::Visibility { visible } => engine.on_visibility_changed(*visible)?,
        ScriptAction::Ambient { ambient } => engine.on_ambient_mode_changed(*ambient)?,
        ScriptAction::InterruptionFilter { filter } => {
            engine.on_interruption_filter_changed(*filter)?;
        }
        ScriptAction::Hardware { .. } => {
            if let Some(properties) = action.hardware() {
                engine.on_hardware_properties(properties)?;
            }
        }
        ScriptAction::TimeTick => engine.on_time_tick()?,
        ScriptAction::TimeZone { offset_minutes } => {
            engine.on_time_zone_changed(offset_from_minutes(line, *offset_minutes)?)?;
        }
        ScriptAction::Data { .. } => {
            if let Some(event) = action.data_event() {
                // Dropped events are logged by the pipeline; the script goes on
                if let Err(e) = engine.on_data_changed(event) {
                    warn!(line, error = %e, "Data event rejected");
                }
            }
        }
    }
    Ok(())
}

/// Play a script against the engine, honouring each line's `at_ms`
async fn play<R: AsyncRead + Unpin>(
    engine: &Engine,
    mut script: ScriptReader<R>,
    started: Instant,
) -> Result<usize> {
    let mut delivered = 0;
    while let Some(entry) = script.next_line().await? {
        let due = started + Duration::from_millis(entry.at_ms);
        tokio::time::sleep_until(due).await;

        tracing::debug!(
            line = script.line(),
            at_ms = entry.at_ms,
            event = entry.action.name(),
            "Delivering scripted event"
        );
        dispatch(engine, script.line(), &entry.action)?;
        delivered += 1;
    }
    Ok(delivered)
}

async fn play_source(engine: &Engine, source: Option<&PathBuf>, started: Instant) -> Result<usize> {
    match source {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open script: {}", path.display()))?;
            play(engine, ScriptReader::new(file), started).await
        }
        None => play(engine, ScriptReader::new(tokio::io::stdin()), started).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("Face daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = resolve_config(&args)?;
    info!(
        source = %config.source(),
        topic = %config.sync.topic,
        asset_dir = %args.asset_dir.display(),
        "Configuration resolved"
    );

    let redraw = Arc::new(RedrawSignal::new());
    let clock = Arc::new(SystemClock);
    let mut engine = Engine::start(
        &config,
        Collaborators {
            redraw: redraw.clone(),
            resolver: Arc::new(DirAssetResolver::new(&args.asset_dir)),
            decoder: Arc::new(ImageIconDecoder),
            clock: clock.clone(),
        },
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let driver = RenderDriver::new(
        engine.store().clone(),
        redraw,
        clock,
        config.display,
        LogRenderPass::new(),
    );
    let renderer = tokio::spawn(driver.run(stop_rx));

    let started = Instant::now();
    let interrupted = tokio::select! {
        played = play_source(&engine, args.script.as_ref(), started) => {
            let delivered = played?;
            info!(delivered, "Script finished");
            false
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C during script, initiating shutdown");
            true
        }
    };

    if !interrupted && !args.exit_after_script {
        info!("Waiting for Ctrl-C");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("Received Ctrl-C, initiating shutdown");
    }

    engine.shutdown().await;
    if stop_tx.send(true).is_err() {
        warn!("Render driver already gone");
    }
    let pass = renderer.await.context("Render driver failed")?;

    info!(frames = pass.frames(), "Face daemon stopped cleanly");
    Ok(())
}
