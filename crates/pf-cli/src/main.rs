//! PulseForge CLI
//!
//! Wires the session client to the playback engine and runs the operator
//! console. Exit always passes through safe-off: output disabled, actuators
//! zeroed, session closed.

mod commands;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use pf_engine::{
    ActuatorSink, IntensityMode, IntensityPolicy, LogSink, PatternScheduler, PlaybackControl,
};
use pf_pattern::PatternLibrary;
use pf_session::{EventDispatcher, SessionBuilder};

#[derive(Parser)]
#[command(name = "pulseforge", about = "Haptic feedback client for multiworld game sessions")]
struct Args {
    /// WebSocket URL of the session server
    #[arg(long, default_value = "ws://127.0.0.1:38281")]
    url: String,

    /// Slot name to authenticate as
    #[arg(long)]
    slot: String,

    /// Slot password, if the session requires one
    #[arg(long)]
    password: Option<String>,

    /// Intensity mode: onitem, percent or time
    #[arg(long, default_value = "onitem", value_parser = parse_mode)]
    mode: IntensityMode,

    /// JSON file with pattern overrides
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Number of simulated devices on the logging sink
    #[arg(long, default_value_t = 1)]
    devices: u32,

    /// Connection timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u32,

    /// Start without connecting; use the `connect` console command later
    #[arg(long)]
    offline: bool,
}

fn parse_mode(s: &str) -> Result<IntensityMode, String> {
    IntensityMode::from_str(s)
}

fn load_library(path: Option<&PathBuf>) -> Result<PatternLibrary> {
    let Some(path) = path else {
        return Ok(PatternLibrary::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading pattern overrides from {}", path.display()))?;
    PatternLibrary::from_overrides_json(&json)
        .with_context(|| format!("parsing pattern overrides from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let library = Arc::new(load_library(args.patterns.as_ref())?);

    let sink: Arc<dyn ActuatorSink> = Arc::new(LogSink::new(args.devices));
    let control = Arc::new(PlaybackControl::new());
    let intensity = Arc::new(IntensityPolicy::new(args.mode));
    let scheduler = Arc::new(PatternScheduler::new(sink, control, intensity));
    let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&scheduler), library));

    let mut builder = SessionBuilder::new(&args.url, &args.slot).timeout(args.timeout_ms);
    if let Some(password) = &args.password {
        builder = builder.password(password);
    }
    let client = Arc::new(builder.build());

    // Event pump: session events into the dispatcher
    let pump_dispatcher = Arc::clone(&dispatcher);
    let mut events = client.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => pump_dispatcher.handle_event(event),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("[Main] Event pump lagged, {skipped} events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    if !args.offline {
        if let Err(err) = client.connect().await {
            log::error!("[Main] Initial connect failed: {err}");
            println!("not connected; use the 'connect' command to retry");
        }
    }

    println!("pulseforge ready (type 'help' for commands)");

    tokio::select! {
        result = commands::run_console(Arc::clone(&dispatcher), Arc::clone(&client)) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("[Main] Interrupted");
        }
    }

    // Safe-off on every exit path
    dispatcher.set_enabled(false).await;
    client.disconnect().await;
    log::info!("[Main] Shutdown complete");
    Ok(())
}
