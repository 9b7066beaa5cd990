//! leg_synth: interactive entry point.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leg_synth::app::{run, run_replay};
use leg_synth::config::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML configuration file; missing means defaults
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Ignore the configuration file and start with defaults
    #[arg(long)]
    quick: bool,

    /// Replay a recorded landmark session instead of opening the window
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Do not calibrate automatically at the start of a replay (replay only)
    #[arg(long, requires = "replay")]
    no_calibrate: bool,

    /// Substring of the MIDI output port to open (overrides the config file)
    #[arg(long, value_name = "NAME")]
    midi_port: Option<String>,

    /// Save the simulated session to a recording file
    #[arg(long, value_name = "FILE", conflicts_with = "replay")]
    record: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut cfg = if args.quick {
        info!("quick start: default configuration");
        AppConfig::default()
    } else {
        AppConfig::load(&args.config)
            .with_context(|| format!("loading config {}", args.config.display()))?
    };
    if let Some(port) = args.midi_port {
        cfg.midi.port = Some(port);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_ctrlc = stop.clone();
    ctrlc::set_handler(move || {
        stop_for_ctrlc.store(true, Ordering::SeqCst);
    })
    .context("installing Ctrl-C handler")?;

    match args.replay {
        Some(path) => {
            run_replay(&cfg, &path, !args.no_calibrate, &stop)?;
        }
        None => {
            run(&cfg, args.record.as_deref(), &stop)?;
        }
    }
    Ok(())
}
