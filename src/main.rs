use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use led_sens::config::{AppConfig, BUILTIN_LAYOUTS};
use led_sens::transport::TransportFactory;
use led_sens::{ConfigWatcher, Controller, DryRunFactory, HidApiFactory, RenderState, SystemMetrics};
use led_sens_core::DeviceLayout;

/// led-sens - Show CPU and GPU metrics on a cooler's LED display
#[derive(Parser, Debug, Clone)]
#[command(name = "led-sens")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// List the built-in layouts and their display modes
    #[arg(short = 'l', long = "list-layouts")]
    list_layouts: bool,

    /// Print reports as hex instead of writing to the device
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Stop after this many ticks
    #[arg(long = "ticks", value_name = "N")]
    ticks: Option<u64>,

    /// Config file (defaults to $LED_SENS_CONFIG, then the user config dir)
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    info!("Starting led-sens v{}", env!("CARGO_PKG_VERSION"));

    if cli.list_layouts {
        if let Err(e) = list_layouts() {
            error!("{:#}", e);
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn list_layouts() -> Result<()> {
    for builtin in &BUILTIN_LAYOUTS {
        let layout = DeviceLayout::from_config(builtin.config()?, 0.1)?;
        println!("{} ({}, {} LEDs)", builtin.name, builtin.id, layout.led_count());
        for mode in layout.mode_names() {
            let marker = if mode == layout.default_mode() { " (default)" } else { "" };
            println!("  {}{}", mode, marker);
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config_path = AppConfig::resolve_path(cli.config);
    let config = AppConfig::load_or_default(config_path.as_deref());
    let state = RenderState::from_config(&config).context("Failed to build render state")?;

    let metrics = SystemMetrics::new(state.metrics_update_interval);
    let factory: Box<dyn TransportFactory> = if cli.dry_run {
        Box::new(DryRunFactory)
    } else {
        Box::new(HidApiFactory)
    };

    let mut controller = Controller::new(state, Box::new(metrics), factory);
    if let Some(path) = config_path {
        controller = controller.with_watcher(ConfigWatcher::new(path));
    }

    let shutdown = controller.shutdown_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Shutdown requested");
        shutdown.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    controller.run(cli.ticks);
    Ok(())
}
