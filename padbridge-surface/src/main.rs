mod dispatch;
mod display;
mod driver;
mod modes;
mod output;
mod runtime;
mod scales;
mod setup;
#[cfg(test)]
mod testing;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use padbridge_core::config::{self, Config};
use padbridge_core::CommandClient;

use dispatch::{ModeDispatcher, ModeEnv};
use output::Surface;
use runtime::SurfaceRuntime;
use scales::ScaleState;
use setup::Services;

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|level| level.parse().ok())
            .unwrap_or(LevelFilter::Info)
    };

    let log_path = config::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("padbridge.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    match File::create(&log_path) {
        Ok(file) => loggers.push(WriteLogger::new(log_level, simplelog::Config::default(), file)),
        Err(e) => eprintln!("padbridge: cannot write {}: {}", log_path.display(), e),
    }

    if CombinedLogger::init(loggers).is_err() {
        eprintln!("padbridge: logger already initialized");
    }

    log::info!("padbridge starting (log level: {:?})", log_level);
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);
    let config = Config::load(config_path.as_deref());

    let mut services = Services::start(&config);
    let inbox = services.forward_events();
    let hardware = match services.open_surface(&config) {
        Ok(hardware) => {
            log::info!("surface on {}", hardware.port_name());
            hardware
        }
        Err(e) => {
            services.stop();
            return Err(e).context("control surface unavailable");
        }
    };

    let env = ModeEnv {
        store: Arc::clone(&services.store),
        commands: CommandClient::new(config.reaper_ip(), config.reaper_port()),
        clips: services.clips.clone(),
        surface: Surface::new(Box::new(hardware)),
        scale: ScaleState::default(),
    };

    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    setup::watch_signals(shutdown_tx.clone());
    setup::watch_stdin(shutdown_tx.clone());

    let mut runtime = SurfaceRuntime::new(ModeDispatcher::new(env), inbox, shutdown_rx, config.fps());
    runtime.run();
    drop(shutdown_tx);

    services.stop();
    log::info!("padbridge stopped");
    Ok(())
}
