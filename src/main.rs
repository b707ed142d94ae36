//! mindwave-io - MindWave headset monitor
//!
//! Connects to the dongle named in the config file, logs the sensor snapshot
//! at a fixed interval and any driver events in between. Ctrl-C disconnects
//! cleanly (the dongle is reset before the port closes).

use mindwave_io::{Config, DriverEvent, Error, MindWave, Result};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Main loop tick; bounds how long Ctrl-C takes to be noticed
const TICK: Duration = Duration::from_millis(50);

/// Parse config path from command line arguments.
///
/// Supports:
/// - `mindwave-io <path>` (positional)
/// - `mindwave-io --config <path>` (flag-based)
/// - `mindwave-io -c <path>` (short flag)
///
/// Defaults to `/etc/mindwave.toml` if not specified.
fn parse_config_path(args: &[String]) -> String {
    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/mindwave.toml".to_string()
}

fn log_event(event: &DriverEvent) {
    match event {
        DriverEvent::Record(record) => log::debug!("Record: {:?}", record),
        DriverEvent::ReadFailed { error, consecutive } => {
            if *consecutive == 1 {
                log::warn!("Read failed: {}", error);
            }
        }
        DriverEvent::HeadsetDisconnected => log::warn!("Headset disconnected"),
        DriverEvent::Stopped => log::info!("Reader stopped"),
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = parse_config_path(&args);
    let config = Config::load(&config_path)?;

    // RUST_LOG overrides the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("mindwave-io v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", config_path);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let driver = MindWave::new(config.device.clone());
    driver.connect()?;
    let events = driver.events();

    let report_interval = Duration::from_millis(config.monitor.report_interval_ms.max(1));
    let mut next_report = Instant::now() + report_interval;

    log::info!("Monitoring headset {}. Press Ctrl-C to stop.", driver.global_headset_id());

    while running.load(Ordering::Relaxed) && driver.is_connected() {
        for event in events.try_iter() {
            log_event(&event);
        }

        if Instant::now() >= next_report {
            let snapshot = driver.snapshot();
            if snapshot.has_contact() {
                log::info!("{}", snapshot);
            } else {
                log::info!("No contact (signal {})", snapshot.poor_signal_quality);
            }
            next_report += report_interval;
        }

        thread::sleep(TICK);
    }

    log::info!("Shutting down...");
    driver.disconnect()?;
    for event in events.try_iter() {
        log_event(&event);
    }

    let stats = driver.stats();
    log::info!(
        "Frames: {}, checksum errors: {}, I/O errors: {}, events dropped: {}",
        stats.frames,
        stats.checksum_errors,
        stats.io_errors,
        stats.events_dropped
    );
    log::info!("mindwave-io stopped");
    Ok(())
}
