//! `asmetrics watch`: run the sampler and print snapshots until stopped.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use asmetrics_core::{Elevation, Monitor, Result, SamplerConfig, Snapshot, Timecode};
use serde::Serialize;

use super::{memory, print_json};

/// Granularity of the shutdown check while waiting for the next tick.
const SLEEP_STEP: Duration = Duration::from_millis(50);

pub struct WatchCommandConfig<'a> {
    pub config_path: Option<&'a Path>,
    pub interval_ms: Option<u64>,
    pub nice: Option<i32>,
    pub timecode: Option<Timecode>,
    pub base_path: Option<PathBuf>,
    pub no_sudo: bool,
    pub count: u64,
    pub json: bool,
}

#[derive(Serialize)]
struct WatchLine<'a> {
    timestamp_unix_ms: u64,
    snapshot: &'a Snapshot,
    ram: &'a asmetrics_core::RamMetrics,
}

/// Applies command-line overrides on top of the file or default config.
fn sampler_config(cfg: &WatchCommandConfig<'_>) -> Result<SamplerConfig> {
    let mut config = match cfg.config_path {
        Some(path) => SamplerConfig::from_json_file(path)?,
        None => SamplerConfig::default(),
    };
    if let Some(ms) = cfg.interval_ms {
        config.interval_ms = ms.max(1);
    }
    if let Some(nice) = cfg.nice {
        config.nice = nice;
    }
    if let Some(timecode) = cfg.timecode {
        config.timecode = timecode;
    }
    if let Some(base) = &cfg.base_path {
        config.base_path = base.clone();
    }
    if cfg.no_sudo {
        config.elevation = Elevation::None;
    }
    Ok(config)
}

/// Sleeps for `total`, returning early once `stop` is set.
fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let mut waited = Duration::ZERO;
    while waited < total && !stop.load(Ordering::Relaxed) {
        let step = SLEEP_STEP.min(total - waited);
        std::thread::sleep(step);
        waited += step;
    }
}

pub fn run(cfg: WatchCommandConfig<'_>) -> Result<()> {
    let config = sampler_config(&cfg)?;
    let interval = config.interval();

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed)) {
            log::warn!("could not install Ctrl-C handler: {e}");
        }
    }

    let mut monitor = Monitor::new(config)?;
    let d = monitor.hardware_descriptor();
    if !cfg.json {
        println!(
            "{} ({} cores) sampling every {} ms. Press Ctrl+C to stop.",
            d.chip_name,
            d.total_core_count,
            interval.as_millis()
        );
    }

    let mut printed = 0u64;
    let mut last_timestamp = None;
    while !stop.load(Ordering::Relaxed) {
        sleep_unless_stopped(interval, &stop);
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let snapshot = match monitor.get_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_transient() => {
                log::debug!("{e}; retrying next tick");
                continue;
            }
            Err(e) => {
                monitor.shutdown();
                return Err(e);
            }
        };

        // The file only changes once per interval; skip repeats.
        if last_timestamp == Some(snapshot.timestamp) {
            continue;
        }
        last_timestamp = Some(snapshot.timestamp);

        let ram = monitor.get_ram_metrics();
        if cfg.json {
            print_json(&WatchLine {
                timestamp_unix_ms: snapshot.timestamp_unix_ms(),
                snapshot: &snapshot,
                ram: &ram,
            });
        } else {
            println!("{} | {}", snapshot.summary(), memory::render(&ram));
        }

        printed += 1;
        if cfg.count > 0 && printed >= cfg.count {
            break;
        }
    }

    monitor.shutdown();
    Ok(())
}
