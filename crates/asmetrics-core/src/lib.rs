//! # asmetrics-core
//!
//! **Apple Silicon power, thermal and utilization telemetry from `powermetrics`.**
//!
//! The core pipeline:
//!
//! Sampler process → NUL-separated plist file → latest complete record →
//! typed CPU / GPU / thermal / power metrics.
//!
//! `powermetrics` appends to its output file while we read it, so the newest
//! record can be torn. [`read_latest`] falls back exactly one record in that
//! case and reports [`MetricsError::NoData`] when nothing complete is on disk
//! yet. Hardware ceilings (max power, max memory bandwidth) come from a static
//! table keyed by chip generation and name, see [`capability`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use asmetrics_core::{Monitor, SamplerConfig};
//!
//! let mut monitor = Monitor::new(SamplerConfig::default())?;
//! let chip = monitor.hardware_descriptor().chip_name.clone();
//! loop {
//!     std::thread::sleep(monitor.config().interval());
//!     match monitor.get_snapshot() {
//!         Ok(snapshot) => println!("{chip}: {}", snapshot.summary()),
//!         Err(e) if e.is_transient() => continue,
//!         Err(e) => return Err(e),
//!     }
//! }
//! # Ok::<(), asmetrics_core::MetricsError>(())
//! ```

pub mod capability;
pub mod command;
pub mod config;
pub mod decode;
pub mod error;
pub mod inventory;
pub mod memory;
pub mod metrics;
pub mod monitor;
pub mod reader;
pub mod record;
pub mod sampler;

#[cfg(test)]
mod testdata;

pub use capability::{CapabilityMatch, CapabilityTier, Ceilings, lookup};
pub use config::{DEFAULT_BASE_PATH, Elevation, SamplerConfig, Timecode};
pub use decode::decode;
pub use error::{MetricsError, Result};
pub use inventory::{HardwareDescriptor, HostProperties, SystemHost, parse_key_values, probe};
pub use memory::{MemoryTotals, RamMetrics};
pub use metrics::{
    ClusterAggregate, ClusterKind, ClusterMetrics, CoreMetrics, CpuMetrics, GpuMetrics,
    PowerMetrics, Snapshot, ThermalPressure,
};
pub use monitor::Monitor;
pub use reader::{latest_record, read_latest};
pub use record::SampleRecord;
pub use sampler::SamplerSupervisor;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reads and decodes the newest complete record at `path`.
pub fn snapshot_from_file(path: &std::path::Path) -> Result<Snapshot> {
    read_latest(path).map(decode)
}
