//! Poll-driven facade for the presentation layer.
//!
//! Owns the configuration, the static hardware descriptor and the sampler.
//! Each getter is independent and safe to call on every tick; none of them
//! waits for the sampler.

use crate::config::SamplerConfig;
use crate::decode::decode;
use crate::error::Result;
use crate::inventory::{self, HardwareDescriptor, SystemHost};
use crate::memory::RamMetrics;
use crate::metrics::Snapshot;
use crate::reader::read_latest;
use crate::sampler::SamplerSupervisor;

type Launch = fn(&SamplerConfig) -> Result<SamplerSupervisor>;

pub struct Monitor {
    config: SamplerConfig,
    descriptor: HardwareDescriptor,
    sampler: SamplerSupervisor,
    launch: Launch,
}

impl Monitor {
    /// Probes the host and starts the sampler.
    pub fn new(config: SamplerConfig) -> Result<Self> {
        let descriptor = inventory::probe(&SystemHost)?;
        Self::with_descriptor(config, descriptor)
    }

    /// Starts the sampler with an already-built descriptor.
    pub fn with_descriptor(config: SamplerConfig, descriptor: HardwareDescriptor) -> Result<Self> {
        Self::with_launcher(config, descriptor, SamplerSupervisor::start)
    }

    fn with_launcher(
        config: SamplerConfig,
        descriptor: HardwareDescriptor,
        launch: Launch,
    ) -> Result<Self> {
        let sampler = launch(&config)?;
        Ok(Self {
            config,
            descriptor,
            sampler,
            launch,
        })
    }

    /// Latest complete snapshot. [`crate::MetricsError::NoData`] means
    /// "nothing yet, try next tick".
    pub fn get_snapshot(&mut self) -> Result<Snapshot> {
        self.sampler.check_alive()?;
        let record = read_latest(self.sampler.output_path())?;
        Ok(decode(record))
    }

    pub fn get_ram_metrics(&self) -> RamMetrics {
        RamMetrics::read()
    }

    pub fn hardware_descriptor(&self) -> &HardwareDescriptor {
        &self.descriptor
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Restarts the sampler on the other timecode slot.
    pub fn restart(&mut self) -> Result<()> {
        self.sampler.stop();
        self.config.timecode = self.config.timecode.alternate();
        log::info!("restarting sampler on timecode {}", self.config.timecode);
        self.sampler = (self.launch)(&self.config)?;
        Ok(())
    }

    /// Stops the sampler. Also happens on drop. Later snapshots fail with
    /// [`crate::MetricsError::NotRunning`].
    pub fn shutdown(&mut self) {
        self.sampler.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Elevation, Timecode};
    use crate::error::MetricsError;
    use crate::metrics::ThermalPressure;
    use crate::testdata::sample_plist;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::{Duration, Instant};

    /// Writes a fake sampler that moves a copy of `fixture` to its `-o` path
    /// in one rename, then idles until signalled.
    fn fake_sampler(dir: &Path, fixture: &Path) -> String {
        let path = dir.join("fake-powermetrics.sh");
        let body = format!(
            "#!/bin/sh\n\
             while [ $# -gt 0 ]; do\n\
             case \"$1\" in -o) out=\"$2\"; shift;; esac\n\
             shift\n\
             done\n\
             cat '{}' > \"$out.tmp\" && mv \"$out.tmp\" \"$out\"\n\
             exec sleep 30\n",
            fixture.display()
        );
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn monitor_in(out: &Path, bin: &Path) -> Monitor {
        let fixture = bin.join("fixture.plist");
        let first = sample_plist("2024-01-01T00:00:00Z", "Nominal");
        let second = sample_plist("2024-01-01T00:00:01Z", "Heavy");
        std::fs::write(&fixture, format!("{first}\0{second}")).unwrap();

        let config = SamplerConfig {
            base_path: out.join("asitop_powermetrics"),
            elevation: Elevation::None,
            program: fake_sampler(bin, &fixture),
            startup_grace: Duration::from_millis(50),
            ..SamplerConfig::default()
        };
        let descriptor = HardwareDescriptor::from_parts("Apple M1", 8, Some((4, 4)), Some(8));
        Monitor::with_launcher(config, descriptor, SamplerSupervisor::spawn).unwrap()
    }

    fn wait_for_snapshot(monitor: &mut Monitor) -> Snapshot {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match monitor.get_snapshot() {
                Ok(snapshot) => return snapshot,
                Err(e) if e.is_transient() && Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(20));
                }
                Err(e) => panic!("no snapshot: {e}"),
            }
        }
    }

    #[test]
    fn snapshot_comes_from_newest_document() {
        let out = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let mut monitor = monitor_in(out.path(), bin.path());

        let snapshot = wait_for_snapshot(&mut monitor);
        assert_eq!(snapshot.thermal_pressure, ThermalPressure::Heavy);
        assert_eq!(monitor.hardware_descriptor().chip_name, "Apple M1");
        monitor.shutdown();
    }

    #[test]
    fn restart_switches_to_other_timecode() {
        let out = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let mut monitor = monitor_in(out.path(), bin.path());
        wait_for_snapshot(&mut monitor);

        monitor.restart().unwrap();
        assert_eq!(monitor.config().timecode, Timecode::One);
        let snapshot = wait_for_snapshot(&mut monitor);
        assert_eq!(snapshot.thermal_pressure, ThermalPressure::Heavy);
        assert!(out.path().join("asitop_powermetrics1").exists());
        assert!(!out.path().join("asitop_powermetrics0").exists());
        monitor.shutdown();
    }

    #[test]
    fn snapshot_after_shutdown_is_not_running() {
        let out = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let mut monitor = monitor_in(out.path(), bin.path());
        wait_for_snapshot(&mut monitor);

        monitor.shutdown();
        assert!(matches!(monitor.get_snapshot(), Err(MetricsError::NotRunning)));
        monitor.shutdown();
    }
}
