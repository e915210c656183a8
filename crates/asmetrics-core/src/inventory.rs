//! One-shot host inventory: chip identity, core topology, GPU size.
//!
//! Reads three `key: value` text sources:
//! - `sysctl machdep.cpu.brand_string machdep.cpu.core_count`
//! - `sysctl hw.perflevel0.logicalcpu hw.perflevel1.logicalcpu`
//! - `system_profiler -detailLevel basic SPDisplaysDataType` (optional)
//!
//! and resolves power/bandwidth ceilings through [`crate::capability`].

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::capability::{self, CapabilityTier};
use crate::command::run_command;
use crate::error::{MetricsError, Result};

const BRAND_STRING: &str = "machdep.cpu.brand_string";
const CORE_COUNT: &str = "machdep.cpu.core_count";
/// perflevel0 is the performance tier, perflevel1 the efficiency tier.
const PERF_LEVEL0_CPUS: &str = "hw.perflevel0.logicalcpu";
const PERF_LEVEL1_CPUS: &str = "hw.perflevel1.logicalcpu";
const GPU_CORES: &str = "Total Number of Cores";

/// Timeout for each host query. system_profiler is the slow one.
const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Static description of the machine, built once per session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HardwareDescriptor {
    pub chip_name: String,
    pub chip_generation: String,
    pub total_core_count: u32,
    pub performance_core_count: Option<u32>,
    pub efficiency_core_count: Option<u32>,
    pub gpu_core_count: Option<u32>,
    pub cpu_max_power_watts: Option<f64>,
    pub gpu_max_power_watts: Option<f64>,
    pub cpu_max_bandwidth_gbps: Option<f64>,
    pub gpu_max_bandwidth_gbps: Option<f64>,
    pub capability_tier: CapabilityTier,
}

impl HardwareDescriptor {
    /// Builds a descriptor from already-known topology, resolving ceilings
    /// from the capability table.
    pub fn from_parts(
        chip_name: &str,
        total_core_count: u32,
        core_split: Option<(u32, u32)>,
        gpu_core_count: Option<u32>,
    ) -> Self {
        let chip_generation = capability::generation_of(chip_name).to_string();
        let found = capability::lookup(&chip_generation, chip_name);
        if found.tier == CapabilityTier::Baseline {
            log::warn!("unrecognized chip '{chip_name}'; using baseline power and bandwidth ceilings");
        }
        let c = found.ceilings;

        Self {
            chip_name: chip_name.to_string(),
            chip_generation,
            total_core_count,
            performance_core_count: core_split.map(|(p, _)| p),
            efficiency_core_count: core_split.map(|(_, e)| e),
            gpu_core_count,
            cpu_max_power_watts: positive(c.cpu_max_power_watts),
            gpu_max_power_watts: positive(c.gpu_max_power_watts),
            cpu_max_bandwidth_gbps: positive(c.cpu_max_bandwidth_gbps),
            gpu_max_bandwidth_gbps: positive(c.gpu_max_bandwidth_gbps),
            capability_tier: found.tier,
        }
    }

    /// CPU power as a percentage of the chip's ceiling.
    pub fn cpu_power_percent(&self, watts: f64) -> Option<f64> {
        percent_of(watts, self.cpu_max_power_watts)
    }

    /// GPU power as a percentage of the chip's ceiling.
    pub fn gpu_power_percent(&self, watts: f64) -> Option<f64> {
        percent_of(watts, self.gpu_max_power_watts)
    }
}

fn positive(v: f64) -> Option<f64> {
    (v > 0.0).then_some(v)
}

fn percent_of(value: f64, ceiling: Option<f64>) -> Option<f64> {
    ceiling.map(|max| value / max * 100.0)
}

/// Text sources for the host inventory.
pub trait HostProperties {
    /// Output listing the brand string and core count.
    fn cpu_properties(&self) -> Option<String>;
    /// Output listing the per-perflevel logical CPU counts.
    fn core_properties(&self) -> Option<String>;
    /// Display hardware report with the GPU core count.
    fn gpu_properties(&self) -> Option<String>;
}

/// Queries the running macOS host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl HostProperties for SystemHost {
    fn cpu_properties(&self) -> Option<String> {
        run_command("sysctl", &[BRAND_STRING, CORE_COUNT], QUERY_TIMEOUT)
    }

    fn core_properties(&self) -> Option<String> {
        run_command("sysctl", &[PERF_LEVEL0_CPUS, PERF_LEVEL1_CPUS], QUERY_TIMEOUT)
    }

    fn gpu_properties(&self) -> Option<String> {
        run_command(
            "system_profiler",
            &["-detailLevel", "basic", "SPDisplaysDataType"],
            QUERY_TIMEOUT,
        )
    }
}

/// Parses `key: value` lines, keeping only keys in `allow`.
///
/// Keys are trimmed, so indented `system_profiler` lines match too. Lines
/// without a colon are skipped.
pub fn parse_key_values(text: &str, allow: &[&str]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if allow.contains(&key) {
            map.insert(key.to_string(), value.trim().to_string());
        }
    }
    map
}

fn parse_count(map: &HashMap<String, String>, key: &str) -> Option<u32> {
    map.get(key).and_then(|v| v.parse().ok())
}

/// Builds the hardware descriptor from `host`.
///
/// Only the chip name is required. A missing total core count falls back to
/// the OS parallelism; missing topology or GPU data becomes `None`.
pub fn probe<H: HostProperties + ?Sized>(host: &H) -> Result<HardwareDescriptor> {
    let cpu = host
        .cpu_properties()
        .map(|text| parse_key_values(&text, &[BRAND_STRING, CORE_COUNT]))
        .unwrap_or_default();

    let chip_name = cpu
        .get(BRAND_STRING)
        .filter(|name| !name.is_empty())
        .cloned()
        .ok_or_else(|| MetricsError::Probe {
            detail: format!("{BRAND_STRING} unavailable"),
        })?;

    let total_core_count = parse_count(&cpu, CORE_COUNT).unwrap_or_else(|| {
        log::warn!("{CORE_COUNT} unavailable; using available parallelism");
        std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1)
    });

    let cores = host
        .core_properties()
        .map(|text| parse_key_values(&text, &[PERF_LEVEL0_CPUS, PERF_LEVEL1_CPUS]))
        .unwrap_or_default();
    let core_split = match (
        parse_count(&cores, PERF_LEVEL0_CPUS),
        parse_count(&cores, PERF_LEVEL1_CPUS),
    ) {
        (Some(p), Some(e)) => Some((p, e)),
        _ => {
            log::warn!("performance/efficiency core split unavailable");
            None
        }
    };

    let gpu_core_count = host
        .gpu_properties()
        .map(|text| parse_key_values(&text, &[GPU_CORES]))
        .and_then(|map| parse_count(&map, GPU_CORES));
    if gpu_core_count.is_none() {
        log::warn!("GPU core count unavailable");
    }

    Ok(HardwareDescriptor::from_parts(
        &chip_name,
        total_core_count,
        core_split,
        gpu_core_count,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedHost {
        cpu: Option<&'static str>,
        cores: Option<&'static str>,
        gpu: Option<&'static str>,
    }

    impl HostProperties for FixedHost {
        fn cpu_properties(&self) -> Option<String> {
            self.cpu.map(str::to_string)
        }
        fn core_properties(&self) -> Option<String> {
            self.cores.map(str::to_string)
        }
        fn gpu_properties(&self) -> Option<String> {
            self.gpu.map(str::to_string)
        }
    }

    const M1_PRO_CPU: &str = "machdep.cpu.brand_string: Apple M1 Pro\nmachdep.cpu.core_count: 10\n";
    const M1_PRO_CORES: &str = "hw.perflevel0.logicalcpu: 8\nhw.perflevel1.logicalcpu: 2\n";
    const M1_PRO_GPU: &str = "\
Graphics/Displays:

    Apple M1 Pro:

      Chipset Model: Apple M1 Pro
      Type: GPU
      Bus: Built-In
      Total Number of Cores: 16
      Vendor: Apple (0x106b)
      Metal Support: Metal 3
";

    fn m1_pro() -> FixedHost {
        FixedHost {
            cpu: Some(M1_PRO_CPU),
            cores: Some(M1_PRO_CORES),
            gpu: Some(M1_PRO_GPU),
        }
    }

    #[test]
    fn parse_key_values_filters_by_allow_list() {
        let text = "machdep.cpu.brand_string: Apple M1\nmachdep.cpu.family: 458787763\nnoise line\n";
        let map = parse_key_values(text, &[BRAND_STRING]);
        assert_eq!(map.len(), 1);
        assert_eq!(map[BRAND_STRING], "Apple M1");
    }

    #[test]
    fn parse_key_values_trims_indented_keys() {
        let map = parse_key_values(M1_PRO_GPU, &[GPU_CORES]);
        assert_eq!(map[GPU_CORES], "16");
    }

    #[test]
    fn probe_m1_pro() {
        let d = probe(&m1_pro()).unwrap();
        assert_eq!(d.chip_name, "Apple M1 Pro");
        assert_eq!(d.chip_generation, "M1");
        assert_eq!(d.total_core_count, 10);
        assert_eq!(d.performance_core_count, Some(8));
        assert_eq!(d.efficiency_core_count, Some(2));
        assert_eq!(d.gpu_core_count, Some(16));
        assert_eq!(d.cpu_max_bandwidth_gbps, Some(200.0));
        assert_eq!(d.gpu_max_bandwidth_gbps, Some(200.0));
        assert_eq!(d.cpu_max_power_watts, Some(30.0));
        assert_eq!(d.gpu_max_power_watts, Some(30.0));
        assert_eq!(d.capability_tier, CapabilityTier::ExactChip);
    }

    #[test]
    fn unknown_generation_uses_baseline() {
        let host = FixedHost {
            cpu: Some("machdep.cpu.brand_string: Apple M3 Ultra\nmachdep.cpu.core_count: 32\n"),
            cores: None,
            gpu: None,
        };
        let d = probe(&host).unwrap();
        assert_eq!(d.chip_generation, "M3");
        assert_eq!(d.cpu_max_bandwidth_gbps, Some(70.0));
        assert_eq!(d.gpu_max_bandwidth_gbps, Some(70.0));
        assert_eq!(d.cpu_max_power_watts, Some(20.0));
        assert_eq!(d.gpu_max_power_watts, Some(20.0));
        assert_eq!(d.capability_tier, CapabilityTier::Baseline);
    }

    #[test]
    fn optional_sources_degrade_to_none() {
        let host = FixedHost {
            cpu: Some(M1_PRO_CPU),
            cores: Some("hw.perflevel0.logicalcpu: 8\n"),
            gpu: Some("Graphics/Displays:\n  Chipset Model: Apple M1 Pro\n"),
        };
        let d = probe(&host).unwrap();
        assert_eq!(d.performance_core_count, None);
        assert_eq!(d.efficiency_core_count, None);
        assert_eq!(d.gpu_core_count, None);
        assert!(d.cpu_max_power_watts.is_some());
    }

    #[test]
    fn missing_core_count_falls_back_to_parallelism() {
        let host = FixedHost {
            cpu: Some("machdep.cpu.brand_string: Apple M2\n"),
            cores: Some(M1_PRO_CORES),
            gpu: None,
        };
        let d = probe(&host).unwrap();
        assert!(d.total_core_count >= 1);
        assert_eq!(d.capability_tier, CapabilityTier::GenerationDefault);
    }

    #[test]
    fn missing_brand_string_is_a_probe_error() {
        let host = FixedHost {
            cpu: None,
            cores: Some(M1_PRO_CORES),
            gpu: Some(M1_PRO_GPU),
        };
        assert!(matches!(probe(&host), Err(MetricsError::Probe { .. })));
    }

    #[test]
    fn power_percent_against_ceiling() {
        let d = probe(&m1_pro()).unwrap();
        assert_eq!(d.cpu_power_percent(15.0), Some(50.0));
        assert_eq!(d.gpu_power_percent(3.0), Some(10.0));
    }
}
