//! Typed metric groups produced by the decoder.

use std::time::SystemTime;

use serde::Serialize;

/// SoC thermal pressure level as reported by the thermal sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermalPressure {
    Nominal,
    Moderate,
    Heavy,
    Trapping,
    Sleeping,
    Unknown,
}

impl ThermalPressure {
    /// Maps a sampler level string. Unrecognized strings are `Unknown`.
    pub fn from_level(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "nominal" => Self::Nominal,
            "moderate" => Self::Moderate,
            "heavy" => Self::Heavy,
            "trapping" => Self::Trapping,
            "sleeping" => Self::Sleeping,
            _ => Self::Unknown,
        }
    }

    /// `true` for levels at which the SoC is throttling.
    pub fn is_throttling(self) -> bool {
        matches!(self, Self::Heavy | Self::Trapping | Self::Sleeping)
    }
}

impl std::fmt::Display for ThermalPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nominal => write!(f, "Nominal"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Heavy => write!(f, "Heavy"),
            Self::Trapping => write!(f, "Trapping"),
            Self::Sleeping => write!(f, "Sleeping"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Core type of a CPU cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterKind {
    Efficiency,
    Performance,
}

impl ClusterKind {
    /// Efficiency clusters are named `E-Cluster`, `E0-Cluster`, ...
    pub fn from_cluster_name(name: &str) -> Self {
        if name.starts_with('E') {
            Self::Efficiency
        } else {
            Self::Performance
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreMetrics {
    pub cpu: u32,
    pub freq_mhz: u32,
    pub active_percent: u32,
}

/// One physical cluster, as listed by the sampler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterMetrics {
    pub name: String,
    pub kind: ClusterKind,
    pub freq_mhz: u32,
    pub active_percent: u32,
    pub cores: Vec<CoreMetrics>,
}

/// All clusters of one kind folded together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAggregate {
    /// Highest cluster frequency.
    pub freq_mhz: u32,
    /// Mean cluster residency.
    pub active_percent: u32,
    /// CPU ids of every core in these clusters.
    pub core_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuMetrics {
    pub clusters: Vec<ClusterMetrics>,
    pub efficiency: Option<ClusterAggregate>,
    pub performance: Option<ClusterAggregate>,
    /// Mean residency over every core (or cluster, when no cores are listed).
    pub package_active_percent: u32,
    pub package_idle_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuMetrics {
    pub freq_mhz: u32,
    pub active_percent: u32,
}

/// Power draw in watts. Fields the sampler omitted are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerMetrics {
    pub cpu_watts: Option<f64>,
    pub gpu_watts: Option<f64>,
    pub ane_watts: Option<f64>,
    pub package_watts: Option<f64>,
}

/// Consolidated view of one sampler record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub cpu: CpuMetrics,
    pub gpu: GpuMetrics,
    pub power: PowerMetrics,
    pub thermal_pressure: ThermalPressure,
    /// Sample time taken verbatim from the record.
    pub timestamp: SystemTime,
}

impl Snapshot {
    /// Sample time in milliseconds since the Unix epoch.
    pub fn timestamp_unix_ms(&self) -> u64 {
        self.timestamp
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// One-line summary for logs and plain-text output.
    pub fn summary(&self) -> String {
        let cluster = |agg: &Option<ClusterAggregate>| match agg {
            Some(a) => format!("{}% @ {} MHz", a.active_percent, a.freq_mhz),
            None => "-".to_string(),
        };
        let watts = |w: Option<f64>| match w {
            Some(w) => format!("{w:.2}W"),
            None => "?".to_string(),
        };
        format!(
            "E {} | P {} | GPU {}% @ {} MHz | CPU {} GPU {} ANE {} pkg {} | thermal {}",
            cluster(&self.cpu.efficiency),
            cluster(&self.cpu.performance),
            self.gpu.active_percent,
            self.gpu.freq_mhz,
            watts(self.power.cpu_watts),
            watts(self.power.gpu_watts),
            watts(self.power.ane_watts),
            watts(self.power.package_watts),
            self.thermal_pressure,
        )
    }
}
