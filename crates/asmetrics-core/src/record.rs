//! Raw powermetrics plist documents.
//!
//! Only the keys the decoder needs are typed. Everything else in the
//! document is ignored by serde.

use serde::Deserialize;

/// One sampler emission, as written by `powermetrics -f plist`.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleRecord {
    pub timestamp: plist::Date,
    #[serde(default)]
    pub thermal_pressure: Option<String>,
    pub processor: ProcessorRecord,
    pub gpu: GpuRecord,
}

/// The `processor` dictionary.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorRecord {
    pub clusters: Vec<ClusterRecord>,
    /// All energy readings are in milliwatts.
    #[serde(default)]
    pub cpu_energy: Option<f64>,
    #[serde(default)]
    pub gpu_energy: Option<f64>,
    #[serde(default)]
    pub ane_energy: Option<f64>,
    #[serde(default)]
    pub combined_power: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterRecord {
    pub name: String,
    pub freq_hz: f64,
    pub idle_ratio: f64,
    #[serde(default)]
    pub cpus: Vec<CoreRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoreRecord {
    pub cpu: u32,
    pub freq_hz: f64,
    pub idle_ratio: f64,
}

/// The `gpu` dictionary. `freq_hz` is reported in MHz despite its name.
#[derive(Debug, Clone, Deserialize)]
pub struct GpuRecord {
    pub freq_hz: f64,
    pub idle_ratio: f64,
}

impl SampleRecord {
    /// Decodes one plist document (XML or binary).
    pub fn from_plist_bytes(bytes: &[u8]) -> Result<Self, plist::Error> {
        plist::from_bytes(bytes)
    }
}
