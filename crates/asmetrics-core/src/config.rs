//! Sampler configuration.
//!
//! The output path convention and the active timecode live here and are
//! passed explicitly to the supervisor and the reader.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Default output path prefix; the timecode digit is appended to it.
pub const DEFAULT_BASE_PATH: &str = "/tmp/asitop_powermetrics";

/// Sample domains requested from powermetrics.
pub const SAMPLERS: &[&str] = &["cpu_power", "gpu_power", "thermal"];

/// One of the two output-file slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timecode {
    #[default]
    #[serde(rename = "0")]
    Zero,
    #[serde(rename = "1")]
    One,
}

impl Timecode {
    /// The other slot.
    pub fn alternate(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "0",
            Self::One => "1",
        }
    }
}

impl std::fmt::Display for Timecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Timecode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Self::Zero),
            "1" => Ok(Self::One),
            other => Err(format!("timecode must be 0 or 1, got '{other}'")),
        }
    }
}

/// How the sampler obtains superuser privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Elevation {
    /// Prefix the command with `sudo`.
    #[default]
    Sudo,
    /// Run directly; the current process must already be root.
    None,
}

/// Configuration shared by the sampler supervisor and the snapshot reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Output path prefix. The file actually written is `<base_path><timecode>`.
    pub base_path: PathBuf,
    pub timecode: Timecode,
    /// `nice` increment for the sampler process.
    pub nice: i32,
    /// Sampling interval in milliseconds.
    pub interval_ms: u64,
    pub elevation: Elevation,
    /// How long `start` watches the new process for an early exit.
    #[serde(with = "duration_ms")]
    pub startup_grace: Duration,
    /// Sampler executable name or path.
    pub program: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(DEFAULT_BASE_PATH),
            timecode: Timecode::Zero,
            nice: 10,
            interval_ms: 1000,
            elevation: Elevation::Sudo,
            startup_grace: Duration::from_millis(250),
            program: "powermetrics".to_string(),
        }
    }
}

impl SamplerConfig {
    /// Loads a JSON configuration file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| MetricsError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| MetricsError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Path of the file written for `timecode`.
    pub fn output_path_for(&self, timecode: Timecode) -> PathBuf {
        let mut raw = self.base_path.clone().into_os_string();
        raw.push(timecode.as_str());
        PathBuf::from(raw)
    }

    /// Path of the active timecode's output file.
    pub fn output_path(&self) -> PathBuf {
        self.output_path_for(self.timecode)
    }

    /// Directory holding the output files.
    pub fn output_dir(&self) -> &Path {
        match self.base_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    /// File-name prefix shared by every output file of this configuration.
    pub fn output_prefix(&self) -> String {
        self.base_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Sampling interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
