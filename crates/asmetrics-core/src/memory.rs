//! RAM and swap usage, in GB rounded to one decimal.

use serde::Serialize;
use sysinfo::System;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Raw byte totals as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryTotals {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_used_bytes: u64,
}

impl MemoryTotals {
    /// Queries the OS.
    pub fn read() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        Self {
            total_bytes: sys.total_memory(),
            available_bytes: sys.available_memory(),
            swap_total_bytes: sys.total_swap(),
            swap_used_bytes: sys.used_swap(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RamMetrics {
    pub total_gb: f64,
    pub free_gb: f64,
    pub used_gb: f64,
    /// `100 - available / total * 100`, truncated: the fill level shown by
    /// the RAM gauge.
    pub free_percent: u32,
    pub swap_total_gb: f64,
    pub swap_used_gb: f64,
    pub swap_free_gb: f64,
    /// Same fill semantics as `free_percent`; `None` without swap.
    pub swap_free_percent: Option<u32>,
}

/// Bytes to GB, rounded to one decimal.
pub fn to_gb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_GB * 10.0).round() / 10.0
}

impl RamMetrics {
    /// Reads the current RAM and swap usage.
    pub fn read() -> Self {
        Self::from_totals(MemoryTotals::read())
    }

    pub fn from_totals(t: MemoryTotals) -> Self {
        let used_bytes = t.total_bytes.saturating_sub(t.available_bytes);
        let swap_free_bytes = t.swap_total_bytes.saturating_sub(t.swap_used_bytes);

        let free_percent = if t.total_bytes == 0 {
            0
        } else {
            (100.0 - t.available_bytes as f64 / t.total_bytes as f64 * 100.0).max(0.0) as u32
        };

        let swap_total_gb = to_gb(t.swap_total_bytes);
        let swap_free_gb = to_gb(swap_free_bytes);
        let swap_free_percent = if swap_total_gb > 0.0 {
            Some((100.0 - swap_free_gb / swap_total_gb * 100.0).max(0.0) as u32)
        } else {
            None
        };

        Self {
            total_gb: to_gb(t.total_bytes),
            free_gb: to_gb(t.available_bytes),
            used_gb: to_gb(used_bytes),
            free_percent,
            swap_total_gb,
            swap_used_gb: to_gb(t.swap_used_bytes),
            swap_free_gb,
            swap_free_percent,
        }
    }
}
