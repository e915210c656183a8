//! Projection of a [`SampleRecord`] into typed metric groups.
//!
//! Decoding never relates values to hardware ceilings. Percentages of
//! maximum power or bandwidth are the presentation layer's business,
//! see [`crate::HardwareDescriptor`].

use std::time::SystemTime;

use crate::metrics::{
    ClusterAggregate, ClusterKind, ClusterMetrics, CoreMetrics, CpuMetrics, GpuMetrics,
    PowerMetrics, Snapshot, ThermalPressure,
};
use crate::record::{ClusterRecord, GpuRecord, ProcessorRecord, SampleRecord};

/// Decodes one record. Infallible: a record that deserialized already has
/// every required field.
pub fn decode(record: SampleRecord) -> Snapshot {
    let thermal_pressure = record
        .thermal_pressure
        .as_deref()
        .map(ThermalPressure::from_level)
        .unwrap_or(ThermalPressure::Unknown);

    Snapshot {
        cpu: decode_cpu(&record.processor),
        gpu: decode_gpu(&record.gpu),
        power: decode_power(&record.processor),
        thermal_pressure,
        timestamp: SystemTime::from(record.timestamp),
    }
}

/// Converts an idle ratio to a 0-100 residency.
fn active_percent(idle_ratio: f64) -> u32 {
    ((1.0 - idle_ratio.clamp(0.0, 1.0)) * 100.0).round() as u32
}

fn hz_to_mhz(freq_hz: f64) -> u32 {
    (freq_hz.max(0.0) / 1e6).round() as u32
}

fn decode_cluster(cluster: &ClusterRecord) -> ClusterMetrics {
    ClusterMetrics {
        name: cluster.name.clone(),
        kind: ClusterKind::from_cluster_name(&cluster.name),
        freq_mhz: hz_to_mhz(cluster.freq_hz),
        active_percent: active_percent(cluster.idle_ratio),
        cores: cluster
            .cpus
            .iter()
            .map(|core| CoreMetrics {
                cpu: core.cpu,
                freq_mhz: hz_to_mhz(core.freq_hz),
                active_percent: active_percent(core.idle_ratio),
            })
            .collect(),
    }
}

/// Folds all clusters of `kind`. Max/Ultra parts split a core type across
/// several clusters (`P0-Cluster`, `P1-Cluster`, ...).
fn aggregate(clusters: &[ClusterMetrics], kind: ClusterKind) -> Option<ClusterAggregate> {
    let matching: Vec<&ClusterMetrics> = clusters.iter().filter(|c| c.kind == kind).collect();
    if matching.is_empty() {
        return None;
    }

    let freq_mhz = matching.iter().map(|c| c.freq_mhz).max().unwrap_or(0);
    let active_sum: u32 = matching.iter().map(|c| c.active_percent).sum();
    let active_percent = active_sum / matching.len() as u32;
    let core_ids = matching
        .iter()
        .flat_map(|c| c.cores.iter().map(|core| core.cpu))
        .collect();

    Some(ClusterAggregate {
        freq_mhz,
        active_percent,
        core_ids,
    })
}

fn decode_cpu(processor: &ProcessorRecord) -> CpuMetrics {
    let clusters: Vec<ClusterMetrics> = processor.clusters.iter().map(decode_cluster).collect();

    let core_residencies: Vec<u32> = clusters
        .iter()
        .flat_map(|c| c.cores.iter().map(|core| core.active_percent))
        .collect();
    let residencies = if core_residencies.is_empty() {
        clusters.iter().map(|c| c.active_percent).collect()
    } else {
        core_residencies
    };
    let package_active_percent = if residencies.is_empty() {
        0
    } else {
        residencies.iter().sum::<u32>() / residencies.len() as u32
    };

    CpuMetrics {
        efficiency: aggregate(&clusters, ClusterKind::Efficiency),
        performance: aggregate(&clusters, ClusterKind::Performance),
        package_active_percent,
        package_idle_ratio: 1.0 - f64::from(package_active_percent) / 100.0,
        clusters,
    }
}

fn decode_gpu(gpu: &GpuRecord) -> GpuMetrics {
    GpuMetrics {
        freq_mhz: gpu.freq_hz.max(0.0).round() as u32,
        active_percent: active_percent(gpu.idle_ratio),
    }
}

fn decode_power(processor: &ProcessorRecord) -> PowerMetrics {
    let watts = |mw: Option<f64>| mw.map(|v| v / 1000.0);
    PowerMetrics {
        cpu_watts: watts(processor.cpu_energy),
        gpu_watts: watts(processor.gpu_energy),
        ane_watts: watts(processor.ane_energy),
        package_watts: watts(processor.combined_power),
    }
}
