use asmetrics_core::{CapabilityTier, HardwareDescriptor, Result, SystemHost, probe};

use super::{or_unknown, print_json};

pub fn run(json: bool) -> Result<()> {
    let descriptor = probe(&SystemHost)?;
    if json {
        print_json(&descriptor);
    } else {
        print!("{}", render(&descriptor));
    }
    Ok(())
}

fn render(d: &HardwareDescriptor) -> String {
    let tier = match d.capability_tier {
        CapabilityTier::ExactChip => "exact match",
        CapabilityTier::GenerationDefault => "generation default",
        CapabilityTier::Baseline => "baseline (unrecognized chip)",
    };
    format!(
        "Chip:        {} ({})\n\
         Cores:       {} total, {} P + {} E\n\
         GPU cores:   {}\n\
         CPU max:     {} W, {} GB/s\n\
         GPU max:     {} W, {} GB/s\n\
         Ceilings:    {tier}\n",
        d.chip_name,
        d.chip_generation,
        d.total_core_count,
        or_unknown(d.performance_core_count),
        or_unknown(d.efficiency_core_count),
        or_unknown(d.gpu_core_count),
        or_unknown(d.cpu_max_power_watts),
        or_unknown(d.cpu_max_bandwidth_gbps),
        or_unknown(d.gpu_max_power_watts),
        or_unknown(d.gpu_max_bandwidth_gbps),
    )
}
