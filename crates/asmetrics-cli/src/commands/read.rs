use std::path::Path;

use asmetrics_core::{Result, snapshot_from_file};

use super::print_json;

/// Decodes a sampler output file once. Needs no privileges, so it is handy
/// for inspecting captures from another machine.
pub fn run(path: &Path, json: bool) -> Result<()> {
    let snapshot = snapshot_from_file(path)?;
    if json {
        print_json(&snapshot);
    } else {
        println!("{}", snapshot.summary());
        for cluster in &snapshot.cpu.clusters {
            println!(
                "  {:<12} {:>3}% @ {:>4} MHz",
                cluster.name, cluster.active_percent, cluster.freq_mhz
            );
            for core in &cluster.cores {
                println!(
                    "    cpu{:<3} {:>3}% @ {:>4} MHz",
                    core.cpu, core.active_percent, core.freq_mhz
                );
            }
        }
    }
    Ok(())
}
