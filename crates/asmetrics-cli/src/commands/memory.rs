use asmetrics_core::{RamMetrics, Result};

use super::{or_unknown, print_json};

pub fn run(json: bool) -> Result<()> {
    let ram = RamMetrics::read();
    if json {
        print_json(&ram);
    } else {
        println!("{}", render(&ram));
    }
    Ok(())
}

pub fn render(m: &RamMetrics) -> String {
    let swap = if m.swap_total_gb > 0.0 {
        format!(
            "swap {}/{} GB ({}%)",
            m.swap_used_gb,
            m.swap_total_gb,
            or_unknown(m.swap_free_percent)
        )
    } else {
        "swap inactive".to_string()
    };
    format!(
        "RAM {}/{} GB ({}%), {swap}",
        m.used_gb, m.total_gb, m.free_percent
    )
}
