//! Static power and memory-bandwidth ceilings per Apple Silicon part.
//!
//! Lookup order: generation → exact chip name → generation default →
//! global baseline. Every input resolves, so new or unrecognized chips
//! still get usable (baseline M1) values.

use serde::Serialize;

/// Known maxima for one chip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ceilings {
    pub cpu_max_bandwidth_gbps: f64,
    pub gpu_max_bandwidth_gbps: f64,
    pub cpu_max_power_watts: f64,
    pub gpu_max_power_watts: f64,
}

impl Ceilings {
    const fn new(cpu_bw: f64, gpu_bw: f64, cpu_w: f64, gpu_w: f64) -> Self {
        Self {
            cpu_max_bandwidth_gbps: cpu_bw,
            gpu_max_bandwidth_gbps: gpu_bw,
            cpu_max_power_watts: cpu_w,
            gpu_max_power_watts: gpu_w,
        }
    }
}

/// Which rule produced a [`CapabilityMatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTier {
    /// The chip name matched a row of its generation.
    ExactChip,
    /// The generation is known but the chip variant is not.
    GenerationDefault,
    /// Unknown generation; baseline values apply.
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapabilityMatch {
    pub ceilings: Ceilings,
    pub tier: CapabilityTier,
}

struct GenerationRule {
    generation: &'static str,
    chips: &'static [(&'static str, Ceilings)],
    default: Ceilings,
}

/// Values used when the generation is not in [`RULES`].
pub const BASELINE: Ceilings = Ceilings::new(70.0, 70.0, 20.0, 20.0);

const RULES: &[GenerationRule] = &[
    GenerationRule {
        generation: "M1",
        chips: &[
            ("Apple M1 Ultra", Ceilings::new(500.0, 800.0, 60.0, 120.0)),
            ("Apple M1 Max", Ceilings::new(250.0, 400.0, 30.0, 60.0)),
            ("Apple M1 Pro", Ceilings::new(200.0, 200.0, 30.0, 30.0)),
        ],
        default: Ceilings::new(70.0, 70.0, 20.0, 20.0),
    },
    GenerationRule {
        generation: "M2",
        chips: &[
            ("Apple M2 Max", Ceilings::new(250.0, 400.0, 30.0, 60.0)),
            ("Apple M2 Pro", Ceilings::new(200.0, 200.0, 40.0, 35.0)),
        ],
        default: Ceilings::new(100.0, 100.0, 25.0, 15.0),
    },
];

/// Resolves the ceilings for a chip. Pure; total over all inputs.
pub fn lookup(generation: &str, chip_name: &str) -> CapabilityMatch {
    let Some(rule) = RULES.iter().find(|r| r.generation == generation) else {
        return CapabilityMatch {
            ceilings: BASELINE,
            tier: CapabilityTier::Baseline,
        };
    };

    match rule.chips.iter().find(|(name, _)| *name == chip_name) {
        Some((_, ceilings)) => CapabilityMatch {
            ceilings: *ceilings,
            tier: CapabilityTier::ExactChip,
        },
        None => CapabilityMatch {
            ceilings: rule.default,
            tier: CapabilityTier::GenerationDefault,
        },
    }
}

/// Generation token of a brand string: "M1" from "Apple M1 Max".
pub fn generation_of(chip_name: &str) -> &str {
    chip_name.split_whitespace().nth(1).unwrap_or("")
}
