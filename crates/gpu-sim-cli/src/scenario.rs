//! Scenario file format: guest memory regions, the batch buffer's start
//! address, and which trace categories to enable. Parsed with `serde` +
//! `toml`, the way the rest of the ambient CLI stack leans on real crates
//! rather than a hand-rolled parser.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct MemoryRegion {
    pub address: u64,
    /// Path to a file whose bytes get loaded at `address`, relative to the
    /// scenario file's own directory.
    pub file: String,
}

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub batch_buffer_address: u64,
    pub memory_size: usize,
    #[serde(default)]
    pub regions: Vec<MemoryRegion>,
    #[serde(default)]
    pub trace: Vec<String>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let scenario: Scenario = toml::from_str(&text)?;
        Ok(scenario)
    }
}

/// Map trace category names from the scenario file to [`TraceMask`] bits.
pub fn parse_trace_mask(names: &[String]) -> gpu_sim_hal::TraceMask {
    use gpu_sim_hal::TraceMask;
    names.iter().fold(TraceMask::empty(), |mask, name| {
        mask | match name.to_ascii_uppercase().as_str() {
            "CS" => TraceMask::CS,
            "VF" => TraceMask::VF,
            "VS" => TraceMask::VS,
            "PS" => TraceMask::PS,
            "URB" => TraceMask::URB,
            "EU" => TraceMask::EU,
            "WARN" => TraceMask::WARN,
            other => {
                log::warn!("unknown trace category '{other}' in scenario file");
                TraceMask::empty()
            }
        }
    })
}
