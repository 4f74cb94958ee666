//! Packet source configuration.
//!
//! Selects where RX pulls frames from:
//! - Live capture on a network interface (pcap, `live` feature)
//! - A seeded synthetic traffic generator

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::validation;

/// Packet capture configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CaptureConfig {
    /// Capture mode (live, simulated).
    #[validate(custom(function = validation::validate_mode))]
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Network interface for live capture.
    #[validate(custom(function = validation::validate_interface))]
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Run in promiscuous mode?
    #[serde(default = "default_promiscuous")]
    pub promiscuous: bool,

    /// Capture snapshot length in bytes.
    #[validate(range(min = 64, max = 262_144))]
    #[serde(default = "default_snaplen", deserialize_with = "deserialize_size")]
    pub snaplen: usize,

    /// Synthetic traffic parameters (simulated mode).
    #[validate(nested)]
    #[serde(default)]
    pub generator: GeneratorConfig,
}

fn default_mode() -> String {
    "simulated".into()
}

fn default_interface() -> String {
    "eth0".into()
}

fn default_promiscuous() -> bool {
    true
}

fn default_snaplen() -> usize {
    2048
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Num(usize),
    Str(String),
}

/// Custom deserializer to allow human‑friendly sizes (e.g. "2KiB") or direct numbers.
fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeValue::deserialize(deserializer)? {
        SizeValue::Num(n) => Ok(n),
        SizeValue::Str(s) => {
            let s = s.trim();
            let split = s
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(s.len());
            let (num_part, unit_part) = s.split_at(split);
            let number: f64 = num_part.parse().map_err(serde::de::Error::custom)?;
            let multiplier = match unit_part.trim().to_lowercase().as_str() {
                "kb" | "kib" => 1024.0,
                "mb" | "mib" => 1024.0 * 1024.0,
                "" | "b" => 1.0,
                _ => return Err(serde::de::Error::custom("Unknown size unit")),
            };
            Ok((number * multiplier) as usize)
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            interface: default_interface(),
            promiscuous: default_promiscuous(),
            snaplen: default_snaplen(),
            generator: GeneratorConfig::default(),
        }
    }
}

/// Traffic generator alternating single packets with attack bursts.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct GeneratorConfig {
    /// RNG seed; identical seeds yield identical traffic.
    #[serde(default)]
    pub seed: u64,

    /// Probability that a generated frame is a threat (ICMP).
    #[validate(custom(function = validation::validate_ratio))]
    #[serde(default = "default_threat_ratio")]
    pub threat_ratio: f64,

    /// Gap after a single packet, lower/upper bound (ms).
    #[serde(default = "default_normal_gap")]
    pub normal_gap_ms: (u64, u64),

    /// Frames per burst, lower/upper bound.
    #[serde(default = "default_burst_len")]
    pub burst_len: (u32, u32),

    /// Pause after a burst, lower/upper bound (ms).
    #[serde(default = "default_burst_pause")]
    pub burst_pause_ms: (u64, u64),
}

fn default_threat_ratio() -> f64 {
    0.5
}

fn default_normal_gap() -> (u64, u64) {
    (500, 1500)
}

fn default_burst_len() -> (u32, u32) {
    (50, 100)
}

fn default_burst_pause() -> (u64, u64) {
    (3000, 5000)
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            threat_ratio: default_threat_ratio(),
            normal_gap_ms: default_normal_gap(),
            burst_len: default_burst_len(),
            burst_pause_ms: default_burst_pause(),
        }
    }
}
