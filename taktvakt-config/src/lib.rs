//! # taktvakt Configuration System
//!
//! Hierarchical configuration for the sequencer, the packet pipeline and the
//! services that run on it.
//!
//! ## Features
//! - **Unified Configuration**: Single source of truth across all crates
//! - **Validation**: Per-field `validator` rules plus cross-field consistency
//!   checks (periods vs. tick modulus, generator ranges)
//! - **Environment Awareness**: `TAKTVAKT_ENV` selects an override file and
//!   `TAKTVAKT_*` variables override individual keys

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod capture;
mod control;
mod detection;
mod error;
mod logging;
mod pipeline;
mod sequencer;
mod validation;

pub use capture::{CaptureConfig, GeneratorConfig};
pub use control::ControlConfig;
pub use detection::{DetectionConfig, DirectorySeed};
pub use error::ConfigError;
pub use logging::LoggingConfig;
pub use pipeline::{IdleStrategy, PipelineConfig};
pub use sequencer::{SequencerConfig, ServiceConfig, ServicesConfig};

/// Top‑level configuration container for all taktvakt components.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct TaktvaktConfig {
    /// Tick timebase and timing logs.
    #[validate(nested)]
    #[serde(default)]
    pub sequencer: SequencerConfig,

    /// Core placement, priority and period of every service.
    #[validate(nested)]
    #[serde(default)]
    pub services: ServicesConfig,

    /// Buffer pool and ring sizing.
    #[validate(nested)]
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Classifier and directory.
    #[validate(nested)]
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Control-plane listener.
    #[validate(nested)]
    #[serde(default)]
    pub control: ControlConfig,

    /// Packet log outputs.
    #[validate(nested)]
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Packet source.
    #[validate(nested)]
    #[serde(default)]
    pub capture: CaptureConfig,
}

impl TaktvaktConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/taktvakt.yaml` - Base settings. If missing, defaults are used.
    /// 3. `config/<environment>.yaml` - Environment‑specific overrides.
    /// 4. `TAKTVAKT_*` environment variables (`__` separates nesting levels).
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(TaktvaktConfig::default()));

        if Path::new("config/taktvakt.yaml").exists() {
            figment = figment.merge(Yaml::file("config/taktvakt.yaml"));
        }

        let env = std::env::var("TAKTVAKT_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::finish(figment)
    }

    /// Load configuration from a specific file on top of the defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment = Figment::from(Serialized::defaults(TaktvaktConfig::default()))
            .merge(Yaml::file(path));
        Self::finish(figment)
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .merge(Env::prefixed("TAKTVAKT_").split("__"))
            .extract()?;
        config.check()?;
        Ok(config)
    }

    /// Field validation plus cross-field checks. Run again after any
    /// programmatic override of a loaded configuration.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.check_consistency()
    }

    /// Cross-field checks that `validator` cannot express per field.
    pub fn check_consistency(&self) -> Result<(), ConfigError> {
        let modulus = self.sequencer.wrap_modulus;
        for (name, service) in self.services.iter() {
            if let Some(period) = service.period_ticks {
                if modulus % period != 0 {
                    return Err(ConfigError::Inconsistent(format!(
                        "service {name}: period {period} does not divide tick modulus {modulus}"
                    )));
                }
            }
        }

        let generator = &self.capture.generator;
        let ranges = [
            ("normal_gap_ms", generator.normal_gap_ms.0, generator.normal_gap_ms.1),
            (
                "burst_len",
                u64::from(generator.burst_len.0),
                u64::from(generator.burst_len.1),
            ),
            ("burst_pause_ms", generator.burst_pause_ms.0, generator.burst_pause_ms.1),
        ];
        for (field, low, high) in ranges {
            if low > high {
                return Err(ConfigError::Inconsistent(format!(
                    "generator.{field}: lower bound {low} exceeds upper bound {high}"
                )));
            }
        }

        if self.detection.directory.len() > self.detection.directory_capacity {
            return Err(ConfigError::Inconsistent(format!(
                "directory seeds {} entries but holds {}",
                self.detection.directory.len(),
                self.detection.directory_capacity
            )));
        }

        Ok(())
    }

    /// Cores requested by services that do not exist on this host.
    pub fn missing_cores(&self) -> Vec<(&'static str, usize)> {
        let available = num_cpus::get();
        self.services
            .iter()
            .filter(|(_, service)| service.core >= available)
            .map(|(name, service)| (name, service.core))
            .collect()
    }

    /// `(read_timeout_us, period_us)` when one slow control client can keep
    /// the CONTROL service busy for a whole period.
    pub fn control_timeout_over_period(&self) -> Option<(u64, u64)> {
        if !self.control.enabled {
            return None;
        }
        let period_us = self.services.control.period_ticks? * self.sequencer.tick_interval_us;
        let timeout_us = self.control.read_timeout_ms.saturating_mul(1_000);
        (timeout_us >= period_us).then_some((timeout_us, period_us))
    }
}
