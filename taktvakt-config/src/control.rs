//! Control-plane listener configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ControlConfig {
    /// Register the control-plane service at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Listen address.
    #[validate(custom(function = validation::validate_socket_addr))]
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Upper bound on waiting for a request after accepting (milliseconds).
    /// The CONTROL service blocks for up to this long, so keep it below the
    /// service period.
    #[validate(range(min = 1, max = 10_000))]
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_bind() -> String {
    "0.0.0.0:8080".into()
}

fn default_read_timeout() -> u64 {
    5
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            bind: default_bind(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}
