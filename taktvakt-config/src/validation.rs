//! Custom validation functions for configuration.
//!
//! Shared validation logic used across configuration sections.

use std::net::SocketAddr;

use validator::ValidationError;

/// Validate that an interface name follows Linux naming conventions.
pub fn validate_interface(name: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^[a-zA-Z0-9_.-]{1,15}$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;

    if re.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_interface"))
    }
}

/// Validate that a queue capacity is a power of two.
pub fn validate_power_of_two(value: usize) -> Result<(), ValidationError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_power_of_two"))
    }
}

/// Validate capture mode.
pub fn validate_mode(mode: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^(live|simulated)$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(mode) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_capture_mode"))
    }
}

/// Validate a `host:port` socket address.
pub fn validate_socket_addr(addr: &str) -> Result<(), ValidationError> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_socket_address"))
}

/// Validate that a ratio lies within `[0, 1]`.
pub fn validate_ratio(value: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("ratio_out_of_range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interfaces() {
        assert!(validate_interface("eth0").is_ok());
        assert!(validate_interface("enp3s0.100").is_ok());
        assert!(validate_interface("").is_err());
        assert!(validate_interface("this-name-is-too-long").is_err());
    }

    #[test]
    fn socket_addresses() {
        assert!(validate_socket_addr("0.0.0.0:8080").is_ok());
        assert!(validate_socket_addr("[::1]:80").is_ok());
        assert!(validate_socket_addr("localhost").is_err());
    }

    #[test]
    fn numeric_rules() {
        assert!(validate_power_of_two(1024).is_ok());
        assert!(validate_power_of_two(1000).is_err());
        assert!(validate_ratio(0.25).is_ok());
        assert!(validate_ratio(1.5).is_err());
    }
}
