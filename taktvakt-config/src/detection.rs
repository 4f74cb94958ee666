//! Detection and directory configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One seeded directory slot.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DirectorySeed {
    pub key: String,
    pub value: String,
}

impl DirectorySeed {
    fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Classifier and query responder parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DetectionConfig {
    /// IPv4 protocol numbers classified as threats (1 = ICMP).
    #[serde(default = "default_blacklist")]
    pub blacklisted_protocols: Vec<u8>,

    /// Payload byte patterns classified as threats.
    #[serde(default)]
    pub signatures: Vec<String>,

    /// UDP destination port carrying directory queries.
    #[validate(range(min = 1))]
    #[serde(default = "default_query_port")]
    pub query_port: u16,

    /// Local address the reply socket binds to.
    #[validate(custom(function = crate::validation::validate_socket_addr))]
    #[serde(default = "default_reply_bind")]
    pub reply_bind: String,

    /// Number of directory slots.
    #[validate(range(min = 1, max = 1024))]
    #[serde(default = "default_directory_capacity")]
    pub directory_capacity: usize,

    /// Initial directory contents, one entry per slot.
    #[serde(default = "default_directory")]
    pub directory: Vec<DirectorySeed>,
}

fn default_blacklist() -> Vec<u8> {
    vec![1]
}

fn default_query_port() -> u16 {
    5005
}

fn default_reply_bind() -> String {
    "0.0.0.0:0".into()
}

fn default_directory_capacity() -> usize {
    10
}

fn default_directory() -> Vec<DirectorySeed> {
    [
        ("Parth", "Dancing"),
        ("Jainil", "Cycling"),
        ("Varsani", "Astrology"),
        ("Nadgir", "Cooking"),
        ("Koppa", "Sports"),
        ("Nalin", "Sleeping"),
        ("Karthik", "Running"),
        ("Abhirath", "Chess"),
        ("Aditya", "Swimming"),
        ("Induja", "Coding"),
    ]
    .into_iter()
    .map(|(key, value)| DirectorySeed::new(key, value))
    .collect()
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            blacklisted_protocols: default_blacklist(),
            signatures: Vec::new(),
            query_port: default_query_port(),
            reply_bind: default_reply_bind(),
            directory_capacity: default_directory_capacity(),
            directory: default_directory(),
        }
    }
}
