//! Engine configuration.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration shared by every job launched from one runner.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Capacity of each job's event channel.
    #[builder(default = "100")]
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Size of the buffer used to stream file data during copies.
    #[builder(default = "1024 * 1024")]
    #[serde(default = "default_copy_chunk_size")]
    pub copy_chunk_size: usize,

    /// Copy permissions and timestamps onto transferred files.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preserve_metadata: bool,

    /// Re-read both sides of every copied file and compare hashes.
    #[builder(default = "false")]
    #[serde(default)]
    pub verify_copies: bool,

    /// Cancel jobs that run longer than this (None = no limit).
    #[builder(default)]
    #[serde(default)]
    pub job_deadline: Option<Duration>,
}

fn default_channel_capacity() -> usize {
    100
}

fn default_copy_chunk_size() -> usize {
    1024 * 1024
}

fn default_true() -> bool {
    true
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.channel_capacity == Some(0) {
            return Err("Channel capacity must be at least 1".to_string());
        }
        if self.copy_chunk_size == Some(0) {
            return Err("Copy chunk size must be at least 1 byte".to_string());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Parse a config from JSON, filling in defaults for missing fields.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(json).map_err(|e| e.to_string())?;
        if config.channel_capacity == 0 || config.copy_chunk_size == 0 {
            return Err("Channel capacity and copy chunk size must be non-zero".to_string());
        }
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            copy_chunk_size: default_copy_chunk_size(),
            preserve_metadata: true,
            verify_copies: false,
            job_deadline: None,
        }
    }
}
