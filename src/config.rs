//! Device session configuration
//!
//! Identity plus every tunable of the SimpleIOT client.  Values can be
//! persisted as a compact postcard blob and restored at boot.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::protocol::identity::DeviceIdentity;

/// Largest OTA chunk the poll loop will pull in one step.
pub const MAX_CHUNK_SIZE: usize = 4096;

/// Core session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IotConfig {
    // --- Identity ---
    pub project: String,
    pub model: String,
    pub serial: String,
    pub firmware_version: String,

    // --- Endpoint ---
    /// Broker (or gateway) host name
    pub host: String,
    pub port: u16,
    /// Reach the cloud through a gateway relay instead of a direct client
    pub with_gateway: bool,

    // --- Timing ---
    /// Sleep between idle polls (milliseconds)
    pub poll_delay_ms: u32,
    /// Grace delay between the "received" ack and restart (milliseconds)
    pub restart_delay_ms: u32,

    // --- OTA ---
    /// Bytes pumped from the fetch source per poll
    pub chunk_size: usize,

    // --- Subscriptions ---
    pub subscribe_monitor: bool,
    pub subscribe_update: bool,
    pub subscribe_diagnostics: bool,
}

impl Default for IotConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            model: String::new(),
            serial: String::new(),
            firmware_version: "1.0.0".into(),

            host: String::new(),
            port: 8883, // MQTT over TLS
            with_gateway: false,

            poll_delay_ms: 200,
            restart_delay_ms: 2000,

            chunk_size: 128,

            subscribe_monitor: true,
            subscribe_update: true,
            subscribe_diagnostics: false,
        }
    }
}

impl IotConfig {
    pub fn new(project: &str, model: &str, serial: &str) -> Self {
        Self {
            project: project.into(),
            model: model.into(),
            serial: serial.into(),
            ..Self::default()
        }
    }

    /// Reject empty identity fields and out-of-range tunables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.identity()?;
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ValidationFailed(
                "chunk_size must be within 1..=4096",
            ));
        }
        if self.poll_delay_ms > 60_000 {
            return Err(ConfigError::ValidationFailed(
                "poll_delay_ms must not exceed 60 s",
            ));
        }
        if self.restart_delay_ms > 60_000 {
            return Err(ConfigError::ValidationFailed(
                "restart_delay_ms must not exceed 60 s",
            ));
        }
        if !self.with_gateway && self.port == 0 {
            return Err(ConfigError::ValidationFailed("port must be non-zero"));
        }
        Ok(())
    }

    /// Build the immutable identity used for every topic and envelope.
    pub fn identity(&self) -> Result<DeviceIdentity, ConfigError> {
        DeviceIdentity::new(
            &self.project,
            &self.model,
            &self.serial,
            &self.firmware_version,
        )
    }

    /// Serialize for persistence.  Only validated configs are written.
    pub fn to_postcard(&self) -> Result<Vec<u8>, ConfigError> {
        self.validate()?;
        postcard::to_allocvec(self).map_err(|_| ConfigError::Corrupted)
    }

    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}
