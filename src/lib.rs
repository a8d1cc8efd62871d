//! SimpleIOT device client library.
//!
//! Topic/envelope protocol, inbound dispatch and a streamed OTA update
//! controller behind port traits.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each adapter; everything else runs
//! on the host.

#![deny(unused_must_use)]

#[cfg(all(target_os = "espidf", not(feature = "espidf")))]
compile_error!("device builds need `--features espidf`");

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod link;
pub mod protocol;
pub mod update;

pub use app::{DeviceHandler, IotSession};
pub use config::IotConfig;
pub use error::{Error, Result};
