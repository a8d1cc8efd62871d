//! Application core: the device session and its port boundary.
//!
//! All interaction with the network, the fetch source and the flash happens
//! through **port traits** defined in [`ports`], keeping the session fully
//! testable without real peripherals.

pub mod ports;
pub mod service;

pub use ports::{
    ContentLength, DeviceHandler, FetchPort, FlashPort, InboundMessage, SystemPort, Transport,
};
pub use service::IotSession;
