//! Host driver for the NeoPixel serial bridge.
//!
//! A [`BridgeClient`] owns the serial link to one bridge and exposes the
//! firmware's commands as typed calls. Version-dependent commands are gated
//! on the protocol version the device reports, queried once per session.

mod capability;
mod client;
pub mod codec;
pub mod command;
mod config;
mod error;
pub mod simulate;
mod transport;

pub use capability::{
    Capabilities, ProtocolExpectation, RotationStrategy, KNOWN_PROTOCOL_VERSION,
};
pub use client::{
    BridgeClient, ClientOptions, DeviceInfo, ADDRESSABLE_LEDS, MAX_LEDS_PER_RESPONSE,
};
pub use config::{BridgeConfig, ConfigError, PortConfig, DEVICE_MAX_DATA_SIZE};
pub use error::{BridgeError, DeviceStatus, ErrorKind};
pub use lightfx::{Color, Frame};
pub use transport::{open_serial, Transport};
