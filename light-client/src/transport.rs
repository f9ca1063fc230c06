use std::io::{Read, Write};

use log::info;
use serialport::{SerialPort, SerialPortType};

use crate::{
    config::{BridgeConfig, PortConfig},
    BridgeError,
};

/// Ordered, blocking byte channel to the bridge. Reads must give up after a
/// bounded time and report it as an error.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send + ?Sized> Transport for T {}

pub fn open_serial(config: &BridgeConfig) -> Result<Box<dyn SerialPort>, BridgeError> {
    let port_name = match &config.port {
        PortConfig::Path(path) => path.to_string_lossy().into_owned(),
        PortConfig::Detect => detect_port(config.manufacturer.as_deref())?,
    };
    info!(
        "Opening bridge on {} at {} baud",
        port_name, config.baud_rate
    );
    Ok(serialport::new(port_name, config.baud_rate)
        .timeout(config.timeout())
        .open()?)
}

fn detect_port(manufacturer: Option<&str>) -> Result<String, BridgeError> {
    for port in serialport::available_ports()? {
        if let SerialPortType::UsbPort(port_info) = port.port_type {
            let matches = match manufacturer {
                None => true,
                Some(wanted) => port_info.manufacturer.as_deref() == Some(wanted),
            };
            if matches {
                info!("Found endpoint: {}", port.port_name);
                return Ok(port.port_name);
            }
        }
    }
    Err(BridgeError::Transport {
        reason: match manufacturer {
            Some(wanted) => format!("no USB serial port from {wanted} found"),
            None => "no USB serial port found".into(),
        },
    })
}
