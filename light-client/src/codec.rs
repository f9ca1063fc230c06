//! Wire format of the bridge protocol.
//!
//! Requests: `0xFD | command | length | payload[length]`.
//!
//! Responses (current firmware): `command | 0x80 | length | status | payload[length]`,
//! where `length` counts the payload bytes after the status byte, so
//! `85 04 00 01 30 00 00` answers `get_led(1)` with `(0x30, 0, 0)`. The oldest
//! firmware answered with a bare `status | length | payload[length]` header
//! instead; which one is in use is a configuration choice, never guessed from
//! the bytes.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{command::CommandId, error::DeviceStatus, BridgeError};

pub const START_OF_PACKET: u8 = 0xfd;
pub const RESPONSE_COMMAND_FLAG: u8 = 0x80;
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

pub fn encode(command: CommandId, payload: &[u8]) -> Result<Vec<u8>, BridgeError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(BridgeError::encoding(format!(
            "{} payload of {} bytes exceeds the {MAX_PAYLOAD_LEN} byte frame limit",
            command.name(),
            payload.len()
        )));
    }

    let mut frame = Vec::with_capacity(3 + payload.len());
    frame.extend_from_slice(&[START_OF_PACKET, command.id(), payload.len() as u8]);
    frame.extend_from_slice(payload);
    Ok(frame)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderLayout {
    /// `echo | length | status`, length counting payload bytes only.
    #[default]
    CommandEcho,
    /// `status | length`, length counting payload bytes only.
    StatusFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub command_echo: Option<u8>,
    pub status: DeviceStatus,
    pub payload: Vec<u8>,
}

impl HeaderLayout {
    pub fn decode_response<R: Read + ?Sized>(self, reader: &mut R) -> Result<Response, BridgeError> {
        let (command_echo, status, payload_len) = match self {
            HeaderLayout::CommandEcho => {
                let mut header = [0u8; 3];
                reader
                    .read_exact(&mut header)
                    .map_err(|e| BridgeError::from_read(e, "response header"))?;
                let [echo, length, status] = header;
                (Some(echo), status, length as usize)
            }
            HeaderLayout::StatusFirst => {
                let mut header = [0u8; 2];
                reader
                    .read_exact(&mut header)
                    .map_err(|e| BridgeError::from_read(e, "response header"))?;
                let [status, length] = header;
                (None, status, length as usize)
            }
        };

        let mut payload = vec![0u8; payload_len];
        reader
            .read_exact(&mut payload)
            .map_err(|e| BridgeError::from_read(e, "response payload"))?;

        Ok(Response {
            command_echo,
            status: DeviceStatus(status),
            payload,
        })
    }

    /// Serializes a response the way the firmware does.
    pub fn encode_response(self, command: u8, status: DeviceStatus, payload: &[u8]) -> Vec<u8> {
        let mut bytes = match self {
            HeaderLayout::CommandEcho => vec![
                command | RESPONSE_COMMAND_FLAG,
                payload.len() as u8,
                status.code(),
            ],
            HeaderLayout::StatusFirst => vec![status.code(), payload.len() as u8],
        };
        bytes.extend_from_slice(payload);
        bytes
    }
}

impl Response {
    /// Checks the response belongs to `command` and reports success, handing
    /// back the payload. A rejected command's payload is dropped.
    pub fn into_payload(self, command: CommandId) -> Result<Vec<u8>, BridgeError> {
        if let Some(echo) = self.command_echo {
            let expected = command.id() | RESPONSE_COMMAND_FLAG;
            if echo != expected {
                return Err(BridgeError::framing(format!(
                    "response echoes command byte {echo:#04x}, expected {expected:#04x} for {command}"
                )));
            }
        }

        if !self.status.is_ok() {
            return Err(BridgeError::Command {
                command,
                status: self.status,
            });
        }

        Ok(self.payload)
    }
}
