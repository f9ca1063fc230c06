use std::{fmt, io};

use thiserror::Error;

use crate::command::CommandId;

/// Status byte reported by the device in every response.
///
/// Zero means success; everything else is a device-defined failure code.
/// The codes known from the bridge firmware are decoded for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceStatus(pub u8);

impl DeviceStatus {
    pub const OK: DeviceStatus = DeviceStatus(0);

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    pub fn description(self) -> &'static str {
        match self.0 {
            0 => "ok",
            1 => "failed to read header",
            2 => "packet too long",
            3 => "packet too short",
            4 => "failed to read packet",
            5 => "wrong packet size",
            6 => "unknown command",
            7 => "index too large",
            _ => "device-defined error",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {:#04x} ({})", self.0, self.description())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Framing,
    Command,
    Encoding,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The byte channel failed; the session has to be reopened.
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    /// The response broke the declared-length contract. The byte stream may
    /// be desynchronized from here on.
    #[error("malformed response: {reason}")]
    Framing { reason: String },

    #[error("device rejected {command}: {status}")]
    Command {
        command: CommandId,
        status: DeviceStatus,
    },

    /// Rejected before anything was written to the transport.
    #[error("invalid request: {reason}")]
    Encoding { reason: String },
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Transport { .. } => ErrorKind::Transport,
            BridgeError::Framing { .. } => ErrorKind::Framing,
            BridgeError::Command { .. } => ErrorKind::Command,
            BridgeError::Encoding { .. } => ErrorKind::Encoding,
        }
    }

    /// Command id and raw status byte for device-side rejections.
    pub fn command_status(&self) -> Option<(u8, u8)> {
        match self {
            BridgeError::Command { command, status } => Some((command.id(), status.code())),
            _ => None,
        }
    }

    pub(crate) fn framing(reason: impl Into<String>) -> Self {
        BridgeError::Framing {
            reason: reason.into(),
        }
    }

    pub(crate) fn encoding(reason: impl Into<String>) -> Self {
        BridgeError::Encoding {
            reason: reason.into(),
        }
    }

    /// Classifies a failed read. A channel that closes before the declared
    /// length arrived is a framing problem; anything else (timeouts included)
    /// belongs to the transport.
    pub(crate) fn from_read(error: io::Error, what: &str) -> Self {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => BridgeError::Framing {
                reason: format!("short read while reading {what}"),
            },
            _ => BridgeError::Transport {
                reason: format!("reading {what}: {error}"),
            },
        }
    }

    pub(crate) fn from_write(error: io::Error) -> Self {
        BridgeError::Transport {
            reason: format!("writing request: {error}"),
        }
    }
}

impl From<serialport::Error> for BridgeError {
    fn from(error: serialport::Error) -> Self {
        BridgeError::Transport {
            reason: error.to_string(),
        }
    }
}
