use serde::{Deserialize, Serialize};

use crate::command::CommandId;

/// Newest protocol revision this client was written against. Used for
/// diagnostics only; other versions are never refused.
pub const KNOWN_PROTOCOL_VERSION: u8 = 4;

/// How a session learns what the device supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolExpectation {
    /// Ask the device with `get_protocol_version` the first time it matters.
    #[default]
    Negotiate,
    /// Firmware predating `get_protocol_version`. Querying the version of such a device is
    /// itself a protocol violation, so the oldest command set is assumed.
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStrategy {
    /// One `rotate_leds` command, the device shifts its own buffer.
    Hardware,
    /// The host shifts its copy and resends the whole strip per step.
    Software,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    version: Option<u8>,
}

impl Capabilities {
    pub fn legacy() -> Self {
        Self { version: None }
    }

    pub fn from_version(version: u8) -> Self {
        Self {
            version: Some(version),
        }
    }

    /// `None` for legacy devices that cannot report a version.
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    pub fn is_known_current(&self) -> bool {
        self.version == Some(KNOWN_PROTOCOL_VERSION)
    }

    pub fn supports(&self, command: CommandId) -> bool {
        match command {
            CommandId::GetProtocolVersion => self.version.is_some(),
            _ => match command.spec().min_version {
                None => true,
                Some(min) => self.version.is_some_and(|version| version >= min),
            },
        }
    }

    pub fn rotation(&self) -> RotationStrategy {
        if self.supports(CommandId::RotateLeds) {
            RotationStrategy::Hardware
        } else {
            RotationStrategy::Software
        }
    }

    pub fn delayed_rotation(&self) -> RotationStrategy {
        if self.supports(CommandId::RotateLedsWithDelay) {
            RotationStrategy::Hardware
        } else {
            RotationStrategy::Software
        }
    }
}
