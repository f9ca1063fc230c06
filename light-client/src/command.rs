use std::fmt;

use crate::BridgeError;

/// Reserved command byte. Ids from here upwards are never dispatched.
pub const INVALID_COMMAND: u8 = 0x7f;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandId {
    GetMaxLeds = 0,
    SetNumLeds = 1,
    SetLed = 2,
    SetLeds = 3,
    GetProtocolVersion = 4,
    GetLed = 5,
    GetLeds = 6,
    RotateLeds = 7,
    RotateLedsWithDelay = 8,
}

impl CommandId {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn spec(self) -> &'static CommandSpec {
        &CATALOG[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

impl TryFrom<u8> for CommandId {
    type Error = BridgeError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        CATALOG
            .iter()
            .map(|spec| spec.id)
            .find(|command| command.id() == id)
            .ok_or_else(|| BridgeError::encoding(format!("unknown command id {id:#04x}")))
    }
}

/// Layout of a request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    Fixed(usize),
    /// Start index followed by one or more `(r, g, b)` triples.
    LedRun,
}

/// Layout of a successful response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Empty,
    Byte,
    /// Echoed start index followed by one triple per requested LED.
    IndexedLeds,
}

impl ResponseShape {
    pub fn expected_len(self, leds: usize) -> usize {
        match self {
            ResponseShape::Empty => 0,
            ResponseShape::Byte => 1,
            ResponseShape::IndexedLeds => 1 + 3 * leds,
        }
    }
}

#[derive(Debug)]
pub struct CommandSpec {
    pub id: CommandId,
    pub name: &'static str,
    pub request: RequestShape,
    pub response: ResponseShape,
    /// Lowest protocol version implementing the command, if it is gated.
    pub min_version: Option<u8>,
}

impl CommandSpec {
    pub(crate) fn check_request(&self, payload: &[u8]) -> Result<(), BridgeError> {
        let valid = match self.request {
            RequestShape::Fixed(len) => payload.len() == len,
            RequestShape::LedRun => payload.len() > 1 && (payload.len() - 1) % 3 == 0,
        };
        if valid {
            Ok(())
        } else {
            Err(BridgeError::encoding(format!(
                "{} payload of {} bytes does not match {:?}",
                self.name,
                payload.len(),
                self.request
            )))
        }
    }
}

pub static CATALOG: [CommandSpec; 9] = [
    CommandSpec {
        id: CommandId::GetMaxLeds,
        name: "get_max_leds",
        request: RequestShape::Fixed(0),
        response: ResponseShape::Byte,
        min_version: None,
    },
    CommandSpec {
        id: CommandId::SetNumLeds,
        name: "set_num_leds",
        request: RequestShape::Fixed(1),
        response: ResponseShape::Empty,
        min_version: None,
    },
    CommandSpec {
        id: CommandId::SetLed,
        name: "set_led",
        request: RequestShape::Fixed(4),
        response: ResponseShape::Empty,
        min_version: None,
    },
    CommandSpec {
        id: CommandId::SetLeds,
        name: "set_leds",
        request: RequestShape::LedRun,
        response: ResponseShape::Empty,
        min_version: None,
    },
    CommandSpec {
        id: CommandId::GetProtocolVersion,
        name: "get_protocol_version",
        request: RequestShape::Fixed(0),
        response: ResponseShape::Byte,
        min_version: None,
    },
    CommandSpec {
        id: CommandId::GetLed,
        name: "get_led",
        request: RequestShape::Fixed(1),
        response: ResponseShape::IndexedLeds,
        min_version: None,
    },
    CommandSpec {
        id: CommandId::GetLeds,
        name: "get_leds",
        request: RequestShape::Fixed(2),
        response: ResponseShape::IndexedLeds,
        min_version: None,
    },
    CommandSpec {
        id: CommandId::RotateLeds,
        name: "rotate_leds",
        request: RequestShape::Fixed(1),
        response: ResponseShape::Empty,
        min_version: Some(3),
    },
    CommandSpec {
        id: CommandId::RotateLedsWithDelay,
        name: "rotate_leds_with_delay",
        request: RequestShape::Fixed(2),
        response: ResponseShape::Empty,
        min_version: Some(4),
    },
];
