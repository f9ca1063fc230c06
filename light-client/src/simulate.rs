//! In-memory stand-in for the bridge firmware.
//!
//! Speaks the wire protocol over `Read`/`Write`, so a [`crate::BridgeClient`]
//! can drive it exactly like a serial port. Clones share the same device,
//! which lets a test keep a handle to inspect the strip after handing the
//! transport to a client.

use std::{
    collections::VecDeque,
    io::{self, Read, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use lightfx::Color;
use log::trace;

use crate::{
    codec::{HeaderLayout, START_OF_PACKET},
    command::CommandId,
    config::DEVICE_MAX_DATA_SIZE,
    error::DeviceStatus,
};

const ERR_PACKET_TOO_LONG: DeviceStatus = DeviceStatus(2);
const ERR_WRONG_PACKET_SIZE: DeviceStatus = DeviceStatus(5);
const ERR_UNKNOWN_COMMAND: DeviceStatus = DeviceStatus(6);
const ERR_INDEX_TOO_LARGE: DeviceStatus = DeviceStatus(7);

#[derive(Clone)]
pub struct SimulatedDevice {
    state: Arc<Mutex<DeviceState>>,
}

struct DeviceState {
    leds: Vec<Color>,
    active: usize,
    /// `None` models firmware without `get_protocol_version`.
    version: Option<u8>,
    header: HeaderLayout,
    incoming: Vec<u8>,
    outgoing: VecDeque<u8>,
    forced_status: Option<DeviceStatus>,
    truncate_next: Option<usize>,
    disconnected: bool,
    frames_received: usize,
}

impl SimulatedDevice {
    /// A device with `max_leds` LEDs running the current firmware.
    pub fn new(max_leds: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                leds: vec![Color::black(); max_leds as usize],
                active: max_leds as usize,
                version: Some(crate::KNOWN_PROTOCOL_VERSION),
                header: HeaderLayout::CommandEcho,
                incoming: Vec::new(),
                outgoing: VecDeque::new(),
                forced_status: None,
                truncate_next: None,
                disconnected: false,
                frames_received: 0,
            })),
        }
    }

    pub fn with_version(self, version: Option<u8>) -> Self {
        self.state().version = version;
        self
    }

    pub fn with_header(self, header: HeaderLayout) -> Self {
        self.state().header = header;
        self
    }

    /// The whole LED buffer, including LEDs past the active count.
    pub fn leds(&self) -> Vec<Color> {
        self.state().leds.clone()
    }

    /// LEDs currently driven, i.e. the first `set_num_leds` of the buffer.
    pub fn active_leds(&self) -> Vec<Color> {
        let state = self.state();
        state.leds[..state.active].to_vec()
    }

    pub fn frames_received(&self) -> usize {
        self.state().frames_received
    }

    /// The next command is answered with `status` instead of being executed.
    pub fn fail_next(&self, status: u8) {
        self.state().forced_status = Some(DeviceStatus(status));
    }

    /// Only the first `bytes` of the next response ever reach the host.
    pub fn truncate_next(&self, bytes: usize) {
        self.state().truncate_next = Some(bytes);
    }

    /// Reads time out from now on, like an unplugged adapter.
    pub fn disconnect(&self) {
        self.state().disconnected = true;
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceState {
    fn process_incoming(&mut self) {
        loop {
            match self.incoming.iter().position(|&b| b == START_OF_PACKET) {
                Some(start) => {
                    self.incoming.drain(..start);
                }
                None => {
                    self.incoming.clear();
                    return;
                }
            }
            if self.incoming.len() < 3 {
                return;
            }
            let len = self.incoming[2] as usize;
            if self.incoming.len() < 3 + len {
                return;
            }

            let frame: Vec<u8> = self.incoming.drain(..3 + len).collect();
            self.frames_received += 1;
            let (command, payload) = (frame[1], &frame[3..]);
            let (status, reply) = match self.forced_status.take() {
                Some(status) => (status, Vec::new()),
                None => self.execute(command, payload),
            };
            trace!(
                "simulated bridge: command {command:#04x} -> {status}, {} byte reply",
                reply.len()
            );

            let mut response = self.header.encode_response(command, status, &reply);
            if let Some(keep) = self.truncate_next.take() {
                response.truncate(keep);
            }
            self.outgoing.extend(response);
        }
    }

    fn execute(&mut self, command: u8, payload: &[u8]) -> (DeviceStatus, Vec<u8>) {
        if payload.len() > DEVICE_MAX_DATA_SIZE {
            return (ERR_PACKET_TOO_LONG, Vec::new());
        }
        let Ok(command) = CommandId::try_from(command) else {
            return (ERR_UNKNOWN_COMMAND, Vec::new());
        };
        if let Some(min) = command.spec().min_version {
            if !self.version.is_some_and(|version| version >= min) {
                return (ERR_UNKNOWN_COMMAND, Vec::new());
            }
        }

        let capacity = self.leds.len();
        let result = match (command, payload) {
            (CommandId::GetMaxLeds, []) => Ok(vec![capacity as u8]),
            (CommandId::SetNumLeds, &[count]) => {
                self.check_range(count, 0).map(|_| {
                    self.active = count as usize;
                    Vec::new()
                })
            }
            (CommandId::SetLed, &[index, r, g, b]) => self.check_range(index, 1).map(|_| {
                self.leds[index as usize] = Color::rgb(r, g, b);
                Vec::new()
            }),
            (CommandId::SetLeds, [index, colors @ ..])
                if !colors.is_empty() && colors.len() % 3 == 0 =>
            {
                let index = *index;
                self.check_range(index, colors.len() / 3).map(|_| {
                    for (offset, rgb) in colors.chunks_exact(3).enumerate() {
                        self.leds[index as usize + offset] = Color::rgb(rgb[0], rgb[1], rgb[2]);
                    }
                    Vec::new()
                })
            }
            (CommandId::GetProtocolVersion, []) => {
                self.version.map(|version| vec![version]).ok_or(ERR_UNKNOWN_COMMAND)
            }
            (CommandId::GetLed, &[index]) => self.read_leds(index, 1),
            (CommandId::GetLeds, &[index, count]) => self.read_leds(index, count as usize),
            (CommandId::RotateLeds, &[shift])
            | (CommandId::RotateLedsWithDelay, &[shift, _]) => {
                if self.active > 0 {
                    let shift = shift as usize % self.active;
                    self.leds[..self.active].rotate_left(shift);
                }
                Ok(Vec::new())
            }
            _ => Err(ERR_WRONG_PACKET_SIZE),
        };

        match result {
            Ok(reply) => (DeviceStatus::OK, reply),
            Err(status) => (status, Vec::new()),
        }
    }

    fn check_range(&self, index: u8, count: usize) -> Result<(), DeviceStatus> {
        if index as usize + count > self.leds.len() {
            Err(ERR_INDEX_TOO_LARGE)
        } else {
            Ok(())
        }
    }

    fn read_leds(&self, index: u8, count: usize) -> Result<Vec<u8>, DeviceStatus> {
        self.check_range(index, count)?;
        let start = index as usize;
        Ok(std::iter::once(index)
            .chain(
                self.leds[start..start + count]
                    .iter()
                    .flat_map(|color| color.to_bytes()),
            )
            .collect())
    }
}

impl Read for SimulatedDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.disconnected {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "device disconnected"));
        }
        if state.outgoing.is_empty() && !buf.is_empty() {
            // Nothing more will ever arrive for this exchange.
            return Ok(0);
        }
        let n = buf.len().min(state.outgoing.len());
        for (slot, byte) in buf.iter_mut().zip(state.outgoing.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for SimulatedDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.disconnected {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device disconnected",
            ));
        }
        state.incoming.extend_from_slice(buf);
        state.process_incoming();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
