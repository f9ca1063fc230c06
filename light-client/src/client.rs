use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    thread,
    time::Duration,
};

use itertools::Itertools;
use lightfx::{Color, Frame};
use log::{debug, info, warn};
use serialport::SerialPort;

use crate::{
    capability::{Capabilities, ProtocolExpectation, RotationStrategy, KNOWN_PROTOCOL_VERSION},
    codec::{self, HeaderLayout, Response},
    command::CommandId,
    config::BridgeConfig,
    transport::{self, Transport},
    BridgeError,
};

/// Highest LED index plus one.
pub const ADDRESSABLE_LEDS: usize = 256;

/// `get_leds` answers with `index + 3 * count` payload bytes, which has to
/// fit the single length byte.
pub const MAX_LEDS_PER_RESPONSE: u8 = ((codec::MAX_PAYLOAD_LEN - 1) / 3) as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub protocol: ProtocolExpectation,
    pub header: HeaderLayout,
    /// Largest run `display` packs into a single `set_leds` frame.
    pub max_leds_per_frame: u8,
    /// How long the transport waits for a reply. A device-side delayed
    /// rotation has to finish inside it.
    pub read_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl From<&BridgeConfig> for ClientOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            protocol: config.protocol,
            header: config.header,
            max_leds_per_frame: config.max_leds_per_frame,
            read_timeout: config.timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub max_leds: u8,
    pub capabilities: Capabilities,
}

struct Session<T> {
    transport: T,
    broken: bool,
}

impl<T: Transport> Session<T> {
    fn round_trip(&mut self, request: &[u8], header: HeaderLayout) -> Result<Response, BridgeError> {
        self.transport
            .write_all(request)
            .and_then(|_| self.transport.flush())
            .map_err(BridgeError::from_write)?;
        header.decode_response(&mut self.transport)
    }
}

/// One session with a bridge device.
///
/// The client owns the transport for its whole life and serializes exchanges:
/// a request is written, flushed and its response fully consumed before the
/// next request may start. Dropping the client closes the transport.
pub struct BridgeClient<T: Transport> {
    session: Mutex<Session<T>>,
    capabilities: Mutex<Option<Capabilities>>,
    options: ClientOptions,
}

impl BridgeClient<Box<dyn SerialPort>> {
    pub fn open(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let port = transport::open_serial(config)?;
        Ok(Self::with_options(port, ClientOptions::from(config)))
    }
}

impl<T: Transport> BridgeClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, ClientOptions::default())
    }

    pub fn with_options(transport: T, options: ClientOptions) -> Self {
        debug!("Starting bridge session with {:?}", options);
        Self {
            session: Mutex::new(Session {
                transport,
                broken: false,
            }),
            capabilities: Mutex::new(None),
            options,
        }
    }

    /// Ends the session and hands the transport back.
    pub fn into_transport(self) -> T {
        self.session
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .transport
    }

    pub fn get_max_leds(&self) -> Result<u8, BridgeError> {
        let payload = self.exchange(CommandId::GetMaxLeds, &[])?;
        decode_byte(CommandId::GetMaxLeds, &payload)
    }

    pub fn set_num_leds(&self, count: u8) -> Result<(), BridgeError> {
        self.acknowledge(CommandId::SetNumLeds, &[count])
    }

    pub fn set_led(&self, index: u8, color: Color) -> Result<(), BridgeError> {
        self.acknowledge(CommandId::SetLed, &[index, color.r, color.g, color.b])
    }

    /// Sets a contiguous run of LEDs starting at `index`, in order.
    pub fn set_leds(&self, index: u8, colors: &[Color]) -> Result<(), BridgeError> {
        check_run(index, colors.len())?;
        let payload: Vec<u8> = std::iter::once(index)
            .chain(colors.iter().flat_map(|color| color.to_bytes()))
            .collect();
        self.acknowledge(CommandId::SetLeds, &payload)
    }

    /// Answered from the negotiated capabilities when they are known,
    /// otherwise asked once and cached.
    pub fn get_protocol_version(&self) -> Result<u8, BridgeError> {
        let mut cached = self.capabilities()?;
        if let Some(version) = (*cached).and_then(|capabilities| capabilities.version()) {
            return Ok(version);
        }
        let version = self.query_protocol_version()?;
        *cached = Some(Capabilities::from_version(version));
        Ok(version)
    }

    pub fn get_led(&self, index: u8) -> Result<Color, BridgeError> {
        let payload = self.exchange(CommandId::GetLed, &[index])?;
        let mut leds = decode_leds(CommandId::GetLed, index, 1, &payload)?;
        leds.pop()
            .ok_or_else(|| BridgeError::framing("get_led returned no LED"))
    }

    /// Reads `count` LEDs starting at `index`, ordered by strip position.
    pub fn get_leds(&self, index: u8, count: u8) -> Result<Vec<Color>, BridgeError> {
        if count > MAX_LEDS_PER_RESPONSE {
            return Err(BridgeError::encoding(format!(
                "cannot read {count} LEDs in one response, at most {MAX_LEDS_PER_RESPONSE}"
            )));
        }
        check_run(index, count as usize)?;
        let payload = self.exchange(CommandId::GetLeds, &[index, count])?;
        decode_leds(CommandId::GetLeds, index, count as usize, &payload)
    }

    /// Device-side rotation. Fails before sending anything when the device
    /// does not implement it; see [`BridgeClient::rotate`] for the variant
    /// that falls back to resending the strip.
    pub fn rotate_leds(&self, shift: u8) -> Result<(), BridgeError> {
        self.require(CommandId::RotateLeds)?;
        self.acknowledge(CommandId::RotateLeds, &[shift])
    }

    pub fn rotate_leds_with_delay(&self, shift: u8, delay_ms: u8) -> Result<(), BridgeError> {
        self.require(CommandId::RotateLedsWithDelay)?;
        self.acknowledge(CommandId::RotateLedsWithDelay, &[shift, delay_ms])
    }

    /// Negotiated capabilities, queried from the device at most once per
    /// session.
    pub fn negotiate(&self) -> Result<Capabilities, BridgeError> {
        let mut cached = self.capabilities()?;
        if let Some(capabilities) = *cached {
            return Ok(capabilities);
        }

        let capabilities = match self.options.protocol {
            ProtocolExpectation::Legacy => {
                info!("Assuming legacy bridge firmware, not querying protocol version");
                Capabilities::legacy()
            }
            ProtocolExpectation::Negotiate => {
                let version = self.query_protocol_version()?;
                if version == KNOWN_PROTOCOL_VERSION {
                    info!("Bridge speaks protocol version {}", version);
                } else {
                    warn!(
                        "Bridge speaks protocol version {}, this client knows version {}",
                        version, KNOWN_PROTOCOL_VERSION
                    );
                }
                Capabilities::from_version(version)
            }
        };
        debug!("Rotation strategy: {:?}", capabilities.rotation());

        *cached = Some(capabilities);
        Ok(capabilities)
    }

    pub fn device_info(&self) -> Result<DeviceInfo, BridgeError> {
        let capabilities = self.negotiate()?;
        let max_leds = self.get_max_leds()?;
        Ok(DeviceInfo {
            max_leds,
            capabilities,
        })
    }

    /// Writes a run of any length starting at `index`, split into as many
    /// `set_leds` frames as the per-frame budget requires.
    pub fn display(&self, index: u8, colors: &[Color]) -> Result<(), BridgeError> {
        if self.options.max_leds_per_frame == 0 {
            return Err(BridgeError::encoding("max_leds_per_frame must be at least 1"));
        }
        check_run(index, colors.len())?;

        let per_frame = self.options.max_leds_per_frame as usize;
        for (chunk_index, chunk) in colors.chunks(per_frame).enumerate() {
            let start = index as usize + chunk_index * per_frame;
            self.set_leds(start as u8, chunk)?;
        }
        Ok(())
    }

    /// Shifts the strip `shift` positions towards index 0 and keeps `frame`,
    /// the host copy of the strip starting at index 0, in step with it.
    ///
    /// Uses `rotate_leds` when the device supports it, otherwise resends
    /// `frame` once per single-position step. Either way only the first
    /// `frame.len()` LEDs move: the device-side path first sets the active
    /// count to the frame length, and that count stays in effect afterwards.
    pub fn rotate(&self, frame: &mut Frame, shift: u8) -> Result<(), BridgeError> {
        match self.negotiate()?.rotation() {
            RotationStrategy::Hardware => {
                self.set_num_leds(active_count(frame)?)?;
                self.rotate_leds(shift)?;
                frame.rotate(shift as usize);
            }
            RotationStrategy::Software => {
                for _ in 0..shift {
                    frame.rotate(1);
                    self.display(0, frame.pixels())?;
                }
            }
        }
        Ok(())
    }

    /// Like [`BridgeClient::rotate`], pausing `delay` between single steps.
    ///
    /// On the device the whole rotation runs inside one exchange, so
    /// `shift * delay` must stay under the read timeout and `delay` under
    /// 256ms.
    pub fn rotate_with_delay(
        &self,
        frame: &mut Frame,
        shift: u8,
        delay: Duration,
    ) -> Result<(), BridgeError> {
        match self.negotiate()?.delayed_rotation() {
            RotationStrategy::Hardware => {
                let delay_ms = u8::try_from(delay.as_millis()).map_err(|_| {
                    BridgeError::encoding(format!(
                        "device-side delay of {}ms exceeds 255ms",
                        delay.as_millis()
                    ))
                })?;
                let total = delay.saturating_mul(shift as u32);
                if total >= self.options.read_timeout {
                    return Err(BridgeError::encoding(format!(
                        "rotating {shift} steps {}ms apart takes {}ms, past the {}ms read timeout",
                        delay.as_millis(),
                        total.as_millis(),
                        self.options.read_timeout.as_millis()
                    )));
                }
                self.set_num_leds(active_count(frame)?)?;
                self.rotate_leds_with_delay(shift, delay_ms)?;
                frame.rotate(shift as usize);
            }
            RotationStrategy::Software => {
                for step in 0..shift {
                    if step > 0 {
                        thread::sleep(delay);
                    }
                    frame.rotate(1);
                    self.display(0, frame.pixels())?;
                }
            }
        }
        Ok(())
    }

    fn require(&self, command: CommandId) -> Result<(), BridgeError> {
        let capabilities = self.negotiate()?;
        if capabilities.supports(command) {
            Ok(())
        } else {
            Err(BridgeError::encoding(match capabilities.version() {
                Some(version) => format!("{command} is not supported by protocol version {version}"),
                None => format!("{command} is not supported by legacy firmware"),
            }))
        }
    }

    fn query_protocol_version(&self) -> Result<u8, BridgeError> {
        if self.options.protocol == ProtocolExpectation::Legacy {
            return Err(BridgeError::encoding(
                "get_protocol_version is not available on legacy firmware",
            ));
        }
        let payload = self.exchange(CommandId::GetProtocolVersion, &[])?;
        decode_byte(CommandId::GetProtocolVersion, &payload)
    }

    fn capabilities(&self) -> Result<MutexGuard<'_, Option<Capabilities>>, BridgeError> {
        self.capabilities
            .lock()
            .map_err(|_| BridgeError::Transport {
                reason: "capability cache poisoned by a panicking caller".into(),
            })
    }

    fn acknowledge(&self, command: CommandId, payload: &[u8]) -> Result<(), BridgeError> {
        let response = self.exchange(command, payload)?;
        check_len(command, &response, 0)
    }

    /// One full request/response exchange, holding the session for its whole
    /// duration.
    fn exchange(&self, command: CommandId, payload: &[u8]) -> Result<Vec<u8>, BridgeError> {
        command.spec().check_request(payload)?;
        let request = codec::encode(command, payload)?;

        let mut session = self.session.lock().map_err(|_| BridgeError::Transport {
            reason: "session poisoned by a panicking caller".into(),
        })?;
        if session.broken {
            return Err(BridgeError::Transport {
                reason: "session is unusable after an earlier transport failure, reopen it".into(),
            });
        }

        debug!("{} -> {}", command, hex(&request));
        let result = session
            .round_trip(&request, self.options.header)
            .and_then(|response| response.into_payload(command));

        match &result {
            Ok(response) => debug!("{} <- {}", command, hex(response)),
            Err(error @ BridgeError::Transport { .. }) => {
                session.broken = true;
                warn!("{}: {}; session closed to further commands", command, error);
            }
            Err(error @ BridgeError::Framing { .. }) => {
                warn!("{}: {}; the stream may be out of sync", command, error);
            }
            Err(error) => debug!("{}: {}", command, error),
        }
        result
    }
}

fn check_run(index: u8, len: usize) -> Result<(), BridgeError> {
    if index as usize + len > ADDRESSABLE_LEDS {
        Err(BridgeError::encoding(format!(
            "{len} LEDs starting at index {index} run past the last addressable LED"
        )))
    } else {
        Ok(())
    }
}

fn active_count(frame: &Frame) -> Result<u8, BridgeError> {
    u8::try_from(frame.len()).map_err(|_| {
        BridgeError::encoding(format!(
            "cannot rotate a frame of {} LEDs on the device",
            frame.len()
        ))
    })
}

fn check_len(command: CommandId, payload: &[u8], leds: usize) -> Result<(), BridgeError> {
    let expected = command.spec().response.expected_len(leds);
    if payload.len() == expected {
        Ok(())
    } else {
        Err(BridgeError::framing(format!(
            "{command} answered with {} payload bytes, expected {expected}",
            payload.len()
        )))
    }
}

fn decode_byte(command: CommandId, payload: &[u8]) -> Result<u8, BridgeError> {
    check_len(command, payload, 0)?;
    Ok(payload[0])
}

fn decode_leds(
    command: CommandId,
    index: u8,
    count: usize,
    payload: &[u8],
) -> Result<Vec<Color>, BridgeError> {
    check_len(command, payload, count)?;
    if payload[0] != index {
        return Err(BridgeError::framing(format!(
            "{command} echoed index {}, requested {index}",
            payload[0]
        )));
    }
    Ok(payload[1..]
        .chunks_exact(3)
        .map(|rgb| Color::rgb(rgb[0], rgb[1], rgb[2]))
        .collect())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).join(" ")
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        io::{self, Read, Write},
    };

    use super::*;
    use crate::ErrorKind;

    /// Records requests and replays canned response bytes.
    struct Scripted {
        written: Vec<u8>,
        replies: VecDeque<u8>,
        when_drained: io::ErrorKind,
    }

    impl Scripted {
        fn new(replies: &[u8]) -> Self {
            Self {
                written: Vec::new(),
                replies: replies.iter().copied().collect(),
                when_drained: io::ErrorKind::UnexpectedEof,
            }
        }

        fn timing_out(mut self) -> Self {
            self.when_drained = io::ErrorKind::TimedOut;
            self
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.replies.is_empty() && !buf.is_empty() {
                return match self.when_drained {
                    io::ErrorKind::UnexpectedEof => Ok(0),
                    kind => Err(io::Error::new(kind, "no reply")),
                };
            }
            let n = buf.len().min(self.replies.len());
            for (slot, byte) in buf.iter_mut().zip(self.replies.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn legacy() -> ClientOptions {
        ClientOptions {
            protocol: ProtocolExpectation::Legacy,
            ..ClientOptions::default()
        }
    }

    #[test]
    fn get_led_exchange() {
        let client = BridgeClient::new(Scripted::new(&[0x85, 4, 0, 1, 0x30, 0x00, 0x00]));
        assert_eq!(client.get_led(1).unwrap(), Color::rgb(0x30, 0, 0));
        assert_eq!(client.into_transport().written, vec![0xfd, 5, 1, 1]);
    }

    #[test]
    fn set_leds_flattens_in_order() {
        let client = BridgeClient::new(Scripted::new(&[0x83, 0, 0]));
        client
            .set_leds(2, &[Color::rgb(1, 2, 3), Color::rgb(4, 5, 6)])
            .unwrap();
        assert_eq!(
            client.into_transport().written,
            vec![0xfd, 3, 7, 2, 1, 2, 3, 4, 5, 6]
        );
    }

    #[test]
    fn get_leds_keeps_order() {
        let client = BridgeClient::new(Scripted::new(&[
            0x86, 7, 0, 10, 1, 1, 1, 2, 2, 2,
        ]));
        assert_eq!(
            client.get_leds(10, 2).unwrap(),
            vec![Color::gray(1), Color::gray(2)]
        );
        assert_eq!(client.into_transport().written, vec![0xfd, 6, 2, 10, 2]);
    }

    #[test]
    fn command_error_leaves_session_usable() {
        let client = BridgeClient::new(Scripted::new(&[0x82, 0, 7, 0x80, 1, 0, 60]));
        let err = client.set_led(200, Color::white()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Command);
        assert_eq!(err.command_status(), Some((2, 7)));
        assert_eq!(client.get_max_leds().unwrap(), 60);
    }

    #[test]
    fn truncated_response_is_framing_error() {
        let client = BridgeClient::new(Scripted::new(&[0x86, 10, 0, 3, 1]));
        let err = client.get_leds(3, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Framing);
    }

    #[test]
    fn unexpected_payload_shape_is_framing_error() {
        let client = BridgeClient::new(Scripted::new(&[0x80, 2, 0, 1, 2, 0x81, 1, 0, 9]));
        assert_eq!(
            client.get_max_leds().unwrap_err().kind(),
            ErrorKind::Framing
        );
        assert_eq!(
            client.set_num_leds(4).unwrap_err().kind(),
            ErrorKind::Framing
        );
    }

    #[test]
    fn wrong_echoed_index_is_framing_error() {
        let client = BridgeClient::new(Scripted::new(&[0x85, 4, 0, 2, 1, 2, 3]));
        assert_eq!(client.get_led(1).unwrap_err().kind(), ErrorKind::Framing);
    }

    #[test]
    fn timeout_breaks_session() {
        let client = BridgeClient::new(Scripted::new(&[]).timing_out());
        assert_eq!(
            client.get_max_leds().unwrap_err().kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            client.get_max_leds().unwrap_err().kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            client.into_transport().written,
            vec![0xfd, 0, 0],
            "nothing is sent once the session is broken"
        );
    }

    #[test]
    fn invalid_requests_are_not_sent() {
        let client = BridgeClient::new(Scripted::new(&[]));
        let too_many = vec![Color::black(); 85];
        assert_eq!(
            client.set_leds(0, &too_many).unwrap_err().kind(),
            ErrorKind::Encoding
        );
        assert_eq!(
            client
                .set_leds(250, &[Color::black(); 10])
                .unwrap_err()
                .kind(),
            ErrorKind::Encoding
        );
        assert_eq!(
            client.set_leds(0, &[]).unwrap_err().kind(),
            ErrorKind::Encoding
        );
        assert_eq!(
            client.get_leds(0, 85).unwrap_err().kind(),
            ErrorKind::Encoding
        );
        assert!(client.into_transport().written.is_empty());
    }

    #[test]
    fn largest_single_frame_is_accepted() {
        let client = BridgeClient::new(Scripted::new(&[0x83, 0, 0]));
        client.set_leds(0, &[Color::white(); 84]).unwrap();
        let written = client.into_transport().written;
        assert_eq!(written.len(), 3 + 253);
        assert_eq!(written[2], 253);
    }

    #[test]
    fn negotiation_happens_once() {
        let client = BridgeClient::new(Scripted::new(&[0x84, 1, 0, 3]));
        assert_eq!(client.negotiate().unwrap().version(), Some(3));
        assert_eq!(client.negotiate().unwrap().version(), Some(3));
        assert_eq!(client.into_transport().written, vec![0xfd, 4, 0]);
    }

    #[test]
    fn explicit_version_query_fills_cache() {
        let client = BridgeClient::new(Scripted::new(&[0x84, 1, 0, 4]));
        assert_eq!(client.get_protocol_version().unwrap(), 4);
        assert_eq!(client.get_protocol_version().unwrap(), 4);
        assert!(client.negotiate().unwrap().is_known_current());
        assert_eq!(client.into_transport().written, vec![0xfd, 4, 0]);
    }

    #[test]
    fn version_comes_from_negotiated_capabilities() {
        let client = BridgeClient::new(Scripted::new(&[0x84, 1, 0, 3]));
        assert_eq!(client.negotiate().unwrap().version(), Some(3));
        assert_eq!(client.get_protocol_version().unwrap(), 3);
        assert_eq!(client.into_transport().written, vec![0xfd, 4, 0]);
    }

    #[test]
    fn legacy_sessions_never_query_version() {
        let client = BridgeClient::with_options(Scripted::new(&[]), legacy());
        assert_eq!(client.negotiate().unwrap(), Capabilities::legacy());
        assert_eq!(
            client.get_protocol_version().unwrap_err().kind(),
            ErrorKind::Encoding
        );
        assert_eq!(
            client.rotate_leds(1).unwrap_err().kind(),
            ErrorKind::Encoding
        );
        assert!(client.into_transport().written.is_empty());
    }

    #[test]
    fn old_firmware_rotates_in_software() {
        let client = BridgeClient::new(Scripted::new(&[0x84, 1, 0, 2, 0x83, 0, 0]));
        let mut frame: Frame = vec![Color::gray(1), Color::gray(2)].into();
        client.rotate(&mut frame, 1).unwrap();
        assert_eq!(frame.pixels(), &[Color::gray(2), Color::gray(1)]);
        assert_eq!(
            client.into_transport().written,
            vec![0xfd, 4, 0, 0xfd, 3, 7, 0, 2, 2, 2, 1, 1, 1]
        );
    }

    #[test]
    fn new_firmware_rotates_on_device() {
        let client = BridgeClient::new(Scripted::new(&[
            0x84, 1, 0, 3, 0x81, 0, 0, 0x87, 0, 0,
        ]));
        let mut frame: Frame = vec![Color::gray(1), Color::gray(2), Color::gray(3)].into();
        client.rotate(&mut frame, 2).unwrap();
        assert_eq!(
            frame.pixels(),
            &[Color::gray(3), Color::gray(1), Color::gray(2)]
        );
        assert_eq!(
            client.into_transport().written,
            vec![0xfd, 4, 0, 0xfd, 1, 1, 3, 0xfd, 7, 1, 2],
            "the active count is set to the frame length before rotating"
        );
    }

    #[test]
    fn delayed_rotation_rejects_long_device_delay() {
        let client = BridgeClient::new(Scripted::new(&[0x84, 1, 0, 4]));
        let mut frame = Frame::new_black(3);
        let err = client
            .rotate_with_delay(&mut frame, 1, Duration::from_millis(300))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert_eq!(client.into_transport().written, vec![0xfd, 4, 0]);
    }

    #[test]
    fn delayed_rotation_must_finish_within_read_timeout() {
        let client = BridgeClient::new(Scripted::new(&[
            0x84, 1, 0, 4, 0x81, 0, 0, 0x88, 0, 0,
        ]));
        let mut frame: Frame = vec![Color::gray(1), Color::gray(2), Color::gray(3)].into();

        let err = client
            .rotate_with_delay(&mut frame, 5, Duration::from_millis(250))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert_eq!(frame.pixels()[0], Color::gray(1), "frame untouched on error");

        client
            .rotate_with_delay(&mut frame, 3, Duration::from_millis(250))
            .unwrap();
        assert_eq!(
            client.into_transport().written,
            vec![0xfd, 4, 0, 0xfd, 1, 1, 3, 0xfd, 8, 2, 3, 250]
        );
    }

    #[test]
    fn read_timeout_follows_config() {
        let config = BridgeConfig {
            timeout_ms: 2000,
            ..BridgeConfig::default()
        };
        let client = BridgeClient::with_options(
            Scripted::new(&[0x84, 1, 0, 4, 0x81, 0, 0, 0x88, 0, 0]),
            ClientOptions::from(&config),
        );
        let mut frame = Frame::new_black(2);
        client
            .rotate_with_delay(&mut frame, 5, Duration::from_millis(250))
            .unwrap();
    }

    #[test]
    fn display_splits_long_runs() {
        let options = ClientOptions {
            max_leds_per_frame: 2,
            ..ClientOptions::default()
        };
        let client = BridgeClient::with_options(
            Scripted::new(&[0x83, 0, 0, 0x83, 0, 0]),
            options,
        );
        client
            .display(5, &[Color::gray(1), Color::gray(2), Color::gray(3)])
            .unwrap();
        assert_eq!(
            client.into_transport().written,
            vec![0xfd, 3, 7, 5, 1, 1, 1, 2, 2, 2, 0xfd, 3, 4, 7, 3, 3, 3]
        );
    }

    #[test]
    fn status_first_header() {
        let options = ClientOptions {
            header: HeaderLayout::StatusFirst,
            ..legacy()
        };
        let client = BridgeClient::with_options(Scripted::new(&[0, 1, 16, 5, 0]), options);
        assert_eq!(client.get_max_leds().unwrap(), 16);
        assert_eq!(
            client.set_led(20, Color::white()).unwrap_err().command_status(),
            Some((2, 5))
        );
    }
}
