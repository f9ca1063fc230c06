use std::{collections::HashMap, thread, time::Duration};

use lightfx::{Color, Frame};
use log::info;
use neopixel_bridge_client::{BridgeClient, BridgeError, Transport};
use thiserror::Error;

const RAINBOW_STEP: Duration = Duration::from_millis(100);
const RAINBOW_BRIGHTNESS: f64 = 0.2;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("unknown program {name}, select one of: {available}")]
    UnknownProgram { name: String, available: String },

    #[error("device reports no LEDs")]
    NoLeds,
}

/// `key=value` pairs given with `--args`; a bare `key` has no value.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProgramArgs(HashMap<String, Option<String>>);

impl ProgramArgs {
    pub fn parse(args: Option<&str>) -> Self {
        Self(
            args.into_iter()
                .flat_map(|args| args.split(','))
                .filter(|arg| !arg.is_empty())
                .map(|arg| match arg.split_once('=') {
                    Some((key, value)) => (key.to_owned(), Some(value.to_owned())),
                    None => (arg.to_owned(), None),
                })
                .collect(),
        )
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|value| value.as_deref())
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str, default: T) -> Result<T, ProgramError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| ProgramError::InvalidArgument {
                name: name.to_owned(),
                reason: format!("cannot parse {value:?}"),
            }),
        }
    }
}

type Run<T> = fn(&BridgeClient<T>, &ProgramArgs) -> Result<(), ProgramError>;

pub struct Program<T: Transport> {
    pub name: &'static str,
    pub description: &'static str,
    pub args: &'static str,
    run: Run<T>,
}

/// Demo programs, built once at startup and looked up by name.
pub struct ProgramRegistry<T: Transport> {
    programs: Vec<Program<T>>,
}

impl<T: Transport> Default for ProgramRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> ProgramRegistry<T> {
    pub fn new() -> Self {
        Self {
            programs: vec![
                Program {
                    name: "fill",
                    description: "set every led to one color",
                    args: "color=#rrggbb",
                    run: fill,
                },
                Program {
                    name: "off",
                    description: "turn all leds off",
                    args: "",
                    run: off,
                },
                Program {
                    name: "rainbow",
                    description: "show a rainbow",
                    args: "rotate=x",
                    run: rainbow,
                },
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Program<T>> {
        self.programs.iter()
    }

    pub fn get(&self, name: &str) -> Result<&Program<T>, ProgramError> {
        self.programs
            .iter()
            .find(|program| program.name == name)
            .ok_or_else(|| ProgramError::UnknownProgram {
                name: name.to_owned(),
                available: self
                    .programs
                    .iter()
                    .map(|program| program.name)
                    .collect::<Vec<_>>()
                    .join(","),
            })
    }

    pub fn run(
        &self,
        name: &str,
        client: &BridgeClient<T>,
        args: &ProgramArgs,
    ) -> Result<(), ProgramError> {
        let program = self.get(name)?;
        info!("Running program {} - {}", program.name, program.description);
        (program.run)(client, args)
    }
}

fn strip_len<T: Transport>(client: &BridgeClient<T>) -> Result<usize, ProgramError> {
    match client.get_max_leds()? {
        0 => Err(ProgramError::NoLeds),
        n => Ok(n as usize),
    }
}

fn fill<T: Transport>(client: &BridgeClient<T>, args: &ProgramArgs) -> Result<(), ProgramError> {
    let color = match args.get("color") {
        None => Color::white(),
        Some(code) => Color::from_hex_str(code).ok_or_else(|| ProgramError::InvalidArgument {
            name: "color".into(),
            reason: format!("{code:?} is not a hex color"),
        })?,
    };
    let frame = Frame::new(strip_len(client)?, color);
    client.display(0, frame.pixels())?;
    Ok(())
}

fn off<T: Transport>(client: &BridgeClient<T>, _args: &ProgramArgs) -> Result<(), ProgramError> {
    let frame = Frame::new_black(strip_len(client)?);
    client.display(0, frame.pixels())?;
    Ok(())
}

/// Spreads the hue wheel over the strip, then turns it `rotate` full times.
fn rainbow<T: Transport>(client: &BridgeClient<T>, args: &ProgramArgs) -> Result<(), ProgramError> {
    let n = strip_len(client)?;
    let turns: usize = args.parsed("rotate", 0)?;

    let mut frame: Frame = (0..n)
        .map(|i| Color::hsv(i as f64 / n as f64, 1.0, RAINBOW_BRIGHTNESS))
        .collect();
    client.display(0, frame.pixels())?;

    for _ in 0..turns * n {
        thread::sleep(RAINBOW_STEP);
        client.rotate(&mut frame, 1)?;
    }
    Ok(())
}
