mod programs;

use std::{error::Error, fs::File, path::PathBuf};

use clap::{Parser, Subcommand};
use lightfx::Color;
use log::{info, LevelFilter};
use neopixel_bridge_client::{
    open_serial, simulate::SimulatedDevice, BridgeClient, BridgeConfig, ClientOptions,
    PortConfig, ProtocolExpectation, Transport,
};
use programs::{ProgramArgs, ProgramRegistry};
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode, WriteLogger};

type Bridge = BridgeClient<Box<dyn Transport>>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the serial device; detected when omitted
    #[arg(short, long)]
    device: Option<PathBuf>,
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Talk to an in-memory bridge with this many LEDs instead of hardware
    #[arg(long)]
    simulate: Option<u8>,
    /// Bridge firmware predates protocol version negotiation
    #[arg(long)]
    legacy: bool,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show LED capacity and protocol version
    Info,
    /// List programs
    List,
    /// Run a program
    Run {
        program: String,
        /// Comma-separated list of arguments to the program
        #[arg(short, long)]
        args: Option<String>,
    },
    Set {
        index: u8,
        color: String,
    },
    Get {
        index: u8,
        #[arg(default_value_t = 1)]
        count: u8,
    },
}

fn load_config(cli: &Cli) -> Result<BridgeConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            BridgeConfig::load(path)?
        }
        None => BridgeConfig::default(),
    };
    if let Some(device) = &cli.device {
        config.port = PortConfig::Path(device.clone());
    }
    if cli.legacy {
        config.protocol = ProtocolExpectation::Legacy;
    }
    Ok(config)
}

fn connect(cli: &Cli, config: &BridgeConfig) -> Result<Bridge, Box<dyn Error>> {
    let transport: Box<dyn Transport> = match cli.simulate {
        Some(leds) => {
            info!("Using simulated bridge with {} leds", leds);
            let device = SimulatedDevice::new(leds).with_header(config.header);
            match config.protocol {
                ProtocolExpectation::Legacy => Box::new(device.with_version(None)),
                ProtocolExpectation::Negotiate => Box::new(device),
            }
        }
        None => Box::new(open_serial(config)?),
    };
    Ok(BridgeClient::with_options(
        transport,
        ClientOptions::from(config),
    ))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    CombinedLogger::init(vec![
        TermLogger::new(
            if cli.verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(
            LevelFilter::Debug,
            Config::default(),
            File::create("bridge.log")?,
        ),
    ])?;

    let registry = ProgramRegistry::default();
    if let Commands::List = cli.command {
        for program in registry.iter() {
            println!(
                "{} - {} (args: {})",
                program.name, program.description, program.args
            );
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    let bridge = connect(&cli, &config)?;

    match &cli.command {
        Commands::List => {}
        Commands::Info => {
            let info = bridge.device_info()?;
            println!("max leds: {}", info.max_leds);
            match info.capabilities.version() {
                Some(version) => println!("protocol version: {}", version),
                None => println!("protocol version: legacy"),
            }
            println!("rotation: {:?}", info.capabilities.rotation());
        }
        Commands::Run { program, args } => {
            registry.run(program, &bridge, &ProgramArgs::parse(args.as_deref()))?;
        }
        Commands::Set { index, color } => {
            let color = Color::from_hex_str(color)
                .ok_or_else(|| format!("{color:?} is not a hex color"))?;
            bridge.set_led(*index, color)?;
        }
        Commands::Get { index, count } => {
            for (offset, color) in bridge.get_leds(*index, *count)?.iter().enumerate() {
                println!("{}: {}", *index as usize + offset, color.to_hex_string());
            }
        }
    }

    Ok(())
}
