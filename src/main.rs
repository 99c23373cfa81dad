//! Weather Node - sample loop binary
//!
//! Runs the sample loop against simulated sensors (or a GPIO rain input),
//! writing serial lines to stdout and the display to stderr.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};
use weather_node::sensors::sim::{SimulatedBarometer, SimulatedClimate, SimulatedRain};
use weather_node::sensors::RainSensor;
use weather_node::{
    decode_line, halt, Decoded, OutputFormat, SensorSuite, SerialPort, Station,
    StationConfig, StationError, TextScreen, DEFAULT_INTERVAL_MS, SEA_LEVEL_PRESSURE_HPA,
};

#[derive(Parser)]
#[command(name = "weather_node")]
#[command(about = "Weather Node - fixed-interval weather sensor loop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    long_about = "Polls temperature/humidity, pressure and rain sensors and writes one serial line per interval"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Sampling interval in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_MS)]
    interval: u64,

    /// Serial line format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::KeyValue)]
    format: OutputFormat,

    /// Run without the status display
    #[arg(long)]
    no_display: bool,

    /// Simulate a board with no barometer fitted
    #[arg(long)]
    no_barometer: bool,

    /// Mean pressure of the simulated barometer in pascals
    #[arg(long, default_value_t = SEA_LEVEL_PRESSURE_HPA * 100.0)]
    base_pressure: f32,

    /// Halt at startup if the barometer is not detected
    #[arg(long)]
    require_barometer: bool,

    /// Make every Nth humidity/temperature read fail (0 disables)
    #[arg(long, default_value_t = 0)]
    fault_every: u64,

    /// Read the rain sensor's digital output from this BCM pin
    #[cfg(feature = "gpio")]
    #[arg(long)]
    rain_pin: Option<u8>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sample loop (default)
    Run,

    /// Take a single sample immediately and exit
    Sample,

    /// Decode serial lines from stdin and print them as JSON records
    Monitor(MonitorArgs),
}

#[derive(Args)]
struct MonitorArgs {
    /// Pretty-print decoded records
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Run) | None => run_command(&cli).await?,
        Some(Commands::Sample) => sample_command(&cli).await?,
        Some(Commands::Monitor(args)) => monitor_command(args).await?,
    }

    Ok(())
}

fn log_level(cli: &Cli) -> LevelFilter {
    if cli.debug {
        LevelFilter::DEBUG
    } else if cli.verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    }
}

/// `RUST_LOG` directives win over the flag level when set.
fn log_filter(level: LevelFilter, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives.unwrap_or_default())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(log_level(cli), directives.as_deref());

    // stdout is the serial channel
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    Ok(())
}

fn print_banner() {
    eprintln!("Weather Node");
    eprintln!("   Version: {}", env!("CARGO_PKG_VERSION"));
    eprintln!();
}

fn build_config(cli: &Cli) -> StationConfig {
    StationConfig::default()
        .with_interval(cli.interval)
        .with_format(cli.format)
        .with_required_barometer(cli.require_barometer)
}

fn build_rain_sensor(cli: &Cli) -> anyhow::Result<Box<dyn RainSensor>> {
    #[cfg(feature = "gpio")]
    {
        if let Some(pin) = cli.rain_pin {
            info!("Reading rain sensor from BCM pin {}", pin);
            let sensor = weather_node::GpioRainSensor::new(pin)?;
            return Ok(Box::new(sensor));
        }
    }

    #[cfg(not(feature = "gpio"))]
    let _ = cli;

    Ok(Box::new(SimulatedRain::default()))
}

fn build_station(cli: &Cli) -> anyhow::Result<Station> {
    let climate = Box::new(SimulatedClimate::default().with_fault_every(cli.fault_every));
    let rain = build_rain_sensor(cli)?;

    let sensors = if cli.no_barometer {
        SensorSuite::without_barometer(climate, rain)
    } else {
        let barometer = SimulatedBarometer::default().with_base_pressure(cli.base_pressure);
        SensorSuite::new(climate, Box::new(barometer), rain)
    };

    let mut station = Station::new(build_config(cli), sensors);
    if cli.no_display {
        info!("Display disabled");
    } else {
        station = station.with_screen(Box::new(TextScreen::new(std::io::stderr())));
    }

    Ok(station)
}

/// Bring the station up, parking forever on a fatal startup failure.
async fn start_station(cli: &Cli) -> anyhow::Result<Option<Station>> {
    let mut station = build_station(cli)?;

    match station.init() {
        Ok(()) => Ok(Some(station)),
        Err(e) if e.is_fatal() => {
            error!("{}", e);
            match e {
                StationError::DisplayInit(_) => eprintln!("SSD1306 allocation failed"),
                _ => eprintln!("Could not find a valid BMP sensor, check wiring!"),
            }
            halt().await;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_command(cli: &Cli) -> anyhow::Result<()> {
    print_banner();

    let Some(mut station) = start_station(cli).await? else {
        return Ok(());
    };

    let mut serial = SerialPort::new(tokio::io::stdout());
    station
        .run(&mut serial)
        .await
        .context("serial output failed")?;

    Ok(())
}

async fn sample_command(cli: &Cli) -> anyhow::Result<()> {
    let Some(mut station) = start_station(cli).await? else {
        return Ok(());
    };

    let emission = station.run_cycle()?;
    let mut serial = SerialPort::new(tokio::io::stdout());
    serial.write_line(emission.line()).await?;

    Ok(())
}

async fn monitor_command(args: &MonitorArgs) -> anyhow::Result<()> {
    info!("Decoding serial lines from stdin");

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut records = 0u64;
    let mut faults = 0u64;

    while let Some(line) = lines.next().await {
        let line = line.context("failed to read from stdin")?;
        let record = match decode_line(&line) {
            Decoded::Sample(reading) => to_json(&reading, args.pretty)?,
            Decoded::KeyValue(reading) => to_json(&reading, args.pretty)?,
            Decoded::SensorFault => {
                faults += 1;
                warn!("Device reported a humidity/temperature read failure");
                continue;
            }
            Decoded::Empty => continue,
            Decoded::Unrecognized(text) => {
                debug!("non-sample line: {}", text);
                continue;
            }
        };
        records += 1;
        println!("{}", record);
    }

    info!("Decoded {} records, {} sensor faults", records, faults);
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
