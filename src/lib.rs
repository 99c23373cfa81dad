//! # Weather Node - fixed-interval weather sensor loop
//!
//! Polls a temperature/humidity sensor, a barometric pressure sensor and a
//! rain sensor once per interval, optionally draws a summary on a small text
//! display, and writes every sample as a single line to a serial stream.
//!
//! ## Features
//!
//! - **Interval polling**: non-blocking interval check against a monotonic clock
//! - **Explicit sensor capabilities**: present, absent and faulted readings
//! - **Two line formats**: `T=..,H=..,P=..,R=..` text or a JSON object
//! - **Line decoding**: parse the emitted lines back on the receiving side
//! - **GPIO rain input**: Raspberry Pi digital pin via rppal (feature-gated)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use weather_node::{SensorSuite, SerialPort, Station, StationConfig};
//! use weather_node::sensors::sim::{SimulatedBarometer, SimulatedClimate, SimulatedRain};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sensors = SensorSuite::new(
//!         Box::new(SimulatedClimate::default()),
//!         Box::new(SimulatedBarometer::default()),
//!         Box::new(SimulatedRain::default()),
//!     );
//!     let mut station = Station::new(StationConfig::default(), sensors);
//!     station.init()?;
//!
//!     let mut serial = SerialPort::new(tokio::io::stdout());
//!     station.run(&mut serial).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod sample;
pub mod screen;
pub mod sensors;
pub mod station;

// Re-export public API
pub use config::{OutputFormat, StationConfig};
pub use error::{Result, StationError};
pub use protocol::{decode_line, encode_line, Decoded, DecodedReading, SerialPort};
pub use sample::{RainStatus, Sample};
pub use screen::{Frame, Screen, TextScreen};
pub use sensors::{PinLevel, Reading, SensorSuite};
pub use station::{halt, Clock, Emission, ManualClock, MonotonicClock, Station};

#[cfg(feature = "gpio")]
pub use sensors::gpio::GpioRainSensor;

/// The default sampling interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 5000;

/// How often the loop re-checks whether the interval has elapsed
pub const DEFAULT_TICK_MS: u64 = 50;

/// Sea-level reference pressure used for altitude derivation, in hPa
pub const SEA_LEVEL_PRESSURE_HPA: f32 = 1013.25;

/// Line emitted instead of a sample when the humidity/temperature read fails
pub const DHT_ERROR_LINE: &str = "Failed to read from DHT sensor!";

/// Title shown on the first display row
pub const DEFAULT_TITLE: &str = "Weather Station";
