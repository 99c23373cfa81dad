//! Sensor drivers and the capability layer the sample loop reads through.
//!
//! Drivers report failures the way the vendor libraries do (a NaN sentinel,
//! a `false` from `begin`). [`SensorSuite`] turns those into explicit
//! [`Reading`] variants so the loop matches on presence and faults instead of
//! checking sentinels inline.

pub mod sim;
pub mod traits;

#[cfg(feature = "gpio")]
pub mod gpio;

use crate::sample::pressure_hpa_from_pa;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// Re-export commonly used items
pub use traits::{BarometricSensor, ClimateSensor, RainSensor};

/// Logic level of a digital input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PinLevel {
    Low,
    High,
}

impl From<PinLevel> for u8 {
    fn from(level: PinLevel) -> Self {
        match level {
            PinLevel::Low => 0,
            PinLevel::High => 1,
        }
    }
}

impl TryFrom<u8> for PinLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PinLevel::Low),
            1 => Ok(PinLevel::High),
            other => Err(format!("invalid pin level {}", other)),
        }
    }
}

/// Outcome of reading one sensor capability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading<T> {
    /// The sensor answered with a usable value
    Present(T),
    /// The sensor was not detected at startup
    Absent,
    /// The sensor answered with the failure sentinel
    Faulted,
}

impl<T> Reading<T> {
    pub fn present(self) -> Option<T> {
        match self {
            Reading::Present(value) => Some(value),
            _ => None,
        }
    }
}

/// Validated humidity/temperature pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Climate {
    pub temperature: f32,
    pub humidity: f32,
}

/// Both rain sensor channels, unvalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RainReading {
    pub analog: u16,
    pub digital: PinLevel,
}

/// Barometer slot with its detection state cached after startup.
pub enum Barometer {
    /// Attached but not probed yet
    Pending(Box<dyn BarometricSensor>),
    /// Probed and answering
    Detected(Box<dyn BarometricSensor>),
    /// Not fitted, or did not answer the probe
    Absent,
}

impl Barometer {
    pub fn is_detected(&self) -> bool {
        matches!(self, Barometer::Detected(_))
    }
}

/// The set of sensors attached to a station.
pub struct SensorSuite {
    climate: Box<dyn ClimateSensor>,
    barometer: Barometer,
    rain: Box<dyn RainSensor>,
}

impl SensorSuite {
    /// Create a suite with a barometer that still needs probing.
    pub fn new(
        climate: Box<dyn ClimateSensor>,
        barometer: Box<dyn BarometricSensor>,
        rain: Box<dyn RainSensor>,
    ) -> Self {
        Self {
            climate,
            barometer: Barometer::Pending(barometer),
            rain,
        }
    }

    /// Create a suite for a board with no barometer fitted.
    pub fn without_barometer(climate: Box<dyn ClimateSensor>, rain: Box<dyn RainSensor>) -> Self {
        Self {
            climate,
            barometer: Barometer::Absent,
            rain,
        }
    }

    /// Probe the barometer once and cache the result.
    ///
    /// Later calls return the cached flag without touching the bus.
    pub fn detect_barometer(&mut self) -> bool {
        let barometer = std::mem::replace(&mut self.barometer, Barometer::Absent);
        self.barometer = match barometer {
            Barometer::Pending(mut driver) => {
                if driver.begin() {
                    info!("Barometric sensor detected");
                    Barometer::Detected(driver)
                } else {
                    warn!("Barometric sensor not found, reporting pressure and altitude as zero");
                    Barometer::Absent
                }
            }
            settled => settled,
        };
        self.barometer.is_detected()
    }

    pub fn barometer_detected(&self) -> bool {
        self.barometer.is_detected()
    }

    /// Read humidity then temperature; either sentinel faults the pair.
    pub fn read_climate(&mut self) -> Reading<Climate> {
        let humidity = self.climate.read_humidity();
        let temperature = self.climate.read_temperature();

        if humidity.is_nan() || temperature.is_nan() {
            debug!(humidity, temperature, "climate sensor returned NaN");
            return Reading::Faulted;
        }

        Reading::Present(Climate {
            temperature,
            humidity,
        })
    }

    /// Pressure in hPa, if the barometer was detected.
    pub fn read_pressure(&mut self) -> Reading<f32> {
        match &mut self.barometer {
            Barometer::Detected(driver) => {
                Reading::Present(pressure_hpa_from_pa(driver.read_pressure_pa()))
            }
            Barometer::Pending(_) | Barometer::Absent => Reading::Absent,
        }
    }

    pub fn read_rain(&mut self) -> RainReading {
        RainReading {
            analog: self.rain.read_analog(),
            digital: self.rain.read_digital(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::sim::{FixedBarometer, FixedClimate, FixedRain};
    use super::*;

    fn suite(climate: FixedClimate, barometer: FixedBarometer) -> SensorSuite {
        SensorSuite::new(
            Box::new(climate),
            Box::new(barometer),
            Box::new(FixedRain::new(300, PinLevel::Low)),
        )
    }

    #[test]
    fn test_nan_humidity_faults_reading() {
        let mut sensors = suite(
            FixedClimate::new(21.0, f32::NAN),
            FixedBarometer::present(101325.0),
        );
        assert!(matches!(sensors.read_climate(), Reading::Faulted));
    }

    #[test]
    fn test_nan_temperature_faults_reading() {
        let mut sensors = suite(
            FixedClimate::new(f32::NAN, 40.0),
            FixedBarometer::present(101325.0),
        );
        assert!(matches!(sensors.read_climate(), Reading::Faulted));
    }

    #[test]
    fn test_valid_climate_is_present() {
        let mut sensors = suite(FixedClimate::new(22.5, 48.3), FixedBarometer::present(101325.0));
        assert_eq!(
            sensors.read_climate(),
            Reading::Present(Climate {
                temperature: 22.5,
                humidity: 48.3
            })
        );
    }

    #[test]
    fn test_pressure_absent_until_detected() {
        let mut sensors = suite(FixedClimate::new(22.5, 48.3), FixedBarometer::present(101325.0));
        assert_eq!(sensors.read_pressure(), Reading::Absent);
        assert!(sensors.detect_barometer());
        assert_eq!(sensors.read_pressure(), Reading::Present(1013.25));
    }

    #[test]
    fn test_missing_barometer_stays_absent() {
        let mut sensors = suite(FixedClimate::new(22.5, 48.3), FixedBarometer::absent());
        assert!(!sensors.detect_barometer());
        assert!(!sensors.detect_barometer());
        assert_eq!(sensors.read_pressure(), Reading::Absent);
    }

    #[test]
    fn test_rain_channels_pass_through() {
        let mut sensors = suite(FixedClimate::new(22.5, 48.3), FixedBarometer::absent());
        let rain = sensors.read_rain();
        assert_eq!(rain.analog, 300);
        assert_eq!(rain.digital, PinLevel::Low);
    }

    #[test]
    fn test_pin_level_serialization() {
        assert_eq!(serde_json::to_string(&PinLevel::Low).unwrap(), "0");
        let level: PinLevel = serde_json::from_str("1").unwrap();
        assert_eq!(level, PinLevel::High);
        assert!(serde_json::from_str::<PinLevel>("2").is_err());
    }
}
