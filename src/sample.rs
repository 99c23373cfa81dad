//! The per-interval sample and its unit conversions.

use crate::sensors::{Climate, PinLevel, RainReading};
use serde::{Deserialize, Serialize, Serializer};

/// Full scale of the 10 bit rain sensor ADC.
pub const ADC_FULL_SCALE: u16 = 1023;

/// Rainfall reported at ADC full scale, in millimeters.
pub const RAINFALL_FULL_SCALE_MM: f32 = 10.0;

/// One complete set of readings captured in a single interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since boot
    pub timestamp: u64,
    /// Temperature in Celsius
    #[serde(serialize_with = "serialize_tenth")]
    pub temperature: f32,
    /// Relative humidity in percent
    #[serde(serialize_with = "serialize_tenth")]
    pub humidity: f32,
    /// Barometric pressure in hPa (0 when no barometer)
    #[serde(serialize_with = "serialize_tenth")]
    pub pressure: f32,
    /// Altitude in meters derived from pressure (0 when no barometer)
    #[serde(serialize_with = "serialize_tenth")]
    pub altitude: f32,
    /// Raw analog rain reading
    pub rain_value: u16,
    /// Digital rain channel; LOW means wet
    pub rain_digital: PinLevel,
}

/// Wet/dry state derived from the rain sensor's digital channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RainStatus {
    Wet,
    Dry,
}

impl From<PinLevel> for RainStatus {
    fn from(level: PinLevel) -> Self {
        match level {
            PinLevel::Low => RainStatus::Wet,
            PinLevel::High => RainStatus::Dry,
        }
    }
}

impl RainStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RainStatus::Wet => "WET",
            RainStatus::Dry => "DRY",
        }
    }
}

impl std::fmt::Display for RainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RainStatus::Wet => f.write_str("Wet"),
            RainStatus::Dry => f.write_str("Dry"),
        }
    }
}

impl Sample {
    /// Assemble a sample from validated readings.
    ///
    /// `pressure_hpa` is `None` when the barometer is absent, in which case
    /// both pressure and altitude are reported as zero.
    pub fn from_readings(
        timestamp: u64,
        climate: Climate,
        pressure_hpa: Option<f32>,
        rain: RainReading,
        sea_level_hpa: f32,
    ) -> Self {
        let (pressure, altitude) = match pressure_hpa {
            Some(hpa) => (hpa, altitude_from_pressure(hpa, sea_level_hpa)),
            None => (0.0, 0.0),
        };

        Self {
            timestamp,
            temperature: climate.temperature,
            humidity: climate.humidity,
            pressure,
            altitude,
            rain_value: rain.analog,
            rain_digital: rain.digital,
        }
    }

    pub fn rain_status(&self) -> RainStatus {
        RainStatus::from(self.rain_digital)
    }

    /// Rainfall estimate in millimeters from the analog channel.
    pub fn rainfall_mm(&self) -> f32 {
        rainfall_mm(self.rain_value)
    }
}

/// Convert pascals to hectopascals.
pub fn pressure_hpa_from_pa(pa: f32) -> f32 {
    pa / 100.0
}

/// Altitude in meters from the international barometric formula.
pub fn altitude_from_pressure(pressure_hpa: f32, sea_level_hpa: f32) -> f32 {
    44330.0 * (1.0 - (pressure_hpa / sea_level_hpa).powf(1.0 / 5.255))
}

/// Rainfall estimate from the analog channel, 0..=10 mm.
///
/// The module's output falls as water bridges the plate: full scale is a dry
/// plate, 0 is fully wet.
pub fn rainfall_mm(analog: u16) -> f32 {
    let wetness = ADC_FULL_SCALE - analog.min(ADC_FULL_SCALE);
    f32::from(wetness) / f32::from(ADC_FULL_SCALE) * RAINFALL_FULL_SCALE_MM
}

/// Round half away from zero to one decimal place.
pub fn round_tenth(value: f32) -> f64 {
    (f64::from(value) * 10.0).round() / 10.0
}

fn serialize_tenth<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_tenth(*value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn climate(temperature: f32, humidity: f32) -> Climate {
        Climate {
            temperature,
            humidity,
        }
    }

    fn dry_rain() -> RainReading {
        RainReading {
            analog: 1023,
            digital: PinLevel::High,
        }
    }

    #[test]
    fn test_pressure_conversion() {
        assert_eq!(pressure_hpa_from_pa(101325.0), 1013.25);
        assert_eq!(pressure_hpa_from_pa(0.0), 0.0);
        assert_eq!(round_tenth(pressure_hpa_from_pa(101325.0)), 1013.3);
    }

    #[test]
    fn test_altitude_at_sea_level_is_zero() {
        let altitude = altitude_from_pressure(1013.25, 1013.25);
        assert!(altitude.abs() < 0.01);
    }

    #[test]
    fn test_altitude_increases_as_pressure_drops() {
        let low = altitude_from_pressure(1000.0, 1013.25);
        let high = altitude_from_pressure(900.0, 1013.25);
        assert!(low > 100.0 && low < 120.0, "got {}", low);
        assert!(high > low);
    }

    #[test]
    fn test_absent_barometer_zeroes_pressure_and_altitude() {
        let sample = Sample::from_readings(5, climate(22.5, 48.3), None, dry_rain(), 1013.25);
        assert_eq!(sample.pressure, 0.0);
        assert_eq!(sample.altitude, 0.0);
    }

    #[test]
    fn test_rain_status_follows_pin_level() {
        assert_eq!(RainStatus::from(PinLevel::Low), RainStatus::Wet);
        assert_eq!(RainStatus::from(PinLevel::High), RainStatus::Dry);
    }

    #[test]
    fn test_rainfall_mapping() {
        assert_eq!(rainfall_mm(1023), 0.0);
        assert_eq!(rainfall_mm(0), 10.0);
        // out-of-range ADC values are not validated, only clamped for the estimate
        assert_eq!(rainfall_mm(4095), 0.0);
    }

    #[test]
    fn test_round_tenth_ties_away_from_zero() {
        assert_eq!(round_tenth(1013.25), 1013.3);
        assert_eq!(round_tenth(22.5), 22.5);
        assert_eq!(round_tenth(48.3), 48.3);
        assert_eq!(round_tenth(-0.25), -0.3);
    }

    #[test]
    fn test_json_fields_rounded() {
        let sample = Sample::from_readings(
            10,
            climate(22.5, 48.3),
            Some(1013.25),
            dry_rain(),
            1013.25,
        );
        let value: serde_json::Value = serde_json::to_value(sample).unwrap();
        assert_eq!(value["pressure"], serde_json::json!(1013.3));
        assert_eq!(value["humidity"], serde_json::json!(48.3));
        assert_eq!(value["rain_digital"], serde_json::json!(1));
    }
}
