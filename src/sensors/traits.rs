//! Driver traits for the attached sensors.
//!
//! Drivers are synchronous: a read blocks the loop until the device answers,
//! the same way the vendor libraries behave on the microcontroller.

use super::PinLevel;

/// Temperature/humidity sensor (DHT family).
///
/// A failed read is signalled with `f32::NAN`, which is what the driver
/// returns when the single-wire transfer times out or fails its checksum.
pub trait ClimateSensor: Send {
    /// Relative humidity in percent, or NaN.
    fn read_humidity(&mut self) -> f32;

    /// Temperature in Celsius, or NaN.
    fn read_temperature(&mut self) -> f32;
}

/// Barometric pressure sensor (BMP family).
pub trait BarometricSensor: Send {
    /// Probe the device. Returns `false` when nothing answers on the bus.
    fn begin(&mut self) -> bool;

    /// Pressure in pascals.
    fn read_pressure_pa(&mut self) -> f32;
}

/// Rain sensor module with an analog and a comparator output.
pub trait RainSensor: Send {
    /// Raw ADC value of the analog channel.
    fn read_analog(&mut self) -> u16;

    /// Comparator output; LOW when water bridges the plate.
    fn read_digital(&mut self) -> PinLevel;
}
