//! Rain sensor input on a Raspberry Pi GPIO pin.
//!
//! The rain module's comparator output is wired to a BCM input pin. The Pi
//! has no ADC, so the analog channel is derived from the comparator: full
//! scale while dry, zero while wet.

use super::traits::RainSensor;
use super::PinLevel;
use crate::error::{Result, StationError};
use crate::sample::ADC_FULL_SCALE;
use rppal::gpio::{Gpio, InputPin, Level};
use tracing::debug;

/// Highest BCM pin exposed on the 40-pin header.
const MAX_HEADER_PIN: u8 = 27;

/// Raspberry Pi rain sensor using rppal.
pub struct GpioRainSensor {
    pin: InputPin,
    last_level: PinLevel,
}

impl GpioRainSensor {
    /// Claim `bcm_pin` as an input with the internal pull-up enabled.
    pub fn new(bcm_pin: u8) -> Result<Self> {
        if bcm_pin > MAX_HEADER_PIN {
            return Err(StationError::gpio_error(format!(
                "Pin {} is not available",
                bcm_pin
            )));
        }

        let gpio = Gpio::new()
            .map_err(|e| StationError::gpio_error(format!("Failed to initialize GPIO: {}", e)))?;

        let pin = gpio
            .get(bcm_pin)
            .map_err(|e| {
                StationError::gpio_error(format!("Failed to access pin {}: {}", bcm_pin, e))
            })?
            .into_input_pullup();

        Ok(Self {
            pin,
            last_level: PinLevel::High,
        })
    }

    fn sample_pin(&mut self) -> PinLevel {
        self.last_level = match self.pin.read() {
            Level::Low => PinLevel::Low,
            Level::High => PinLevel::High,
        };
        self.last_level
    }
}

impl RainSensor for GpioRainSensor {
    fn read_analog(&mut self) -> u16 {
        match self.sample_pin() {
            PinLevel::Low => 0,
            PinLevel::High => ADC_FULL_SCALE,
        }
    }

    fn read_digital(&mut self) -> PinLevel {
        let previous = self.last_level;
        let level = self.sample_pin();
        if level != previous {
            debug!(?previous, ?level, "rain comparator changed between channel reads");
        }
        level
    }
}
