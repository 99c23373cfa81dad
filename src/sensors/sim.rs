//! Simulated and fixed-value drivers for running the loop off-device.
//!
//! The simulated drivers produce slow deterministic waveforms so a run is
//! reproducible; the fixed drivers return the same reading every time and are
//! what the tests and benchmarks are written against.

use super::traits::{BarometricSensor, ClimateSensor, RainSensor};
use super::PinLevel;
use crate::sample::ADC_FULL_SCALE;
use std::collections::VecDeque;

/// DHT stand-in that drifts around a base temperature and humidity.
#[derive(Debug, Clone)]
pub struct SimulatedClimate {
    base_temperature: f32,
    base_humidity: f32,
    /// Every Nth read cycle returns NaN
    fault_every: Option<u64>,
    step: u64,
}

impl SimulatedClimate {
    pub fn new(base_temperature: f32, base_humidity: f32) -> Self {
        Self {
            base_temperature,
            base_humidity,
            fault_every: None,
            step: 0,
        }
    }

    /// Inject a failed read every `n` cycles. `0` disables injection.
    pub fn with_fault_every(mut self, n: u64) -> Self {
        self.fault_every = (n > 0).then_some(n);
        self
    }

    fn faulted(&self) -> bool {
        self.fault_every.is_some_and(|n| self.step % n == 0)
    }
}

impl Default for SimulatedClimate {
    fn default() -> Self {
        Self::new(22.0, 55.0)
    }
}

impl ClimateSensor for SimulatedClimate {
    // humidity is read first each cycle, so it advances the waveform
    fn read_humidity(&mut self) -> f32 {
        self.step += 1;
        if self.faulted() {
            return f32::NAN;
        }
        self.base_humidity + 5.0 * (self.step as f32 * 0.2).cos()
    }

    fn read_temperature(&mut self) -> f32 {
        if self.faulted() {
            return f32::NAN;
        }
        self.base_temperature + 1.5 * (self.step as f32 * 0.3).sin()
    }
}

/// BMP stand-in oscillating around a base pressure, or not fitted at all.
#[derive(Debug, Clone)]
pub struct SimulatedBarometer {
    present: bool,
    base_pa: f32,
    step: u64,
}

impl SimulatedBarometer {
    pub fn new(present: bool) -> Self {
        Self {
            present,
            base_pa: 101325.0,
            step: 0,
        }
    }

    pub fn with_base_pressure(mut self, pa: f32) -> Self {
        self.base_pa = pa;
        self
    }
}

impl Default for SimulatedBarometer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl BarometricSensor for SimulatedBarometer {
    fn begin(&mut self) -> bool {
        self.present
    }

    fn read_pressure_pa(&mut self) -> f32 {
        self.step += 1;
        self.base_pa + 150.0 * (self.step as f32 * 0.05).sin()
    }
}

/// Rain module stand-in sweeping its analog output between dry and wet.
#[derive(Debug, Clone)]
pub struct SimulatedRain {
    wet_threshold: u16,
    period: u64,
    step: u64,
    analog: u16,
}

impl SimulatedRain {
    /// `wet_threshold` is the comparator trip point on the analog scale.
    pub fn new(wet_threshold: u16) -> Self {
        Self {
            wet_threshold,
            period: 48,
            step: 0,
            analog: ADC_FULL_SCALE,
        }
    }
}

impl Default for SimulatedRain {
    fn default() -> Self {
        Self::new(500)
    }
}

impl RainSensor for SimulatedRain {
    fn read_analog(&mut self) -> u16 {
        // triangle wave from full scale down to a fifth of it and back
        let floor = ADC_FULL_SCALE / 5;
        let span = u64::from(ADC_FULL_SCALE - floor);
        let half = self.period / 2;
        let phase = self.step % self.period;
        let offset = if phase < half { phase } else { self.period - phase };
        self.step += 1;
        self.analog = ADC_FULL_SCALE - (span * offset / half) as u16;
        self.analog
    }

    fn read_digital(&mut self) -> PinLevel {
        if self.analog < self.wet_threshold {
            PinLevel::Low
        } else {
            PinLevel::High
        }
    }
}

/// Climate driver that always returns the same pair.
#[derive(Debug, Clone, Copy)]
pub struct FixedClimate {
    temperature: f32,
    humidity: f32,
}

impl FixedClimate {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature,
            humidity,
        }
    }
}

impl ClimateSensor for FixedClimate {
    fn read_humidity(&mut self) -> f32 {
        self.humidity
    }

    fn read_temperature(&mut self) -> f32 {
        self.temperature
    }
}

/// Climate driver replaying a script of (temperature, humidity) pairs.
///
/// The last pair repeats once the script runs out.
#[derive(Debug, Clone)]
pub struct ScriptedClimate {
    script: VecDeque<(f32, f32)>,
    current: (f32, f32),
}

impl ScriptedClimate {
    pub fn new(script: impl IntoIterator<Item = (f32, f32)>) -> Self {
        Self {
            script: script.into_iter().collect(),
            current: (f32::NAN, f32::NAN),
        }
    }
}

impl ClimateSensor for ScriptedClimate {
    fn read_humidity(&mut self) -> f32 {
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }
        self.current.1
    }

    fn read_temperature(&mut self) -> f32 {
        self.current.0
    }
}

/// Barometer that is either absent or always reports the same pressure.
#[derive(Debug, Clone, Copy)]
pub struct FixedBarometer {
    pressure_pa: Option<f32>,
}

impl FixedBarometer {
    pub fn present(pressure_pa: f32) -> Self {
        Self {
            pressure_pa: Some(pressure_pa),
        }
    }

    pub fn absent() -> Self {
        Self { pressure_pa: None }
    }
}

impl BarometricSensor for FixedBarometer {
    fn begin(&mut self) -> bool {
        self.pressure_pa.is_some()
    }

    fn read_pressure_pa(&mut self) -> f32 {
        self.pressure_pa.unwrap_or(0.0)
    }
}

/// Rain driver with constant channel values.
#[derive(Debug, Clone, Copy)]
pub struct FixedRain {
    analog: u16,
    digital: PinLevel,
}

impl FixedRain {
    pub fn new(analog: u16, digital: PinLevel) -> Self {
        Self { analog, digital }
    }
}

impl RainSensor for FixedRain {
    fn read_analog(&mut self) -> u16 {
        self.analog
    }

    fn read_digital(&mut self) -> PinLevel {
        self.digital
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_injection_hits_both_channels() {
        let mut climate = SimulatedClimate::default().with_fault_every(3);
        let mut faults = 0;
        for _ in 0..9 {
            let humidity = climate.read_humidity();
            let temperature = climate.read_temperature();
            assert_eq!(humidity.is_nan(), temperature.is_nan());
            if humidity.is_nan() {
                faults += 1;
            }
        }
        assert_eq!(faults, 3);
    }

    #[test]
    fn test_simulated_climate_stays_near_base() {
        let mut climate = SimulatedClimate::new(20.0, 50.0);
        for _ in 0..100 {
            let humidity = climate.read_humidity();
            let temperature = climate.read_temperature();
            assert!((humidity - 50.0).abs() <= 5.0);
            assert!((temperature - 20.0).abs() <= 1.5);
        }
    }

    #[test]
    fn test_simulated_rain_trips_comparator() {
        let mut rain = SimulatedRain::new(500);
        let mut saw_wet = false;
        let mut saw_dry = false;
        for _ in 0..48 {
            let analog = rain.read_analog();
            let digital = rain.read_digital();
            assert!(analog <= ADC_FULL_SCALE);
            assert_eq!(digital == PinLevel::Low, analog < 500);
            saw_wet |= digital == PinLevel::Low;
            saw_dry |= digital == PinLevel::High;
        }
        assert!(saw_wet && saw_dry);
    }

    #[test]
    fn test_scripted_climate_repeats_last_pair() {
        let mut climate = ScriptedClimate::new([(f32::NAN, 40.0), (21.0, 41.0)]);
        assert_eq!(climate.read_humidity(), 40.0);
        assert!(climate.read_temperature().is_nan());
        assert_eq!(climate.read_humidity(), 41.0);
        assert_eq!(climate.read_temperature(), 21.0);
        assert_eq!(climate.read_humidity(), 41.0);
    }

    #[test]
    fn test_absent_barometer_fails_probe() {
        assert!(!FixedBarometer::absent().begin());
        assert!(SimulatedBarometer::new(true).begin());
        assert!(!SimulatedBarometer::new(false).begin());
    }

    #[test]
    fn test_barometer_wanders_around_base_pressure() {
        let mut barometer = SimulatedBarometer::default().with_base_pressure(90000.0);
        for _ in 0..100 {
            let pa = barometer.read_pressure_pa();
            assert!((89850.0..=90150.0).contains(&pa), "got {}", pa);
        }
    }
}
