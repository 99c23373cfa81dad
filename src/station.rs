//! The fixed-interval sample loop.
//!
//! A [`Station`] owns the sensors, the optional screen and a monotonic clock.
//! [`Station::poll`] is cheap and is called on every scheduler tick; it only
//! runs a read-format-transmit cycle once the configured interval has elapsed
//! since the previous one.

use crate::config::StationConfig;
use crate::error::{Result, StationError};
use crate::protocol::{encode_line, SerialPort};
use crate::sample::Sample;
use crate::screen::{Frame, Screen};
use crate::sensors::{Reading, SensorSuite};
use futures_util::stream::{self, BoxStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Milliseconds elapsed since boot.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Clock backed by the runtime's monotonic instant.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    boot: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ms(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// What one cycle put on the serial line.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    /// A complete sample and its encoded line
    Sample { sample: Sample, line: String },
    /// The humidity/temperature read failed; only the error line is sent
    Fault { line: String },
}

impl Emission {
    pub fn line(&self) -> &str {
        match self {
            Emission::Sample { line, .. } | Emission::Fault { line } => line,
        }
    }

    pub fn sample(&self) -> Option<&Sample> {
        match self {
            Emission::Sample { sample, .. } => Some(sample),
            Emission::Fault { .. } => None,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Emission::Fault { .. })
    }
}

/// The sample loop.
pub struct Station {
    config: StationConfig,
    sensors: SensorSuite,
    screen: Option<Box<dyn Screen>>,
    clock: Box<dyn Clock>,
    last_cycle_ms: u64,
}

impl Station {
    /// Create a station with no screen and a monotonic clock starting now.
    pub fn new(config: StationConfig, sensors: SensorSuite) -> Self {
        Self {
            config,
            sensors,
            screen: None,
            clock: Box::new(MonotonicClock::new()),
            last_cycle_ms: 0,
        }
    }

    /// Attach a display.
    pub fn with_screen(mut self, screen: Box<dyn Screen>) -> Self {
        self.screen = Some(screen);
        self
    }

    /// Replace the clock the interval is measured against.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn barometer_detected(&self) -> bool {
        self.sensors.barometer_detected()
    }

    /// Probe the barometer and bring up the screen.
    ///
    /// A missing barometer degrades to zero pressure unless the configuration
    /// requires it. A screen that fails to start is always fatal.
    pub fn init(&mut self) -> Result<()> {
        self.config.validate()?;

        if !self.sensors.detect_barometer() && self.config.require_barometer {
            error!("Barometric sensor required but not detected");
            return Err(StationError::BarometerMissing);
        }

        if let Some(screen) = self.screen.as_mut() {
            screen.begin().map_err(|e| match e {
                StationError::DisplayInit(_) => e,
                other => StationError::display_error(other.to_string()),
            })?;
            debug!("Display initialized");
        }

        info!(
            interval_ms = self.config.interval_ms,
            format = ?self.config.format,
            barometer = self.sensors.barometer_detected(),
            "Station initialized"
        );
        Ok(())
    }

    /// Run a cycle if a full interval has passed since the previous one.
    pub fn poll(&mut self) -> Result<Option<Emission>> {
        let now = self.clock.now_ms();
        if now.saturating_sub(self.last_cycle_ms) < self.config.interval_ms {
            return Ok(None);
        }
        self.last_cycle_ms = now;
        self.cycle_at(now).map(Some)
    }

    /// Run one read-format-transmit cycle immediately.
    pub fn run_cycle(&mut self) -> Result<Emission> {
        let now = self.clock.now_ms();
        self.cycle_at(now)
    }

    fn cycle_at(&mut self, now_ms: u64) -> Result<Emission> {
        let climate = match self.sensors.read_climate() {
            Reading::Present(climate) => climate,
            Reading::Faulted | Reading::Absent => {
                warn!("Failed to read from humidity/temperature sensor, skipping cycle");
                return Ok(Emission::Fault {
                    line: crate::DHT_ERROR_LINE.to_string(),
                });
            }
        };

        let pressure = self.sensors.read_pressure().present();
        let rain = self.sensors.read_rain();
        let sample = Sample::from_readings(
            now_ms / 1000,
            climate,
            pressure,
            rain,
            self.config.sea_level_hpa,
        );

        if let Some(screen) = self.screen.as_mut() {
            let frame = Frame::from_sample(&self.config.title, &sample);
            if let Err(e) = screen.render(&frame) {
                warn!("Display update failed: {}", e);
            }
        }

        let line = encode_line(&sample, self.config.format)?;
        debug!(timestamp = sample.timestamp, "sample cycle complete");
        Ok(Emission::Sample { sample, line })
    }

    fn ticker(&self) -> Interval {
        let mut ticker = time::interval(Duration::from_millis(self.config.tick_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    /// Poll on every tick and write each emission to `port`.
    ///
    /// Only returns if writing to the port fails.
    pub async fn run<W: AsyncWrite + Unpin>(&mut self, port: &mut SerialPort<W>) -> Result<()> {
        let mut ticker = self.ticker();
        info!(
            "Sampling every {}ms (tick {}ms)",
            self.config.interval_ms, self.config.tick_ms
        );

        loop {
            ticker.tick().await;
            if let Some(emission) = self.poll()? {
                port.write_line(emission.line()).await?;
            }
        }
    }

    /// Turn the station into a stream of emissions driven by the tick timer.
    pub fn into_stream(self) -> BoxStream<'static, Emission> {
        let stream = stream::unfold(
            (self, None::<Interval>),
            |(mut station, mut ticker)| async move {
                loop {
                    let interval = ticker.get_or_insert_with(|| station.ticker());
                    interval.tick().await;
                    match station.poll() {
                        Ok(Some(emission)) => return Some((emission, (station, ticker))),
                        Ok(None) => continue,
                        Err(err) => {
                            error!("Failed to run sample cycle: {}", err);
                            return None;
                        }
                    }
                }
            },
        );

        Box::pin(stream)
    }
}

/// Park forever after a fatal startup failure.
pub async fn halt() {
    warn!("Device halted");
    std::future::pending::<()>().await
}
