//! Error handling for the weather node crate.

/// A specialized `Result` type for weather node operations.
pub type Result<T> = std::result::Result<T, StationError>;

/// The main error type for station operations.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// I/O operation failed (serial output, display sink)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The display could not be initialized; the device cannot continue
    #[error("Display initialization failed: {0}")]
    DisplayInit(String),

    /// The barometer was required but not detected at startup
    #[error("Barometric sensor not detected")]
    BarometerMissing,

    /// A serial line could not be parsed
    #[error("Failed to parse line: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// GPIO operation failed (only available with gpio feature)
    #[cfg(feature = "gpio")]
    #[error("GPIO error: {0}")]
    Gpio(String),
}

impl StationError {
    /// Create a new display initialization error
    pub fn display_error(msg: impl Into<String>) -> Self {
        Self::DisplayInit(msg.into())
    }

    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new GPIO error
    #[cfg(feature = "gpio")]
    pub fn gpio_error(msg: impl Into<String>) -> Self {
        Self::Gpio(msg.into())
    }

    /// Whether this error halts the device at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DisplayInit(_) | Self::BarometerMissing)
    }
}
