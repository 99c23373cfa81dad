//! Serial line protocol: encoding samples, writing lines, decoding them back.

use crate::config::OutputFormat;
use crate::error::{Result, StationError};
use crate::sample::{rainfall_mm, round_tenth, RainStatus, Sample};
use crate::sensors::PinLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Encode a sample as a single line, without the terminator.
pub fn encode_line(sample: &Sample, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::KeyValue => Ok(format!(
            "T={:.1},H={:.1},P={:.1},R={:.1}",
            round_tenth(sample.temperature),
            round_tenth(sample.humidity),
            round_tenth(sample.pressure),
            round_tenth(sample.rainfall_mm()),
        )),
        OutputFormat::Json => Ok(serde_json::to_string(sample)?),
    }
}

/// Line-oriented writer standing in for the UART.
pub struct SerialPort<W> {
    writer: W,
    lines_written: u64,
}

impl<W: AsyncWrite + Unpin> SerialPort<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            lines_written: 0,
        }
    }

    /// Write one line followed by `\n` and flush it.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        self.lines_written += 1;
        trace!(line, "serial line written");
        Ok(())
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// A JSON sample as seen by the receiving side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedReading {
    pub timestamp: Option<u64>,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub altitude: f64,
    pub rain_value: u16,
    pub rain_status: RainStatus,
    pub rainfall_mm: f64,
}

/// A key=value sample line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValueReading {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub rain_mm: f64,
}

/// Classification of one received line.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Sample(DecodedReading),
    KeyValue(KeyValueReading),
    /// The humidity/temperature read failed on the device
    SensorFault,
    Empty,
    /// Anything else: boot chatter, partial lines, malformed JSON
    Unrecognized(String),
}

/// Classify a received serial line.
///
/// JSON objects are located inside surrounding noise, and missing fields
/// fall back to neutral defaults (dry, zero pressure) rather than failing.
/// `rain_digital` reads as dry only when it is exactly 1.
///
/// `DecodedReading::rainfall_mm` uses the same inverted map as the emitting
/// side ([`rainfall_mm`]), so a raw value of 1023 decodes as 0 mm. A reader
/// that scales `raw / 1023 * 10` will show different millimetre figures for
/// the same line.
pub fn decode_line(line: &str) -> Decoded {
    let line = line.trim();

    if line.is_empty() {
        return Decoded::Empty;
    }
    if line == crate::DHT_ERROR_LINE {
        return Decoded::SensorFault;
    }
    if line.starts_with("T=") {
        return match parse_key_value(line) {
            Ok(reading) => Decoded::KeyValue(reading),
            Err(_) => Decoded::Unrecognized(line.to_string()),
        };
    }

    match extract_object(line).and_then(parse_json_reading) {
        Ok(reading) => Decoded::Sample(reading),
        Err(_) => Decoded::Unrecognized(line.to_string()),
    }
}

fn extract_object(line: &str) -> Result<&str> {
    let start = line
        .find('{')
        .ok_or_else(|| StationError::parse_error("no JSON object"))?;
    let end = line
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| StationError::parse_error("unterminated JSON object"))?;
    Ok(&line[start..=end])
}

fn parse_json_reading(object: &str) -> Result<DecodedReading> {
    let value: Value = serde_json::from_str(object)?;
    if !value.is_object() {
        return Err(StationError::parse_error("expected a JSON object"));
    }

    let rain_value = number(&value, "rain_value", 0.0).clamp(0.0, f64::from(u16::MAX)) as u16;
    // only an explicit 1 reads as dry
    let rain_digital = match number(&value, "rain_digital", 1.0) as i64 {
        1 => PinLevel::High,
        _ => PinLevel::Low,
    };

    Ok(DecodedReading {
        timestamp: value.get("timestamp").and_then(Value::as_u64),
        temperature: number(&value, "temperature", 0.0),
        humidity: number(&value, "humidity", 0.0),
        pressure: number(&value, "pressure", 0.0),
        altitude: number(&value, "altitude", 0.0),
        rain_value,
        rain_status: RainStatus::from(rain_digital),
        rainfall_mm: round_tenth(rainfall_mm(rain_value)),
    })
}

/// Numeric field that may also arrive quoted; unparsable values use `default`.
fn number(value: &Value, key: &str, default: f64) -> f64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

fn parse_key_value(line: &str) -> Result<KeyValueReading> {
    let mut reading = KeyValueReading {
        temperature: 0.0,
        humidity: 0.0,
        pressure: 0.0,
        rain_mm: 0.0,
    };

    for pair in line.split(',') {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| StationError::parse_error(format!("malformed pair: {}", pair)))?;
        let parsed: f64 = raw
            .trim()
            .parse()
            .map_err(|_| StationError::parse_error(format!("bad value for {}: {}", key, raw)))?;
        match key.trim() {
            "T" => reading.temperature = parsed,
            "H" => reading.humidity = parsed,
            "P" => reading.pressure = parsed,
            "R" => reading.rain_mm = parsed,
            other => return Err(StationError::parse_error(format!("unknown key: {}", other))),
        }
    }

    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{Climate, RainReading};

    fn scenario_sample() -> Sample {
        Sample::from_readings(
            5,
            Climate {
                temperature: 22.5,
                humidity: 48.3,
            },
            Some(1013.25),
            RainReading {
                analog: 1023,
                digital: PinLevel::High,
            },
            crate::SEA_LEVEL_PRESSURE_HPA,
        )
    }

    #[test]
    fn test_key_value_line() {
        let line = encode_line(&scenario_sample(), OutputFormat::KeyValue).unwrap();
        assert_eq!(line, "T=22.5,H=48.3,P=1013.3,R=0.0");
    }

    #[test]
    fn test_json_line_keys_in_order() {
        let line = encode_line(&scenario_sample(), OutputFormat::Json).unwrap();
        assert!(!line.contains('\n'));
        let keys = [
            "\"timestamp\"",
            "\"temperature\"",
            "\"humidity\"",
            "\"pressure\"",
            "\"altitude\"",
            "\"rain_value\"",
            "\"rain_digital\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| line.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(line.contains("\"pressure\":1013.3"));
    }

    #[test]
    fn test_decode_json_with_noise() {
        let line = r#"boot> {"timestamp":5,"temperature":22.5,"humidity":48.3,"pressure":1013.3,"altitude":0.0,"rain_value":0,"rain_digital":0} "#;
        match decode_line(line) {
            Decoded::Sample(reading) => {
                assert_eq!(reading.timestamp, Some(5));
                assert_eq!(reading.pressure, 1013.3);
                assert_eq!(reading.rain_status, RainStatus::Wet);
                assert_eq!(reading.rainfall_mm, 10.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_json_defaults() {
        match decode_line(r#"{"temperature":"21.5"}"#) {
            Decoded::Sample(reading) => {
                assert_eq!(reading.temperature, 21.5);
                assert_eq!(reading.pressure, 0.0);
                assert_eq!(reading.timestamp, None);
                assert_eq!(reading.rain_status, RainStatus::Dry);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_rain_digital_other_than_one_is_wet() {
        for raw in ["2", "-1", "\"0\""] {
            let line = format!(r#"{{"temperature":20.0,"rain_digital":{}}}"#, raw);
            match decode_line(&line) {
                Decoded::Sample(reading) => {
                    assert_eq!(reading.rain_status, RainStatus::Wet, "rain_digital={}", raw)
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        match decode_line(r#"{"temperature":20.0,"rain_digital":1}"#) {
            Decoded::Sample(reading) => assert_eq!(reading.rain_status, RainStatus::Dry),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_key_value() {
        assert_eq!(
            decode_line("T=22.5,H=48.3,P=1013.3,R=1.2"),
            Decoded::KeyValue(KeyValueReading {
                temperature: 22.5,
                humidity: 48.3,
                pressure: 1013.3,
                rain_mm: 1.2,
            })
        );
    }

    #[test]
    fn test_decode_fault_and_noise() {
        assert_eq!(decode_line(crate::DHT_ERROR_LINE), Decoded::SensorFault);
        assert_eq!(decode_line("   "), Decoded::Empty);
        assert!(matches!(decode_line("BMP180 init"), Decoded::Unrecognized(_)));
        assert!(matches!(decode_line("{\"temperature\": 2"), Decoded::Unrecognized(_)));
        assert!(matches!(decode_line("T=abc,H=1"), Decoded::Unrecognized(_)));
    }

    #[tokio::test]
    async fn test_serial_port_terminates_lines() {
        let mut port = SerialPort::new(Vec::new());
        port.write_line("T=1.0,H=2.0,P=0.0,R=0.0").await.unwrap();
        port.write_line(crate::DHT_ERROR_LINE).await.unwrap();
        assert_eq!(port.lines_written(), 2);

        let written = String::from_utf8(port.into_inner()).unwrap();
        assert_eq!(written, format!("T=1.0,H=2.0,P=0.0,R=0.0\n{}\n", crate::DHT_ERROR_LINE));
    }
}
