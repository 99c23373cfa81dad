//! Fixed-layout text rendering for the small status display.
//!
//! Models a 128x64 monochrome panel driven with the 6x8 built-in font, which
//! gives a 21 column by 8 row character grid. Size-2 text doubles each glyph
//! in both directions.

use crate::error::{Result, StationError};
use crate::sample::{round_tenth, RainStatus, Sample};
use std::io::Write;

/// Character columns on the panel.
pub const COLUMNS: usize = 21;

/// Character rows on the panel.
pub const ROWS: usize = 8;

/// What the display shows for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub title: String,
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
    pub rain: RainStatus,
}

impl Frame {
    pub fn from_sample(title: &str, sample: &Sample) -> Self {
        Self {
            title: title.to_string(),
            temperature: sample.temperature,
            humidity: sample.humidity,
            pressure: sample.pressure,
            rain: sample.rain_status(),
        }
    }
}

/// A display the sample loop can draw on.
pub trait Screen: Send {
    /// Initialize the panel. Failure here is fatal for the station.
    fn begin(&mut self) -> Result<()>;

    /// Clear and redraw the full layout.
    fn render(&mut self, frame: &Frame) -> Result<()>;
}

/// Text rendition of the panel, written to any byte sink.
pub struct TextScreen<W> {
    sink: W,
    grid: [[char; COLUMNS]; ROWS],
}

impl<W: Write + Send> TextScreen<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            grid: [[' '; COLUMNS]; ROWS],
        }
    }

    /// Current contents, one string per row with trailing blanks trimmed.
    pub fn grid(&self) -> Vec<String> {
        self.grid
            .iter()
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .collect()
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn clear(&mut self) {
        self.grid = [[' '; COLUMNS]; ROWS];
    }

    /// Print `text` at a character cell, clipping at the panel edges.
    fn print_at(&mut self, row: usize, col: usize, text: &str, size: usize) {
        let mut x = col;
        for ch in text.chars() {
            for dy in 0..size {
                for dx in 0..size {
                    if let Some(cell) = self
                        .grid
                        .get_mut(row + dy)
                        .and_then(|r| r.get_mut(x + dx))
                    {
                        *cell = ch;
                    }
                }
            }
            x += size;
            if x >= COLUMNS {
                break;
            }
        }
    }

    fn flush_grid(&mut self) -> Result<()> {
        let border = format!("+{}+", "-".repeat(COLUMNS));
        writeln!(self.sink, "{}", border)?;
        for row in self.grid.iter() {
            writeln!(self.sink, "|{}|", row.iter().collect::<String>())?;
        }
        writeln!(self.sink, "{}", border)?;
        self.sink.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> Screen for TextScreen<W> {
    fn begin(&mut self) -> Result<()> {
        self.clear();
        self.flush_grid()
            .map_err(|e| StationError::display_error(format!("panel did not respond: {}", e)))
    }

    fn render(&mut self, frame: &Frame) -> Result<()> {
        self.clear();
        self.print_at(0, 0, &frame.title, 1);
        self.print_at(2, 0, &format!("{:.1} C", round_tenth(frame.temperature)), 2);
        self.print_at(
            5,
            0,
            &format!(
                "H:{:.1}% P:{:.1}",
                round_tenth(frame.humidity),
                round_tenth(frame.pressure)
            ),
            1,
        );
        self.print_at(7, 0, &format!("Rain: {}", frame.rain.label()), 1);
        self.flush_grid()
    }
}
