//! CSV persistence of processed readings.
//!
//! One row per fetch: the fetch timestamp followed by load voltage, current
//! and power of every channel in channel order, each with two decimals.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::sample::{Channel, Reading};

/// Number of fields in every header and data row.
pub const FIELD_COUNT: usize = 1 + 3 * Channel::ALL.len();

/// Writes the column header row.
pub fn write_header<W: Write>(writer: &mut W) -> io::Result<()> {
    write!(writer, "Date")?;
    for channel in Channel::ALL {
        let label = channel.label();
        write!(
            writer,
            ",{label} Voltage (V),{label} Current (mA),{label} Power (mW)"
        )?;
    }
    writeln!(writer)
}

/// Writes one data row for `reading`. A missing timestamp leaves the date field empty.
pub fn write_row<W: Write>(writer: &mut W, reading: &Reading) -> io::Result<()> {
    if let Some(timestamp) = reading.timestamp {
        write!(writer, "{timestamp}")?;
    }
    for values in &reading.channels {
        write!(
            writer,
            ",{:.2},{:.2},{:.2}",
            values.load_voltage_v, values.current_ma, values.power_mw
        )?;
    }
    writeln!(writer)
}

/// Appends readings to a CSV file, creating it with a header on first use.
#[derive(Debug, Clone)]
pub struct CsvRecorder {
    path: PathBuf,
}

impl CsvRecorder {
    /// Creates a recorder for `path`. Nothing is touched on disk until the first record.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the CSV file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row. The header is written only when this call creates the file.
    pub fn record(&self, reading: &Reading) -> io::Result<()> {
        let mut file = match OpenOptions::new().append(true).create_new(true).open(&self.path) {
            Ok(mut created) => {
                write_header(&mut created)?;
                created
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => self.open_existing()?,
            Err(err) => return Err(err),
        };

        write_row(&mut file, reading)?;
        file.flush()
    }

    fn open_existing(&self) -> io::Result<File> {
        OpenOptions::new().append(true).open(&self.path)
    }
}
