//! Search artifacts on disk.
//!
//! - [`ProgressLog`]: one tab-separated line per finished trial
//!   (`trial`, elapsed seconds, trial gap, best gap, method), appended.
//! - [`save_demands`] / [`load_demands`]: demand vectors as a JSON object
//!   keyed by `origin->destination`.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::application::gap::{ProgressSink, SearchMethod, TrialRecord};
use crate::domain::demand::DemandMatrix;
use crate::error::Result;

/// Append-only per-trial progress file.
#[derive(Debug)]
pub struct ProgressLog {
    writer: BufWriter<File>,
}

impl ProgressLog {
    /// Open `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl ProgressSink for ProgressLog {
    fn record(&mut self, method: SearchMethod, record: &TrialRecord) -> Result<()> {
        writeln!(
            self.writer,
            "{}\t{:.3}\t{}\t{}\t{}",
            record.trial,
            record.elapsed.as_secs_f64(),
            record.trial_gap,
            record.best_gap,
            method.name()
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Write `demands` as pretty JSON.
///
/// # Errors
///
/// Returns IO or serialization errors.
pub fn save_demands(path: impl AsRef<Path>, demands: &DemandMatrix) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, demands)?;
    writer.flush()?;
    Ok(())
}

/// Read a demand vector written by [`save_demands`].
///
/// # Errors
///
/// Returns IO or parse errors.
pub fn load_demands(path: impl AsRef<Path>) -> Result<DemandMatrix> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
