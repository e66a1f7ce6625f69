use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use crate::drivers::DaqError;
use crate::types::{Fault, Sample};

pub const CSV_HEADER: [&str; 3] = ["Timestamp", "Device", "Value"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogKind {
    Sample,
    Fault,
    Info,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogLine {
    pub kind: LogKind,
    pub text: String,
}

/// Log pane contents, the on-disk CSV, and the samples kept for export.
pub struct Recorder {
    csv_path: PathBuf,
    lines: Vec<LogLine>,
    samples: Vec<Sample>,
}

impl Recorder {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            lines: Vec::new(),
            samples: Vec::new(),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    #[cfg(test)]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Logs, persists and retains one reading. The sample is kept even when the
    /// CSV append fails; the failure is returned so the caller can surface it.
    pub fn record_sample(&mut self, sample: &Sample) -> Result<(), DaqError> {
        self.push(
            LogKind::Sample,
            format!(
                "{} - Device: {} - Value: {}",
                sample.timestamp_text(),
                sample.device,
                sample.value
            ),
        );
        self.samples.push(sample.clone());
        let written = append_csv_row(&self.csv_path, sample);
        if let Err(e) = &written {
            log::error!("failed to append to {}: {e}", self.csv_path.display());
            self.note(format!("CSV write to {} failed: {e}", self.csv_path.display()));
        }
        written
    }

    pub fn record_fault(&mut self, fault: &Fault) {
        self.push(
            LogKind::Fault,
            format!(
                "{} - Error occurred while acquiring data from {}",
                fault.timestamp_text(),
                fault.device
            ),
        );
    }

    pub fn note(&mut self, text: impl Into<String>) {
        self.push(LogKind::Info, text.into());
    }

    /// Writes every retained sample to `path`, replacing it. Returns the row count.
    pub fn export(&self, path: &Path) -> Result<usize, DaqError> {
        let mut w = csv::Writer::from_path(path)?;
        w.write_record(CSV_HEADER)?;
        for sample in &self.samples {
            w.write_record(csv_row(sample))?;
        }
        w.flush()?;
        log::info!("exported {} rows to {}", self.samples.len(), path.display());
        Ok(self.samples.len())
    }

    /// Empties the log pane and retained samples. The CSV file is left alone.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.samples.clear();
    }

    fn push(&mut self, kind: LogKind, text: String) {
        log::debug!("{text}");
        self.lines.push(LogLine { kind, text });
    }
}

fn csv_row(sample: &Sample) -> [String; 3] {
    [
        sample.timestamp_text(),
        sample.device.clone(),
        sample.value.to_string(),
    ]
}

/// Opens `path` for append, writes the header if the file is new or empty,
/// writes one row and flushes before closing.
fn append_csv_row(path: &Path, sample: &Sample) -> Result<(), DaqError> {
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if needs_header {
        w.write_record(CSV_HEADER)?;
    }
    w.write_record(csv_row(sample))?;
    w.flush()?;
    Ok(())
}
