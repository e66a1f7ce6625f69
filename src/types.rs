// src/types.rs
use chrono::{DateTime, Local};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// One successful reading
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub device: String,
    pub value: f64,
}

impl Sample {
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Seconds since the Unix epoch, used as the plot x coordinate.
    pub fn epoch_secs(&self) -> f64 {
        self.timestamp.timestamp_millis() as f64 / 1000.0
    }
}

// A driver error in place of a reading
#[derive(Clone, Debug, PartialEq)]
pub struct Fault {
    pub timestamp: DateTime<Local>,
    pub device: String,
    pub code: i32,
    pub message: String,
}

impl Fault {
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

// Acquisition thread -> GUI
#[derive(Clone, Debug)]
pub enum DaqMessage {
    Sample(Sample),
    Fault(Fault),
    Stopped,
}
