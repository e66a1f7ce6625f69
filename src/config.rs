// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "DAQLOG_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "daqlog.json";

/// Which backend answers `AnalogInput::read`.
#[derive(Serialize, Deserialize, PartialEq, Clone, Copy, Debug)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// Measurement Computing Universal Library (cbw64.dll / cbw32.dll).
    Mcc,
    Simulated,
}

/// Analog input ranges, named after the UL constants.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum Range {
    #[serde(rename = "BIP20VOLTS")]
    Bip20Volts,
    #[serde(rename = "BIP10VOLTS")]
    Bip10Volts,
    #[serde(rename = "BIP5VOLTS")]
    Bip5Volts,
    #[serde(rename = "BIP2VOLTS")]
    Bip2Volts,
    #[serde(rename = "BIP2PT5VOLTS")]
    Bip2Pt5Volts,
    #[serde(rename = "BIP1PT25VOLTS")]
    Bip1Pt25Volts,
    #[serde(rename = "BIP1VOLTS")]
    Bip1Volts,
    #[serde(rename = "UNI10VOLTS")]
    Uni10Volts,
    #[serde(rename = "UNI5VOLTS")]
    Uni5Volts,
}

impl Range {
    /// Range code passed to `cbAIn` / `cbToEngUnits`.
    pub fn ul_code(self) -> i32 {
        match self {
            Range::Bip5Volts => 0,
            Range::Bip10Volts => 1,
            Range::Bip2Pt5Volts => 2,
            Range::Bip1Pt25Volts => 3,
            Range::Bip1Volts => 4,
            Range::Bip2Volts => 14,
            Range::Bip20Volts => 15,
            Range::Uni10Volts => 100,
            Range::Uni5Volts => 101,
        }
    }

    /// (min, max) in volts.
    pub fn span(self) -> (f64, f64) {
        match self {
            Range::Bip20Volts => (-20.0, 20.0),
            Range::Bip10Volts => (-10.0, 10.0),
            Range::Bip5Volts => (-5.0, 5.0),
            Range::Bip2Pt5Volts => (-2.5, 2.5),
            Range::Bip2Volts => (-2.0, 2.0),
            Range::Bip1Pt25Volts => (-1.25, 1.25),
            Range::Bip1Volts => (-1.0, 1.0),
            Range::Uni10Volts => (0.0, 10.0),
            Range::Uni5Volts => (0.0, 5.0),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DaqConfig {
    pub driver: DriverKind,
    /// Overrides the platform default UL library name.
    pub library_path: Option<String>,
    pub board_num: i32,
    pub channel: i32,
    pub range: Range,
    pub device_label: String,
    pub csv_path: PathBuf,
    pub min_interval_ms: u64,
    /// Trailing window drawn by the live chart; 0 draws the whole series.
    pub plot_window_secs: f64,
    pub max_plot_points: usize,
    /// Probability per read that the simulated device reports a fault.
    pub sim_fault_rate: f64,
}

impl Default for DaqConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Mcc,
            library_path: None,
            board_num: 0,
            channel: 0,
            range: Range::Bip5Volts,
            device_label: "USB-1208FS-Plus".to_owned(),
            csv_path: PathBuf::from("data.csv"),
            min_interval_ms: 100,
            plot_window_secs: 300.0,
            max_plot_points: 2000,
            sim_fault_rate: 0.0,
        }
    }
}

impl DaqConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: DaqConfig = serde_json::from_str(text).context("failed to parse config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    /// `$DAQLOG_CONFIG`, else `daqlog.json` if present, else defaults.
    pub fn discover() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            Self::load(local)
        } else {
            log::info!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.device_label.trim().is_empty() || self.device_label.contains('\n') {
            anyhow::bail!("device_label must be a single non-empty line");
        }
        if !(0.0..=1.0).contains(&self.sim_fault_rate) {
            anyhow::bail!("sim_fault_rate must be within 0..=1");
        }
        if self.max_plot_points < 2 {
            anyhow::bail!("max_plot_points must be at least 2");
        }
        if self.plot_window_secs < 0.0 {
            anyhow::bail!("plot_window_secs must not be negative");
        }
        Ok(())
    }
}
