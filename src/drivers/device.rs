use crate::config::{DaqConfig, DriverKind};
use crate::drivers::mcc::MccBoard;
use crate::drivers::sim::SimulatedDevice;
use crate::drivers::DaqError;
/// One analog input channel that can be polled for a single reading.
pub trait AnalogInput: Send {
    /// Human-readable device name written into the log and CSV.
    fn label(&self) -> &str;
    /// Reads one sample and returns it in volts.
    fn read(&mut self) -> Result<f64, DaqError>;
}
/// Opens the backend selected in the config.
pub fn open_device(config: &DaqConfig) -> Result<Box<dyn AnalogInput>, DaqError> {
    match config.driver {
        DriverKind::Mcc => Ok(Box::new(MccBoard::open(config)?)),
        DriverKind::Simulated => Ok(Box::new(SimulatedDevice::new(config))),
    }
}
#[cfg(test)]
pub use scripted::ScriptedDevice;
