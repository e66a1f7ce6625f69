// src/drivers/mod.rs
pub mod device;
pub mod error;
pub mod mcc;
pub mod plot;
pub mod sim;
pub use device::{open_device, AnalogInput};
#[cfg(test)]
pub use device::ScriptedDevice;
pub use error::DaqError;
pub use plot::{save_series_png, PlotStyle};
