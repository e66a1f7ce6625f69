use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use crate::config::DaqConfig;
use crate::drivers::{AnalogInput, DaqError};
pub const SIM_FAULT_CODE: i32 = 9999;
/// Stand-in for the board when no hardware is attached: a slow sine plus noise.
pub struct SimulatedDevice {
    label: String,
    rng: StdRng,
    started: Instant,
    amplitude: f64,
    offset: f64,
    fault_rate: f64,
}
impl SimulatedDevice {
    pub fn new(config: &DaqConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
    pub fn with_rng(config: &DaqConfig, rng: StdRng) -> Self {
        let (lo, hi) = config.range.span();
        Self {
            label: config.device_label.clone(),
            rng,
            started: Instant::now(),
            amplitude: (hi - lo) * 0.3,
            offset: (hi + lo) / 2.0,
            fault_rate: config.sim_fault_rate,
        }
    }
}
impl AnalogInput for SimulatedDevice {
    fn label(&self) -> &str {
        &self.label
    }
    fn read(&mut self) -> Result<f64, DaqError> {
        if self.fault_rate > 0.0 && self.rng.gen_bool(self.fault_rate) {
            return Err(DaqError::Driver {
                code: SIM_FAULT_CODE,
                message: "simulated driver fault".into(),
            });
        }
        let t = self.started.elapsed().as_secs_f64();
        let noise = self.rng.gen_range(-0.02..0.02) * self.amplitude;
        Ok(self.offset + self.amplitude * (t * 0.5).sin() + noise)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn readings_stay_inside_range() {
        let config = DaqConfig::default();
        let mut dev = SimulatedDevice::with_rng(&config, StdRng::seed_from_u64(7));
        for _ in 0..200 {
            let v = dev.read().unwrap();
            assert!((-5.0..=5.0).contains(&v), "{v} out of range");
        }
        assert_eq!(dev.label(), "USB-1208FS-Plus");
    }
    #[test]
    fn always_faulting_device_reports_code() {
        let config = DaqConfig {
            sim_fault_rate: 1.0,
            ..DaqConfig::default()
        };
        let mut dev = SimulatedDevice::with_rng(&config, StdRng::seed_from_u64(1));
        let err = dev.read().unwrap_err();
        assert_eq!(err.code(), Some(SIM_FAULT_CODE));
    }
}
