// src/engine.rs
use crate::drivers::{AnalogInput, DaqError};
use crate::types::*;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Upper bound on how long a sleeping loop takes to notice Stop.
const STOP_POLL_SLICE: Duration = Duration::from_millis(20);

/// Owns the stop flag and the acquisition thread. Lives on the GUI thread.
pub struct Acquisition {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Acquisition {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(true)),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::SeqCst)
    }

    /// Launches the loop. Returns `Ok(false)` when a loop is already running.
    pub fn start(
        &mut self,
        device: Box<dyn AnalogInput>,
        tx: Sender<DaqMessage>,
        interval: Duration,
    ) -> Result<bool, DaqError> {
        if self.is_running() {
            log::warn!("start ignored: acquisition already running");
            return Ok(false);
        }
        // A loop that was told to stop may still be inside its last driver call.
        if let Some(previous) = self.worker.take() {
            if previous.join().is_err() {
                log::error!("previous acquisition thread panicked");
            }
        }
        self.stop.store(false, Ordering::SeqCst);
        match spawn_thread(device, tx, Arc::clone(&self.stop), interval) {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(true)
            }
            Err(e) => {
                self.stop.store(true, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Raises the stop flag without waiting for the thread. Returns `false` when idle.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.stop.store(true, Ordering::SeqCst);
        log::info!("stop requested");
        true
    }

    #[cfg(test)]
    fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            handle.join().ok();
        }
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

pub fn spawn_thread(
    mut device: Box<dyn AnalogInput>,
    tx: Sender<DaqMessage>,
    stop: Arc<AtomicBool>,
    interval: Duration,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("acquisition".to_owned())
        .spawn(move || run_loop(device.as_mut(), &tx, &stop, interval))
}

/// Polls until `stop` is raised or the receiver hangs up, then sends `Stopped`.
pub fn run_loop(
    device: &mut dyn AnalogInput,
    tx: &Sender<DaqMessage>,
    stop: &AtomicBool,
    interval: Duration,
) {
    log::info!("acquisition started on {}", device.label());
    let mut polls: u64 = 0;
    while !stop.load(Ordering::SeqCst) {
        let msg = poll_once(device);
        polls += 1;
        if tx.send(msg).is_err() {
            log::warn!("receiver gone, acquisition loop exiting");
            break;
        }
        pause(interval, stop);
    }
    log::info!("acquisition stopped after {polls} polls");
    tx.send(DaqMessage::Stopped).ok();
}

fn poll_once(device: &mut dyn AnalogInput) -> DaqMessage {
    let result = device.read();
    let timestamp = Local::now();
    let device_label = device.label().to_owned();
    match result {
        Ok(value) => DaqMessage::Sample(Sample {
            timestamp,
            device: device_label,
            value,
        }),
        Err(err) => {
            log::error!("read from {device_label} failed: {err}");
            let code = err.code().unwrap_or(-1);
            let message = match err {
                DaqError::Driver { message, .. } => message,
                other => other.to_string(),
            };
            DaqMessage::Fault(Fault {
                timestamp,
                device: device_label,
                code,
                message,
            })
        }
    }
}

fn pause(interval: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + interval;
    loop {
        let now = Instant::now();
        if now >= deadline || stop.load(Ordering::SeqCst) {
            return;
        }
        thread::sleep((deadline - now).min(STOP_POLL_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ScriptedDevice;
    use std::sync::mpsc::channel;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn loop_forwards_readings_in_order_until_stopped() {
        let (tx, rx) = channel();
        let stop = Arc::new(AtomicBool::new(false));
        let device = ScriptedDevice::new("dev", [Ok(1.23), Err(42), Ok(1.10)]);
        let handle =
            spawn_thread(Box::new(device), tx, Arc::clone(&stop), Duration::from_millis(1))
                .unwrap();

        match rx.recv_timeout(WAIT).unwrap() {
            DaqMessage::Sample(s) => assert_eq!((s.device.as_str(), s.value), ("dev", 1.23)),
            other => panic!("expected sample, got {other:?}"),
        }
        match rx.recv_timeout(WAIT).unwrap() {
            DaqMessage::Fault(f) => assert_eq!(f.code, 42),
            other => panic!("expected fault, got {other:?}"),
        }
        match rx.recv_timeout(WAIT).unwrap() {
            DaqMessage::Sample(s) => assert_eq!(s.value, 1.10),
            other => panic!("expected sample, got {other:?}"),
        }

        stop.store(true, Ordering::SeqCst);
        handle.join().unwrap();
        let last = rx.try_iter().last();
        assert!(matches!(last, Some(DaqMessage::Stopped)));
    }

    #[test]
    fn raised_flag_means_no_reads() {
        let (tx, rx) = channel();
        let stop = AtomicBool::new(true);
        let mut device = ScriptedDevice::new("dev", [Ok(1.0)]);
        run_loop(&mut device, &tx, &stop, Duration::ZERO);
        let msgs: Vec<_> = rx.try_iter().collect();
        assert_eq!(msgs.len(), 1);
        assert!(matches!(msgs[0], DaqMessage::Stopped));
    }

    #[test]
    fn loop_exits_when_receiver_dropped() {
        let (tx, rx) = channel();
        drop(rx);
        let stop = AtomicBool::new(false);
        let mut device = ScriptedDevice::new("dev", [Ok(1.0), Ok(2.0)]);
        run_loop(&mut device, &tx, &stop, Duration::ZERO);
        assert!(!stop.load(Ordering::SeqCst));
    }

    #[test]
    fn second_start_is_ignored_while_running() {
        let (tx, rx) = channel();
        let mut acq = Acquisition::new();
        assert!(!acq.is_running());
        let first = ScriptedDevice::new("a", [Ok(1.0)]);
        assert!(acq
            .start(Box::new(first), tx.clone(), Duration::from_millis(5))
            .unwrap());
        assert!(acq.is_running());

        let second = ScriptedDevice::new("b", [Ok(2.0)]);
        assert!(!acq
            .start(Box::new(second), tx.clone(), Duration::from_millis(5))
            .unwrap());

        assert!(acq.stop());
        assert!(!acq.stop());
        acq.join();
        drop(tx);
        assert!(rx.iter().all(|m| match m {
            DaqMessage::Sample(s) => s.device == "a",
            DaqMessage::Fault(f) => f.device == "a",
            DaqMessage::Stopped => true,
        }));
    }

    #[test]
    fn restart_after_stop_runs_a_fresh_loop() {
        let (tx, rx) = channel();
        let mut acq = Acquisition::new();
        acq.start(
            Box::new(ScriptedDevice::new("a", [Ok(1.0)])),
            tx.clone(),
            Duration::from_millis(1),
        )
        .unwrap();
        acq.stop();
        assert!(acq
            .start(
                Box::new(ScriptedDevice::new("b", [Ok(2.0)])),
                tx.clone(),
                Duration::from_millis(1),
            )
            .unwrap());
        acq.stop();
        acq.join();
        drop(tx);
        let stopped = rx
            .iter()
            .filter(|m| matches!(m, DaqMessage::Stopped))
            .count();
        assert_eq!(stopped, 2);
    }
}
