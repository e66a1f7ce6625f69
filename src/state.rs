// src/state.rs
use crate::config::DaqConfig;
use crate::drivers::{open_device, save_series_png, AnalogInput, PlotStyle};
use crate::engine::Acquisition;
use crate::plotter::Series;
use crate::recorder::{LogLine, Recorder};
use crate::types::*;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Pending error dialog. Repeated errors of the same kind bump `repeats`;
/// errors of another kind wait behind it.
#[derive(Clone, Debug, PartialEq)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub repeats: u32,
}

/// Everything the window shows, owned by the GUI thread. The acquisition
/// thread only ever talks to it through `DaqMessage`s.
pub struct DaqState {
    config: DaqConfig,
    recorder: Recorder,
    series: Series,
    acquisition: Acquisition,
    tx: Sender<DaqMessage>,
    rx: Receiver<DaqMessage>,
    alerts: VecDeque<Alert>,
}

impl DaqState {
    pub fn new(config: DaqConfig) -> Self {
        let (tx, rx) = channel();
        Self {
            recorder: Recorder::new(config.csv_path.clone()),
            config,
            series: Series::default(),
            acquisition: Acquisition::new(),
            tx,
            rx,
            alerts: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &DaqConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.acquisition.is_running()
    }

    pub fn can_start(&self) -> bool {
        !self.is_running()
    }

    pub fn can_stop(&self) -> bool {
        self.is_running()
    }

    pub fn lines(&self) -> &[LogLine] {
        self.recorder.lines()
    }

    pub fn csv_path(&self) -> &std::path::Path {
        self.recorder.csv_path()
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn visible_points(&self) -> Vec<[f64; 2]> {
        self.series
            .visible(self.config.plot_window_secs, self.config.max_plot_points)
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alerts.front()
    }

    pub fn dismiss_alert(&mut self) {
        self.alerts.pop_front();
    }

    // ---- actions ----

    pub fn start(&mut self) {
        if !self.can_start() {
            return;
        }
        match open_device(&self.config) {
            Ok(device) => self.start_with(device),
            Err(e) => {
                log::error!("cannot open device: {e}");
                self.recorder.note(format!("Cannot open device: {e}"));
                self.raise_alert("Device Error", e.to_string());
            }
        }
    }

    pub fn start_with(&mut self, device: Box<dyn AnalogInput>) {
        match self
            .acquisition
            .start(device, self.tx.clone(), self.config.min_interval())
        {
            Ok(true) => log::info!("acquisition running"),
            Ok(false) => {}
            Err(e) => {
                log::error!("failed to spawn acquisition thread: {e}");
                self.raise_alert("Acquisition Error", e.to_string());
            }
        }
    }

    pub fn stop(&mut self) {
        self.acquisition.stop();
    }

    /// `None` means the save dialog was dismissed.
    pub fn export(&mut self, path: Option<PathBuf>) {
        let Some(path) = path else {
            self.recorder.note("Export cancelled");
            return;
        };
        match self.recorder.export(&path) {
            Ok(_) => self
                .recorder
                .note(format!("Log exported to {}", path.display())),
            Err(e) => {
                log::error!("export to {} failed: {e}", path.display());
                self.raise_alert("Export Error", e.to_string());
            }
        }
    }

    pub fn save_plot(&mut self, path: Option<PathBuf>) {
        let Some(path) = path else {
            self.recorder.note("Save plot cancelled");
            return;
        };
        let points = self.visible_points();
        match save_series_png(&path, &points, &self.config.device_label, &PlotStyle::default()) {
            Ok(()) => self
                .recorder
                .note(format!("Plot saved to {}", path.display())),
            Err(e) => {
                log::error!("saving plot to {} failed: {e}", path.display());
                self.raise_alert("Plot Error", e.to_string());
            }
        }
    }

    /// Empties the log pane and the chart. `data.csv` keeps what it has.
    pub fn clear(&mut self) {
        self.recorder.clear();
        self.series.clear();
    }

    // ---- acquisition feed ----

    /// Handles at most `budget` queued messages; returns how many were handled.
    pub fn pump(&mut self, budget: usize) -> usize {
        let mut handled = 0;
        while handled < budget {
            match self.rx.try_recv() {
                Ok(msg) => {
                    self.handle_message(msg);
                    handled += 1;
                }
                Err(_) => break,
            }
        }
        handled
    }

    pub fn handle_message(&mut self, msg: DaqMessage) {
        match msg {
            DaqMessage::Sample(sample) => {
                // A CSV failure is already noted in the log; the reading still counts.
                self.recorder.record_sample(&sample).ok();
                self.series.add_point(sample.epoch_secs(), sample.value);
            }
            DaqMessage::Fault(fault) => {
                self.recorder.record_fault(&fault);
                self.raise_alert(
                    "UL Error",
                    format!(
                        "A UL error occurred. Code: {} Message: {}",
                        fault.code, fault.message
                    ),
                );
            }
            DaqMessage::Stopped => log::debug!("acquisition thread exited"),
        }
    }

    fn raise_alert(&mut self, title: &str, message: String) {
        if let Some(alert) = self.alerts.iter_mut().find(|a| a.title == title) {
            alert.message = message;
            alert.repeats += 1;
            return;
        }
        self.alerts.push_back(Alert {
            title: title.to_owned(),
            message,
            repeats: 0,
        });
    }
}

/// Appends `ext` when the chosen file name has no extension, as save dialogs
/// do not do it on every platform.
pub fn with_default_extension(mut path: PathBuf, ext: &str) -> PathBuf {
    if path.extension().is_none() {
        path.set_extension(ext);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverKind;
    use crate::drivers::ScriptedDevice;
    use crate::recorder::tests::{fault_at, read_csv, sample_at, temp_path};
    use crate::recorder::LogKind;
    use std::time::{Duration, Instant};

    fn state_with_csv(name: &str) -> (DaqState, PathBuf) {
        let path = temp_path(name);
        let config = DaqConfig {
            csv_path: path.clone(),
            min_interval_ms: 1,
            ..DaqConfig::default()
        };
        (DaqState::new(config), path)
    }

    fn kinds(state: &DaqState) -> Vec<LogKind> {
        state.lines().iter().map(|l| l.kind).collect()
    }

    #[test]
    fn three_good_reads_land_everywhere_in_order() {
        let (mut state, path) = state_with_csv("state-three.csv");
        for (i, v) in [1.23, 1.45, 1.10].into_iter().enumerate() {
            state.handle_message(DaqMessage::Sample(sample_at(i as u32, v)));
        }
        let rows = read_csv(&path);
        assert_eq!(rows.len(), 4);
        let values: Vec<&str> = rows[1..].iter().map(|r| r[2].as_str()).collect();
        assert_eq!(values, ["1.23", "1.45", "1.1"]);
        let ys: Vec<f64> = state.series().points().iter().map(|p| p[1]).collect();
        assert_eq!(ys, [1.23, 1.45, 1.10]);
        assert_eq!(state.lines().len(), 3);
        assert!(state.lines()[1].text.ends_with("Value: 1.45"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn fault_in_the_middle_is_logged_but_not_recorded() {
        let (mut state, path) = state_with_csv("state-fault.csv");
        state.handle_message(DaqMessage::Sample(sample_at(0, 1.23)));
        state.handle_message(DaqMessage::Fault(fault_at(1)));
        state.handle_message(DaqMessage::Sample(sample_at(2, 1.10)));
        assert_eq!(kinds(&state), [LogKind::Sample, LogKind::Fault, LogKind::Sample]);
        assert_eq!(read_csv(&path).len(), 3);
        assert_eq!(state.series().len(), 2);
        let alert = state.alert().unwrap();
        assert_eq!(alert.title, "UL Error");
        assert_eq!(
            alert.message,
            "A UL error occurred. Code: 16 Message: Board not responding"
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn repeated_faults_share_one_alert() {
        let (mut state, _) = state_with_csv("state-repeat.csv");
        for i in 0..3 {
            state.handle_message(DaqMessage::Fault(fault_at(i)));
        }
        assert_eq!(state.alert().unwrap().repeats, 2);
        state.dismiss_alert();
        assert!(state.alert().is_none());
        assert_eq!(state.lines().len(), 3);
    }

    #[test]
    fn pending_alert_is_not_replaced_by_another_kind() {
        let (mut state, _) = state_with_csv("state-queue.csv");
        let bad = temp_path("no-such-dir").join("out.csv");
        state.export(Some(bad));
        state.handle_message(DaqMessage::Fault(fault_at(0)));
        state.handle_message(DaqMessage::Fault(fault_at(1)));
        assert_eq!(state.alert().unwrap().title, "Export Error");
        state.dismiss_alert();
        let next = state.alert().unwrap();
        assert_eq!(next.title, "UL Error");
        assert_eq!(next.repeats, 1);
        state.dismiss_alert();
        assert!(state.alert().is_none());
    }

    #[test]
    fn export_contains_only_successful_reads() {
        let (mut state, path) = state_with_csv("state-export-src.csv");
        let out = temp_path("state-export-out.csv");
        for i in 0..5 {
            state.handle_message(DaqMessage::Sample(sample_at(i, i as f64)));
        }
        for i in 5..8 {
            state.handle_message(DaqMessage::Fault(fault_at(i)));
        }
        state.export(Some(out.clone()));
        assert_eq!(read_csv(&out).len(), 1 + 5);
        assert_eq!(
            state.lines().last().unwrap().text,
            format!("Log exported to {}", out.display())
        );
        std::fs::remove_file(&path).ok();
        std::fs::remove_file(&out).ok();
    }

    #[test]
    fn cancelled_export_is_informational() {
        let (mut state, _) = state_with_csv("state-cancel.csv");
        state.export(None);
        let last = state.lines().last().unwrap();
        assert_eq!(last.kind, LogKind::Info);
        assert_eq!(last.text, "Export cancelled");
        assert!(state.alert().is_none());
    }

    #[test]
    fn clear_resets_view_but_not_disk() {
        let (mut state, path) = state_with_csv("state-clear.csv");
        state.handle_message(DaqMessage::Sample(sample_at(0, 1.0)));
        state.handle_message(DaqMessage::Sample(sample_at(1, 2.0)));
        state.clear();
        assert!(state.lines().is_empty());
        assert!(state.series().is_empty());
        assert_eq!(read_csv(&path).len(), 3);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn default_extension_only_when_missing() {
        assert_eq!(
            with_default_extension(PathBuf::from("/tmp/run1"), "csv"),
            PathBuf::from("/tmp/run1.csv")
        );
        assert_eq!(
            with_default_extension(PathBuf::from("/tmp/run1.txt"), "csv"),
            PathBuf::from("/tmp/run1.txt")
        );
    }

    #[test]
    fn start_with_missing_library_raises_alert() {
        let (mut state, _) = state_with_csv("state-nolib.csv");
        state.config.driver = DriverKind::Mcc;
        state.config.library_path = Some("no-such-ul.dll".into());
        state.start();
        assert!(state.can_start());
        assert_eq!(state.alert().unwrap().title, "Device Error");
    }

    #[test]
    fn live_run_with_scripted_device() {
        let (mut state, path) = state_with_csv("state-live.csv");
        let device = ScriptedDevice::new("USB-1208FS-Plus", [Ok(1.23), Err(16), Ok(1.10)]);
        state.start_with(Box::new(device));
        assert!(state.can_stop() && !state.can_start());

        let second = ScriptedDevice::new("other", [Ok(9.9)]);
        state.start_with(Box::new(second));

        let deadline = Instant::now() + Duration::from_secs(5);
        while state.lines().len() < 3 && Instant::now() < deadline {
            if state.pump(1) == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        state.stop();
        assert!(state.can_start() && !state.can_stop());

        assert_eq!(
            kinds(&state)[..3],
            [LogKind::Sample, LogKind::Fault, LogKind::Sample]
        );
        let rows = read_csv(&path);
        assert_eq!(rows.len(), 3);
        assert!(rows[1..].iter().all(|r| r[1] == "USB-1208FS-Plus"));
        assert_eq!(state.series().len(), 2);
        std::fs::remove_file(&path).ok();
    }
}
