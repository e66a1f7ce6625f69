// src/gui.rs
use eframe::egui;
use egui::{Color32, RichText};
use egui_plot::{GridInput, GridMark, Legend, Line, Plot, PlotPoints, Points};
use std::time::Duration;
use crate::config::DaqConfig;
use crate::plotter::{format_time, tick_format, time_ticks};
use crate::recorder::LogKind;
use crate::state::{with_default_extension, DaqState};
use crate::types::TIMESTAMP_FORMAT;

// Messages handled per frame; the rest wait for the next frame.
const MAX_MESSAGES_PER_FRAME: usize = 500;
const RUNNING_REPAINT: Duration = Duration::from_millis(50);
const IDLE_REPAINT: Duration = Duration::from_millis(500);
const LINE_COLOR: Color32 = Color32::from_rgb(31, 119, 180);

pub struct DaqApp {
    state: DaqState,
}

impl DaqApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: DaqConfig) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());
        log::info!(
            "recording to {} from {}",
            config.csv_path.display(),
            config.device_label
        );
        Self {
            state: DaqState::new(config),
        }
    }

    fn buttons(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.state.can_start(), egui::Button::new("Start Acquisition"))
                .clicked()
            {
                self.state.start();
            }
            if ui
                .add_enabled(self.state.can_stop(), egui::Button::new("Stop Acquisition"))
                .clicked()
            {
                self.state.stop();
            }
            if ui.button("Export to CSV").clicked() {
                let path = rfd::FileDialog::new()
                    .set_file_name("export.csv")
                    .add_filter("CSV Files", &["csv"])
                    .save_file()
                    .map(|p| with_default_extension(p, "csv"));
                self.state.export(path);
            }
            if ui.button("Clear Data").clicked() {
                self.state.clear();
            }
            if ui
                .add_enabled(!self.state.series().is_empty(), egui::Button::new("Save Plot"))
                .clicked()
            {
                let path = rfd::FileDialog::new()
                    .set_file_name("plot.png")
                    .add_filter("PNG Images", &["png"])
                    .save_file()
                    .map(|p| with_default_extension(p, "png"));
                self.state.save_plot(path);
            }
            ui.separator();
            let status = if self.state.is_running() { "running" } else { "idle" };
            ui.label(format!(
                "{status} | {} points | {}",
                self.state.series().len(),
                self.state.csv_path().display()
            ));
        });
    }

    fn log_pane(&self, ui: &mut egui::Ui) {
        let lines = self.state.lines();
        let row_height = ui.text_style_height(&egui::TextStyle::Monospace);
        egui::ScrollArea::vertical()
            .max_height(180.0)
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show_rows(ui, row_height, lines.len(), |ui, rows| {
                for line in &lines[rows] {
                    let color = match line.kind {
                        LogKind::Sample => ui.visuals().text_color(),
                        LogKind::Fault => Color32::from_rgb(200, 40, 40),
                        LogKind::Info => Color32::GRAY,
                    };
                    ui.label(RichText::new(&line.text).monospace().color(color));
                }
            });
    }

    fn chart(&self, ui: &mut egui::Ui) {
        let points = self.state.visible_points();
        let label = self.state.config().device_label.clone();
        Plot::new("series")
            .legend(Legend::default())
            .y_axis_label("Volts")
            .x_grid_spacer(time_grid_spacer)
            .x_axis_formatter(|mark, _chars, _range| {
                format_time(mark.value, tick_format(mark.step_size))
            })
            .label_formatter(|_name, p| {
                format!("{}\n{:.4} V", format_time(p.x, TIMESTAMP_FORMAT), p.y)
            })
            .show(ui, |plot_ui| {
                if points.is_empty() {
                    return;
                }
                plot_ui.line(
                    Line::new(PlotPoints::new(points.clone()))
                        .color(LINE_COLOR)
                        .name(label),
                );
                plot_ui.points(Points::new(points).radius(2.5).color(LINE_COLOR));
            });
    }

    fn alert_dialog(&mut self, ctx: &egui::Context) {
        let Some(alert) = self.state.alert().cloned() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new(alert.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(alert.message.as_str());
                if alert.repeats > 0 {
                    ui.small(format!("{} more since this dialog opened", alert.repeats));
                }
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.state.dismiss_alert();
        }
    }
}

/// Major grid lines on round wall-clock steps (1 s, 5 s, 1 min, ...).
fn time_grid_spacer(input: GridInput) -> Vec<GridMark> {
    let (min, max) = input.bounds;
    let (step, ticks) = time_ticks(min, max);
    ticks
        .into_iter()
        .map(|value| GridMark {
            value,
            step_size: step,
        })
        .collect()
}

impl eframe::App for DaqApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. drain the acquisition channel
        let handled = self.state.pump(MAX_MESSAGES_PER_FRAME);
        if handled == MAX_MESSAGES_PER_FRAME {
            ctx.request_repaint();
        } else if self.state.is_running() {
            ctx.request_repaint_after(RUNNING_REPAINT);
        } else {
            // a stopped loop may still deliver its last reading
            ctx.request_repaint_after(IDLE_REPAINT);
        }

        // 2. UI
        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.add_space(6.0);
            self.buttons(ui);
            ui.add_space(6.0);
        });
        egui::TopBottomPanel::top("log").resizable(true).show(ctx, |ui| {
            self.log_pane(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart(ui);
        });

        self.alert_dialog(ctx);
    }
}
