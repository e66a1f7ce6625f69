// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod config;
mod drivers;
mod engine;
mod gui;
mod plotter;
mod recorder;
mod state;
mod types;
use config::DaqConfig;
use eframe::egui;
fn main() -> eframe::Result<()> {
    env_logger::init();
    let config = match DaqConfig::discover() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e:#}; falling back to default config");
            DaqConfig::default()
        }
    };
    log::info!("starting with {config:?}");
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([900.0, 700.0])
        .with_min_inner_size([600.0, 450.0])
        .with_title("Data Acquisition");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "Data Acquisition",
        options,
        Box::new(move |cc| Box::new(gui::DaqApp::new(cc, config))),
    )
}
