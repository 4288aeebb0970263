mod app;
mod color;
mod config;
mod data;
mod error;
mod state;
mod ui;

use app::CellKpiApp;
use config::ViewerConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = ViewerConfig::discover().unwrap_or_else(|e| {
        log::error!("{e}; falling back to default settings");
        ViewerConfig::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Cell KPI Viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(CellKpiApp::new(&config)))),
    )
}
