//! # Pan/Tilt Monitor
//!
//! Dashboard do cabeçote de posicionamento com GUI via eframe/egui.
//!
//! Conecta por serial ou TCP, mostra PAN/TILT/HEIGHT ao vivo, o monitor
//! de texto e os gráficos do histórico, e exporta as amostras para TXT.
//!
//! ## Atalhos
//! - `F11`: Fullscreen
//! - `G`: Toggle gráficos
//! - `T`: Alternar tema

mod dashboard;
mod panels;
mod theme_egui;

use dashboard::MonitorDashboard;
use pantilt_core::config::AppConfig;
use tracing::warn;

fn main() -> eframe::Result<()> {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Config ──
    let config_path = AppConfig::default_path();
    let config = AppConfig::load(&config_path);

    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("{e}");
        }
    }
    for problem in config.validate() {
        warn!("Config: {problem}");
    }

    // ── Janela eframe ──
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("Pan/Tilt Monitor")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([960.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Pan/Tilt Monitor",
        options,
        Box::new(move |cc| Ok(Box::new(MonitorDashboard::new(cc, config)))),
    )
}
