//! Painéis do dashboard renderizados com egui.

use crate::dashboard::{LineKind, LogLine};
use crate::theme_egui::EguiTheme;
use egui::{Color32, RichText, Ui};
use egui_plot::{Line, Plot, PlotPoints};
use pantilt_core::Field;
use pantilt_core::TelemetrySample;
use std::collections::VecDeque;

/// Amostras mostradas no log de timestamps.
const SAMPLE_LOG_ROWS: usize = 200;

// ──────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────

fn metric_row(ui: &mut Ui, label: &str, value: &str, color: Color32, dim: Color32) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(RichText::new(format!("{label}:")).color(dim).monospace());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui: &mut Ui| {
            ui.label(RichText::new(value).color(color).monospace().strong());
        });
    });
}

fn panel_frame(
    ui: &mut Ui,
    title: &str,
    accent: Color32,
    theme: &EguiTheme,
    add_body: impl FnOnce(&mut Ui),
) {
    egui::Frame::new()
        .fill(theme.panel)
        .stroke(egui::Stroke::new(2.0, accent))
        .corner_radius(4.0)
        .inner_margin(8.0)
        .show(ui, |ui: &mut Ui| {
            ui.vertical_centered(|ui: &mut Ui| {
                ui.label(
                    RichText::new(format!("── {title} ──"))
                        .color(accent)
                        .strong()
                        .monospace()
                        .size(13.0),
                );
            });
            ui.add_space(4.0);
            add_body(ui);
        });
}

// ──────────────────────────────────────────
// Eixos
// ──────────────────────────────────────────

/// Valor atual de um eixo e quantos pontos há na série.
pub fn render_axis(ui: &mut Ui, field: Field, latest: Option<u32>, points: usize, theme: &EguiTheme) {
    let accent = theme.field_color(field);
    panel_frame(ui, field.label(), accent, theme, |ui: &mut Ui| {
        ui.vertical_centered(|ui: &mut Ui| {
            let text = latest.map_or_else(|| "—".to_string(), |v| v.to_string());
            ui.label(RichText::new(text).color(accent).monospace().strong().size(28.0));
        });
        metric_row(ui, "Pontos", &points.to_string(), theme.text, theme.dim);
    });
}

/// Gráfico de uma série, com margem de 10 unidades acima e abaixo.
pub fn render_series(
    ui: &mut Ui,
    field: Field,
    points: &[[f64; 2]],
    theme: &EguiTheme,
    width: f32,
    height: f32,
) {
    let color = theme.field_color(field);
    ui.label(RichText::new(field.label()).color(color).monospace().size(11.0));

    let (lo, hi) = points
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p[1]), hi.max(p[1])));
    let line = Line::new(PlotPoints::from(points.to_vec()))
        .color(color)
        .width(1.5)
        .name(field.label());

    let mut plot = Plot::new(format!("plot_{}", field.label()))
        .height(height)
        .width(width)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false);
    if !points.is_empty() {
        plot = plot.include_y(lo - 10.0).include_y(hi + 10.0);
    }
    plot.show(ui, |plot_ui| {
        plot_ui.line(line);
    });
}

// ──────────────────────────────────────────
// Logs
// ──────────────────────────────────────────

fn line_color(kind: LineKind, theme: &EguiTheme) -> Color32 {
    match kind {
        LineKind::Info => theme.dim,
        LineKind::Received => theme.text,
        LineKind::Sent => theme.sent,
        LineKind::Error => theme.error,
    }
}

/// Monitor de texto: recebido, enviado, erros.
pub fn render_monitor(ui: &mut Ui, lines: &VecDeque<LogLine>, theme: &EguiTheme, height: f32) {
    panel_frame(ui, "MONITOR", theme.title, theme, |ui: &mut Ui| {
        egui::ScrollArea::vertical()
            .id_salt("monitor_log")
            .max_height(height)
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui: &mut Ui| {
                for line in lines {
                    ui.label(
                        RichText::new(&line.text)
                            .color(line_color(line.kind, theme))
                            .monospace()
                            .size(11.0),
                    );
                }
            });
    });
}

/// Últimas amostras completas no formato da exportação.
pub fn render_sample_log(
    ui: &mut Ui,
    samples: &[TelemetrySample],
    theme: &EguiTheme,
    height: f32,
) {
    let title = format!("TIMESTAMP,PAN,TILT,HEIGHT ({})", samples.len());
    panel_frame(ui, &title, theme.title, theme, |ui: &mut Ui| {
        egui::ScrollArea::vertical()
            .id_salt("sample_log")
            .max_height(height)
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui: &mut Ui| {
                if samples.is_empty() {
                    ui.label(RichText::new("Sem amostras").color(theme.dim).monospace());
                }
                let skip = samples.len().saturating_sub(SAMPLE_LOG_ROWS);
                for s in &samples[skip..] {
                    ui.label(
                        RichText::new(s.to_line())
                            .color(theme.text)
                            .monospace()
                            .size(11.0),
                    );
                }
            });
    });
}
