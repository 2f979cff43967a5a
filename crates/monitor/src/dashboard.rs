//! Dashboard principal – App eframe/egui.

use crate::panels;
use crate::theme_egui::{self, EguiTheme};
use egui::RichText;
use pantilt_core::config::{AppConfig, LinkInputs, LinkKind};
use pantilt_core::export::export_history;
use pantilt_core::session::{CloseReason, Drained};
use pantilt_core::{Field, History, Session, SessionEvent};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{info, warn};

const PLOT_HEIGHT: f32 = 140.0;
const LOG_HEIGHT: f32 = 160.0;

/// Tipo de linha no monitor de texto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Info,
    Received,
    Sent,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub kind: LineKind,
    pub text: String,
}

impl LogLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Linhas do monitor para um evento da sessão.
fn describe_event(event: &SessionEvent) -> Vec<LogLine> {
    match event {
        SessionEvent::Connected { peer } => {
            vec![LogLine::new(LineKind::Info, format!("Conectado a {peer}."))]
        }
        SessionEvent::Received(text) => text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .map(|l| LogLine::new(LineKind::Received, format!("Recebido: {l}")))
            .collect(),
        SessionEvent::Fields { .. } => Vec::new(),
        SessionEvent::Rejected(r) => vec![LogLine::new(LineKind::Info, format!("Descartado: {r}"))],
        SessionEvent::Sent(cmd) => vec![LogLine::new(LineKind::Sent, format!("Enviado: {cmd}"))],
        SessionEvent::Error(e) => vec![LogLine::new(LineKind::Error, e.to_string())],
        SessionEvent::Closed(reason) => {
            let line = match reason {
                CloseReason::Disconnected => LogLine::new(LineKind::Info, "Desconectado."),
                CloseReason::RemoteClosed => {
                    LogLine::new(LineKind::Error, "Conexão encerrada pelo cabeçote.")
                }
                CloseReason::ReadFailed => LogLine::new(LineKind::Error, "Leitura interrompida."),
            };
            vec![line]
        }
    }
}

/// Pontos `[índice, valor]` de cada eixo, refeitos só quando chegam dados.
#[derive(Default)]
struct PlotCache {
    series: [Vec<[f64; 2]>; 3],
}

impl PlotCache {
    fn rebuild(&mut self, history: &History) {
        for (slot, field) in self.series.iter_mut().zip(Field::ALL) {
            *slot = history
                .series(field)
                .into_iter()
                .enumerate()
                .map(|(i, v)| [i as f64, f64::from(v)])
                .collect();
        }
    }

    fn points(&self, field: Field) -> &[[f64; 2]] {
        let idx = Field::ALL.iter().position(|f| *f == field).unwrap_or(0);
        &self.series[idx]
    }

    fn clear(&mut self) {
        self.series.iter_mut().for_each(Vec::clear);
    }
}

/// Estado do dashboard.
pub struct MonitorDashboard {
    config: AppConfig,
    theme: EguiTheme,
    theme_index: usize,
    all_themes: Vec<EguiTheme>,

    // Sessão atual (mantida após desconectar para permitir exportar)
    session: Option<Session>,

    // Monitor de texto
    log: VecDeque<LogLine>,

    // Entradas
    link_inputs: LinkInputs,
    command_input: String,
    export_path: String,

    plots: PlotCache,

    // UI state
    show_graphs: bool,
    is_fullscreen: bool,
}

impl MonitorDashboard {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let dash = &config.dashboard;

        let all_themes = theme_egui::all_themes();
        let theme_index = all_themes
            .iter()
            .position(|t| t.name == dash.theme)
            .unwrap_or(0);
        let theme = all_themes[theme_index].clone();

        Self {
            export_path: config.export.default_path.clone(),
            link_inputs: LinkInputs::from_config(&config.link),
            show_graphs: dash.show_graphs,
            config,
            theme,
            theme_index,
            all_themes,
            session: None,
            log: VecDeque::new(),
            command_input: String::new(),
            plots: PlotCache::default(),
            is_fullscreen: false,
        }
    }

    fn push_log(&mut self, line: LogLine) {
        push_bounded(&mut self.log, line, self.config.dashboard.monitor_scrollback);
    }

    fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_connected)
    }

    // ── Ações ──

    fn connect(&mut self) {
        if self.is_connected() {
            return;
        }
        let config = match self.config.with_link_inputs(&self.link_inputs) {
            Ok(config) => config,
            Err(problems) => {
                for problem in problems {
                    warn!("Config: {problem}");
                    self.push_log(LogLine::new(LineKind::Error, problem));
                }
                return;
            }
        };

        // Sessão anterior e seu histórico são descartados; o link antigo
        // precisa ser solto antes de reabrir a mesma porta
        if let Some(mut old) = self.session.take() {
            old.close(self.config.link.release_timeout());
        }
        self.plots.clear();
        self.config = config;

        let target = self.config.link.target();
        info!("Conectando a {target}...");
        match Session::connect(&self.config) {
            Ok(session) => self.session = Some(session),
            Err(e) => {
                warn!("{e}");
                self.push_log(LogLine::new(LineKind::Error, e.to_string()));
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.disconnect();
        }
    }

    fn send_command(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let line = match session.send_command(&self.command_input) {
            Ok(Some(cmd)) => LogLine::new(LineKind::Sent, format!("Enviado: {cmd}")),
            Ok(None) => return,
            Err(e) => LogLine::new(LineKind::Error, e.to_string()),
        };
        self.command_input.clear();
        self.push_log(line);
    }

    fn export(&mut self) {
        let samples = self
            .session
            .as_ref()
            .map(|s| s.state().history().samples())
            .unwrap_or_default();
        let line = match export_history(samples, Path::new(self.export_path.trim())) {
            Ok((path, n)) => LogLine::new(
                LineKind::Info,
                format!("{n} amostras exportadas para {}", path.display()),
            ),
            Err(e) => {
                warn!("{e}");
                LogLine::new(LineKind::Error, e.to_string())
            }
        };
        self.push_log(line);
    }

    /// Processa eventos pendentes da sessão.
    fn poll_session(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let drained: Drained = session.drain();
        if drained.has_new_data() {
            self.plots.rebuild(session.state().history());
        }
        for event in &drained.events {
            for line in describe_event(event) {
                self.push_log(line);
            }
        }
    }

    // ── Render ──

    fn render_toolbar(&mut self, ui: &mut egui::Ui) {
        let connected = self.is_connected();
        ui.horizontal(|ui: &mut egui::Ui| {
            ui.add_enabled_ui(!connected, |ui: &mut egui::Ui| {
                self.render_link_inputs(ui);
            });
            if ui.add_enabled(!connected, egui::Button::new("Conectar")).clicked() {
                self.connect();
            }
            if ui.add_enabled(connected, egui::Button::new("Desconectar")).clicked() {
                self.disconnect();
            }

            ui.separator();
            let resp = ui.add_enabled(
                connected,
                egui::TextEdit::singleline(&mut self.command_input)
                    .hint_text("comando")
                    .desired_width(160.0),
            );
            let enter = resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.add_enabled(connected, egui::Button::new("Enviar")).clicked() || enter {
                self.send_command();
            }

            ui.separator();
            ui.add(egui::TextEdit::singleline(&mut self.export_path).desired_width(200.0));
            if ui.button("Exportar TXT").clicked() {
                self.export();
            }
        });
    }

    fn render_link_inputs(&mut self, ui: &mut egui::Ui) {
        let inputs = &mut self.link_inputs;
        egui::ComboBox::from_id_salt("link_kind")
            .selected_text(link_kind_label(inputs.kind))
            .width(70.0)
            .show_ui(ui, |ui: &mut egui::Ui| {
                for kind in [LinkKind::Serial, LinkKind::Tcp] {
                    ui.selectable_value(&mut inputs.kind, kind, link_kind_label(kind));
                }
            });
        match inputs.kind {
            LinkKind::Serial => {
                ui.add(
                    egui::TextEdit::singleline(&mut inputs.serial_port)
                        .hint_text("porta")
                        .desired_width(110.0),
                );
            }
            LinkKind::Tcp => {
                ui.add(
                    egui::TextEdit::singleline(&mut inputs.host)
                        .hint_text("IP")
                        .desired_width(110.0),
                );
                ui.add(
                    egui::TextEdit::singleline(&mut inputs.port)
                        .hint_text("porta")
                        .desired_width(50.0),
                );
            }
        }
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui: &mut egui::Ui| match &self.session {
            Some(session) if session.is_connected() => {
                let last = session
                    .state()
                    .last_update()
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "—".into());
                ui.label(
                    RichText::new(format!(
                        "● Conectado a {} | {} amostras | último dado {last}",
                        session.peer(),
                        session.state().history().len()
                    ))
                    .color(self.theme.online)
                    .monospace(),
                );
            }
            _ => {
                ui.label(
                    RichText::new(format!("○ Desconectado ({})", self.config.link.target()))
                        .color(self.theme.error)
                        .monospace(),
                );
            }
        });
    }

    fn render_graphs(&self, ui: &mut egui::Ui) {
        let w = (ui.available_width() / 3.0) - 8.0;
        ui.horizontal(|ui: &mut egui::Ui| {
            for field in Field::ALL {
                ui.vertical(|ui: &mut egui::Ui| {
                    let points = self.plots.points(field);
                    panels::render_series(ui, field, points, &self.theme, w, PLOT_HEIGHT);
                });
            }
        });
    }
}

fn link_kind_label(kind: LinkKind) -> &'static str {
    match kind {
        LinkKind::Serial => "Serial",
        LinkKind::Tcp => "TCP",
    }
}

fn push_bounded(log: &mut VecDeque<LogLine>, line: LogLine, max: usize) {
    while log.len() >= max.max(1) {
        log.pop_front();
    }
    log.push_back(line);
}

impl eframe::App for MonitorDashboard {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ── Poll sessão ──
        self.poll_session();

        // ── Redesenho em intervalo fixo ──
        ctx.request_repaint_after(self.config.dashboard.redraw_interval());

        // ── Configurar estilo visual baseado no tema ──
        let mut visuals = if self.theme.name == "light" {
            egui::Visuals::light()
        } else {
            egui::Visuals::dark()
        };
        visuals.panel_fill = self.theme.bg;
        visuals.window_fill = self.theme.panel;
        visuals.override_text_color = Some(self.theme.text);
        ctx.set_visuals(visuals);

        // ── Atalhos de teclado (fora dos campos de texto) ──
        if !ctx.wants_keyboard_input() {
            ctx.input(|i: &egui::InputState| {
                if i.key_pressed(egui::Key::G) {
                    self.show_graphs = !self.show_graphs;
                }
                if i.key_pressed(egui::Key::T) {
                    self.theme_index = (self.theme_index + 1) % self.all_themes.len();
                    self.theme = self.all_themes[self.theme_index].clone();
                    info!("Tema: {}", self.theme.name);
                }
                if i.key_pressed(egui::Key::F11) {
                    self.is_fullscreen = !self.is_fullscreen;
                    ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.is_fullscreen));
                }
            });
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui: &mut egui::Ui| {
            ui.add_space(4.0);
            self.render_toolbar(ui);
            ui.add_space(4.0);
        });

        // ── Painel central ──
        egui::CentralPanel::default().show(ctx, |ui: &mut egui::Ui| {
            ui.vertical_centered(|ui: &mut egui::Ui| {
                ui.label(
                    RichText::new("PAN / TILT / HEIGHT")
                        .color(self.theme.title)
                        .size(22.0)
                        .strong()
                        .monospace(),
                );
            });
            self.render_status(ui);
            ui.add_space(8.0);

            // ── Valores atuais ──
            let state = self.session.as_ref().map(Session::state);
            ui.columns(3, |cols| {
                for (col, field) in cols.iter_mut().zip(Field::ALL) {
                    let latest = state.and_then(|s| s.latest(field));
                    let points = self.plots.points(field).len();
                    panels::render_axis(col, field, latest, points, &self.theme);
                }
            });

            // ── Gráficos ──
            if self.show_graphs {
                ui.add_space(8.0);
                ui.separator();
                self.render_graphs(ui);
            }

            ui.add_space(8.0);
            let samples = state.map(|s| s.history().samples()).unwrap_or_default();
            ui.columns(2, |cols| {
                panels::render_monitor(&mut cols[0], &self.log, &self.theme, LOG_HEIGHT);
                panels::render_sample_log(&mut cols[1], samples, &self.theme, LOG_HEIGHT);
            });

            // ── Help bar (fundo) ──
            ui.with_layout(egui::Layout::bottom_up(egui::Align::Center), |ui: &mut egui::Ui| {
                ui.label(
                    RichText::new("[F11] Fullscreen | [G] Gráficos | [T] Tema")
                        .color(self.theme.dim)
                        .monospace()
                        .size(10.0),
                );
            });
        });
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pantilt_core::HistoryPolicy;
    use pantilt_core::types::FieldSet;

    #[test]
    fn received_chunk_becomes_one_line_per_text_line() {
        let lines = describe_event(&SessionEvent::Received("PAN: 1\r\n\r\nTILT: 2\n".into()));
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Recebido: PAN: 1", "Recebido: TILT: 2"]);
        assert!(lines.iter().all(|l| l.kind == LineKind::Received));
    }

    #[test]
    fn remote_close_is_shown_as_error() {
        let lines = describe_event(&SessionEvent::Closed(CloseReason::RemoteClosed));
        assert_eq!(lines[0].kind, LineKind::Error);
    }

    #[test]
    fn log_respects_scrollback() {
        let mut log = VecDeque::new();
        for i in 0..10 {
            push_bounded(&mut log, LogLine::new(LineKind::Info, i.to_string()), 3);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].text, "7");
    }

    #[test]
    fn plot_cache_follows_history_series() {
        let mut history = History::new(HistoryPolicy::Rolling { window: 2 });
        let at = chrono::Local::now().naive_local();
        history.record(at, &FieldSet::full(5, 6, 7));
        history.record(at, &FieldSet::full(8, 9, 10));
        history.record(at, &FieldSet::full(11, 12, 13));

        let mut cache = PlotCache::default();
        cache.rebuild(&history);
        assert_eq!(cache.points(Field::Pan), &[[0.0, 8.0], [1.0, 11.0]]);
        assert_eq!(cache.points(Field::Height).len(), 2);

        cache.clear();
        assert!(cache.points(Field::Tilt).is_empty());
    }
}
