//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável; seções ausentes usam o padrão.

use crate::commands::CommandScript;
use crate::error::MonitorError;
use crate::history::HistoryPolicy;
use crate::parser::Grammar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Folga somada ao timeout de leitura ao esperar o link ser liberado.
const RELEASE_MARGIN_MS: u64 = 500;

/// Tipo de link com o cabeçote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    #[default]
    Serial,
    Tcp,
}

/// Paridade da porta serial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParityMode {
    None,
    #[default]
    Odd,
    Even,
}

/// Porta serial do cabeçote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Nome da porta (ex: "COM7", "/dev/ttyUSB0")
    pub port: String,
    pub baud_rate: u32,
    pub parity: ParityMode,
    /// Timeout de leitura em milissegundos
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "COM7".into(),
            baud_rate: 115_200,
            parity: ParityMode::Odd,
            timeout_ms: 1000,
        }
    }
}

/// Servidor TCP do cabeçote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    pub host: String,
    pub port: u16,
    /// Timeout de conexão em milissegundos
    pub connect_timeout_ms: u64,
    /// Timeout de leitura em milissegundos
    pub read_timeout_ms: u64,
    /// Tamanho máximo de cada leitura
    pub read_chunk: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: "192.1.0.41".into(),
            port: 30301,
            connect_timeout_ms: 3000,
            read_timeout_ms: 1000,
            read_chunk: 1024,
        }
    }
}

/// Link com o cabeçote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// "serial" ou "tcp"
    pub kind: LinkKind,
    /// Envia o handshake do tipo de link ao conectar
    pub send_handshake: bool,
    pub serial: SerialConfig,
    pub tcp: TcpConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            kind: LinkKind::Serial,
            send_handshake: true,
            serial: SerialConfig::default(),
            tcp: TcpConfig::default(),
        }
    }
}

impl LinkConfig {
    /// Descrição curta do destino (ex: "COM7 @ 115200").
    pub fn target(&self) -> String {
        match self.kind {
            LinkKind::Serial => format!("{} @ {}", self.serial.port, self.serial.baud_rate),
            LinkKind::Tcp => format!("{}:{}", self.tcp.host, self.tcp.port),
        }
    }

    /// Tempo para a thread de leitura sair e liberar o link após desconectar.
    pub fn release_timeout(&self) -> Duration {
        let read_timeout_ms = match self.kind {
            LinkKind::Serial => self.serial.timeout_ms,
            LinkKind::Tcp => self.tcp.read_timeout_ms,
        };
        Duration::from_millis(read_timeout_ms.max(1) + RELEASE_MARGIN_MS)
    }

    /// Script de comandos enviado ao conectar.
    pub fn command_script(&self) -> CommandScript {
        if !self.send_handshake {
            return CommandScript::none();
        }
        match self.kind {
            LinkKind::Serial => CommandScript::serial(),
            LinkKind::Tcp => CommandScript::tcp(),
        }
    }
}

/// Parser e histórico.
///
/// Campos ausentes seguem o tipo de link: serial usa `labelled` com janela
/// de 100 valores, TCP usa `compact` com histórico ilimitado.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// "labelled" (PAN:/TILT:/HEIGHT:) ou "compact" (P=/T=/H=)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar: Option<Grammar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryPolicy>,
}

impl TelemetryConfig {
    pub fn grammar_for(&self, kind: LinkKind) -> Grammar {
        self.grammar.unwrap_or(match kind {
            LinkKind::Serial => Grammar::Labelled,
            LinkKind::Tcp => Grammar::Compact,
        })
    }

    pub fn history_for(&self, kind: LinkKind) -> HistoryPolicy {
        self.history.unwrap_or(match kind {
            LinkKind::Serial => HistoryPolicy::default(),
            LinkKind::Tcp => HistoryPolicy::Unbounded,
        })
    }
}

/// Destino digitado no dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInputs {
    pub kind: LinkKind,
    pub serial_port: String,
    pub host: String,
    /// Texto livre; validado em [`AppConfig::with_link_inputs`].
    pub port: String,
}

impl LinkInputs {
    pub fn from_config(link: &LinkConfig) -> Self {
        Self {
            kind: link.kind,
            serial_port: link.serial.port.clone(),
            host: link.tcp.host.clone(),
            port: link.tcp.port.to_string(),
        }
    }
}

/// Dashboard egui.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Tema: "dark", "light" ou "high_contrast"
    pub theme: String,
    /// Intervalo de redesenho em milissegundos
    pub redraw_interval_ms: u64,
    /// Linhas mantidas no monitor de texto
    pub monitor_scrollback: usize,
    pub show_graphs: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            theme: "dark".into(),
            redraw_interval_ms: 100,
            monitor_scrollback: 500,
            show_graphs: true,
        }
    }
}

impl DashboardConfig {
    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(self.redraw_interval_ms)
    }
}

/// Exportação.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub default_path: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_path: "telemetria.txt".into(),
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub link: LinkConfig,
    pub telemetry: TelemetryConfig,
    pub dashboard: DashboardConfig,
    pub export: ExportConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), MonitorError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| MonitorError::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| MonitorError::Config(format!("{}: {e}", path.display())))?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        match self.link.kind {
            LinkKind::Serial => {
                if self.link.serial.port.trim().is_empty() {
                    errors.push("Porta serial não pode ser vazia".into());
                }
                if self.link.serial.baud_rate == 0 {
                    errors.push("Baud rate não pode ser 0".into());
                }
            }
            LinkKind::Tcp => {
                if self.link.tcp.host.trim().is_empty() {
                    errors.push("Host TCP não pode ser vazio".into());
                }
                if self.link.tcp.port == 0 {
                    errors.push("Porta TCP não pode ser 0".into());
                }
                if self.link.tcp.read_chunk == 0 {
                    errors.push("read_chunk não pode ser 0".into());
                }
            }
        }
        if let HistoryPolicy::Rolling { window } = self.telemetry.history_for(self.link.kind) {
            if window == 0 {
                errors.push("Janela do histórico não pode ser 0".into());
            }
        }
        if self.dashboard.redraw_interval_ms < 16 || self.dashboard.redraw_interval_ms > 5000 {
            errors.push(format!(
                "Intervalo de redesenho inválido: {} ms (16–5000)",
                self.dashboard.redraw_interval_ms
            ));
        }

        errors
    }

    /// Copia a configuração com o destino digitado e valida o resultado.
    pub fn with_link_inputs(&self, inputs: &LinkInputs) -> Result<AppConfig, Vec<String>> {
        let mut config = self.clone();
        let mut errors = Vec::new();

        config.link.kind = inputs.kind;
        match inputs.kind {
            LinkKind::Serial => config.link.serial.port = inputs.serial_port.trim().to_string(),
            LinkKind::Tcp => {
                config.link.tcp.host = inputs.host.trim().to_string();
                match inputs.port.trim().parse::<u16>() {
                    Ok(port) => config.link.tcp.port = port,
                    Err(_) => errors.push(format!("Porta TCP inválida: \"{}\"", inputs.port.trim())),
                }
            }
        }
        errors.extend(config.validate());

        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.link.serial.port, parsed.link.serial.port);
        assert_eq!(config.telemetry.history, parsed.telemetry.history);
        assert_eq!(config.dashboard.theme, parsed.dashboard.theme);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[link]
kind = "tcp"

[link.tcp]
port = 9999

[telemetry]
grammar = "compact"

[telemetry.history]
policy = "unbounded"
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.link.kind, LinkKind::Tcp);
        assert_eq!(config.link.tcp.port, 9999);
        // Outros campos devem ter valor padrão
        assert_eq!(config.link.tcp.host, "192.1.0.41");
        assert_eq!(config.link.serial.parity, ParityMode::Odd);
        assert_eq!(config.telemetry.grammar, Some(Grammar::Compact));
        assert_eq!(config.telemetry.history, Some(HistoryPolicy::Unbounded));
        assert_eq!(config.dashboard.redraw_interval_ms, 100);
    }

    #[test]
    fn rolling_window_from_toml() {
        let config: AppConfig = toml::from_str(
            r#"
[telemetry.history]
policy = "rolling"
window = 250
"#,
        )
        .unwrap();
        assert_eq!(config.telemetry.history, Some(HistoryPolicy::Rolling { window: 250 }));
        assert_eq!(
            config.telemetry.history_for(LinkKind::Tcp),
            HistoryPolicy::Rolling { window: 250 }
        );
    }

    #[test]
    fn handshake_follows_link_kind() {
        let mut link = LinkConfig::default();
        assert_eq!(link.command_script(), CommandScript::serial());
        link.kind = LinkKind::Tcp;
        assert_eq!(link.command_script(), CommandScript::tcp());
        link.send_handshake = false;
        assert!(link.command_script().steps.is_empty());
    }

    #[test]
    fn invalid_tcp_port_is_reported() {
        let mut config = AppConfig::default();
        config.link.kind = LinkKind::Tcp;
        config.link.tcp.port = 0;
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn telemetry_defaults_follow_link_kind() {
        let config: AppConfig = toml::from_str("[link]\nkind = \"tcp\"\n").unwrap();
        let telemetry = &config.telemetry;
        assert_eq!(telemetry.grammar_for(config.link.kind), Grammar::Compact);
        assert_eq!(telemetry.history_for(config.link.kind), HistoryPolicy::Unbounded);
        assert_eq!(telemetry.grammar_for(LinkKind::Serial), Grammar::Labelled);
        assert_eq!(
            telemetry.history_for(LinkKind::Serial),
            HistoryPolicy::Rolling { window: 100 }
        );

        let explicit = TelemetryConfig {
            grammar: Some(Grammar::Labelled),
            history: None,
        };
        assert_eq!(explicit.grammar_for(LinkKind::Tcp), Grammar::Labelled);
    }

    #[test]
    fn link_inputs_replace_target() {
        let config = AppConfig::default();
        let inputs = LinkInputs {
            kind: LinkKind::Tcp,
            serial_port: String::new(),
            host: " 10.0.0.7 ".into(),
            port: "4001".into(),
        };
        let updated = config.with_link_inputs(&inputs).unwrap();
        assert_eq!(updated.link.kind, LinkKind::Tcp);
        assert_eq!(updated.link.target(), "10.0.0.7:4001");
        // Original intacto
        assert_eq!(config.link.kind, LinkKind::Serial);
        assert_eq!(LinkInputs::from_config(&updated.link), LinkInputs {
            serial_port: "COM7".into(),
            host: "10.0.0.7".into(),
            ..inputs
        });
    }

    #[test]
    fn invalid_link_inputs_are_reported() {
        let config = AppConfig::default();
        let mut inputs = LinkInputs::from_config(&config.link);
        inputs.kind = LinkKind::Tcp;
        inputs.port = "abc".into();
        inputs.host = "  ".into();
        let errors = config.with_link_inputs(&inputs).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("abc"));

        inputs.kind = LinkKind::Serial;
        inputs.serial_port = String::new();
        assert_eq!(config.with_link_inputs(&inputs).unwrap_err().len(), 1);
    }

    #[test]
    fn release_timeout_covers_read_timeout() {
        let mut link = LinkConfig::default();
        link.serial.timeout_ms = 200;
        assert_eq!(link.release_timeout(), Duration::from_millis(700));
        link.kind = LinkKind::Tcp;
        assert_eq!(link.release_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn every_theme_name_is_accepted() {
        for name in crate::theme::theme_names() {
            let config: AppConfig =
                toml::from_str(&format!("[dashboard]\ntheme = \"{name}\"\n")).unwrap();
            assert_eq!(crate::theme::get_theme(&config.dashboard.theme).name, name);
        }
    }
}
