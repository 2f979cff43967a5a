//! # Pan/Tilt Core
//!
//! Núcleo do monitor do cabeçote de posicionamento: extrai PAN/TILT/HEIGHT
//! do texto recebido por serial ou TCP, mantém o histórico da sessão e
//! exporta para texto.
//!
//! ## Módulos
//! - [`types`] – Amostra e conjunto de campos
//! - [`parser`] – Convenções `PAN:`/`TILT:`/`HEIGHT:` e `P=`/`T=`/`H=`
//! - [`history`] – Janelas por campo e log de amostras
//! - [`export`] – Arquivo `timestamp,pan,tilt,height`
//! - [`commands`] – Handshake e keep-alive
//! - [`link`] – Porta serial e socket TCP
//! - [`session`] – Threads de leitura/comandos e channel para a UI
//! - [`config`] – Configuração unificada via TOML
//! - [`theme`] – Temas do dashboard
//! - [`error`] – Erros do monitor

pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod link;
pub mod parser;
pub mod session;
pub mod theme;
pub mod types;

// Re-exports convenientes
pub use config::AppConfig;
pub use error::MonitorError;
pub use history::{History, HistoryPolicy, TelemetryState};
pub use parser::{Grammar, parse_chunk};
pub use session::{Session, SessionEvent, SessionOptions};
pub use types::{Field, FieldSet, TelemetrySample};
