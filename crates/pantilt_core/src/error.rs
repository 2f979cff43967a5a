//! Erros do monitor.
//!
//! Nenhum deles é fatal: a sessão registra, avisa a UI e o usuário pode
//! reconectar.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Falha ao abrir {target}: {source}")]
    TransportOpen {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Erro ao ler do link: {0}")]
    TransportRead(#[source] std::io::Error),

    #[error("Erro ao enviar comando: {0}")]
    TransportWrite(#[source] std::io::Error),

    #[error("Bytes não UTF-8 no offset {offset}; chunk de {len} bytes descartado")]
    Decode { offset: usize, len: usize },

    #[error("Falha ao exportar para {}: {source}", path.display())]
    ExportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuração inválida: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
