//! Sequências de comandos enviadas ao cabeçote ao conectar.

use std::time::Duration;

/// Terminador de comando (Enter).
pub const CR: u8 = b'\r';
const ESC: u8 = 0x1b;

/// Um envio seguido de uma espera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    pub bytes: Vec<u8>,
    pub delay_after: Duration,
}

impl CommandStep {
    pub fn new(bytes: impl Into<Vec<u8>>, delay_after: Duration) -> Self {
        Self {
            bytes: bytes.into(),
            delay_after,
        }
    }

    /// Texto legível para o log do monitor (CR/ESC escapados).
    pub fn describe(&self) -> String {
        describe_bytes(&self.bytes)
    }
}

/// Comando repetido periodicamente até desconectar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAlive {
    pub bytes: Vec<u8>,
    pub interval: Duration,
}

/// Handshake inicial mais keep-alive opcional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandScript {
    pub steps: Vec<CommandStep>,
    pub keep_alive: Option<KeepAlive>,
}

impl CommandScript {
    /// Script vazio (nenhum envio automático).
    pub fn none() -> Self {
        Self::default()
    }

    /// Cabeçote serial: `M`, `8`, `3`, `R` com 1 s entre eles, depois `R` a cada 1 s.
    pub fn serial() -> Self {
        let second = Duration::from_secs(1);
        Self {
            steps: ["M", "8", "3", "R"]
                .iter()
                .map(|cmd| CommandStep::new(with_cr(cmd), second))
                .collect(),
            keep_alive: Some(KeepAlive {
                bytes: with_cr("R"),
                interval: second,
            }),
        }
    }

    /// Cabeçote TCP: menu de configuração, depois `6`+CR e `a`+CR.
    pub fn tcp() -> Self {
        let half = Duration::from_millis(500);
        let menu: [&[u8]; 12] = [
            b"5", &[CR], &[ESC], b"mc", &[ESC], &[CR], b"R", &[CR], b"M", &[CR], b"A", &[CR],
        ];
        let mut steps: Vec<CommandStep> = menu
            .iter()
            .map(|bytes| CommandStep::new(bytes.to_vec(), half))
            .collect();
        steps.push(CommandStep::new(with_cr("6"), half));
        steps.push(CommandStep::new(with_cr("a"), half));
        Self {
            steps,
            keep_alive: None,
        }
    }
}

/// Comando digitado pelo usuário: sem espaços nas bordas, terminado em CR.
///
/// Retorna `None` para entrada vazia.
pub fn user_command(input: &str) -> Option<Vec<u8>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(with_cr(trimmed))
    }
}

fn with_cr(cmd: &str) -> Vec<u8> {
    let mut bytes = cmd.as_bytes().to_vec();
    bytes.push(CR);
    bytes
}

pub fn describe_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            CR => out.push_str("<CR>"),
            ESC => out.push_str("<ESC>"),
            0x20..=0x7e => out.push(b as char),
            other => out.push_str(&format!("<{other:02X}>")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Todos os bytes do handshake concatenados (sem keep-alive).
    fn handshake_bytes(script: &CommandScript) -> Vec<u8> {
        script.steps.iter().flat_map(|s| s.bytes.iter().copied()).collect()
    }

    #[test]
    fn serial_script_bytes() {
        let script = CommandScript::serial();
        assert_eq!(handshake_bytes(&script), b"M\r8\r3\rR\r");
        assert!(script.steps.iter().all(|s| s.delay_after == Duration::from_secs(1)));
        let ka = script.keep_alive.unwrap();
        assert_eq!(ka.bytes, b"R\r");
        assert_eq!(ka.interval, Duration::from_secs(1));
    }

    #[test]
    fn tcp_script_bytes() {
        let script = CommandScript::tcp();
        assert_eq!(
            handshake_bytes(&script),
            b"5\r\x1bmc\x1b\rR\rM\rA\r6\ra\r".to_vec()
        );
        assert_eq!(script.steps.len(), 14);
        assert!(script.keep_alive.is_none());
    }

    #[test]
    fn user_command_is_trimmed() {
        assert_eq!(user_command("  R  "), Some(b"R\r".to_vec()));
        assert_eq!(user_command("   "), None);
    }

    #[test]
    fn describe_escapes_control_bytes() {
        assert_eq!(describe_bytes(b"\x1bmc\r"), "<ESC>mc<CR>");
        assert_eq!(describe_bytes(&[0x07]), "<07>");
    }
}
