//! Links de bytes com o cabeçote: porta serial e socket TCP.
//!
//! Cada link é separado em um leitor (usado só pela thread de leitura) e um
//! escritor (compartilhado atrás de um mutex pela sessão).

use crate::config::{LinkConfig, LinkKind, ParityMode, SerialConfig, TcpConfig};
use crate::error::{MonitorError, Result};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info};

/// Limite de bytes sem `\n` antes de entregar a linha assim mesmo.
const MAX_PENDING_LINE: usize = 4096;

/// Resultado de uma leitura.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// Bytes recebidos (linha no serial, chunk no TCP).
    Data(Vec<u8>),
    /// Timeout de leitura sem dados.
    Idle,
    /// O outro lado fechou o link.
    Eof,
}

/// Lado de leitura de um link.
pub trait LinkReader: Send {
    fn read_chunk(&mut self) -> io::Result<ReadEvent>;
}

/// Lado de escrita de um link.
pub trait LinkWriter: Send {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;
    /// Fecha o link; leituras bloqueadas devem retornar logo em seguida.
    fn close(&mut self) -> io::Result<()>;
}

/// Link aberto, pronto para virar uma sessão.
pub struct Link {
    pub reader: Box<dyn LinkReader>,
    pub writer: Box<dyn LinkWriter>,
    pub peer: String,
}

impl Link {
    pub fn from_parts(
        reader: Box<dyn LinkReader>,
        writer: Box<dyn LinkWriter>,
        peer: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            writer,
            peer: peer.into(),
        }
    }

    /// Abre o link descrito na configuração.
    pub fn open(config: &LinkConfig) -> Result<Self> {
        match config.kind {
            LinkKind::Serial => Self::serial(&config.serial),
            LinkKind::Tcp => Self::tcp(&config.tcp),
        }
    }

    /// Conecta ao servidor TCP do cabeçote.
    pub fn tcp(config: &TcpConfig) -> Result<Self> {
        let target = format!("{}:{}", config.host, config.port);
        let open_err = |source: io::Error| MonitorError::TransportOpen {
            target: target.clone(),
            source,
        };

        let stream = connect_tcp(config).map_err(open_err)?;
        stream
            .set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms.max(1))))
            .map_err(open_err)?;
        stream.set_nodelay(true).ok();
        let writer = stream.try_clone().map_err(open_err)?;

        info!("Conectado a {target}");
        Ok(Self {
            reader: Box::new(ChunkReader::new(stream, config.read_chunk)),
            writer: Box::new(TcpWriter(writer)),
            peer: target,
        })
    }

    /// Abre a porta serial do cabeçote.
    pub fn serial(config: &SerialConfig) -> Result<Self> {
        let target = format!("{} @ {}", config.port, config.baud_rate);
        let open_err = |source: io::Error| MonitorError::TransportOpen {
            target: target.clone(),
            source,
        };

        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .parity(parity(config.parity))
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .open()
            .map_err(|e| open_err(e.into()))?;
        let reader = port.try_clone().map_err(|e| open_err(e.into()))?;

        info!(
            "Conectado a {} ({} baud, paridade {:?})",
            config.port, config.baud_rate, config.parity
        );
        Ok(Self {
            reader: Box::new(LineReader::new(reader)),
            writer: Box::new(SerialWriter(Some(port))),
            peer: target,
        })
    }
}

fn connect_tcp(config: &TcpConfig) -> io::Result<TcpStream> {
    let timeout = Duration::from_millis(config.connect_timeout_ms.max(1));
    let mut last_err = None;
    for addr in (config.host.as_str(), config.port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Falha ao conectar em {addr}: {e}");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "host não resolveu para nenhum endereço")
    }))
}

fn parity(mode: ParityMode) -> serialport::Parity {
    match mode {
        ParityMode::None => serialport::Parity::None,
        ParityMode::Odd => serialport::Parity::Odd,
        ParityMode::Even => serialport::Parity::Even,
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

// ──────────────────────────────────────────────
// Leitores
// ──────────────────────────────────────────────

/// Entrega chunks crus de até `chunk` bytes (TCP).
pub struct ChunkReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(inner: R, chunk: usize) -> Self {
        Self {
            inner,
            buf: vec![0; chunk.max(1)],
        }
    }
}

impl<R: Read + Send> LinkReader for ChunkReader<R> {
    fn read_chunk(&mut self) -> io::Result<ReadEvent> {
        match self.inner.read(&mut self.buf) {
            Ok(0) => Ok(ReadEvent::Eof),
            Ok(n) => Ok(ReadEvent::Data(self.buf[..n].to_vec())),
            Err(e) if is_timeout(&e) => Ok(ReadEvent::Idle),
            Err(e) => Err(e),
        }
    }
}

/// Entrega uma linha por leitura (serial); linhas parciais esperam o resto.
pub struct LineReader<R> {
    inner: R,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        match self.pending.iter().position(|&b| b == b'\n') {
            Some(pos) => Some(self.pending.drain(..=pos).collect()),
            None if self.pending.len() >= MAX_PENDING_LINE => Some(std::mem::take(&mut self.pending)),
            None => None,
        }
    }
}

impl<R: Read + Send> LinkReader for LineReader<R> {
    fn read_chunk(&mut self) -> io::Result<ReadEvent> {
        if let Some(line) = self.take_line() {
            return Ok(ReadEvent::Data(line));
        }

        let mut buf = [0u8; 256];
        match self.inner.read(&mut buf) {
            // Porta serial sem dados
            Ok(0) => Ok(ReadEvent::Idle),
            Ok(n) => {
                self.pending.extend_from_slice(&buf[..n]);
                Ok(self.take_line().map_or(ReadEvent::Idle, ReadEvent::Data))
            }
            Err(e) if is_timeout(&e) => Ok(ReadEvent::Idle),
            Err(e) => Err(e),
        }
    }
}

// ──────────────────────────────────────────────
// Escritores
// ──────────────────────────────────────────────

struct TcpWriter(TcpStream);

impl LinkWriter for TcpWriter {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.0.write_all(bytes)?;
        self.0.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.0.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

struct SerialWriter(Option<Box<dyn serialport::SerialPort>>);

impl LinkWriter for SerialWriter {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self
            .0
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "porta serial fechada"))?;
        port.write_all(bytes)?;
        port.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        // O clone do leitor sai pelo timeout de leitura
        self.0.take();
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Decodificação UTF-8
// ──────────────────────────────────────────────

/// Decodifica chunks como UTF-8, guardando sequências multibyte cortadas
/// no fim do chunk para a próxima chamada.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    carry: Vec<u8>,
}

impl Utf8Decoder {
    /// Bytes inválidos descartam o chunk inteiro com [`MonitorError::Decode`].
    pub fn decode(&mut self, bytes: &[u8]) -> Result<String> {
        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(bytes);

        match std::str::from_utf8(&buf) {
            Ok(text) => Ok(text.to_owned()),
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                self.carry = buf[valid..].to_vec();
                Ok(String::from_utf8_lossy(&buf[..valid]).into_owned())
            }
            Err(e) => Err(MonitorError::Decode {
                offset: e.valid_up_to(),
                len: buf.len(),
            }),
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
