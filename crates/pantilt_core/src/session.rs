//! Sessão de conexão com o cabeçote.
//!
//! ```text
//!  link ──► [pantilt-reader] ──┐
//!                              ├──► channel<SessionEvent> ──► Session::drain (UI)
//!  script ► [pantilt-commands] ┘            │
//!               │                           ▼
//!               └──► Mutex<LinkWriter> ◄── send_command (UI)
//! ```
//!
//! O estado visível (últimos valores e histórico) só muda em
//! [`Session::drain`], na thread que consome o channel.

use crate::commands::{CommandScript, describe_bytes, user_command};
use crate::config::AppConfig;
use crate::error::{MonitorError, Result};
use crate::history::{HistoryPolicy, TelemetryState};
use crate::link::{Link, LinkReader, LinkWriter, ReadEvent, Utf8Decoder};
use crate::parser::{Grammar, Rejection, parse_chunk};
use crate::types::FieldSet;
use chrono::{Local, NaiveDateTime};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Capacidade do channel; a leitura bloqueia se a UI ficar para trás.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

type SharedWriter = Arc<Mutex<Box<dyn LinkWriter>>>;

/// Por que a leitura terminou.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Desconexão pedida pelo usuário.
    Disconnected,
    /// O cabeçote fechou o link.
    RemoteClosed,
    /// Erro de leitura.
    ReadFailed,
}

/// Evento entregue à UI, em ordem de chegada.
#[derive(Debug)]
pub enum SessionEvent {
    Connected { peer: String },
    /// Texto recebido, já decodificado.
    Received(String),
    /// Campos extraídos de uma linha/chunk.
    Fields { at: NaiveDateTime, fields: FieldSet },
    Rejected(Rejection),
    /// Comando enviado pelo handshake.
    Sent(String),
    Error(MonitorError),
    Closed(CloseReason),
}

/// Parâmetros de uma sessão.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub grammar: Grammar,
    pub history: HistoryPolicy,
    pub script: CommandScript,
}

impl SessionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            grammar: config.telemetry.grammar_for(config.link.kind),
            history: config.telemetry.history_for(config.link.kind),
            script: config.link.command_script(),
        }
    }
}

/// Resumo de uma chamada a [`Session::drain`].
#[derive(Debug, Default)]
pub struct Drained {
    pub events: Vec<SessionEvent>,
    /// Conjuntos de campos aplicados (atualizam os valores ao vivo).
    pub field_updates: usize,
}

impl Drained {
    pub fn has_new_data(&self) -> bool {
        self.field_updates > 0
    }
}

/// Conexão ativa: dona do link, do histórico e da flag de cancelamento.
pub struct Session {
    peer: String,
    running: Arc<AtomicBool>,
    writer: SharedWriter,
    events: Receiver<SessionEvent>,
    stop: Option<Sender<()>>,
    state: TelemetryState,
    reader: Option<JoinHandle<()>>,
    commander: Option<JoinHandle<()>>,
}

impl Session {
    /// Inicia leitura e handshake sobre um link já aberto.
    pub fn start(link: Link, options: SessionOptions) -> Self {
        let Link {
            reader,
            writer,
            peer,
        } = link;

        let (tx, rx) = bounded::<SessionEvent>(EVENT_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let running = Arc::new(AtomicBool::new(true));
        let writer: SharedWriter = Arc::new(Mutex::new(writer));

        let _ = tx.send(SessionEvent::Connected { peer: peer.clone() });

        let reader_handle = {
            let running = Arc::clone(&running);
            let tx = tx.clone();
            let grammar = options.grammar;
            std::thread::Builder::new()
                .name("pantilt-reader".into())
                .spawn(move || reader_loop(reader, grammar, &running, &tx))
                .expect("Falha ao criar thread de leitura")
        };

        let script = options.script;
        let commander = if script.steps.is_empty() && script.keep_alive.is_none() {
            None
        } else {
            let running = Arc::clone(&running);
            let writer = Arc::clone(&writer);
            Some(
                std::thread::Builder::new()
                    .name("pantilt-commands".into())
                    .spawn(move || command_loop(&script, &writer, &running, &stop_rx, &tx))
                    .expect("Falha ao criar thread de comandos"),
            )
        };

        info!("Sessão iniciada com {peer} ({})", options.grammar);

        Self {
            peer,
            running,
            writer,
            events: rx,
            stop: Some(stop_tx),
            state: TelemetryState::new(options.history),
            reader: Some(reader_handle),
            commander,
        }
    }

    /// Abre o link da configuração e inicia a sessão.
    pub fn connect(config: &AppConfig) -> Result<Self> {
        let link = Link::open(&config.link)?;
        Ok(Self::start(link, SessionOptions::from_config(config)))
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// `true` enquanto a thread de leitura estiver ativa.
    pub fn is_connected(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self.reader.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn state(&self) -> &TelemetryState {
        &self.state
    }

    /// Consome os eventos pendentes e aplica os campos ao estado.
    pub fn drain(&mut self) -> Drained {
        let mut drained = Drained::default();
        while let Ok(event) = self.events.try_recv() {
            if let SessionEvent::Fields { at, fields } = &event {
                drained.field_updates += 1;
                self.state.apply(*at, fields);
            }
            drained.events.push(event);
        }
        drained
    }

    /// Envia um comando digitado (sem espaços nas bordas, terminado em CR).
    ///
    /// Retorna o texto enviado, ou `None` para entrada vazia.
    pub fn send_command(&self, input: &str) -> Result<Option<String>> {
        let Some(bytes) = user_command(input) else {
            return Ok(None);
        };
        write_locked(&self.writer, &bytes).map_err(MonitorError::TransportWrite)?;
        debug!("Comando enviado: {}", describe_bytes(&bytes));
        Ok(Some(input.trim().to_string()))
    }

    /// Para as threads e fecha o link. Pode ser chamado mais de uma vez.
    pub fn disconnect(&mut self) {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        // Derrubar o sender acorda a thread de comandos
        self.stop.take();
        let closed = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .close();
        if let Err(e) = closed {
            warn!("Erro ao fechar link com {}: {e}", self.peer);
        }
        if was_running {
            info!("Desconectado de {}", self.peer);
        }
    }

    /// Desconecta e espera a thread de leitura soltar o link.
    ///
    /// A porta serial só é liberada quando o leitor sai (no próximo timeout
    /// de leitura); reabrir antes disso falha com lock exclusivo.
    pub fn close(&mut self, grace: Duration) -> bool {
        self.disconnect();
        let released = self.wait_finished(grace);
        if !released {
            warn!("Threads de {} ainda ativas após {grace:?}", self.peer);
        }
        released
    }

    /// Aguarda as threads terminarem (até `timeout`). Retorna `true` se ambas saíram.
    pub fn wait_finished(&mut self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let finished = |h: &Option<JoinHandle<()>>| h.as_ref().is_none_or(JoinHandle::is_finished);
        loop {
            if finished(&self.reader) && finished(&self.commander) {
                for handle in [self.reader.take(), self.commander.take()].into_iter().flatten() {
                    let _ = handle.join();
                }
                return true;
            }
            if std::time::Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ──────────────────────────────────────────────
// Threads
// ──────────────────────────────────────────────

fn write_locked(writer: &SharedWriter, bytes: &[u8]) -> std::io::Result<()> {
    writer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .send(bytes)
}

/// Envia eventos em ordem; `false` se a UI já descartou a sessão.
fn forward(tx: &Sender<SessionEvent>, events: impl IntoIterator<Item = SessionEvent>) -> bool {
    events.into_iter().all(|event| tx.send(event).is_ok())
}

fn reader_loop(
    mut reader: Box<dyn LinkReader>,
    grammar: Grammar,
    running: &AtomicBool,
    tx: &Sender<SessionEvent>,
) {
    let mut decoder = Utf8Decoder::default();

    let reason = loop {
        if !running.load(Ordering::Acquire) {
            break CloseReason::Disconnected;
        }

        match reader.read_chunk() {
            Ok(ReadEvent::Data(bytes)) => {
                let at = Local::now().naive_local();
                let text = match decoder.decode(&bytes) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("{e}");
                        if !forward(tx, [SessionEvent::Error(e)]) {
                            break CloseReason::Disconnected;
                        }
                        continue;
                    }
                };
                if text.is_empty() {
                    continue;
                }

                let outcome = parse_chunk(grammar, &text);
                let events = std::iter::once(SessionEvent::Received(text))
                    .chain(
                        outcome
                            .fields
                            .into_iter()
                            .map(|fields| SessionEvent::Fields { at, fields }),
                    )
                    .chain(outcome.rejections.into_iter().map(SessionEvent::Rejected));
                if !forward(tx, events) {
                    break CloseReason::Disconnected;
                }
            }
            Ok(ReadEvent::Idle) => {}
            Ok(ReadEvent::Eof) => {
                if running.load(Ordering::Acquire) {
                    info!("Link fechado pelo cabeçote");
                    break CloseReason::RemoteClosed;
                }
                break CloseReason::Disconnected;
            }
            Err(e) => {
                if !running.load(Ordering::Acquire) {
                    break CloseReason::Disconnected;
                }
                error!("Erro de leitura: {e}");
                let _ = tx.send(SessionEvent::Error(MonitorError::TransportRead(e)));
                break CloseReason::ReadFailed;
            }
        }
    };

    running.store(false, Ordering::Release);
    debug!("Thread de leitura encerrada: {reason:?}");
    let _ = tx.send(SessionEvent::Closed(reason));
}

/// Espera `delay` ou até a sessão ser encerrada. `true` = encerrada.
fn stopped_during(stop: &Receiver<()>, delay: Duration) -> bool {
    !matches!(stop.recv_timeout(delay), Err(RecvTimeoutError::Timeout))
}

fn command_loop(
    script: &CommandScript,
    writer: &SharedWriter,
    running: &AtomicBool,
    stop: &Receiver<()>,
    tx: &Sender<SessionEvent>,
) {
    for step in &script.steps {
        if !running.load(Ordering::Acquire) {
            return;
        }
        if let Err(e) = write_locked(writer, &step.bytes) {
            warn!("Handshake interrompido: {e}");
            let _ = tx.send(SessionEvent::Error(MonitorError::TransportWrite(e)));
            return;
        }
        let _ = tx.send(SessionEvent::Sent(step.describe()));
        if stopped_during(stop, step.delay_after) {
            return;
        }
    }
    if !script.steps.is_empty() {
        info!("Handshake enviado ({} comandos)", script.steps.len());
    }

    let Some(keep_alive) = &script.keep_alive else {
        return;
    };
    loop {
        if !running.load(Ordering::Acquire) {
            return;
        }
        if let Err(e) = write_locked(writer, &keep_alive.bytes) {
            warn!("Keep-alive interrompido: {e}");
            let _ = tx.send(SessionEvent::Error(MonitorError::TransportWrite(e)));
            return;
        }
        if stopped_during(stop, keep_alive.interval) {
            return;
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
