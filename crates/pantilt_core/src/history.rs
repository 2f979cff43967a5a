//! Histórico de telemetria da sessão.
//!
//! Duas políticas explícitas, escolhidas na configuração:
//!
//! - [`HistoryPolicy::Rolling`]: uma janela circular independente por campo
//!   (cada valor extraído entra na janela do seu campo, mesmo sem os outros
//!   dois) e o log cronológico das amostras completas.
//! - [`HistoryPolicy::Unbounded`]: lista única de amostras completas, sem
//!   limite; as séries dos gráficos saem dela.

use crate::types::{Field, FieldSet, TelemetrySample};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Janela padrão por campo (100 pontos).
pub const DEFAULT_WINDOW: usize = 100;

/// Política de retenção do histórico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum HistoryPolicy {
    Rolling { window: usize },
    Unbounded,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        HistoryPolicy::Rolling {
            window: DEFAULT_WINDOW,
        }
    }
}

/// Buffer circular de um único campo.
#[derive(Debug, Clone)]
pub struct FieldWindow {
    values: VecDeque<u32>,
    capacity: usize,
}

impl FieldWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: u32) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.values.iter().copied()
    }
}

#[derive(Debug, Clone)]
enum Store {
    Rolling {
        pan: FieldWindow,
        tilt: FieldWindow,
        height: FieldWindow,
        log: Vec<TelemetrySample>,
    },
    Unbounded {
        samples: Vec<TelemetrySample>,
    },
}

/// Histórico pertencente a uma sessão de conexão.
#[derive(Debug, Clone)]
pub struct History {
    policy: HistoryPolicy,
    store: Store,
}

impl History {
    pub fn new(policy: HistoryPolicy) -> Self {
        let store = match policy {
            HistoryPolicy::Rolling { window } => Store::Rolling {
                pan: FieldWindow::new(window),
                tilt: FieldWindow::new(window),
                height: FieldWindow::new(window),
                log: Vec::new(),
            },
            HistoryPolicy::Unbounded => Store::Unbounded {
                samples: Vec::new(),
            },
        };
        Self { policy, store }
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    /// Registra um conjunto extraído de uma linha.
    ///
    /// Retorna a amostra criada quando o conjunto está completo.
    pub fn record(&mut self, at: NaiveDateTime, fields: &FieldSet) -> Option<TelemetrySample> {
        let sample = TelemetrySample::from_fields(at, fields);

        match &mut self.store {
            Store::Rolling {
                pan,
                tilt,
                height,
                log,
            } => {
                if let Some(v) = fields.pan {
                    pan.push(v);
                }
                if let Some(v) = fields.tilt {
                    tilt.push(v);
                }
                if let Some(v) = fields.height {
                    height.push(v);
                }
                if let Some(s) = sample {
                    log.push(s);
                }
            }
            Store::Unbounded { samples } => {
                if let Some(s) = sample {
                    samples.push(s);
                }
            }
        }

        sample
    }

    /// Amostras completas em ordem de chegada (usadas na exportação).
    pub fn samples(&self) -> &[TelemetrySample] {
        match &self.store {
            Store::Rolling { log, .. } => log,
            Store::Unbounded { samples } => samples,
        }
    }

    /// Série de um campo, do mais antigo para o mais recente.
    pub fn series(&self, field: Field) -> Vec<u32> {
        match &self.store {
            Store::Rolling {
                pan, tilt, height, ..
            } => {
                let window = match field {
                    Field::Pan => pan,
                    Field::Tilt => tilt,
                    Field::Height => height,
                };
                window.iter().collect()
            }
            Store::Unbounded { samples } => samples.iter().map(|s| s.value(field)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples().is_empty()
    }
}

// ──────────────────────────────────────────────
// Estado ao vivo
// ──────────────────────────────────────────────

/// Último valor de cada campo mais o histórico da sessão.
///
/// Só é alterado no lado consumidor (thread da UI).
#[derive(Debug, Clone)]
pub struct TelemetryState {
    latest: FieldSet,
    last_update: Option<NaiveDateTime>,
    history: History,
}

impl TelemetryState {
    pub fn new(policy: HistoryPolicy) -> Self {
        Self {
            latest: FieldSet::default(),
            last_update: None,
            history: History::new(policy),
        }
    }

    /// Aplica um conjunto extraído: atualiza os slots e o histórico.
    pub fn apply(&mut self, at: NaiveDateTime, fields: &FieldSet) -> Option<TelemetrySample> {
        if fields.is_empty() {
            return None;
        }
        for field in Field::ALL {
            if let Some(v) = fields.get(field) {
                self.latest.set(field, v);
            }
        }
        self.last_update = Some(at);
        self.history.record(at, fields)
    }

    pub fn latest(&self, field: Field) -> Option<u32> {
        self.latest.get(field)
    }

    pub fn last_update(&self) -> Option<NaiveDateTime> {
        self.last_update
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, sec % 60)
            .unwrap()
    }

    fn pan_only(v: u32) -> FieldSet {
        FieldSet {
            pan: Some(v),
            ..Default::default()
        }
    }

    #[test]
    fn window_evicts_oldest() {
        let mut w = FieldWindow::new(3);
        for v in 1..=4 {
            w.push(v);
        }
        assert_eq!(w.iter().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn rolling_never_exceeds_window_per_field() {
        let mut h = History::new(HistoryPolicy::default());
        for v in 0..101 {
            h.record(ts(v), &pan_only(v));
        }
        let pan = h.series(Field::Pan);
        assert_eq!(pan.len(), DEFAULT_WINDOW);
        assert_eq!(pan[0], 1);
        assert_eq!(pan[99], 100);
        assert!(h.series(Field::Tilt).is_empty());
        // nenhum conjunto completo → nada no log
        assert!(h.is_empty());
    }

    #[test]
    fn rolling_windows_are_independent() {
        let mut h = History::new(HistoryPolicy::Rolling { window: 2 });
        h.record(ts(0), &FieldSet::full(1, 10, 100));
        h.record(ts(1), &pan_only(2));
        h.record(ts(2), &pan_only(3));
        assert_eq!(h.series(Field::Pan), vec![2, 3]);
        assert_eq!(h.series(Field::Tilt), vec![10]);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn unbounded_keeps_only_complete_samples() {
        let mut h = History::new(HistoryPolicy::Unbounded);
        assert!(h.record(ts(0), &pan_only(5)).is_none());
        for v in 0..250 {
            assert!(h.record(ts(v), &FieldSet::full(v, v + 1, v + 2)).is_some());
        }
        assert_eq!(h.len(), 250);
        assert_eq!(h.series(Field::Height).last(), Some(&251));
        assert_eq!(h.samples()[0].pan, 0);
    }

    #[test]
    fn state_updates_only_present_fields() {
        let mut state = TelemetryState::new(HistoryPolicy::default());
        state.apply(ts(0), &FieldSet::full(1, 2, 3));
        let partial = FieldSet {
            pan: Some(45),
            tilt: Some(10),
            height: None,
        };
        assert!(state.apply(ts(1), &partial).is_none());
        assert_eq!(state.latest(Field::Pan), Some(45));
        assert_eq!(state.latest(Field::Tilt), Some(10));
        assert_eq!(state.latest(Field::Height), Some(3));
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn empty_set_changes_nothing() {
        let mut state = TelemetryState::new(HistoryPolicy::Unbounded);
        state.apply(ts(0), &FieldSet::full(1, 2, 3));
        state.apply(ts(1), &FieldSet::default());
        assert_eq!(state.last_update(), Some(ts(0)));
        assert_eq!(state.history().len(), 1);
    }
}
