//! Extração de PAN/TILT/HEIGHT do texto recebido do cabeçote.
//!
//! Duas convenções textuais fixas, escolhidas por implantação:
//!
//! ```text
//! Labelled (serial):  "PAN: 45 TILT: 10"      → campos independentes por linha
//! Compact  (TCP):     "X P=12 a T=34 b H=56"  → registro completo ou nada
//! ```
//!
//! Só dígitos ASCII são reconhecidos. Valores com rótulo mas sem número
//! utilizável viram [`Rejection`] em vez de sumir em silêncio.

use crate::types::{Field, FieldSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

/// Tamanho máximo do trecho guardado numa rejeição.
const FRAGMENT_MAX_CHARS: usize = 40;

static PAN_VALUE: LazyLock<Regex> = LazyLock::new(|| labelled_value("PAN"));
static TILT_VALUE: LazyLock<Regex> = LazyLock::new(|| labelled_value("TILT"));
static HEIGHT_VALUE: LazyLock<Regex> = LazyLock::new(|| labelled_value("HEIGHT"));

static COMPACT_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"P=([0-9]+).*?T=([0-9]+).*?H=([0-9]+)").expect("regex compacta inválida")
});
static COMPACT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"P=").expect("regex compacta inválida"));

fn labelled_value(label: &str) -> Regex {
    Regex::new(&format!(r"{label}:\s*([0-9]+)")).expect("regex rotulada inválida")
}

/// Convenção textual usada pelo cabeçote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grammar {
    /// `PAN:<n>`, `TILT:<n>`, `HEIGHT:<n>` em qualquer ordem.
    #[default]
    Labelled,
    /// `P=<n> … T=<n> … H=<n>` numa mesma linha, nessa ordem.
    Compact,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grammar::Labelled => f.write_str("labelled"),
            Grammar::Compact => f.write_str("compact"),
        }
    }
}

/// Motivo pelo qual um valor foi descartado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Rótulo presente, mas sem dígitos (negativo, decimal, texto…).
    NotDigits,
    /// Dígitos que não cabem em `u32`.
    Overflow,
    /// Registro compacto sem `T=` ou `H=` na sequência.
    Incomplete,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotDigits => f.write_str("valor não numérico"),
            RejectReason::Overflow => f.write_str("valor fora da faixa"),
            RejectReason::Incomplete => f.write_str("registro incompleto"),
        }
    }
}

/// Valor descartado pelo parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Campo afetado; `None` quando o registro inteiro foi descartado.
    pub field: Option<Field>,
    pub reason: RejectReason,
    /// Trecho da linha original (truncado).
    pub fragment: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(f, "{field}: {} em \"{}\"", self.reason, self.fragment),
            None => write!(f, "{} em \"{}\"", self.reason, self.fragment),
        }
    }
}

/// Resultado do parse de um chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Conjuntos extraídos, na ordem em que aparecem no texto.
    pub fields: Vec<FieldSet>,
    pub rejections: Vec<Rejection>,
}

/// Extrai campos de um chunk (uma ou mais linhas, última possivelmente parcial).
pub fn parse_chunk(grammar: Grammar, text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for line in text.lines() {
        match grammar {
            Grammar::Labelled => parse_labelled_line(line, &mut outcome),
            Grammar::Compact => parse_compact_line(line, &mut outcome),
        }
    }
    for rejection in &outcome.rejections {
        debug!("Telemetria descartada ({grammar}): {rejection}");
    }
    outcome
}

fn value_regex(field: Field) -> &'static Regex {
    match field {
        Field::Pan => &PAN_VALUE,
        Field::Tilt => &TILT_VALUE,
        Field::Height => &HEIGHT_VALUE,
    }
}

fn parse_labelled_line(line: &str, outcome: &mut ParseOutcome) {
    let mut set = FieldSet::default();

    for field in Field::ALL {
        if let Some(caps) = value_regex(field).captures(line) {
            match caps[1].parse::<u32>() {
                Ok(value) => set.set(field, value),
                Err(_) => outcome.rejections.push(Rejection {
                    field: Some(field),
                    reason: RejectReason::Overflow,
                    fragment: fragment(line),
                }),
            }
        } else if line.contains(&format!("{}:", field.label())) {
            outcome.rejections.push(Rejection {
                field: Some(field),
                reason: RejectReason::NotDigits,
                fragment: fragment(line),
            });
        }
    }

    if !set.is_empty() {
        outcome.fields.push(set);
    }
}

fn parse_compact_line(line: &str, outcome: &mut ParseOutcome) {
    let mut matched = false;

    for caps in COMPACT_RECORD.captures_iter(line) {
        matched = true;
        let values = (
            caps[1].parse::<u32>(),
            caps[2].parse::<u32>(),
            caps[3].parse::<u32>(),
        );
        match values {
            (Ok(pan), Ok(tilt), Ok(height)) => {
                outcome.fields.push(FieldSet::full(pan, tilt, height));
            }
            _ => outcome.rejections.push(Rejection {
                field: None,
                reason: RejectReason::Overflow,
                fragment: fragment(&caps[0]),
            }),
        }
    }

    if !matched && COMPACT_START.is_match(line) {
        outcome.rejections.push(Rejection {
            field: None,
            reason: RejectReason::Incomplete,
            fragment: fragment(line),
        });
    }
}

fn fragment(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(FRAGMENT_MAX_CHARS) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labelled_extracts_digit_runs() {
        let out = parse_chunk(Grammar::Labelled, "PAN: 45 TILT: 10");
        assert_eq!(
            out.fields,
            vec![FieldSet {
                pan: Some(45),
                tilt: Some(10),
                height: None,
            }]
        );
        assert!(out.rejections.is_empty());
    }

    #[test]
    fn labelled_ignores_surrounding_text_and_order() {
        let out = parse_chunk(Grammar::Labelled, ">> HEIGHT:300 status ok PAN:7deg TILT:   2\r");
        assert_eq!(out.fields, vec![FieldSet::full(7, 2, 300)]);
    }

    #[test]
    fn labelled_fields_on_separate_lines_stay_separate() {
        let out = parse_chunk(Grammar::Labelled, "PAN: 1\nTILT: 2\nHEIGHT: 3\n");
        assert_eq!(out.fields.len(), 3);
        assert!(out.fields.iter().all(|f| f.complete().is_none()));
        assert_eq!(out.fields[2].height, Some(3));
    }

    #[test]
    fn labelled_takes_first_numeric_occurrence() {
        let out = parse_chunk(Grammar::Labelled, "PAN: x PAN: 5");
        assert_eq!(out.fields[0].pan, Some(5));
        assert!(out.rejections.is_empty());
    }

    #[test]
    fn labelled_negative_value_is_rejected() {
        let out = parse_chunk(Grammar::Labelled, "PAN: -5 TILT: 3");
        assert_eq!(out.fields[0].pan, None);
        assert_eq!(out.fields[0].tilt, Some(3));
        assert_eq!(out.rejections.len(), 1);
        assert_eq!(out.rejections[0].field, Some(Field::Pan));
        assert_eq!(out.rejections[0].reason, RejectReason::NotDigits);
    }

    #[test]
    fn labelled_overflow_is_rejected() {
        let out = parse_chunk(Grammar::Labelled, "HEIGHT: 99999999999");
        assert!(out.fields.is_empty());
        assert_eq!(out.rejections[0].reason, RejectReason::Overflow);
    }

    #[test]
    fn labelled_noise_produces_nothing() {
        let out = parse_chunk(Grammar::Labelled, "boot ok\nready\n");
        assert_eq!(out, ParseOutcome::default());
    }

    #[test]
    fn compact_requires_all_three_in_order() {
        let out = parse_chunk(Grammar::Compact, "X P=12 junk T=34 more H=56");
        assert_eq!(out.fields, vec![FieldSet::full(12, 34, 56)]);

        let out = parse_chunk(Grammar::Compact, "P=12 T=34");
        assert!(out.fields.is_empty());
        assert_eq!(out.rejections.len(), 1);
        assert_eq!(out.rejections[0].reason, RejectReason::Incomplete);
    }

    #[test]
    fn compact_does_not_span_lines() {
        let out = parse_chunk(Grammar::Compact, "P=1 T=2\nH=3\n");
        assert!(out.fields.is_empty());
    }

    #[test]
    fn compact_yields_every_record_in_chunk() {
        let out = parse_chunk(Grammar::Compact, "P=1 T=2 H=3 P=4 T=5 H=6\nP=7,T=8,H=9\r\nP=10");
        assert_eq!(
            out.fields,
            vec![
                FieldSet::full(1, 2, 3),
                FieldSet::full(4, 5, 6),
                FieldSet::full(7, 8, 9),
            ]
        );
        assert_eq!(out.rejections.len(), 1);
    }

    #[test]
    fn compact_ignores_labelled_text() {
        let out = parse_chunk(Grammar::Compact, "PAN: 45 TILT: 10 HEIGHT: 3");
        assert!(out.fields.is_empty());
    }

    #[test]
    fn non_ascii_digits_are_not_numbers() {
        let out = parse_chunk(Grammar::Labelled, "PAN: ٤٥");
        assert!(out.fields.is_empty());
        assert_eq!(out.rejections[0].reason, RejectReason::NotDigits);
    }

    #[test]
    fn fragment_is_truncated() {
        let long = format!("PAN: -{}", "x".repeat(100));
        let out = parse_chunk(Grammar::Labelled, &long);
        assert!(out.rejections[0].fragment.chars().count() <= FRAGMENT_MAX_CHARS + 1);
    }
}
