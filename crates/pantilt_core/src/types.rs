//! Tipos de telemetria do cabeçote Pan/Tilt/Height.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Formato fixo de timestamp usado no log de amostras e na exportação.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ──────────────────────────────────────────────
// Campos
// ──────────────────────────────────────────────

/// Um dos três eixos reportados pelo cabeçote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Pan,
    Tilt,
    Height,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Pan, Field::Tilt, Field::Height];

    /// Rótulo em maiúsculas, como aparece no link serial.
    pub fn label(self) -> &'static str {
        match self {
            Field::Pan => "PAN",
            Field::Tilt => "TILT",
            Field::Height => "HEIGHT",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Campos extraídos de uma única linha/chunk.
///
/// Na convenção rotulada uma linha pode trazer só parte dos campos;
/// na compacta o parser só produz conjuntos completos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    pub pan: Option<u32>,
    pub tilt: Option<u32>,
    pub height: Option<u32>,
}

impl FieldSet {
    pub fn full(pan: u32, tilt: u32, height: u32) -> Self {
        Self {
            pan: Some(pan),
            tilt: Some(tilt),
            height: Some(height),
        }
    }

    pub fn get(&self, field: Field) -> Option<u32> {
        match field {
            Field::Pan => self.pan,
            Field::Tilt => self.tilt,
            Field::Height => self.height,
        }
    }

    pub fn set(&mut self, field: Field, value: u32) {
        match field {
            Field::Pan => self.pan = Some(value),
            Field::Tilt => self.tilt = Some(value),
            Field::Height => self.height = Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pan.is_none() && self.tilt.is_none() && self.height.is_none()
    }

    /// Retorna `(pan, tilt, height)` somente se os três vieram juntos.
    pub fn complete(&self) -> Option<(u32, u32, u32)> {
        Some((self.pan?, self.tilt?, self.height?))
    }
}

// ──────────────────────────────────────────────
// Amostra
// ──────────────────────────────────────────────

/// Leitura completa com timestamp local. Imutável depois de criada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub timestamp: NaiveDateTime,
    pub pan: u32,
    pub tilt: u32,
    pub height: u32,
}

impl TelemetrySample {
    /// Cria a amostra se o conjunto estiver completo.
    pub fn from_fields(timestamp: NaiveDateTime, fields: &FieldSet) -> Option<Self> {
        let (pan, tilt, height) = fields.complete()?;
        Some(Self {
            timestamp,
            pan,
            tilt,
            height,
        })
    }

    pub fn value(&self, field: Field) -> u32 {
        match field {
            Field::Pan => self.pan,
            Field::Tilt => self.tilt,
            Field::Height => self.height,
        }
    }

    /// Linha `timestamp,pan,tilt,height` sem quebra de linha.
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.pan,
            self.tilt,
            self.height
        )
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn partial_set_is_not_a_sample() {
        let fields = FieldSet {
            pan: Some(45),
            tilt: Some(10),
            height: None,
        };
        assert!(fields.complete().is_none());
        assert!(TelemetrySample::from_fields(ts(), &fields).is_none());
    }

    #[test]
    fn complete_set_builds_sample() {
        let sample = TelemetrySample::from_fields(ts(), &FieldSet::full(12, 34, 56)).unwrap();
        assert_eq!(sample.value(Field::Pan), 12);
        assert_eq!(sample.value(Field::Tilt), 34);
        assert_eq!(sample.value(Field::Height), 56);
    }

    #[test]
    fn line_uses_fixed_timestamp_format() {
        let sample = TelemetrySample::from_fields(ts(), &FieldSet::full(1, 2, 3)).unwrap();
        assert_eq!(sample.to_line(), "2024-03-09 14:05:07,1,2,3");
    }

    #[test]
    fn empty_set() {
        let mut fields = FieldSet::default();
        assert!(fields.is_empty());
        fields.set(Field::Height, 7);
        assert!(!fields.is_empty());
        assert_eq!(fields.get(Field::Height), Some(7));
    }
}
