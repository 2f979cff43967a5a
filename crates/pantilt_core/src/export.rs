//! Exportação do histórico para texto.
//!
//! Uma linha por amostra, sem cabeçalho e sem escape:
//!
//! ```text
//! 2024-03-09 14:05:07,45,10,300
//! ```

use crate::error::{MonitorError, Result};
use crate::types::TelemetrySample;
use std::path::{Path, PathBuf};
use tracing::info;

/// Extensão padrão do arquivo exportado.
pub const EXPORT_EXTENSION: &str = "txt";

/// Gera o conteúdo completo do arquivo.
pub fn render_export(samples: &[TelemetrySample]) -> String {
    let mut out = String::with_capacity(samples.len() * 32);
    for sample in samples {
        out.push_str(&sample.to_line());
        out.push('\n');
    }
    out
}

/// Acrescenta `.txt` quando o caminho não tem extensão.
pub fn with_default_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(EXPORT_EXTENSION)
    }
}

/// Grava o histórico em `path` numa única passada.
///
/// Retorna o caminho efetivo e o número de linhas escritas.
pub fn export_history(samples: &[TelemetrySample], path: &Path) -> Result<(PathBuf, usize)> {
    let path = with_default_extension(path);
    std::fs::write(&path, render_export(samples)).map_err(|source| MonitorError::ExportWrite {
        path: path.clone(),
        source,
    })?;
    info!("{} amostras exportadas para {}", samples.len(), path.display());
    Ok((path, samples.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{History, HistoryPolicy};
    use crate::types::{FieldSet, TIMESTAMP_FORMAT};
    use chrono::{NaiveDate, NaiveDateTime};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pantilt-export-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Lê de volta uma linha exportada.
    fn parse_export_line(line: &str) -> Option<TelemetrySample> {
        let mut parts = line.trim_end_matches(['\r', '\n']).split(',');
        let timestamp = NaiveDateTime::parse_from_str(parts.next()?, TIMESTAMP_FORMAT).ok()?;
        let pan = parts.next()?.parse().ok()?;
        let tilt = parts.next()?.parse().ok()?;
        let height = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(TelemetrySample {
            timestamp,
            pan,
            tilt,
            height,
        })
    }

    fn history_with(n: u32) -> History {
        let base = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        let mut h = History::new(HistoryPolicy::Unbounded);
        for i in 0..n {
            let at = base + chrono::Duration::seconds(i as i64);
            h.record(at, &FieldSet::full(i, i * 2, 1000 + i));
        }
        h
    }

    #[test]
    fn export_roundtrip_preserves_order() {
        let dir = scratch_dir("roundtrip");
        let history = history_with(25);

        let (path, written) = export_history(history.samples(), &dir.join("log.txt")).unwrap();
        assert_eq!(written, 25);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 25);
        assert_eq!(lines[0], "2024-05-17 08:30:00,0,0,1000");

        let parsed: Vec<TelemetrySample> =
            lines.iter().map(|l| parse_export_line(l).unwrap()).collect();
        assert_eq!(parsed, history.samples());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_extension_gets_txt() {
        let dir = scratch_dir("ext");
        let (path, _) = export_history(history_with(1).samples(), &dir.join("dump")).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("txt"));
        assert!(path.exists());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn empty_history_writes_empty_file() {
        assert_eq!(render_export(&[]), "");
    }

    #[test]
    fn unwritable_destination_is_reported() {
        let dir = scratch_dir("unwritable");
        let target = dir.join("missing").join("sub").join("log.txt");
        let err = export_history(history_with(2).samples(), &target).unwrap_err();
        assert!(matches!(err, MonitorError::ExportWrite { .. }));
        std::fs::remove_dir_all(dir).ok();
    }
}
