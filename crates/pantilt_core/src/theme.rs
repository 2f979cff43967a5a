//! Temas visuais do dashboard.
//!
//! Cores em hex; a conversão para `egui::Color32` é feita no monitor.

use serde::{Deserialize, Serialize};

/// Cor em formato hex string (ex: "#00ff88").
pub type HexColor = String;

/// Definição completa de um tema de cores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    // Fundo
    pub bg: HexColor,
    pub panel: HexColor,
    // Texto
    pub text: HexColor,
    pub dim: HexColor,
    pub title: HexColor,
    // Um por eixo
    pub pan: HexColor,
    pub tilt: HexColor,
    pub height: HexColor,
    // Monitor de texto / status
    pub sent: HexColor,
    pub online: HexColor,
    pub error: HexColor,
}

/// Converte uma string hex "#RRGGBB" para tupla (r, g, b).
pub fn hex_to_rgb(hex: &str) -> (u8, u8, u8) {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return (255, 255, 255); // fallback branco
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).unwrap_or(255);
    (channel(0..2), channel(2..4), channel(4..6))
}

/// Tema Escuro (padrão).
pub fn dark_theme() -> Theme {
    Theme {
        name: "dark".into(),
        bg: "#1a1a1a".into(),
        panel: "#252525".into(),
        text: "#ffffff".into(),
        dim: "#777777".into(),
        title: "#00d9ff".into(),
        pan: "#ff5555".into(),
        tilt: "#00ff88".into(),
        height: "#4d9fff".into(),
        sent: "#ffcc00".into(),
        online: "#00ff88".into(),
        error: "#ff3333".into(),
    }
}

/// Tema Claro.
pub fn light_theme() -> Theme {
    Theme {
        name: "light".into(),
        bg: "#f5f5f5".into(),
        panel: "#ffffff".into(),
        text: "#333333".into(),
        dim: "#888888".into(),
        title: "#0066cc".into(),
        pan: "#cc2222".into(),
        tilt: "#00aa55".into(),
        height: "#1f5fcc".into(),
        sent: "#cc7700".into(),
        online: "#00aa55".into(),
        error: "#cc2222".into(),
    }
}

/// Tema High Contrast (acessibilidade).
pub fn high_contrast_theme() -> Theme {
    Theme {
        name: "high_contrast".into(),
        bg: "#000000".into(),
        panel: "#1a1a1a".into(),
        text: "#ffffff".into(),
        dim: "#cccccc".into(),
        title: "#00ffff".into(),
        pan: "#ff0000".into(),
        tilt: "#00ff00".into(),
        height: "#00ffff".into(),
        sent: "#ffff00".into(),
        online: "#00ff00".into(),
        error: "#ff0000".into(),
    }
}

/// Retorna tema pelo nome.
pub fn get_theme(name: &str) -> Theme {
    match name.to_lowercase().as_str() {
        "light" => light_theme(),
        "high_contrast" => high_contrast_theme(),
        _ => dark_theme(),
    }
}

/// Nomes de temas disponíveis.
pub fn theme_names() -> Vec<&'static str> {
    vec!["dark", "light", "high_contrast"]
}
