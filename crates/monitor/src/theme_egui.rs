//! Conversão de temas para `egui::Color32`.

use egui::Color32;
use pantilt_core::Field;
use pantilt_core::theme::{self, Theme};

/// Tema convertido para tipos egui.
#[derive(Clone)]
pub struct EguiTheme {
    pub name: String,
    pub bg: Color32,
    pub panel: Color32,
    pub text: Color32,
    pub dim: Color32,
    pub title: Color32,
    pub pan: Color32,
    pub tilt: Color32,
    pub height: Color32,
    pub sent: Color32,
    pub online: Color32,
    pub error: Color32,
}

impl EguiTheme {
    /// Converte um [`Theme`] do core para [`EguiTheme`].
    pub fn from_core(t: &Theme) -> Self {
        Self {
            name: t.name.clone(),
            bg: hex_color(&t.bg),
            panel: hex_color(&t.panel),
            text: hex_color(&t.text),
            dim: hex_color(&t.dim),
            title: hex_color(&t.title),
            pan: hex_color(&t.pan),
            tilt: hex_color(&t.tilt),
            height: hex_color(&t.height),
            sent: hex_color(&t.sent),
            online: hex_color(&t.online),
            error: hex_color(&t.error),
        }
    }

    pub fn field_color(&self, field: Field) -> Color32 {
        match field {
            Field::Pan => self.pan,
            Field::Tilt => self.tilt,
            Field::Height => self.height,
        }
    }
}

fn hex_color(hex: &str) -> Color32 {
    let (r, g, b) = theme::hex_to_rgb(hex);
    Color32::from_rgb(r, g, b)
}

/// Carrega todos os temas disponíveis.
pub fn all_themes() -> Vec<EguiTheme> {
    theme::theme_names()
        .iter()
        .map(|name| EguiTheme::from_core(&theme::get_theme(name)))
        .collect()
}
