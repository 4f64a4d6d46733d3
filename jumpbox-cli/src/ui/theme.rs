//! Color palette and style helpers for the menu
//!
//! Widgets ask [`styles`] for a role ("selection", "error note", "key hint")
//! instead of hard-coding colors.

use ratatui::style::{Color, Modifier, Style};

use jumpbox_core::navigator::NoteKind;

/// Color palette tokens for the theme
#[derive(Clone, Debug)]
pub struct Palette {
    /// Panel border color
    pub panel_border: Color,
    /// Primary text color
    pub text: Color,
    /// Dimmed text (addresses, counts)
    pub text_dim: Color,
    /// Muted text (version, status tags)
    pub text_muted: Color,
    /// Accent color (titles, focus)
    pub accent: Color,
    pub error: Color,
    pub info: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    /// Key hint text
    pub key_hint: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            panel_border: Color::Rgb(60, 60, 60),
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            text_muted: Color::Rgb(100, 100, 100),
            accent: Color::Rgb(79, 193, 255),      // Light blue
            error: Color::Rgb(244, 135, 113),      // Coral red
            info: Color::Rgb(156, 220, 254),       // Light cyan
            selection_bg: Color::Rgb(38, 79, 120), // Dark blue
            selection_fg: Color::White,
            key_hint: Color::Rgb(206, 145, 120), // Soft orange
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Theme {
    pub palette: Palette,
}

impl Theme {
    pub fn key_hint_style(&self) -> Style {
        Style::default().fg(self.palette.key_hint)
    }

    pub fn subtle_border_style(&self) -> Style {
        Style::default().fg(self.palette.panel_border)
    }

    pub fn focused_border_style(&self) -> Style {
        Style::default().fg(self.palette.accent)
    }

    pub fn selection_style(&self) -> Style {
        Style::default()
            .bg(self.palette.selection_bg)
            .fg(self.palette.selection_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.palette.text)
    }

    pub fn text_dim_style(&self) -> Style {
        Style::default().fg(self.palette.text_dim)
    }

    pub fn text_muted_style(&self) -> Style {
        Style::default().fg(self.palette.text_muted)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.palette.accent)
    }

    pub fn accent_bold_style(&self) -> Style {
        Style::default()
            .fg(self.palette.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Groups are bold so they stand apart from devices
    pub fn group_style(&self) -> Style {
        Style::default()
            .fg(self.palette.text)
            .add_modifier(Modifier::BOLD)
    }

    pub fn note_style(&self, kind: NoteKind) -> Style {
        match kind {
            NoteKind::Info => Style::default().fg(self.palette.info),
            NoteKind::Error => Style::default()
                .fg(self.palette.error)
                .add_modifier(Modifier::BOLD),
        }
    }
}

static DEFAULT_THEME: std::sync::OnceLock<Theme> = std::sync::OnceLock::new();

pub fn theme() -> &'static Theme {
    DEFAULT_THEME.get_or_init(Theme::default)
}

pub mod styles {
    use super::*;

    pub fn key_hint() -> Style {
        theme().key_hint_style()
    }

    pub fn border_subtle() -> Style {
        theme().subtle_border_style()
    }

    pub fn border_focused() -> Style {
        theme().focused_border_style()
    }

    pub fn selection() -> Style {
        theme().selection_style()
    }

    pub fn text() -> Style {
        theme().text_style()
    }

    pub fn text_dim() -> Style {
        theme().text_dim_style()
    }

    pub fn text_muted() -> Style {
        theme().text_muted_style()
    }

    pub fn accent() -> Style {
        theme().accent_style()
    }

    pub fn accent_bold() -> Style {
        theme().accent_bold_style()
    }

    pub fn group() -> Style {
        theme().group_style()
    }

    pub fn note(kind: NoteKind) -> Style {
        theme().note_style(kind)
    }
}
