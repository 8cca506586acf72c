use ratatui::style::{Color, Modifier, Style};

use scriptsense_core::JobPhase;

/// Color theme for the TUI.
pub struct Theme {
    pub done: Color,
    pub error: Color,
    pub warning: Color,
    pub cancelled: Color,

    pub header_fg: Color,
    pub header_bg: Color,
    pub border: Color,
    pub text: Color,
    pub dim: Color,
    pub active: Color,
    pub editing: Color,
    pub spinner: Color,
    pub bar: Color,
    pub footer_fg: Color,
    pub footer_bg: Color,
}

impl Theme {
    /// Hacker-green terminal theme.
    pub fn hacker() -> Self {
        Self {
            done: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
            cancelled: Color::Magenta,

            header_fg: Color::Black,
            header_bg: Color::Green,
            border: Color::DarkGray,
            text: Color::White,
            dim: Color::DarkGray,
            active: Color::Cyan,
            editing: Color::Yellow,
            spinner: Color::Cyan,
            bar: Color::Green,
            footer_fg: Color::DarkGray,
            footer_bg: Color::Reset,
        }
    }

    pub fn phase_color(&self, phase: &JobPhase) -> Color {
        match phase {
            JobPhase::Processing => self.active,
            JobPhase::Done => self.done,
            JobPhase::Cancelled => self.cancelled,
            JobPhase::Error(_) => self.error,
        }
    }

    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.header_fg)
            .bg(self.header_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Border of a text panel: focused, editing or idle.
    pub fn panel_border_style(&self, focused: bool, editing: bool) -> Style {
        match (focused, editing) {
            (_, true) => Style::default().fg(self.editing).add_modifier(Modifier::BOLD),
            (true, false) => Style::default().fg(self.active),
            (false, false) => self.border_style(),
        }
    }

    pub fn footer_style(&self) -> Style {
        Style::default().fg(self.footer_fg).bg(self.footer_bg)
    }
}
