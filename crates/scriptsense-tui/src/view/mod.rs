pub mod help;
pub mod processing;
pub mod result;

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::StatusLine;
use crate::theme::Theme;

/// Spinner frames for animated progress indication.
const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Get the current spinner character based on a tick counter.
pub fn spinner_char(tick: usize) -> char {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

/// Truncate a string to fit in `max_width` columns, appending "…" if truncated.
pub fn truncate(s: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if s.chars().count() <= max_width {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

/// ` SCRIPTSENSE > job > page` header line.
fn render_breadcrumb(f: &mut Frame, area: Rect, job_id: &str, page: &str, theme: &Theme) {
    let breadcrumb = Line::from(vec![
        Span::styled(" SCRIPTSENSE ", theme.header_style()),
        Span::styled(" > ", Style::default().fg(theme.dim)),
        Span::styled(
            truncate(job_id, (area.width as usize).saturating_sub(30)),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" > ", Style::default().fg(theme.dim)),
        Span::styled(page.to_string(), Style::default().fg(theme.active)),
    ]);
    f.render_widget(Paragraph::new(breadcrumb), area);
}

fn render_status(f: &mut Frame, area: Rect, status: Option<&StatusLine>, theme: &Theme) {
    let Some(status) = status else {
        return;
    };
    let color = if status.is_error { theme.error } else { theme.done };
    f.render_widget(
        Paragraph::new(Span::styled(format!(" {}", status.text), Style::default().fg(color))),
        area,
    );
}

fn render_footer(f: &mut Frame, area: Rect, keys: &str, theme: &Theme) {
    f.render_widget(
        Paragraph::new(Span::styled(format!(" {keys}"), theme.footer_style())),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("வணக்கம்", 20), "வணக்கம்");
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn spinner_wraps() {
        assert_eq!(spinner_char(0), spinner_char(SPINNER_FRAMES.len()));
    }
}
