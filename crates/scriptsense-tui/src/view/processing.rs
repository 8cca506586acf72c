use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use scriptsense_core::JobPhase;

use crate::app::App;
use crate::theme::Theme;
use crate::view::{render_breadcrumb, render_footer, render_status, spinner_char};

/// Render the processing screen, also used for the cancelled and failed states.
pub fn render(f: &mut Frame, app: &App) {
    let theme = &app.theme;
    let snapshot = &app.snapshot;
    let chunks = Layout::vertical([
        Constraint::Length(1), // breadcrumb
        Constraint::Min(8),    // job panel
        Constraint::Length(1), // status
        Constraint::Length(1), // footer
    ])
    .split(f.area());

    render_breadcrumb(f, chunks[0], snapshot.job_id.as_str(), snapshot.phase.label(), theme);

    let lines = if snapshot.is_visible() {
        job_lines(app, theme)
    } else {
        vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Processing cancelled.",
                Style::default()
                    .fg(theme.cancelled)
                    .add_modifier(Modifier::BOLD),
            )),
        ]
    };

    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.phase_color(&snapshot.phase)))
                .title(" Job "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(panel, chunks[1]);

    render_status(f, chunks[2], app.status.as_ref(), theme);

    let keys = match snapshot.phase {
        JobPhase::Processing if !snapshot.cancelling => "c cancel job  ? help  q quit",
        _ => "? help  q quit",
    };
    render_footer(f, chunks[3], keys, theme);
}

fn job_lines<'a>(app: &'a App, theme: &Theme) -> Vec<Line<'a>> {
    let snapshot = &app.snapshot;
    let metrics = &snapshot.metrics;

    let headline = match &snapshot.phase {
        JobPhase::Error(message) => Line::from(Span::styled(
            format!("  Processing failed: {message}"),
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        )),
        _ if snapshot.cancelling => Line::from(Span::styled(
            format!("  {} Cancelling...", spinner_char(app.tick)),
            Style::default().fg(theme.warning),
        )),
        _ => Line::from(Span::styled(
            format!("  {} Processing document...", spinner_char(app.tick)),
            Style::default()
                .fg(theme.spinner)
                .add_modifier(Modifier::BOLD),
        )),
    };

    let row = |label: &'static str, value: &'a str| {
        Line::from(vec![
            Span::styled(format!("    {label:<12}"), Style::default().fg(theme.dim)),
            Span::styled(value, Style::default().fg(theme.text)),
        ])
    };

    vec![
        Line::from(""),
        headline,
        Line::from(""),
        row("Accuracy", metrics.accuracy_label()),
        row("Pages", metrics.pages_label()),
        row("ETA", metrics.eta_label()),
        Line::from(Span::styled(
            format!("    {:<12}{}", "Polls", snapshot.polls),
            Style::default().fg(theme.dim),
        )),
    ]
}
