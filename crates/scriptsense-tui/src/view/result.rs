use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{BarChart, Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use scriptsense_core::api::TextArea;
use scriptsense_core::languages;
use scriptsense_core::results::{review_hint, TextPanel};

use crate::app::{App, ResultState};
use crate::theme::Theme;
use crate::view::{render_breadcrumb, render_footer, render_status, spinner_char};

const FOOTER_KEYS: &str = "Tab switch  e edit  p pdf  w doc  s spaces  j/k scroll  ? help  q quit";
const EDIT_KEYS: &str = "Ctrl+s reprocess  Esc discard  Ctrl+c quit";

/// Render the result screen: stats, the two text panels and the confidence histogram.
pub fn render(f: &mut Frame, app: &App) {
    let Some(state) = app.results.as_ref() else {
        return;
    };
    let theme = &app.theme;
    let show_histogram = state.histogram.total() > 0 && f.area().height >= 30;

    let mut constraints = vec![
        Constraint::Length(1), // breadcrumb
        Constraint::Length(5), // stats
        Constraint::Min(6),    // text panels
    ];
    if show_histogram {
        constraints.push(Constraint::Length(9));
    }
    constraints.push(Constraint::Length(1)); // status
    constraints.push(Constraint::Length(1)); // footer
    let chunks = Layout::vertical(constraints).split(f.area());

    render_breadcrumb(f, chunks[0], app.snapshot.job_id.as_str(), "Result", theme);
    render_stats(f, chunks[1], app, state);

    let halves = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    for (i, half) in halves.iter().enumerate() {
        render_panel(f, *half, app, state, i);
    }

    let mut next = 3;
    if show_histogram {
        render_histogram(f, chunks[next], state, theme);
        next += 1;
    }
    render_status(f, chunks[next], app.status.as_ref(), theme);
    let keys = if app.is_editing() { EDIT_KEYS } else { FOOTER_KEYS };
    render_footer(f, chunks[next + 1], keys, theme);
}

fn render_stats(f: &mut Frame, area: Rect, app: &App, state: &ResultState) {
    let theme = &app.theme;
    let result = &state.result;
    let stats = &result.stats;
    let label = Style::default().fg(theme.dim);
    let value = Style::default().fg(theme.text).add_modifier(Modifier::BOLD);

    let chars_label = if app.count_whitespace {
        "Chars "
    } else {
        "Chars (no spaces) "
    };
    let mut first = vec![
        Span::styled(" Language ", label),
        Span::styled(languages::display_name(result.source_language()), value),
    ];
    if let Some(c) = result.confidence {
        first.push(Span::styled("  Confidence ", label));
        first.push(Span::styled(format!("{:.1}%", c * 100.0), value));
    }
    let second = vec![
        Span::styled(" Words ", label),
        Span::styled(stats.word_count.to_string(), value),
        Span::styled(format!("  {chars_label}"), label),
        Span::styled(stats.char_count(app.count_whitespace).to_string(), value),
        Span::styled("  Lines ", label),
        Span::styled(stats.line_count.to_string(), value),
        Span::styled("  Pages ", label),
        Span::styled(stats.page_count.to_string(), value),
    ];

    let mut lines = vec![Line::from(first), Line::from(second)];
    if let Some(hint) = review_hint(result.low_conf_count) {
        lines.push(Line::from(Span::styled(
            format!(" {hint}"),
            Style::default().fg(theme.warning),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(" Document ");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_panel(f: &mut Frame, area: Rect, app: &App, state: &ResultState, index: usize) {
    let theme = &app.theme;
    let panel = &state.panels[index];
    let busy = state.busy == Some(index);

    let text = if busy || panel.is_editing() {
        let mut draft = panel.draft().to_string();
        if !busy {
            draft.push('▏');
        }
        draft
    } else {
        panel.displayed().to_string()
    };

    let suffix = if busy {
        format!(" {} reprocessing ", spinner_char(app.tick))
    } else if panel.is_editing() {
        " editing ".to_string()
    } else {
        String::new()
    };
    let title = format!(" {} ({}){suffix}", panel_title(panel), panel.lang);

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.panel_border_style(state.focus == index, panel.is_editing()))
                .title(title),
        )
        .wrap(Wrap { trim: false })
        .scroll((state.scroll[index], 0));
    f.render_widget(paragraph, area);
}

fn panel_title(panel: &TextPanel) -> &'static str {
    match panel.area {
        TextArea::Extracted => "Extracted",
        TextArea::Translated => "Translated",
    }
}

fn render_histogram(f: &mut Frame, area: Rect, state: &ResultState, theme: &Theme) {
    let data: Vec<(&str, u64)> = state
        .histogram
        .buckets()
        .map(|(label, count)| (label, count as u64))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style())
                .title(" Word confidence "),
        )
        .data(data.as_slice())
        .bar_width(8)
        .bar_gap(2)
        .bar_style(Style::default().fg(theme.bar))
        .value_style(Style::default().fg(theme.header_fg).bg(theme.bar))
        .label_style(Style::default().fg(theme.dim));
    f.render_widget(chart, area);
}
