use std::mem;

use scriptsense_core::api::TextArea;
use scriptsense_core::results::{CommitOutcome, TextPanel};
use scriptsense_core::{ConfidenceHistogram, JobId, JobPhase, JobResult, PollSnapshot};
use scriptsense_export::ExportFormat;

use crate::action::Action;
use crate::theme::Theme;
use crate::tui_event::BackendEvent;

/// Which screen is currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Processing,
    Result,
    Cancelled,
}

/// Work the main loop hands to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    CancelJob,
    Reprocess(TextPanel),
    Export {
        text: String,
        lang: String,
        area: TextArea,
        format: ExportFormat,
    },
}

/// One-line feedback shown above the footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
}

/// State of the result screen.
pub struct ResultState {
    pub result: JobResult,
    pub panels: [TextPanel; 2],
    pub focus: usize,
    pub scroll: [u16; 2],
    /// Panel index with a reprocess request in flight.
    pub busy: Option<usize>,
    pub histogram: ConfidenceHistogram,
}

impl ResultState {
    fn new(result: JobResult, target_hint: &str) -> Self {
        let panels = [
            TextPanel::extracted(&result),
            TextPanel::translated(&result, target_hint),
        ];
        let histogram = ConfidenceHistogram::from_scores(&result.word_confidence_scores);
        Self {
            result,
            panels,
            focus: 1,
            scroll: [0, 0],
            busy: None,
            histogram,
        }
    }

    pub fn focused(&self) -> &TextPanel {
        &self.panels[self.focus]
    }

    fn panel_index(area: TextArea) -> usize {
        match area {
            TextArea::Extracted => 0,
            TextArea::Translated => 1,
        }
    }
}

/// Main application state.
pub struct App {
    pub screen: Screen,
    pub snapshot: PollSnapshot,
    pub results: Option<ResultState>,
    /// Fallback language for the translated panel.
    pub target_hint: String,
    pub tick: usize,
    pub theme: Theme,
    pub should_quit: bool,
    pub show_help: bool,
    pub count_whitespace: bool,
    pub status: Option<StatusLine>,
    /// Height of the visible text area (set on resize, used for page up/down).
    pub visible_rows: usize,
    requests: Vec<Request>,
}

impl App {
    pub fn new(job_id: JobId, target_hint: impl Into<String>) -> Self {
        Self {
            screen: Screen::Processing,
            snapshot: PollSnapshot {
                job_id,
                phase: JobPhase::Processing,
                metrics: Default::default(),
                cancelling: false,
                polls: 0,
            },
            results: None,
            target_hint: target_hint.into(),
            tick: 0,
            theme: Theme::hacker(),
            should_quit: false,
            show_help: false,
            count_whitespace: true,
            status: None,
            visible_rows: 20,
            requests: Vec::new(),
        }
    }

    /// Whether keystrokes currently go into a text panel.
    pub fn is_editing(&self) -> bool {
        self.screen == Screen::Result
            && self
                .results
                .as_ref()
                .is_some_and(|r| r.focused().is_editing() && r.busy != Some(r.focus))
    }

    /// Requests queued since the last call.
    pub fn take_requests(&mut self) -> Vec<Request> {
        mem::take(&mut self.requests)
    }

    fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(StatusLine {
            text: text.into(),
            is_error,
        });
    }

    /// Process a user action and update state. Returns true if the app should quit.
    pub fn update(&mut self, action: Action) -> bool {
        // When help overlay is shown, only allow a few actions through
        if self.show_help {
            match action {
                Action::Quit => {
                    self.should_quit = true;
                    return true;
                }
                Action::ToggleHelp | Action::CancelEdit => {
                    self.show_help = false;
                }
                Action::Tick => {
                    self.tick = self.tick.wrapping_add(1);
                }
                Action::Resize(_w, h) => {
                    self.visible_rows = (h as usize).saturating_sub(14);
                }
                _ => {} // swallow everything else
            }
            return false;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
                return true;
            }
            Action::ToggleHelp => {
                if !self.is_editing() {
                    self.show_help = true;
                }
            }
            Action::CancelJob => self.request_cancel(),
            Action::SwitchPanel => {
                if let Some(r) = self.results.as_mut() {
                    if !r.focused().is_editing() {
                        r.focus = 1 - r.focus;
                    }
                }
            }
            Action::BeginEdit => {
                if let Some(r) = self.results.as_mut() {
                    if r.busy.is_none() {
                        let focus = r.focus;
                        r.panels[focus].begin_edit();
                        self.set_status("Editing: Ctrl+S to reprocess, Esc to discard", false);
                    }
                }
            }
            Action::CancelEdit => {
                if let Some(r) = self.results.as_mut() {
                    let focus = r.focus;
                    if r.panels[focus].is_editing() && r.busy.is_none() {
                        r.panels[focus].cancel_edit();
                        self.status = None;
                    }
                }
            }
            Action::CommitEdit => self.commit_edit(),
            Action::Input(c) => {
                if self.is_editing() {
                    if let Some(r) = self.results.as_mut() {
                        let focus = r.focus;
                        r.panels[focus].push_char(c);
                    }
                }
            }
            Action::Backspace => {
                if self.is_editing() {
                    if let Some(r) = self.results.as_mut() {
                        let focus = r.focus;
                        r.panels[focus].pop_char();
                    }
                }
            }
            Action::ExportPdf => self.request_export(ExportFormat::Pdf),
            Action::ExportDoc => self.request_export(ExportFormat::Doc),
            Action::ToggleWhitespace => {
                self.count_whitespace = !self.count_whitespace;
            }
            Action::ScrollDown => self.scroll_by(1),
            Action::ScrollUp => self.scroll_by(-1),
            Action::PageDown => self.scroll_by(self.visible_rows.max(1) as i32),
            Action::PageUp => self.scroll_by(-(self.visible_rows.max(1) as i32)),
            Action::Tick => {
                self.tick = self.tick.wrapping_add(1);
            }
            Action::Resize(_w, h) => {
                // Rough estimate: total height minus header, stats, histogram and footer
                self.visible_rows = (h as usize).saturating_sub(14);
            }
            Action::None => {}
        }
        false
    }

    fn request_cancel(&mut self) {
        if self.screen != Screen::Processing
            || self.snapshot.phase.is_terminal()
            || self.snapshot.cancelling
            || self.requests.contains(&Request::CancelJob)
        {
            return;
        }
        self.snapshot.cancelling = true;
        self.requests.push(Request::CancelJob);
        self.set_status("Cancelling...", false);
    }

    fn commit_edit(&mut self) {
        let Some(r) = self.results.as_mut() else {
            return;
        };
        let focus = r.focus;
        if !r.panels[focus].is_editing() || r.busy.is_some() {
            return;
        }
        r.busy = Some(focus);
        let area = r.panels[focus].area;
        self.requests.push(Request::Reprocess(r.panels[focus].clone()));
        self.set_status(format!("Reprocessing {area} text..."), false);
    }

    fn request_export(&mut self, format: ExportFormat) {
        let Some(r) = self.results.as_ref() else {
            return;
        };
        let panel = r.focused();
        if panel.is_editing() {
            return;
        }
        self.requests.push(Request::Export {
            text: panel.displayed().to_string(),
            lang: panel.lang.clone(),
            area: panel.area,
            format,
        });
    }

    fn scroll_by(&mut self, delta: i32) {
        if let Some(r) = self.results.as_mut() {
            let s = &mut r.scroll[r.focus];
            *s = if delta < 0 {
                s.saturating_sub(delta.unsigned_abs() as u16)
            } else {
                s.saturating_add(delta as u16)
            };
        }
    }

    /// Process a backend event and update model state.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Snapshot(snapshot) => {
                if self.screen == Screen::Processing {
                    self.snapshot = snapshot;
                }
            }
            BackendEvent::JobDone(result) => {
                self.snapshot.phase = JobPhase::Done;
                self.results = Some(ResultState::new(*result, &self.target_hint));
                self.screen = Screen::Result;
                self.status = None;
            }
            BackendEvent::JobCancelled => {
                self.snapshot.phase = JobPhase::Cancelled;
                self.snapshot.cancelling = false;
                self.screen = Screen::Cancelled;
                self.status = None;
            }
            BackendEvent::CancelFailed(error) => {
                self.snapshot.cancelling = false;
                self.set_status(format!("Cancel failed: {error}"), true);
            }
            BackendEvent::Reprocessed { panel, outcome } => {
                if let Some(r) = self.results.as_mut() {
                    let idx = ResultState::panel_index(panel.area);
                    r.panels[idx] = panel;
                    r.busy = None;
                }
                match outcome {
                    CommitOutcome::Reprocessed => self.set_status("Text reprocessed", false),
                    CommitOutcome::KeptEdit { reason } => {
                        self.set_status(format!("Kept your edit ({reason})"), true)
                    }
                }
            }
            BackendEvent::Exported(path) => {
                self.set_status(format!("Exported {}", path.display()), false);
            }
            BackendEvent::ExportFailed(error) => {
                self.set_status(format!("Export failed: {error}"), true);
            }
        }
    }

    /// Render the current screen.
    pub fn view(&self, f: &mut ratatui::Frame) {
        match self.screen {
            Screen::Processing | Screen::Cancelled => crate::view::processing::render(f, self),
            Screen::Result => crate::view::result::render(f, self),
        }

        if self.show_help {
            crate::view::help::render(f, &self.theme);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptsense_core::api::ReprocessResponse;
    use scriptsense_core::JobMetrics;

    fn app() -> App {
        App::new(JobId::new("job-7").unwrap(), "en")
    }

    fn result() -> JobResult {
        JobResult {
            extracted_text: "வணக்கம்".to_string(),
            translated_text: "Hello".to_string(),
            detected_language: Some("ta".to_string()),
            target_lang: Some("en".to_string()),
            word_confidence_scores: vec![0.1, 0.9, 0.95],
            ..Default::default()
        }
    }

    fn finished() -> App {
        let mut app = app();
        app.handle_backend_event(BackendEvent::JobDone(Box::new(result())));
        app
    }

    #[test]
    fn snapshots_update_processing_view() {
        let mut app = app();
        let mut snap = app.snapshot.clone();
        snap.metrics = JobMetrics {
            accuracy: Some("88%".to_string()),
            ..Default::default()
        };
        snap.polls = 3;
        app.handle_backend_event(BackendEvent::Snapshot(snap.clone()));
        assert_eq!(app.snapshot, snap);
        assert_eq!(app.screen, Screen::Processing);
    }

    #[test]
    fn cancel_is_requested_once() {
        let mut app = app();
        app.update(Action::CancelJob);
        app.update(Action::CancelJob);
        assert_eq!(app.take_requests(), vec![Request::CancelJob]);
        assert!(app.snapshot.cancelling);

        app.handle_backend_event(BackendEvent::CancelFailed("offline".to_string()));
        assert!(!app.snapshot.cancelling);
        assert!(app.status.as_ref().is_some_and(|s| s.is_error));

        app.update(Action::CancelJob);
        assert_eq!(app.take_requests(), vec![Request::CancelJob]);
    }

    #[test]
    fn cancel_ignored_after_error() {
        let mut app = app();
        app.snapshot.phase = JobPhase::Error("processing failed".to_string());
        app.update(Action::CancelJob);
        assert!(app.take_requests().is_empty());
    }

    #[test]
    fn done_switches_to_result_view() {
        let app = finished();
        assert_eq!(app.screen, Screen::Result);
        let r = app.results.as_ref().unwrap();
        assert_eq!(r.panels[0].lang, "ta");
        assert_eq!(r.panels[1].displayed(), "Hello");
        assert_eq!(r.histogram.counts(), [1, 0, 0, 0, 2]);
        assert_eq!(r.focus, 1);
    }

    #[test]
    fn late_snapshot_does_not_leave_result_view() {
        let mut app = finished();
        let snap = app.snapshot.clone();
        app.handle_backend_event(BackendEvent::Snapshot(snap));
        assert_eq!(app.screen, Screen::Result);
    }

    #[test]
    fn cancelled_event_shows_cancelled_screen() {
        let mut app = app();
        app.update(Action::CancelJob);
        app.handle_backend_event(BackendEvent::JobCancelled);
        assert_eq!(app.screen, Screen::Cancelled);
        assert_eq!(app.snapshot.phase, JobPhase::Cancelled);
    }

    #[test]
    fn edit_and_commit_sends_draft() {
        let mut app = finished();
        app.update(Action::BeginEdit);
        assert!(app.is_editing());
        app.update(Action::Input('!'));
        app.update(Action::CommitEdit);
        assert!(!app.is_editing());

        let requests = app.take_requests();
        let [Request::Reprocess(panel)] = requests.as_slice() else {
            panic!("expected one reprocess request, got {requests:?}");
        };
        assert_eq!(panel.draft(), "Hello!");
        assert_eq!(panel.reprocess_request().source_lang, "auto");

        // input is ignored while the request is in flight
        app.update(Action::Input('x'));
        assert_eq!(app.results.as_ref().unwrap().panels[1].draft(), "Hello!");
    }

    #[tokio::test]
    async fn reprocessed_panel_replaces_edited_one() {
        struct Echo;
        impl scriptsense_core::TextReprocessor for Echo {
            async fn reprocess(
                &self,
                request: &scriptsense_core::api::ReprocessRequest,
            ) -> Result<ReprocessResponse, scriptsense_core::ApiError> {
                Ok(ReprocessResponse {
                    translated_text: Some(request.text.to_uppercase()),
                    ..Default::default()
                })
            }
        }

        let mut app = finished();
        app.update(Action::BeginEdit);
        app.update(Action::Input('!'));
        app.update(Action::CommitEdit);
        let Some(Request::Reprocess(mut panel)) = app.take_requests().pop() else {
            panic!("expected a reprocess request");
        };
        let outcome = panel.commit(&Echo).await;
        app.handle_backend_event(BackendEvent::Reprocessed { panel, outcome });

        let r = app.results.as_ref().unwrap();
        assert_eq!(r.busy, None);
        assert_eq!(r.panels[1].displayed(), "HELLO!");
        assert!(!r.panels[1].is_editing());
        assert_eq!(app.status.as_ref().unwrap().text, "Text reprocessed");
    }

    #[test]
    fn escape_discards_edit() {
        let mut app = finished();
        app.update(Action::BeginEdit);
        app.update(Action::Backspace);
        app.update(Action::CancelEdit);
        let r = app.results.as_ref().unwrap();
        assert_eq!(r.panels[1].draft(), "Hello");
        assert!(!r.panels[1].is_editing());
        assert!(app.take_requests().is_empty());
    }

    #[test]
    fn export_uses_focused_panel() {
        let mut app = finished();
        app.update(Action::SwitchPanel);
        app.update(Action::ExportPdf);
        assert_eq!(
            app.take_requests(),
            vec![Request::Export {
                text: "வணக்கம்".to_string(),
                lang: "ta".to_string(),
                area: TextArea::Extracted,
                format: ExportFormat::Pdf,
            }]
        );
    }

    #[test]
    fn help_swallows_actions() {
        let mut app = finished();
        app.update(Action::ToggleHelp);
        assert!(app.show_help);
        app.update(Action::ExportDoc);
        assert!(app.take_requests().is_empty());
        app.update(Action::ToggleHelp);
        assert!(!app.show_help);
        assert!(app.update(Action::Quit));
        assert!(app.should_quit);
    }

    #[test]
    fn scrolling_is_per_panel() {
        let mut app = finished();
        app.update(Action::ScrollDown);
        app.update(Action::ScrollDown);
        app.update(Action::SwitchPanel);
        app.update(Action::ScrollUp);
        assert_eq!(app.results.as_ref().unwrap().scroll, [0, 2]);
    }
}
