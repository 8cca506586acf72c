//! Editable result panels and review hints.

use crate::api::{ReprocessRequest, TextArea, TextReprocessor};
use crate::job::JobResult;

/// Source language sent when reprocessing translated text.
const AUTO_SOURCE: &str = "auto";

/// One text panel of the result view: what is shown plus an edit buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPanel {
    pub area: TextArea,
    /// Language code of the text in this panel.
    pub lang: String,
    displayed: String,
    draft: String,
    editing: bool,
}

/// How a commit resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The backend returned replacement text, now displayed.
    Reprocessed,
    /// The edited text itself is now displayed.
    KeptEdit { reason: String },
}

impl TextPanel {
    pub fn new(area: TextArea, lang: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            area,
            lang: lang.into(),
            draft: text.clone(),
            displayed: text,
            editing: false,
        }
    }

    /// The extracted-text panel for a finished job.
    pub fn extracted(result: &JobResult) -> Self {
        Self::new(
            TextArea::Extracted,
            result.source_language(),
            result.extracted_text.clone(),
        )
    }

    /// The translated-text panel. `fallback_lang` is used when the result
    /// does not echo its target language.
    pub fn translated(result: &JobResult, fallback_lang: &str) -> Self {
        let lang = result
            .target_lang
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(fallback_lang);
        Self::new(TextArea::Translated, lang, result.translated_text.clone())
    }

    pub fn displayed(&self) -> &str {
        &self.displayed
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn begin_edit(&mut self) {
        self.draft = self.displayed.clone();
        self.editing = true;
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn push_char(&mut self, c: char) {
        self.draft.push(c);
    }

    pub fn pop_char(&mut self) {
        self.draft.pop();
    }

    /// Drop the edit and go back to the displayed text.
    pub fn cancel_edit(&mut self) {
        self.draft = self.displayed.clone();
        self.editing = false;
    }

    pub fn reprocess_request(&self) -> ReprocessRequest {
        let source_lang = match self.area {
            TextArea::Translated => AUTO_SOURCE.to_string(),
            TextArea::Extracted => self.lang.clone(),
        };
        ReprocessRequest {
            text: self.draft.clone(),
            target_lang: self.lang.clone(),
            source_lang,
            area: self.area,
        }
    }

    /// Send the draft for reprocessing and display the outcome. Never fails:
    /// an empty reply or a failed request leaves the edited text displayed.
    pub async fn commit(&mut self, reprocessor: &impl TextReprocessor) -> CommitOutcome {
        self.editing = false;
        let request = self.reprocess_request();

        let (text, outcome) = match reprocessor.reprocess(&request).await {
            Ok(reply) => {
                let replacement = reply
                    .translated_text
                    .or(reply.corrected_text)
                    .filter(|t| !t.trim().is_empty());
                match replacement {
                    Some(text) => (text, CommitOutcome::Reprocessed),
                    None => (
                        request.text,
                        CommitOutcome::KeptEdit {
                            reason: "backend returned no text".to_string(),
                        },
                    ),
                }
            }
            Err(e) => {
                log::warn!("reprocessing {} text failed: {}", self.area, e);
                (
                    request.text,
                    CommitOutcome::KeptEdit {
                        reason: e.to_string(),
                    },
                )
            }
        };

        self.displayed = text.clone();
        self.draft = text;
        outcome
    }
}

/// Warning shown when some words were recognized with low confidence.
pub fn review_hint(low_conf_count: u64) -> Option<String> {
    match low_conf_count {
        0 => None,
        1 => Some("Review suggested: 1 word was detected with low confidence.".to_string()),
        n => Some(format!(
            "Review suggested: {n} words were detected with low confidence."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiError;
    use crate::api::ReprocessResponse;
    use std::sync::Mutex;

    struct FakeReprocessor {
        reply: Mutex<Option<Result<ReprocessResponse, ApiError>>>,
        seen: Mutex<Vec<ReprocessRequest>>,
    }

    impl FakeReprocessor {
        fn replying(reply: Result<ReprocessResponse, ApiError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::default(),
            }
        }
    }

    impl TextReprocessor for FakeReprocessor {
        async fn reprocess(
            &self,
            request: &ReprocessRequest,
        ) -> Result<ReprocessResponse, ApiError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(ReprocessResponse::default()))
        }
    }

    fn result() -> JobResult {
        JobResult {
            extracted_text: "vanakkam".into(),
            translated_text: "hello".into(),
            detected_language: Some("ta".into()),
            target_lang: Some("en".into()),
            ..Default::default()
        }
    }

    #[test]
    fn panels_are_seeded_from_result() {
        let r = result();
        let extracted = TextPanel::extracted(&r);
        assert_eq!(extracted.displayed(), "vanakkam");
        assert_eq!(extracted.lang, "ta");

        let translated = TextPanel::translated(&JobResult::default(), "hi");
        assert_eq!(translated.lang, "hi");
        assert_eq!(translated.displayed(), "");
    }

    #[test]
    fn cancel_reverts_draft() {
        let mut panel = TextPanel::translated(&result(), "en");
        panel.begin_edit();
        panel.push_char('!');
        assert_eq!(panel.draft(), "hello!");
        panel.cancel_edit();
        assert_eq!(panel.draft(), "hello");
        assert!(!panel.is_editing());
    }

    #[tokio::test]
    async fn commit_displays_reprocessed_text() {
        let fake = FakeReprocessor::replying(Ok(ReprocessResponse {
            translated_text: Some("Hello there".into()),
            ..Default::default()
        }));
        let mut panel = TextPanel::translated(&result(), "en");
        panel.begin_edit();
        panel.set_draft("helo there");

        assert_eq!(panel.commit(&fake).await, CommitOutcome::Reprocessed);
        assert_eq!(panel.displayed(), "Hello there");
        assert!(!panel.is_editing());

        let seen = fake.seen.lock().unwrap();
        assert_eq!(seen[0].source_lang, "auto");
        assert_eq!(seen[0].target_lang, "en");
        assert_eq!(seen[0].area, TextArea::Translated);
        assert_eq!(seen[0].text, "helo there");
    }

    #[tokio::test]
    async fn empty_reply_keeps_edit() {
        let fake = FakeReprocessor::replying(Ok(ReprocessResponse::default()));
        let mut panel = TextPanel::extracted(&result());
        panel.begin_edit();
        panel.set_draft("vanakkam!");

        let outcome = panel.commit(&fake).await;
        assert!(matches!(outcome, CommitOutcome::KeptEdit { .. }));
        assert_eq!(panel.displayed(), "vanakkam!");
        assert_eq!(fake.seen.lock().unwrap()[0].source_lang, "ta");
    }

    #[tokio::test]
    async fn failed_request_keeps_edit() {
        let fake = FakeReprocessor::replying(Err(ApiError::Backend {
            status: 500,
            message: "boom".into(),
        }));
        let mut panel = TextPanel::translated(&result(), "en");
        panel.begin_edit();
        panel.set_draft("edited");

        let outcome = panel.commit(&fake).await;
        assert_eq!(
            outcome,
            CommitOutcome::KeptEdit {
                reason: "backend error (500): boom".into()
            }
        );
        assert_eq!(panel.displayed(), "edited");
    }

    #[test]
    fn review_hint_pluralizes() {
        assert_eq!(review_hint(0), None);
        assert!(review_hint(1).unwrap().contains("1 word was"));
        assert!(review_hint(4).unwrap().contains("4 words were"));
    }
}
