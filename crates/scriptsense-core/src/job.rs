//! Processing job model: identifier, lifecycle phase, sticky progress metrics
//! and the terminal result payload.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque job identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a backend-issued identifier. Empty (or whitespace-only) ids are rejected.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-side view of a job's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPhase {
    Processing,
    Done,
    Cancelled,
    Error(String),
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobPhase::Processing)
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobPhase::Processing => "Processing",
            JobPhase::Done => "Done",
            JobPhase::Cancelled => "Cancelled",
            JobPhase::Error(_) => "Error",
        }
    }
}

/// Partial progress information reported while a job is processing.
///
/// Fields are sticky: [`merge`](JobMetrics::merge) only overwrites the fields
/// present in the update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetrics {
    #[serde(default, deserialize_with = "loose_string")]
    pub accuracy: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub pages: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub eta: Option<String>,
}

impl JobMetrics {
    pub fn merge(&mut self, update: &JobMetrics) {
        if let Some(v) = &update.accuracy {
            self.accuracy = Some(v.clone());
        }
        if let Some(v) = &update.pages {
            self.pages = Some(v.clone());
        }
        if let Some(v) = &update.eta {
            self.eta = Some(v.clone());
        }
    }

    pub fn accuracy_label(&self) -> &str {
        self.accuracy.as_deref().unwrap_or("Loading...")
    }

    pub fn pages_label(&self) -> &str {
        self.pages.as_deref().unwrap_or("Estimating...")
    }

    pub fn eta_label(&self) -> &str {
        self.eta.as_deref().unwrap_or("240s")
    }
}

/// Accept strings and numbers; treat null and empty strings as absent.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Character, word, line and page counts for the extracted text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocStats {
    pub word_count: u64,
    pub char_count: u64,
    pub char_count_with_spaces: Option<u64>,
    pub char_count_no_spaces: Option<u64>,
    pub line_count: u64,
    pub page_count: u64,
}

impl DocStats {
    /// Character count with or without whitespace, falling back to the plain count.
    pub fn char_count(&self, with_whitespace: bool) -> u64 {
        let specific = if with_whitespace {
            self.char_count_with_spaces
        } else {
            self.char_count_no_spaces
        };
        specific.filter(|&n| n > 0).unwrap_or(self.char_count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceMetrics {
    pub document_quality: Option<f64>,
    pub handwriting_clarity: Option<f64>,
    pub text_recognition: Option<f64>,
}

/// Terminal payload of a finished job. Handed to result views by value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobResult {
    pub extracted_text: String,
    pub translated_text: String,
    pub detected_language: Option<String>,
    pub confidence: Option<f64>,
    pub target_lang: Option<String>,
    pub stats: DocStats,
    pub low_conf_count: u64,
    pub word_confidence_scores: Vec<f64>,
    pub confidence_metrics: ConfidenceMetrics,
    pub download_extracted_pdf: Option<String>,
    pub download_extracted_docx: Option<String>,
    pub download_translated_pdf: Option<String>,
    pub download_translated_docx: Option<String>,
}

impl JobResult {
    /// Language of the extracted text, defaulting to English.
    pub fn source_language(&self) -> &str {
        self.detected_language
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("en")
    }
}
