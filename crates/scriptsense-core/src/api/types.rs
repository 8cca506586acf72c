//! Request and response bodies exchanged with the backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::job::{JobMetrics, JobResult};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Generic `{message}` / `{error}` reply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageResponse {
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateJobResponse {
    pub job_id: String,
}

/// Status string reported by `GET /status/{jobId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Cancelled,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub metrics: Option<JobMetrics>,
}

impl StatusResponse {
    pub fn processing(metrics: Option<JobMetrics>) -> Self {
        Self {
            status: JobStatus::Processing,
            result: None,
            metrics,
        }
    }

    pub fn done(result: &JobResult) -> Self {
        Self {
            status: JobStatus::Done,
            result: serde_json::to_value(result).ok(),
            metrics: None,
        }
    }

    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            result: None,
            metrics: None,
        }
    }

    /// Decode the terminal payload. A missing result decodes as an empty one.
    pub fn job_result(&self) -> Result<JobResult, serde_json::Error> {
        match &self.result {
            Some(value) if !value.is_null() => serde_json::from_value(value.clone()),
            _ => Ok(JobResult::default()),
        }
    }

    /// Error message attached to a backend-reported failure, if any.
    pub fn error_message(&self) -> Option<String> {
        self.result
            .as_ref()
            .and_then(|r| r.get("error"))
            .and_then(|e| e.as_str())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectedLanguage {
    #[serde(rename = "detected_lang_code")]
    pub code: String,
    #[serde(rename = "detected_lang_name")]
    pub name: Option<String>,
    pub confidence: Option<f64>,
}

/// Which result panel a piece of text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextArea {
    Extracted,
    Translated,
}

impl TextArea {
    pub fn as_str(self) -> &'static str {
        match self {
            TextArea::Extracted => "extracted",
            TextArea::Translated => "translated",
        }
    }
}

impl fmt::Display for TextArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReprocessRequest {
    pub text: String,
    pub target_lang: String,
    pub source_lang: String,
    pub area: TextArea,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReprocessResponse {
    pub corrected_text: Option<String>,
    pub translated_text: Option<String>,
    pub detected_language: Option<String>,
    pub confidence: Option<f64>,
}

/// Server-side render format for edited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    Pdf,
    Docx,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveEditRequest<'a> {
    pub text: &'a str,
    pub format: SaveFormat,
    pub lang_code: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SaveEditResponse {
    pub message: String,
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FeedbackRequest<'a> {
    pub email: &'a str,
    pub feedback: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EmailRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSummary {
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedbackLog {
    pub email: Option<String>,
    pub feedback: Vec<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistoryRecord {
    pub filename: String,
    pub upload_time: Option<String>,
    pub language: Option<String>,
    pub confidence: Option<f64>,
    pub word_count: Option<u64>,
    pub page_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecentDocument {
    pub filename: String,
    pub file_type: Option<String>,
    pub language: Option<String>,
    pub uploaded_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_tolerated() {
        let resp: StatusResponse = serde_json::from_str(r#"{"status":"paused"}"#).unwrap();
        assert_eq!(resp.status, JobStatus::Unknown);
    }

    #[test]
    fn error_status_exposes_message() {
        let resp: StatusResponse =
            serde_json::from_str(r#"{"status":"error","result":{"error":"No text extracted"}}"#)
                .unwrap();
        assert_eq!(resp.status, JobStatus::Error);
        assert_eq!(resp.error_message().as_deref(), Some("No text extracted"));
    }

    #[test]
    fn done_with_empty_result_decodes() {
        let resp: StatusResponse = serde_json::from_str(r#"{"status":"done","result":{}}"#).unwrap();
        assert_eq!(resp.job_result().unwrap(), JobResult::default());
    }

    #[test]
    fn reprocess_request_serializes_area_lowercase() {
        let req = ReprocessRequest {
            text: "x".into(),
            target_lang: "ta".into(),
            source_lang: "auto".into(),
            area: TextArea::Translated,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["area"], "translated");
    }
}
