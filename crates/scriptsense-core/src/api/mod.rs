//! HTTP gateway to the OCR/translation backend.
//!
//! [`ApiClient`] wraps every endpoint the client uses and attaches the
//! session's bearer token to each request. The narrow traits at the bottom
//! ([`JobApi`], [`TokenVerifier`], [`TextReprocessor`]) are the seams the
//! poller, session guard and result panels depend on.

pub mod types;

use std::future::Future;
use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::job::JobId;
use crate::session::Session;
use crate::upload::UploadRequest;
use crate::{ApiError, ValidationError};

pub use types::{
    DetectedLanguage, FeedbackLog, HistoryRecord, JobStatus, LoginResponse, MessageResponse,
    RecentDocument, ReprocessRequest, ReprocessResponse, SaveEditRequest, SaveEditResponse,
    SaveFormat, StatusResponse, TextArea, UserInfo, UserSummary, VerifyResponse,
};
use types::{
    CreateJobResponse, EmailRequest, FeedbackRequest, LoginRequest, SignupRequest, TokenRequest,
};

/// Client for the backend REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Build a client carrying the token of `session`, if any.
    pub fn for_session(config: &Config, session: Option<&Session>) -> Result<Self, ApiError> {
        let client = Self::new(config)?;
        Ok(match session {
            Some(s) => client.with_token(s.token.clone()),
            None => client,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send_raw(request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_raw(&self, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        log::debug!("response {} ({} bytes)", status.as_u16(), body.len());

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| "unauthorized".to_string()),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message: error_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            });
        }
        Ok(body.to_vec())
    }

    // ---- auth ----

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let req = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, password });
        self.send(req).await
    }

    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<MessageResponse, ApiError> {
        let req = self.http.post(self.url("/auth/signup")).json(&SignupRequest {
            name,
            email,
            password,
        });
        self.send(req).await
    }

    pub async fn verify_token(&self, token: &str) -> Result<VerifyResponse, ApiError> {
        let req = self
            .http
            .post(self.url("/auth/verify-token"))
            .json(&TokenRequest { token });
        self.send(req).await
    }

    // ---- jobs ----

    /// Upload a document and create a processing job.
    pub async fn create_job(&self, upload: &UploadRequest, email: &str) -> Result<JobId, ApiError> {
        let form = Form::new()
            .part("file", file_part(&upload.file).await?)
            .text("source_lang", upload.source_lang.clone())
            .text("target_lang", upload.target_lang.clone())
            .text("email", email.to_string());
        let req = self.http.post(self.url("/upload")).multipart(form);
        let created: CreateJobResponse = self.send(req).await?;
        log::info!("created job {} for {}", created.job_id, upload.file.display());
        JobId::new(created.job_id).ok_or_else(|| ApiError::Backend {
            status: 200,
            message: "backend returned an empty job id".to_string(),
        })
    }

    pub async fn poll_status(&self, job_id: &JobId) -> Result<StatusResponse, ApiError> {
        let req = self
            .http
            .get(self.url(&format!("/status/{}", urlencoding::encode(job_id.as_str()))));
        self.send(req).await
    }

    pub async fn cancel_job(&self, job_id: &JobId) -> Result<MessageResponse, ApiError> {
        let req = self
            .http
            .post(self.url(&format!("/cancel/{}", urlencoding::encode(job_id.as_str()))));
        self.send(req).await
    }

    pub async fn detect_language(&self, file: &Path) -> Result<DetectedLanguage, ApiError> {
        let form = Form::new().part("file", file_part(file).await?);
        let req = self.http.post(self.url("/detect-language")).multipart(form);
        self.send(req).await
    }

    // ---- result editing ----

    pub async fn reprocess_text(
        &self,
        request: &ReprocessRequest,
    ) -> Result<ReprocessResponse, ApiError> {
        if request.text.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        let req = self.http.post(self.url("/reprocess-text")).json(request);
        self.send(req).await
    }

    pub async fn save_edited_text(
        &self,
        request: &SaveEditRequest<'_>,
    ) -> Result<SaveEditResponse, ApiError> {
        if request.text.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        let req = self.http.post(self.url("/save-edited-text")).json(request);
        self.send(req).await
    }

    /// Fetch a server-generated file from a link returned by the backend
    /// (`download_*` result fields or a save-edit `download_url`).
    pub async fn download(&self, link: &str) -> Result<Vec<u8>, ApiError> {
        let url = if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else if link.starts_with('/') {
            self.url(link)
        } else {
            self.url(&format!("/{link}"))
        };
        self.send_raw(self.http.get(url)).await
    }

    // ---- feedback & history ----

    /// Submit free-text feedback. An `error` field in a successful reply is a
    /// backend-reported failure.
    pub async fn submit_feedback(
        &self,
        email: &str,
        feedback: &str,
    ) -> Result<MessageResponse, ApiError> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(ValidationError::EmptyFeedback.into());
        }
        let req = self
            .http
            .post(self.url("/feedback"))
            .json(&FeedbackRequest { email, feedback });
        let reply: MessageResponse = self.send(req).await?;
        if let Some(error) = reply.error {
            return Err(ApiError::Backend {
                status: 200,
                message: error,
            });
        }
        Ok(reply)
    }

    pub async fn recent_documents(&self, email: &str) -> Result<Vec<RecentDocument>, ApiError> {
        let req = self
            .http
            .post(self.url("/recent-documents"))
            .json(&EmailRequest { email });
        self.send(req).await
    }

    pub async fn history(&self, email: &str) -> Result<Vec<HistoryRecord>, ApiError> {
        let req = self
            .http
            .get(self.url(&format!("/history/{}", urlencoding::encode(email))));
        self.send(req).await
    }

    // ---- admin ----

    /// List all users. Authorization is decided by the backend; `admin_email`
    /// identifies the requesting account.
    pub async fn admin_users(&self, admin_email: &str) -> Result<Vec<UserSummary>, ApiError> {
        let req = self
            .http
            .post(self.url("/admin/users"))
            .json(&EmailRequest { email: admin_email });
        self.send(req).await
    }

    pub async fn admin_feedback(&self, user_email: &str) -> Result<FeedbackLog, ApiError> {
        let req = self.http.get(self.url(&format!(
            "/admin/feedback/{}",
            urlencoding::encode(user_email)
        )));
        self.send(req).await
    }
}

async fn file_part(path: &Path) -> Result<Part, ApiError> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Part::bytes(bytes).file_name(name))
}

/// Pull `error` (or `message`) out of a JSON error body.
fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Status polling and cancellation, as used by the job poller.
pub trait JobApi: Send + Sync + 'static {
    fn fetch_status(
        &self,
        job_id: &JobId,
    ) -> impl Future<Output = Result<StatusResponse, ApiError>> + Send;

    fn send_cancel(&self, job_id: &JobId) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Token verification, as used by the session guard.
pub trait TokenVerifier: Send + Sync {
    /// `Ok(true)` valid, `Ok(false)` rejected by the backend, `Err` unreachable.
    fn check_token(&self, token: &str) -> impl Future<Output = Result<bool, ApiError>> + Send;
}

/// Text reprocessing, as used by editable result panels.
pub trait TextReprocessor: Send + Sync {
    fn reprocess(
        &self,
        request: &ReprocessRequest,
    ) -> impl Future<Output = Result<ReprocessResponse, ApiError>> + Send;
}

impl JobApi for ApiClient {
    async fn fetch_status(&self, job_id: &JobId) -> Result<StatusResponse, ApiError> {
        self.poll_status(job_id).await
    }

    async fn send_cancel(&self, job_id: &JobId) -> Result<(), ApiError> {
        self.cancel_job(job_id).await.map(|_| ())
    }
}

impl TokenVerifier for ApiClient {
    async fn check_token(&self, token: &str) -> Result<bool, ApiError> {
        match self.verify_token(token).await {
            Ok(resp) => Ok(resp.valid),
            Err(ApiError::Unauthorized { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl TextReprocessor for ApiClient {
    async fn reprocess(&self, request: &ReprocessRequest) -> Result<ReprocessResponse, ApiError> {
        self.reprocess_text(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(
            error_message(br#"{"error":"Invalid job ID"}"#).as_deref(),
            Some("Invalid job ID")
        );
        assert_eq!(
            error_message(br#"{"message":"Cannot cancel job in done status."}"#).as_deref(),
            Some("Cannot cancel job in done status.")
        );
        assert_eq!(error_message(b"<html>"), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = Config {
            api_url: "http://localhost:5000/".to_string(),
            ..Config::default()
        };
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.url("/status/x"), "http://localhost:5000/status/x");
    }
}
