//! Upload form validation and submission.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{ApiClient, DetectedLanguage};
use crate::job::JobId;
use crate::{ApiError, MissingField, ValidationError};

/// Extensions the backend accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "pdf", "doc", "docx"];

/// Tick of the cosmetic upload progress indicator.
pub const PROGRESS_TICK: Duration = Duration::from_millis(100);

/// Raw form state. Any field may be unset until submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub file: Option<PathBuf>,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
}

/// A fully validated upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: PathBuf,
    pub source_lang: String,
    pub target_lang: String,
}

impl UploadForm {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self {
            file,
            ..Default::default()
        }
    }

    /// Check every required field at once. Reports all missing fields together,
    /// then rejects unsupported file types.
    pub fn validate(&self) -> Result<UploadRequest, ValidationError> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        let mut missing = Vec::new();
        if self.file.is_none() {
            missing.push(MissingField::File);
        }
        let source = present(&self.source_lang);
        if source.is_none() {
            missing.push(MissingField::SourceLanguage);
        }
        let target = present(&self.target_lang);
        if target.is_none() {
            missing.push(MissingField::TargetLanguage);
        }

        match (&self.file, source, target) {
            (Some(file), Some(source), Some(target)) => {
                check_extension(file)?;
                Ok(UploadRequest {
                    file: file.clone(),
                    source_lang: source.to_string(),
                    target_lang: target.to_string(),
                })
            }
            _ => Err(ValidationError::Missing(missing)),
        }
    }

    /// Ask the backend for the document's language and use it as the source.
    pub async fn auto_detect(&mut self, api: &ApiClient) -> Result<DetectedLanguage, ApiError> {
        let file = self
            .file
            .as_deref()
            .ok_or(ValidationError::Missing(vec![MissingField::File]))?;
        check_extension(file)?;

        let detected = api.detect_language(file).await?;
        if !detected.code.is_empty() {
            log::info!(
                "detected {} ({})",
                detected.name.as_deref().unwrap_or("unknown"),
                detected.code
            );
            self.source_lang = Some(detected.code.clone());
        }
        Ok(detected)
    }

    /// Validate, then create the job. Nothing is sent if validation fails.
    pub async fn submit(&self, api: &ApiClient, email: &str) -> Result<JobId, ApiError> {
        let request = self.validate()?;
        api.create_job(&request, email).await
    }
}

fn check_extension(path: &Path) -> Result<(), ValidationError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedFile(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ))
    }
}

/// Steps of the simulated upload progress: 10, 20, ..., 100.
///
/// Purely cosmetic; it does not reflect transfer progress.
pub fn simulated_progress() -> impl Iterator<Item = u8> {
    (1..=10).map(|step| step * 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn form(file: Option<&str>, source: Option<&str>, target: Option<&str>) -> UploadForm {
        UploadForm {
            file: file.map(PathBuf::from),
            source_lang: source.map(str::to_string),
            target_lang: target.map(str::to_string),
        }
    }

    #[test]
    fn reports_every_missing_field() {
        let err = form(None, None, Some("  ")).validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::Missing(vec![
                MissingField::File,
                MissingField::SourceLanguage,
                MissingField::TargetLanguage,
            ])
        );
    }

    #[test]
    fn missing_target_only() {
        let err = form(Some("scan.png"), Some("ta"), None).validate().unwrap_err();
        assert_eq!(err, ValidationError::Missing(vec![MissingField::TargetLanguage]));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = form(Some("notes.txt"), Some("en"), Some("hi"))
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedFile("notes.txt".into()));
    }

    #[test]
    fn complete_form_validates() {
        let req = form(Some("Scan.JPEG"), Some("ta"), Some("en")).validate().unwrap();
        assert_eq!(req.source_lang, "ta");
        assert_eq!(req.target_lang, "en");
        assert_eq!(req.file, PathBuf::from("Scan.JPEG"));
    }

    #[test]
    fn language_codes_are_trimmed() {
        let req = form(Some("scan.pdf"), Some(" hi\t"), Some("\nen ")).validate().unwrap();
        assert_eq!(req.source_lang, "hi");
        assert_eq!(req.target_lang, "en");
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_network() {
        // Nothing listens on port 9; a request attempt would surface as a transport error.
        let config = Config {
            api_url: "http://127.0.0.1:9".into(),
            ..Config::default()
        };
        let api = ApiClient::new(&config).unwrap();
        let err = form(Some("scan.pdf"), Some("en"), None)
            .submit(&api, "a@example.com")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::Missing(ref m)) if m == &[MissingField::TargetLanguage]
        ));
    }

    #[test]
    fn progress_runs_to_one_hundred() {
        let steps: Vec<u8> = simulated_progress().collect();
        assert_eq!(steps.first(), Some(&10));
        assert_eq!(steps.last(), Some(&100));
        assert_eq!(steps.len(), 10);
    }
}
