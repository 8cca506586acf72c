use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use scriptsense_core::api::{JobStatus, SaveEditRequest, SaveFormat, TextArea};
use scriptsense_core::upload::UploadForm;
use scriptsense_core::{
    ApiClient, ApiError, Config, JobHooks, JobId, JobPhase, JobPoller, PollConfig, TokenVerifier,
    ValidationError,
};

/// What the mock backend saw, in arrival order.
#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
    upload_fields: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl Seen {
    fn record(&self, path: &str, headers: &HeaderMap) {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((path.to_string(), auth));
    }

    fn auth_for(&self, path: &str) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .and_then(|(_, a)| a.clone())
    }

    fn count(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p.starts_with(prefix))
            .count()
    }
}

type Reply = (StatusCode, Json<Value>);

async fn login(Json(body): Json<Value>) -> Reply {
    if body["password"] == "secret" {
        (
            StatusCode::OK,
            Json(json!({
                "message": "Login successful",
                "token": "tok-1",
                "user": {"email": body["email"], "is_admin": true}
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid credentials"})),
        )
    }
}

async fn verify(Json(body): Json<Value>) -> Reply {
    if body["token"] == "good" {
        (StatusCode::OK, Json(json!({"valid": true, "email": "a@example.com"})))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"valid": false})))
    }
}

async fn status(State(seen): State<Seen>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    seen.record(&format!("/status/{id}"), &headers);
    match id.as_str() {
        "running" => (
            StatusCode::OK,
            Json(json!({"status": "processing", "metrics": {"accuracy": 88, "pages": "2"}})),
        ),
        "finished" => (
            StatusCode::OK,
            Json(json!({
                "status": "done",
                "result": {
                    "extracted_text": "hello",
                    "translated_text": "vanakkam",
                    "word_confidence_scores": [0.5, 0.9],
                    "low_conf_count": 1
                }
            })),
        ),
        _ => (StatusCode::NOT_FOUND, Json(json!({"error": "Invalid job ID"}))),
    }
}

async fn cancel(State(seen): State<Seen>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    seen.record(&format!("/cancel/{id}"), &headers);
    if id == "running" {
        (StatusCode::OK, Json(json!({"message": "Job cancelled"})))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Cannot cancel job in done status."})),
        )
    }
}

async fn upload(State(seen): State<Seen>, headers: HeaderMap, mut multipart: Multipart) -> Reply {
    seen.record("/upload", &headers);
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let value = match field.file_name() {
            Some(file_name) => Some(file_name.to_string()),
            None => field.text().await.ok(),
        };
        seen.upload_fields.lock().unwrap().push((name, value));
    }
    (StatusCode::OK, Json(json!({"job_id": "job-42"})))
}

async fn feedback(Json(body): Json<Value>) -> Reply {
    if body["feedback"].as_str().unwrap_or_default().contains("fail") {
        (StatusCode::OK, Json(json!({"error": "database unavailable"})))
    } else {
        (StatusCode::OK, Json(json!({"message": "Feedback submitted"})))
    }
}

async fn admin_users(State(seen): State<Seen>, headers: HeaderMap) -> Reply {
    seen.record("/admin/users", &headers);
    (StatusCode::FORBIDDEN, Json(json!({"error": "Admins only"})))
}

async fn save_edit(Json(body): Json<Value>) -> Reply {
    (
        StatusCode::OK,
        Json(json!({
            "message": "saved",
            "download_url": format!("/download/edited.{}", body["format"].as_str().unwrap_or("pdf"))
        })),
    )
}

async fn download(Path(name): Path<String>) -> Vec<u8> {
    format!("file:{name}").into_bytes()
}

async fn spawn_backend() -> (Config, Seen) {
    let seen = Seen::default();
    let router = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/verify-token", post(verify))
        .route("/status/{id}", get(status))
        .route("/cancel/{id}", post(cancel))
        .route("/upload", post(upload))
        .route("/feedback", post(feedback))
        .route("/admin/users", post(admin_users))
        .route("/save-edited-text", post(save_edit))
        .route("/download/{name}", get(download))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let config = Config {
        api_url: format!("http://{addr}"),
        ..Config::default()
    };
    (config, seen)
}

fn job(id: &str) -> JobId {
    JobId::new(id).unwrap()
}

#[tokio::test]
async fn login_returns_token_and_admin_flag() {
    let (config, _) = spawn_backend().await;
    let api = ApiClient::new(&config).unwrap();

    let reply = api.login("a@example.com", "secret").await.unwrap();
    assert_eq!(reply.token, "tok-1");
    assert!(reply.user.is_admin);

    let err = api.login("a@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { status: 401, ref message } if message == "Invalid credentials"));
}

#[tokio::test]
async fn verification_maps_rejection_to_false() {
    let (config, _) = spawn_backend().await;
    let api = ApiClient::new(&config).unwrap();
    assert!(api.check_token("good").await.unwrap());
    assert!(!api.check_token("stale").await.unwrap());
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let config = Config {
        api_url: "http://127.0.0.1:9".into(),
        request_timeout: Duration::from_secs(2),
        ..Config::default()
    };
    let api = ApiClient::new(&config).unwrap();
    let err = api.check_token("good").await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn status_requests_carry_bearer_token() {
    let (config, seen) = spawn_backend().await;
    let api = ApiClient::new(&config).unwrap().with_token("tok-1");

    let status = api.poll_status(&job("running")).await.unwrap();
    assert_eq!(status.status, JobStatus::Processing);
    let metrics = status.metrics.unwrap();
    assert_eq!(metrics.accuracy.as_deref(), Some("88"));
    assert_eq!(metrics.pages.as_deref(), Some("2"));
    assert_eq!(seen.auth_for("/status/running").as_deref(), Some("Bearer tok-1"));

    let err = api.poll_status(&job("missing")).await.unwrap_err();
    assert!(matches!(err, ApiError::Backend { status: 404, ref message } if message == "Invalid job ID"));
}

#[tokio::test]
async fn cancel_of_finished_job_reports_backend_message() {
    let (config, _) = spawn_backend().await;
    let api = ApiClient::new(&config).unwrap();

    assert_eq!(
        api.cancel_job(&job("running")).await.unwrap().message.as_deref(),
        Some("Job cancelled")
    );
    let err = api.cancel_job(&job("finished")).await.unwrap_err();
    assert!(err.to_string().contains("Cannot cancel job in done status."));
}

#[tokio::test]
async fn upload_sends_multipart_form() {
    let (config, seen) = spawn_backend().await;
    let api = ApiClient::new(&config).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("letter.png");
    std::fs::write(&file, b"\x89PNG fake").unwrap();

    let form = UploadForm {
        file: Some(file),
        source_lang: Some("ta".into()),
        target_lang: Some("en".into()),
    };
    let id = form.submit(&api, "a@example.com").await.unwrap();
    assert_eq!(id.as_str(), "job-42");

    let fields = seen.upload_fields.lock().unwrap().clone();
    assert!(fields.contains(&("file".into(), Some("letter.png".into()))));
    assert!(fields.contains(&("source_lang".into(), Some("ta".into()))));
    assert!(fields.contains(&("target_lang".into(), Some("en".into()))));
    assert!(fields.contains(&("email".into(), Some("a@example.com".into()))));
}

#[tokio::test]
async fn invalid_upload_sends_nothing() {
    let (config, seen) = spawn_backend().await;
    let api = ApiClient::new(&config).unwrap();
    let form = UploadForm {
        file: Some("scan.pdf".into()),
        source_lang: Some("en".into()),
        target_lang: None,
    };
    let err = form.submit(&api, "a@example.com").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(ValidationError::Missing(_))));
    assert_eq!(seen.count("/upload"), 0);
}

#[tokio::test]
async fn feedback_error_field_is_a_failure() {
    let (config, _) = spawn_backend().await;
    let api = ApiClient::new(&config).unwrap();

    assert!(api.submit_feedback("a@example.com", "great app").await.is_ok());

    let err = api
        .submit_feedback("a@example.com", "this will fail")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Backend { ref message, .. } if message == "database unavailable"));

    let err = api.submit_feedback("a@example.com", "   ").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(ValidationError::EmptyFeedback)));
}

#[tokio::test]
async fn admin_listing_is_authorized_by_backend() {
    let (config, seen) = spawn_backend().await;
    let api = ApiClient::new(&config).unwrap().with_token("tok-1");

    let err = api.admin_users("a@example.com").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { status: 403, .. }));
    assert_eq!(seen.auth_for("/admin/users").as_deref(), Some("Bearer tok-1"));
}

#[tokio::test]
async fn saved_edit_can_be_downloaded() {
    let (config, _) = spawn_backend().await;
    let api = ApiClient::new(&config).unwrap();

    let saved = api
        .save_edited_text(&SaveEditRequest {
            text: "edited",
            format: SaveFormat::Docx,
            lang_code: "en",
        })
        .await
        .unwrap();
    assert_eq!(saved.download_url, "/download/edited.docx");

    let bytes = api.download(&saved.download_url).await.unwrap();
    assert_eq!(bytes, b"file:edited.docx");
}

#[tokio::test]
async fn poller_delivers_result_from_backend() {
    let (config, seen) = spawn_backend().await;
    let api = Arc::new(ApiClient::new(&config).unwrap());
    let poller = JobPoller::new(
        api,
        PollConfig {
            interval: Duration::from_millis(20),
            max_duration: Some(Duration::from_secs(10)),
        },
    );

    let delivered = Arc::new(Mutex::new(None));
    let sink = delivered.clone();
    let hooks = JobHooks::new(
        move |result| *sink.lock().unwrap() = Some(result),
        || panic!("job was not cancelled"),
    );
    let mut handle = poller.start(job("finished"), hooks);
    handle.finished().await;

    assert_eq!(handle.snapshot().phase, JobPhase::Done);
    let result = delivered.lock().unwrap().take().unwrap();
    assert_eq!(result.extracted_text, "hello");
    assert_eq!(result.low_conf_count, 1);
    assert_eq!(seen.count("/status/finished"), 1);
}

#[tokio::test]
async fn cancelling_a_running_job_stops_polling() {
    let (config, seen) = spawn_backend().await;
    let api = Arc::new(ApiClient::new(&config).unwrap());
    let poller = JobPoller::new(
        api,
        PollConfig {
            interval: Duration::from_millis(20),
            max_duration: None,
        },
    );

    let cancelled = Arc::new(Mutex::new(0));
    let counter = cancelled.clone();
    let mut handle = poller.start(
        job("running"),
        JobHooks::new(|_| panic!("job did not finish"), move || *counter.lock().unwrap() += 1),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel_job().await.unwrap();
    handle.finished().await;
    let polls = seen.count("/status/running");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(seen.count("/status/running"), polls);
    assert_eq!(*cancelled.lock().unwrap(), 1);
    assert_eq!(handle.snapshot().phase, JobPhase::Cancelled);
    assert_eq!(seen.count("/cancel/running"), 1);
}

#[test]
fn text_area_serializes_lowercase() {
    assert_eq!(serde_json::to_value(TextArea::Translated).unwrap(), json!("translated"));
}
