use crate::auth::{require_admin, AdminAuth};
use crate::config::ApiConfig;
use crate::ingestion::{FailedUpload, IngestionError, IngestionService};
use crate::query::{QueryError, QueryService, SubmissionStats};
use crate::record_store::RecordStore;
use crate::status::{StatusError, StatusUpdater};
use crate::submission::{CategoryRules, EventType, Submission, SubmissionStatus};
use crate::validator::{IncomingFile, RawSubmission};
use anyhow::{Context, Result};
use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Multipart overhead allowed on top of the file payloads
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionService>,
    pub queries: Arc<QueryService>,
    pub status: Arc<StatusUpdater>,
    pub records: Arc<dyn RecordStore>,
    pub auth: Arc<AdminAuth>,
    /// Largest accepted request body
    pub max_body_bytes: usize,
    /// Include error details in 5xx responses (non-production only)
    pub expose_details: bool,
}

impl AppState {
    /// Body limit for a submission carrying `max_files` of `max_file_size` each
    pub fn body_limit_for(max_file_size: usize) -> usize {
        let max_files = EventType::ALL
            .iter()
            .map(|t| t.rules().max_files)
            .max()
            .unwrap_or(1);
        max_file_size * max_files + FORM_OVERHEAD_BYTES
    }
}

/// Error response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_uploads: Vec<FailedUpload>,
}

/// Error returned from handlers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, code: &str) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                code: code.to_string(),
                details: None,
                failed_uploads: Vec::new(),
            },
        }
    }

    fn bad_request(error: impl Into<String>, code: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, code)
    }

    /// 5xx with the underlying cause attached outside production
    fn internal(state: &AppState, error: &str, code: &str, cause: &dyn std::fmt::Display) -> Self {
        error!(error = %cause, code = code, "{}", error);
        let mut api_error = Self::new(StatusCode::INTERNAL_SERVER_ERROR, error, code);
        if state.expose_details {
            api_error.body.details = Some(cause.to_string());
        }
        api_error
    }

    fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn ingestion_error(state: &AppState, err: IngestionError) -> ApiError {
    match err {
        IngestionError::Validation(e) => ApiError::bad_request(e.to_string(), e.code()),
        IngestionError::UploadFailed { failures } => {
            let mut api_error = ApiError::internal(
                state,
                "File upload failed",
                "UPLOAD_FAILED",
                &format!("{} file upload(s) failed", failures.len()),
            )
            .with_status(StatusCode::BAD_GATEWAY);
            api_error.body.failed_uploads = failures;
            api_error
        }
        IngestionError::RollbackFailed {
            submission_id,
            failures,
            source,
        } => {
            let cause = format!("submission {submission_id} left without files: {source}");
            let mut api_error =
                ApiError::internal(state, "File upload failed", "STORAGE_ERROR", &cause);
            api_error.body.failed_uploads = failures;
            api_error
        }
        IngestionError::Storage(e) => {
            ApiError::internal(state, "Failed to store submission", "STORAGE_ERROR", &e)
        }
        e @ IngestionError::Vanished(_) => {
            ApiError::internal(state, "Failed to retrieve submission", "STORAGE_ERROR", &e)
        }
    }
}

fn query_error(state: &AppState, err: QueryError) -> ApiError {
    match err {
        QueryError::NotFound(id) => ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Submission {id} not found"),
            "NOT_FOUND",
        ),
        QueryError::Storage(e) => {
            ApiError::internal(state, "Failed to query submissions", "QUERY_ERROR", &e)
        }
    }
}

fn status_error(state: &AppState, err: StatusError) -> ApiError {
    match err {
        e @ StatusError::InvalidStatus(_) => ApiError::bad_request(e.to_string(), "INVALID_STATUS"),
        StatusError::NotFound(id) => ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Submission {id} not found"),
            "NOT_FOUND",
        ),
        StatusError::Storage(e) => {
            ApiError::internal(state, "Failed to update status", "STORAGE_ERROR", &e)
        }
    }
}

/// Successful submission response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    /// False when some file parts could not be stored
    pub complete: bool,
    pub submission: Submission,
    pub failed_uploads: Vec<FailedUpload>,
}

/// Query parameters for the submission list
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub event_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionListResponse {
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub submission: Submission,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: SubmissionStats,
}

/// Status change request
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// One category as described to form clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDescription {
    pub event_type: EventType,
    pub slug: &'static str,
    #[serde(flatten)]
    pub rules: CategoryRules,
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let cors = if config.cors_enabled {
        if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    let admin = Router::new()
        .route("/submissions", get(list_submissions).put(update_status))
        .route("/submissions/stats", get(submission_stats))
        .route("/submissions/:id", get(get_submission))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_admin,
        ));

    let submit = Router::new()
        .route("/submit", post(submit))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.max_body_bytes));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/categories", get(list_categories))
        .merge(submit)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "submission-service"
    }))
}

/// Readiness check endpoint
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.records.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "database": "connected"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}

/// Category rules for form clients
async fn list_categories() -> Json<Vec<CategoryDescription>> {
    Json(
        EventType::ALL
            .into_iter()
            .map(|event_type| CategoryDescription {
                event_type,
                slug: event_type.slug(),
                rules: event_type.rules(),
            })
            .collect(),
    )
}

/// Accept a submission form with its files
#[instrument(skip(state, multipart))]
async fn submit(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let raw = read_submission_form(multipart).await?;

    let outcome = state
        .ingestion
        .submit(raw)
        .await
        .map_err(|e| ingestion_error(&state, e))?;

    if !outcome.is_complete() {
        warn!(
            submission_id = %outcome.submission.id,
            failed = outcome.failed_uploads.len(),
            "Submission stored with failed uploads"
        );
    }

    Ok(Json(SubmitResponse {
        success: true,
        complete: outcome.is_complete(),
        submission: outcome.submission,
        failed_uploads: outcome.failed_uploads,
    }))
}

/// List submissions with optional filters
#[instrument(skip(state))]
async fn list_submissions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<SubmissionListResponse>, ApiError> {
    let event_type = match non_empty(params.event_type) {
        Some(value) => Some(value.parse::<EventType>().map_err(|e| {
            ApiError::bad_request(e.to_string(), "INVALID_EVENT_TYPE")
        })?),
        None => None,
    };
    let status = match non_empty(params.status) {
        Some(value) => Some(
            value
                .parse::<SubmissionStatus>()
                .map_err(|e| ApiError::bad_request(e.to_string(), "INVALID_STATUS"))?,
        ),
        None => None,
    };

    let submissions = state
        .queries
        .list(event_type, status)
        .await
        .map_err(|e| query_error(&state, e))?;

    Ok(Json(SubmissionListResponse { submissions }))
}

/// Get single submission with files
#[instrument(skip(state))]
async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let id = parse_id(&id)?;
    let submission = state
        .queries
        .get(id)
        .await
        .map_err(|e| query_error(&state, e))?;

    Ok(Json(SubmissionResponse { submission }))
}

/// Aggregate counts
async fn submission_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state
        .queries
        .stats()
        .await
        .map_err(|e| query_error(&state, e))?;

    Ok(Json(StatsResponse { stats }))
}

/// Change a submission's review status
#[instrument(skip(state))]
async fn update_status(
    State(state): State<AppState>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let id = parse_id(&request.id)?;

    state
        .status
        .update_status(id, &request.status)
        .await
        .map_err(|e| status_error(&state, e))?;

    Ok(Json(SuccessResponse { success: true }))
}

fn parse_id(value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::bad_request("Invalid submission ID", "INVALID_ID"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Collect form fields and file parts
///
/// Files come under the repeated `files` field. Older clients send
/// `file1`, `file2`, ... instead; those are used only when no `files`
/// part is present, ordered by their number.
async fn read_submission_form(mut multipart: Multipart) -> Result<RawSubmission, ApiError> {
    let mut raw = RawSubmission::default();
    let mut files = Vec::new();
    let mut legacy_files: Vec<(u32, IncomingFile)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::bad_request(format!("Failed to read multipart: {e}"), "INVALID_FORM")
    })? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "files" {
            if let Some(file) = read_file(field).await? {
                files.push(file);
            }
        } else if let Some(slot) = legacy_file_slot(&name) {
            if let Some(file) = read_file(field).await? {
                legacy_files.push((slot, file));
            }
        } else if TEXT_FIELDS.contains(&name.as_str()) {
            let value = field.text().await.map_err(|e| {
                ApiError::bad_request(format!("Failed to read field {name}: {e}"), "INVALID_FORM")
            })?;
            assign_field(&mut raw, &name, value);
        } else {
            // Unknown parts may carry binary data; drain without decoding
            let skipped = field.bytes().await.map_err(|e| {
                ApiError::bad_request(format!("Failed to read field {name}: {e}"), "INVALID_FORM")
            })?;
            debug!(field = %name, size_bytes = skipped.len(), "Ignoring unknown form field");
        }
    }

    if files.is_empty() && !legacy_files.is_empty() {
        legacy_files.sort_by_key(|(slot, _)| *slot);
        files = legacy_files.into_iter().map(|(_, file)| file).collect();
    }

    raw.files = files;
    Ok(raw)
}

/// Read a file part; browsers send an empty unnamed part for an empty input
async fn read_file(field: Field<'_>) -> Result<Option<IncomingFile>, ApiError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);

    let data = field.bytes().await.map_err(|e| {
        ApiError::bad_request(format!("Failed to read file data: {e}"), "INVALID_FORM")
    })?;

    if file_name.is_empty() && data.is_empty() {
        return Ok(None);
    }

    let file_name = if file_name.is_empty() {
        format!("upload-{}", Utc::now().timestamp_millis())
    } else {
        file_name
    };

    Ok(Some(IncomingFile {
        file_name,
        content_type,
        data,
    }))
}

fn legacy_file_slot(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("file")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Form fields read as text
const TEXT_FIELDS: &[&str] = &[
    "fullName",
    "collegeName",
    "year",
    "branch",
    "contactEmail",
    "contactPhone",
    "eventType",
    "projectTitle",
    "gitRepositoryUrl",
    "gitUrl",
];

fn assign_field(raw: &mut RawSubmission, name: &str, value: String) {
    match name {
        "fullName" => raw.full_name = value,
        "collegeName" => raw.college_name = value,
        "year" => raw.year = Some(value),
        "branch" => raw.branch = value,
        "contactEmail" => raw.contact_email = value,
        "contactPhone" => raw.contact_phone = value,
        "eventType" => raw.event_type = value,
        "projectTitle" => raw.project_title = value,
        // `gitUrl` is what older form builds send
        "gitRepositoryUrl" | "gitUrl" => {
            if raw.git_repository_url.is_none() || !value.trim().is_empty() {
                raw.git_repository_url = Some(value);
            }
        }
        other => debug!(field = other, "Ignoring unknown form field"),
    }
}

/// Start the API server; returns once `shutdown` is cancelled
pub async fn start_api_server(
    state: AppState,
    config: &ApiConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let router = create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting submission API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("API server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::blob_store::{BlobError, BlobStore, MockBlobStore};
    use crate::config::{AuthConfig, UploadConfig};
    use crate::memory::{InMemoryBlobStore, InMemoryRecordStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-SUBMISSION-BOUNDARY";
    const PASSWORD: &str = "panel-secret";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                Part::File(name, file_name, content_type, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn participant<'a>(event_type: &'a str) -> Vec<Part<'a>> {
        vec![
            Part::Text("fullName", "Lakshmi N"),
            Part::Text("collegeName", "SSN College"),
            Part::Text("year", "3rd"),
            Part::Text("branch", "CSE"),
            Part::Text("contactEmail", "lakshmi@example.org"),
            Part::Text("contactPhone", "+91 9222222222"),
            Part::Text("eventType", event_type),
            Part::Text("projectTitle", "Quiet Streets"),
        ]
    }

    fn test_app() -> (Router, Arc<InMemoryBlobStore>) {
        let blobs = Arc::new(InMemoryBlobStore::new("https://files.test"));
        (app_with_blobs(blobs.clone()), blobs)
    }

    fn app_with_blobs(blobs: Arc<dyn BlobStore>) -> Router {
        let records = Arc::new(InMemoryRecordStore::new());
        let uploads = UploadConfig::default();
        let auth = AdminAuth::new(&AuthConfig {
            admin_username: "admin".to_string(),
            admin_password_hash: hash_password(PASSWORD).unwrap(),
        })
        .unwrap();

        let state = AppState {
            ingestion: Arc::new(IngestionService::new(records.clone(), blobs, &uploads)),
            queries: Arc::new(QueryService::new(records.clone())),
            status: Arc::new(StatusUpdater::new(records.clone())),
            records,
            auth: Arc::new(auth),
            max_body_bytes: AppState::body_limit_for(uploads.max_file_size_bytes),
            expose_details: true,
        };
        let api = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_enabled: true,
            cors_origins: vec![],
        };
        create_router(state, &api)
    }

    /// Blob store rejecting every key that ends with `suffix`
    fn rejecting(suffix: &'static str) -> MockBlobStore {
        let mut blobs = MockBlobStore::new();
        blobs.expect_put().returning(move |key, _, _| {
            if key.ends_with(suffix) {
                Err(BlobError::Upload {
                    key: key.to_string(),
                    message: "connection reset".to_string(),
                })
            } else {
                Ok(format!("https://files.test/{key}"))
            }
        });
        blobs.expect_delete().returning(|_| Ok(()));
        blobs
    }

    fn submit_request(parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/submit")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let credentials = STANDARD.encode(format!("admin:{PASSWORD}"));
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Basic {credentials}"));
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_submit_with_files_field() {
        let (app, blobs) = test_app();
        let mut parts = participant("Reels & Photography");
        parts.push(Part::File("files", "dawn.jpg", "image/jpeg", b"jpeg-bytes"));
        parts.push(Part::File("files", "dusk.mp4", "video/mp4", b"mp4-bytes"));

        let response = app.oneshot(submit_request(&parts)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["complete"], true);
        assert_eq!(body["submission"]["status"], "pending");
        assert_eq!(body["submission"]["eventType"], "Reels & Photography");
        assert_eq!(body["submission"]["year"], "3rd");
        assert_eq!(body["submission"]["files"].as_array().unwrap().len(), 2);
        assert_eq!(blobs.object_count().await, 2);
    }

    #[tokio::test]
    async fn test_submit_accepts_legacy_numbered_files() {
        let (app, _) = test_app();
        let mut parts = participant("Paper Presentation");
        parts.push(Part::File("file1", "paper.pdf", "application/pdf", b"%PDF-1.7"));

        let response = app.oneshot(submit_request(&parts)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["submission"]["files"][0]["fileName"], "paper.pdf");
        assert_eq!(body["submission"]["files"][0]["fileType"], "application/pdf");
    }

    #[tokio::test]
    async fn test_submit_web_designing_with_legacy_git_url() {
        let (app, _) = test_app();
        let mut parts = participant("Web Designing");
        parts.push(Part::Text("gitUrl", "https://github.com/lakshmi/site"));

        let response = app.oneshot(submit_request(&parts)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(
            body["submission"]["gitRepositoryUrl"],
            "https://github.com/lakshmi/site"
        );
    }

    #[tokio::test]
    async fn test_partial_upload_failure_response() {
        let app = app_with_blobs(Arc::new(rejecting("clip.mp4")));
        let mut parts = participant("Reels & Photography");
        parts.push(Part::File("files", "still.jpg", "image/jpeg", b"jpeg-bytes"));
        parts.push(Part::File("files", "clip.mp4", "video/mp4", b"mp4-bytes"));

        let response = app.oneshot(submit_request(&parts)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["complete"], false);
        assert_eq!(body["submission"]["files"].as_array().unwrap().len(), 1);
        assert_eq!(body["submission"]["files"][0]["fileName"], "still.jpg");
        assert_eq!(body["failedUploads"][0]["slot"], 2);
        assert_eq!(body["failedUploads"][0]["fileName"], "clip.mp4");
        assert!(body["failedUploads"][0]["error"]
            .as_str()
            .unwrap()
            .contains("connection reset"));
    }

    #[tokio::test]
    async fn test_all_uploads_failing_is_502() {
        let app = app_with_blobs(Arc::new(rejecting(".pdf")));
        let mut parts = participant("Paper Presentation");
        parts.push(Part::File("files", "paper.pdf", "application/pdf", b"%PDF-1.7"));

        let response = app.clone().oneshot(submit_request(&parts)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = json_body(response).await;
        assert_eq!(body["code"], "UPLOAD_FAILED");
        assert_eq!(body["failedUploads"][0]["slot"], 1);
        assert_eq!(body["failedUploads"][0]["fileName"], "paper.pdf");

        let listed = json_body(
            app.oneshot(admin_request("GET", "/submissions", None))
                .await
                .unwrap(),
        )
        .await;
        assert!(listed["submissions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_binary_field_is_ignored() {
        let (app, blobs) = test_app();
        let mut parts = participant("Paper Presentation");
        let not_utf8: &[u8] = &[0xff, 0xfe, 0x00, 0xc3];
        parts.push(Part::File("resume", "cv.bin", "application/octet-stream", not_utf8));
        parts.push(Part::File("files", "paper.pdf", "application/pdf", b"%PDF-1.7"));

        let response = app.oneshot(submit_request(&parts)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["submission"]["files"].as_array().unwrap().len(), 1);
        assert_eq!(blobs.object_count().await, 1);
    }

    #[tokio::test]
    async fn test_submit_validation_error_is_400() {
        let (app, blobs) = test_app();
        let parts = participant("Code Debugging");

        let response = app.oneshot(submit_request(&parts)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["code"], "NO_FILES_PROVIDED");
        assert_eq!(body["error"], "File upload is required for this event type");
        assert_eq!(blobs.object_count().await, 0);
    }

    #[tokio::test]
    async fn test_admin_routes_require_credentials() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/submissions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn test_review_flow() {
        let (app, _) = test_app();

        let mut parts = participant("Code Debugging");
        parts.push(Part::File("files", "fix.zip", "application/zip", b"PK"));
        let created = json_body(app.clone().oneshot(submit_request(&parts)).await.unwrap()).await;
        let id = created["submission"]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(admin_request(
                "PUT",
                "/submissions",
                Some(serde_json::json!({ "id": id, "status": "approved" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);

        let response = app
            .clone()
            .oneshot(admin_request(
                "GET",
                "/submissions?eventType=code-debugging&status=approved",
                None,
            ))
            .await
            .unwrap();
        let listed = json_body(response).await;
        assert_eq!(listed["submissions"].as_array().unwrap().len(), 1);
        assert_eq!(listed["submissions"][0]["status"], "approved");
        assert_eq!(
            listed["submissions"][0]["files"].as_array().unwrap().len(),
            1
        );

        let response = app
            .clone()
            .oneshot(admin_request("GET", &format!("/submissions/{id}"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let stats = json_body(
            app.oneshot(admin_request("GET", "/submissions/stats", None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(stats["stats"]["total"], 1);
        assert_eq!(stats["stats"]["byEventType"]["Code Debugging"], 1);
        assert_eq!(stats["stats"]["byEventType"]["Web Designing"], 0);
        assert_eq!(stats["stats"]["byStatus"]["approved"], 1);
    }

    #[tokio::test]
    async fn test_update_status_errors() {
        let (app, _) = test_app();

        let response = app
            .clone()
            .oneshot(admin_request(
                "PUT",
                "/submissions",
                Some(serde_json::json!({ "id": Uuid::new_v4(), "status": "bogus" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_STATUS");

        let response = app
            .oneshot(admin_request(
                "PUT",
                "/submissions",
                Some(serde_json::json!({ "id": Uuid::new_v4(), "status": "rejected" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_filter() {
        let (app, _) = test_app();
        let response = app
            .oneshot(admin_request("GET", "/submissions?eventType=Quiz", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_categories_describe_rules() {
        let (app, _) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/categories").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = json_body(response).await;
        let categories = body.as_array().unwrap();
        assert_eq!(categories.len(), 4);
        assert_eq!(categories[2]["eventType"], "Reels & Photography");
        assert_eq!(categories[2]["maxFiles"], 2);
        assert_eq!(categories[1]["requiresRepositoryUrl"], true);
    }

    #[test]
    fn test_legacy_file_slot() {
        assert_eq!(legacy_file_slot("file1"), Some(1));
        assert_eq!(legacy_file_slot("file12"), Some(12));
        assert_eq!(legacy_file_slot("files"), None);
        assert_eq!(legacy_file_slot("file"), None);
        assert_eq!(legacy_file_slot("profile1"), None);
    }
}
