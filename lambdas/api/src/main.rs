use anyhow::Context;
use aws_config::BehaviorVersion;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use domain::{
    config::StoreBackend,
    uploads::{
        DetailView, DocumentStore, DynamoDocumentStore, HttpOcrService, MemoryDocumentStore,
        OcrService, PrescriptionRecord, ReminderPlan, UploadFile, UploadOrchestrator,
    },
    SessionContext, Settings, UserId,
};
use serde::Serialize;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

mod error;

use error::{ApiError, ErrorBody};

/// Set by the authorizer in front of the function once a session is established.
const USER_ID_HEADER: &str = "x-user-id";

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

type InFlightSet = Arc<Mutex<HashSet<UserId>>>;

#[derive(Clone)]
struct AppState {
    ocr: Arc<dyn OcrService>,
    store: Arc<dyn DocumentStore>,
    // Users with an upload currently being processed by this instance.
    uploads_in_flight: InFlightSet,
}

/// Marks a user's upload as in flight until dropped.
struct InFlight {
    uploads: InFlightSet,
    user_id: UserId,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock_in_flight(&self.uploads).remove(&self.user_id);
    }
}

fn lock_in_flight(uploads: &InFlightSet) -> MutexGuard<'_, HashSet<UserId>> {
    match uploads.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl AppState {
    fn new(ocr: Arc<dyn OcrService>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            ocr,
            store,
            uploads_in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Request-scoped orchestrator; history is always read from the store.
    fn orchestrator(&self) -> UploadOrchestrator {
        UploadOrchestrator::new(self.ocr.clone(), self.store.clone())
    }

    /// `None` while another upload for the same user is being processed.
    fn begin_upload(&self, user_id: &UserId) -> Option<InFlight> {
        if !lock_in_flight(&self.uploads_in_flight).insert(user_id.clone()) {
            return None;
        }

        Some(InFlight {
            uploads: self.uploads_in_flight.clone(),
            user_id: user_id.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let settings = Settings::from_env();
    let state = build_state(&settings).await?;

    let app = tower::ServiceBuilder::new()
        .layer(axum_aws_lambda::LambdaLayer::default())
        .service(app(state));

    lambda_http::run(app).await?;
    Ok(())
}

async fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let ocr = HttpOcrService::new(settings.ocr_service_url.clone(), settings.ocr_timeout)
        .context("Failed to build OCR client")?;

    let store: Arc<dyn DocumentStore> = match settings.store_backend {
        StoreBackend::Dynamo => {
            let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            let client = aws_sdk_dynamodb::Client::new(&config);
            Arc::new(DynamoDocumentStore::new(client, settings.uploads_table.clone()))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; uploads are lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    tracing::info!(
        "OCR service at {} (timeout {:?})",
        settings.ocr_service_url,
        settings.ocr_timeout
    );

    Ok(AppState::new(Arc::new(ocr), store))
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/uploads", post(upload_prescription).get(list_uploads))
        .route("/uploads/:id", get(get_upload))
        .route("/uploads/:id/detail", get(get_upload_detail))
        .route("/uploads/:id/reminders", get(get_upload_reminders))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

fn current_user(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(UserId::from)
        .ok_or(ApiError::Domain(domain::Error::Unauthenticated))
}

async fn read_file(mut multipart: Multipart) -> Result<UploadFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or("").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        return Ok(UploadFile::new(name, bytes.to_vec())?.with_content_type(content_type));
    }

    Err(ApiError::Domain(domain::Error::InvalidFile {
        reason: "No file part".to_string(),
    }))
}

#[derive(Serialize)]
struct UploadResponse {
    record: PrescriptionRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_error: Option<ErrorBody>,
}

// Upload prescription image
async fn upload_prescription(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = current_user(&headers)?;
    let file = read_file(multipart).await?;

    let _in_flight = state
        .begin_upload(&user_id)
        .ok_or(ApiError::UploadInProgress)?;

    tracing::info!("Processing {} for {}", file.name(), user_id);

    let outcome = state
        .orchestrator()
        .process_upload(&file, &SessionContext::fixed(Some(user_id)))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            refresh_error: outcome.refresh_error.as_ref().map(ErrorBody::from),
            record: outcome.record,
        }),
    ))
}

// List upload history, newest first
async fn list_uploads(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = current_user(&headers)?;

    let mut orchestrator = state.orchestrator();
    orchestrator
        .refresh_history(&SessionContext::fixed(Some(user_id)))
        .await?;

    Ok(Json(orchestrator.history_view().entries()))
}

async fn select_record(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
) -> Result<PrescriptionRecord, ApiError> {
    let user_id = current_user(headers)?;

    state
        .orchestrator()
        .select_id(id, &SessionContext::fixed(Some(user_id)))
        .await?
        .cloned()
        .ok_or(ApiError::NotFound)
}

// Get one upload's prescription
async fn get_upload(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let record = select_record(&state, &headers, &id).await?;
    Ok(Json(record))
}

// Render one upload as text
async fn get_upload_detail(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let record = select_record(&state, &headers, &id).await?;
    let text = DetailView::new(&record).to_string();
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

// Dose slots and reminder times for one upload
async fn get_upload_reminders(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let record = select_record(&state, &headers, &id).await?;
    Ok(Json(ReminderPlan::from_record(&record)))
}
