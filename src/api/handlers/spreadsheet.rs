use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::dtos::{
    requests::ExportQuery,
    responses::{EventWithImportResponse, ImportResponse},
};
use crate::api::extractors::admin::AdminToken;
use crate::api::handlers::admin_event::{insert_event, validate_event_fields};
use crate::domain::models::{event::Event, message::SeatingUpdateKind};
use crate::domain::services::spreadsheet::{template_sheet, SHEET_NAME};
use crate::error::AppError;
use crate::infra::xlsx::{read_sheet, write_sheet, XLSX_CONTENT_TYPE};
use crate::state::AppState;

fn xlsx_response(bytes: Vec<u8>, filename: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename={}", filename)),
        ],
        bytes,
    )
}

fn is_spreadsheet_name(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.ends_with(".xlsx") || lower.ends_with(".xls")
}

struct UploadedFile {
    filename: String,
    content: Vec<u8>,
}

/// Fields of an upload form. Text fields are kept by name, the `file` part separately.
#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    fields: std::collections::HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
                form.file = Some(UploadedFile { filename, content: content.to_vec() });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid field '{}': {}", name, e)))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    fn take_file(&mut self) -> Result<UploadedFile, AppError> {
        let file = self.file.take().ok_or(AppError::Validation("No file uploaded".into()))?;
        if !is_spreadsheet_name(&file.filename) {
            return Err(AppError::Validation("Only Excel files (.xlsx, .xls) are allowed".into()));
        }
        Ok(file)
    }

    fn field(&self, name: &str) -> Result<&str, AppError> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Validation(format!("Missing field: {}", name)))
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` or a bare date (midnight UTC).
fn parse_event_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or(AppError::Validation("Invalid date format".into()))
}

/// Parses and imports `content` into the event, keeps the original bytes and
/// notifies the event's portal subscribers.
///
/// The original is written before the import so a storage failure leaves the
/// seating untouched. If the import then fails, the previous original is restored.
async fn import_upload(
    state: &AppState,
    event: &Event,
    content: &[u8],
    kind: SeatingUpdateKind,
) -> Result<usize, AppError> {
    let sheet = read_sheet(content)?;
    let previous = state.upload_store.load_original(&event.id).await?;
    state.upload_store.save_original(&event.id, content).await?;

    let processed_count = match state.importer.import(&event.id, &sheet).await {
        Ok(count) => count,
        Err(e) => {
            restore_original(state, &event.id, previous).await;
            return Err(e.into());
        }
    };

    state.checkin_service.broadcast_seating_update(&event.public_code, kind);
    Ok(processed_count)
}

async fn restore_original(state: &AppState, event_id: &str, previous: Option<Vec<u8>>) {
    let restored = match previous {
        Some(bytes) => state.upload_store.save_original(event_id, &bytes).await,
        None => state.upload_store.remove(event_id).await,
    };
    if let Err(e) = restored {
        error!(event_id, error = %e, "failed to restore stored upload after failed import");
    }
}

pub async fn upload_seating(
    State(state): State<Arc<AppState>>,
    _admin: AdminToken,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_repo.find_by_id(&id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    let file = UploadForm::read(multipart).await?.take_file()?;
    info!(event_id = %event.id, filename = %file.filename, bytes = file.content.len(), "seating upload received");

    let processed_count = import_upload(&state, &event, &file.content, SeatingUpdateKind::Uploaded).await?;

    Ok(Json(ImportResponse {
        message: format!("Successfully processed {} guests", processed_count),
        processed_count,
    }))
}

pub async fn create_event_with_excel(
    State(state): State<Arc<AppState>>,
    _admin: AdminToken,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let name = form.field("name")?.to_string();
    let organizer_email = form.field("organizer_email")?.to_string();
    let date = parse_event_date(form.field("date")?)?;
    validate_event_fields(&name, &organizer_email)?;
    let file = form.take_file()?;

    let event = insert_event(&state, &name, date, &organizer_email).await?;

    match import_upload(&state, &event, &file.content, SeatingUpdateKind::EventCreated).await {
        Ok(processed_count) => Ok((StatusCode::CREATED, Json(EventWithImportResponse { event, processed_count }))),
        Err(e) => {
            warn!(event_id = %event.id, "import failed, removing newly created event");
            if let Err(cleanup) = state.event_repo.delete(&event.id).await {
                error!(event_id = %event.id, error = %cleanup, "failed to remove event after failed import");
            }
            if let Err(cleanup) = state.upload_store.remove(&event.id).await {
                error!(event_id = %event.id, error = %cleanup, "failed to remove stored upload");
            }
            Err(e)
        }
    }
}

pub async fn export_original(
    State(state): State<Arc<AppState>>,
    _admin: AdminToken,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_repo.find_by_id(&id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    let bytes = state.upload_store.load_original(&event.id).await?
        .ok_or(AppError::NotFound("Original file not found".into()))?;

    Ok(xlsx_response(bytes, format!("original_seating_{}.xlsx", event.public_code)))
}

pub async fn export_updated(
    State(state): State<Arc<AppState>>,
    _admin: AdminToken,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_repo.find_by_id(&id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    let sheet = state.importer.export(&event.id, query.include_checkin.unwrap_or(true)).await?;
    let bytes = write_sheet(&sheet, SHEET_NAME)?;

    Ok(xlsx_response(bytes, format!("current_seating_{}.xlsx", event.public_code)))
}

pub async fn event_template(
    State(state): State<Arc<AppState>>,
    Path(public_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.event_repo.find_by_public_code(&public_code).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    let bytes = write_sheet(&template_sheet(), SHEET_NAME)?;
    Ok(xlsx_response(bytes, format!("seating_template_{}.xlsx", public_code)))
}

pub async fn general_template() -> Result<impl IntoResponse, AppError> {
    let bytes = write_sheet(&template_sheet(), SHEET_NAME)?;
    Ok(xlsx_response(bytes, "wedding_seating_template.xlsx".to_string()))
}
