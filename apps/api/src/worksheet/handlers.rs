use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::auth::Authenticated;
use crate::errors::AppError;
use crate::intake::{parse_workbook, SheetExtract};
use crate::state::AppState;
use crate::storage::{destination_key, PDF_CONTENT_TYPE};
use crate::worksheet::{build_worksheet, WorksheetJob};

/// Multipart field carrying the spreadsheet.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub ok: bool,
    pub download_url: String,
    pub items: usize,
    pub page_count: u32,
    /// Object key of the stored worksheet.
    pub filename: String,
    pub tax_year: Option<String>,
}

struct Upload {
    filename: String,
    bytes: Bytes,
}

/// POST /generate
/// Parses the uploaded spreadsheet, builds the worksheet and returns a signed
/// download URL.
pub async fn handle_generate(
    _auth: Authenticated,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, AppError> {
    let upload = read_upload(&mut multipart).await?;
    info!(
        "Received spreadsheet '{}' ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );

    let sheet = tokio::task::spawn_blocking(move || parse_workbook(&upload.bytes))
        .await
        .map_err(|e| anyhow::anyhow!("Spreadsheet parsing task failed: {e}"))??;

    generate_and_publish(&state, sheet).await.map(Json)
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("File upload is required".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        return Ok(Upload { filename, bytes });
    }
    Err(AppError::Validation("File upload is required".to_string()))
}

/// Builds the worksheet for an extracted sheet, stores it and signs a download URL.
pub async fn generate_and_publish(
    state: &AppState,
    sheet: SheetExtract,
) -> Result<GenerateResponse, AppError> {
    let config = state.worksheet.clone();
    let job = WorksheetJob {
        client_name: sheet.client_name,
        tax_year: sheet.tax_year,
        items: sheet.items,
    };

    let (job, rendered) = tokio::task::spawn_blocking(move || {
        let rendered = build_worksheet(&job, &config);
        (job, rendered)
    })
    .await
    .map_err(|e| anyhow::anyhow!("Worksheet build task failed: {e}"))?;
    let rendered = rendered?;

    let key = destination_key(&job.client_name, Utc::now());
    state
        .store
        .upload(&key, rendered.pdf.clone(), PDF_CONTENT_TYPE)
        .await?;
    let download_url = state
        .store
        .signed_url(&key, state.config.signed_url_ttl)
        .await?;

    info!(
        "Generated worksheet {key} for '{}': {} rows, {} pages, {} note fields, {} choice widgets",
        job.client_name,
        rendered.rows.len(),
        rendered.page_count,
        rendered.note_field_count(),
        rendered.widget_count()
    );

    Ok(GenerateResponse {
        ok: true,
        download_url,
        items: job.items.len(),
        page_count: rendered.page_count,
        filename: key,
        tax_year: job.tax_year,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
