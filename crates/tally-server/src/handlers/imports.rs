//! Import batch handlers: upload, review, confirm, cancel

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{household_from_headers, AppError, AppState, SuccessResponse, MAX_UPLOAD_SIZE};
use tally_core::import::{detect_format, parse_statement};
use tally_core::models::{ImportBatch, RowDecision, StagedTransaction};
use tally_core::{Categorizer, Committer, DuplicateDetector};

/// Response for the upload endpoint: the batch plus processing counts
#[derive(Serialize)]
pub struct UploadResponse {
    pub batch: ImportBatch,
    /// Rows flagged as duplicates of existing transactions
    pub duplicates: usize,
    /// Rows a category rule matched
    pub auto_matched: usize,
}

/// POST /api/imports - Upload a bank statement
///
/// Expects multipart form with:
/// - file: the statement (required, max 10MB; .csv, .qfx, or .ofx)
/// - account_id: account to import into (required)
///
/// The file is parsed into staged rows, then duplicate detection and
/// rule-based categorization run before the response returns. Nothing
/// touches the ledger until the batch is confirmed.
pub async fn upload_import(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);

    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut account_id: Option<i64> = None;
    let mut total_size: usize = 0;

    // Extract fields from multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;
                total_size += bytes.len();

                // Check file size limit
                if total_size > MAX_UPLOAD_SIZE {
                    return Err(AppError::bad_request(&format!(
                        "File too large. Maximum size is {} MB",
                        MAX_UPLOAD_SIZE / 1024 / 1024
                    )));
                }

                file_data = Some(bytes.to_vec());
            }
            "account_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read account_id"))?;
                account_id = Some(value.parse().map_err(|_| {
                    AppError::bad_request(&format!("Invalid account_id: {}", value))
                })?);
            }
            _ => {}
        }
    }

    // Validate required fields
    let file_data = file_data.ok_or_else(|| AppError::bad_request("Missing file field"))?;
    let filename = filename.ok_or_else(|| AppError::bad_request("Missing file name"))?;
    let account_id = account_id.ok_or_else(|| AppError::bad_request("Missing account_id field"))?;

    // Reject unknown extensions before parsing begins
    let format = detect_format(&filename)?;

    // Ownership check on the target account
    let account = state.db.get_account(household_id, account_id)?;

    let rows = parse_statement(&file_data, format)?;

    let batch_id = state
        .db
        .create_import_batch(household_id, account.id, &filename, format)?;
    for row in &rows {
        state.db.insert_staged_row(batch_id, row)?;
    }
    state.db.update_batch_total(batch_id, rows.len() as i64)?;

    let batch = state.db.get_import_batch(household_id, batch_id)?;
    let duplicates = DuplicateDetector::new(&state.db).scan_batch(household_id, &batch)?;
    let auto_matched = Categorizer::new(&state.db).scan_batch(household_id, batch_id)?;

    info!(
        "Staged import batch {} for account '{}': {} rows, {} duplicates, {} auto-matched",
        batch_id,
        account.name,
        rows.len(),
        duplicates,
        auto_matched
    );

    let batch = state.db.get_import_batch(household_id, batch_id)?;
    Ok(Json(UploadResponse {
        batch,
        duplicates,
        auto_matched,
    }))
}

/// GET /api/imports - List import batches, newest first
pub async fn list_imports(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ImportBatch>>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    let batches = state.db.list_import_batches(household_id)?;
    Ok(Json(batches))
}

/// GET /api/imports/:id - Get one import batch
pub async fn get_import(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ImportBatch>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    let batch = state.db.get_import_batch(household_id, id)?;
    Ok(Json(batch))
}

/// GET /api/imports/:id/rows - List a batch's staged rows in file order
pub async fn get_import_rows(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Vec<StagedTransaction>>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    // Ownership check via the batch lookup
    let batch = state.db.get_import_batch(household_id, id)?;
    let rows = state.db.list_batch_rows(batch.id)?;
    Ok(Json(rows))
}

/// Request body for confirming a batch
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub decisions: Vec<RowDecision>,
}

/// POST /api/imports/:id/confirm - Commit reviewed rows to the ledger
///
/// Rows absent from the decisions are left untouched; duplicates are never
/// committed. The batch is finalized afterwards.
pub async fn confirm_import(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ImportBatch>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    let batch = Committer::new(&state.db).confirm_batch(household_id, id, &req.decisions)?;
    Ok(Json(batch))
}

/// POST /api/imports/:id/cancel - Discard an un-finalized batch and its
/// staged rows
pub async fn cancel_import(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    state.db.delete_import_batch(household_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
