//! Recurring transaction handlers
//!
//! Processing due occurrences is an explicit caller-triggered action;
//! there is no background timer.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;

use crate::{household_from_headers, AppError, AppState, SuccessResponse};
use tally_core::models::{NewRecurringTransaction, RecurringTransaction};
use tally_core::RecurringProcessor;

/// GET /api/recurring - List recurring transactions, soonest first
pub async fn list_recurring(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<RecurringTransaction>>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    let recurring = state.db.list_recurring_transactions(household_id)?;
    Ok(Json(recurring))
}

/// POST /api/recurring - Create a recurring transaction. The first
/// occurrence is seeded from the start date.
pub async fn create_recurring(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<NewRecurringTransaction>,
) -> Result<Json<RecurringTransaction>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    if req.description.trim().is_empty() {
        return Err(AppError::bad_request("Description is required"));
    }

    let id = state.db.create_recurring_transaction(household_id, &req)?;
    let recurring = state.db.get_recurring_transaction(household_id, id)?;
    Ok(Json(recurring))
}

/// DELETE /api/recurring/:id - Delete a recurring transaction
pub async fn delete_recurring(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    state.db.delete_recurring_transaction(household_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/recurring/:id/process - Materialize the next occurrence as a
/// ledger transaction and advance the schedule
pub async fn process_recurring(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<RecurringTransaction>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    let recurring = RecurringProcessor::new(&state.db).process(household_id, id)?;
    Ok(Json(recurring))
}

/// POST /api/recurring/:id/skip - Advance the schedule without creating a
/// transaction
pub async fn skip_recurring(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<RecurringTransaction>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    let recurring = RecurringProcessor::new(&state.db).skip(household_id, id)?;
    Ok(Json(recurring))
}

/// Response for the process-due endpoint
#[derive(Serialize)]
pub struct ProcessDueResponse {
    pub processed: usize,
}

/// POST /api/recurring/process-due - Process every occurrence due today
pub async fn process_due_recurring(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ProcessDueResponse>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    let today = chrono::Utc::now().date_naive();
    let processed = RecurringProcessor::new(&state.db).process_due(household_id, today)?;
    Ok(Json(ProcessDueResponse { processed }))
}
