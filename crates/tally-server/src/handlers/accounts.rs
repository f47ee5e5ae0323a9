//! Account handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::{household_from_headers, AppError, AppState, SuccessResponse};
use tally_core::models::{Account, NewAccount};

/// GET /api/accounts - List the household's accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Account>>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    let accounts = state.db.list_accounts(household_id)?;
    Ok(Json(accounts))
}

/// POST /api/accounts - Create an account
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<NewAccount>,
) -> Result<Json<Account>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("Account name is required"));
    }

    let id = state.db.create_account(household_id, &req)?;
    let account = state.db.get_account(household_id, id)?;
    Ok(Json(account))
}

/// GET /api/accounts/:id - Get one account
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    let account = state.db.get_account(household_id, id)?;
    Ok(Json(account))
}

/// DELETE /api/accounts/:id - Delete an account (rejected while
/// transactions reference it)
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    state.db.delete_account(household_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
