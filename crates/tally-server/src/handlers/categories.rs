//! Category handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::{household_from_headers, AppError, AppState, SuccessResponse};
use tally_core::models::{Category, NewCategory};

/// GET /api/categories - List the household's categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Category>>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    let categories = state.db.list_categories(household_id)?;
    Ok(Json(categories))
}

/// POST /api/categories - Create a category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<NewCategory>,
) -> Result<Json<Category>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("Category name is required"));
    }

    let id = state.db.create_category(household_id, &req)?;
    let category = state.db.get_category(household_id, id)?;
    Ok(Json(category))
}

/// DELETE /api/categories/:id - Delete a category (rejected while
/// transactions or rules reference it)
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    state.db.delete_category(household_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
