//! Category rule handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{household_from_headers, AppError, AppState, SuccessResponse};
use tally_core::models::{CategoryRule, NewCategoryRule};
use tally_core::Categorizer;

/// GET /api/rules - List the household's rules in evaluation order
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CategoryRule>>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    let rules = state.db.list_rules(household_id)?;
    Ok(Json(rules))
}

/// POST /api/rules - Create a rule
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<NewCategoryRule>,
) -> Result<Json<CategoryRule>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    if req.pattern.trim().is_empty() {
        return Err(AppError::bad_request("Rule pattern is required"));
    }

    let id = state.db.create_rule(household_id, &req)?;
    let rule = state.db.get_rule(household_id, id)?;
    Ok(Json(rule))
}

/// DELETE /api/rules/:id - Delete a rule
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);
    state.db.delete_rule(household_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Request body for testing rules against a sample description
#[derive(Debug, Deserialize)]
pub struct TestRulesRequest {
    pub description: String,
}

/// Response for a rule test
#[derive(Serialize)]
pub struct TestRulesResponse {
    pub matched: bool,
    pub rule_id: Option<i64>,
    pub category_id: Option<i64>,
    pub payee: Option<String>,
}

/// POST /api/rules/test - Dry-run the rule engine against a description.
/// Does not touch usage counters.
pub async fn test_rules(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TestRulesRequest>,
) -> Result<Json<TestRulesResponse>, AppError> {
    let household_id = household_from_headers(&headers, &state.config);

    let result = Categorizer::new(&state.db).test_description(household_id, &req.description)?;
    let response = match result {
        Some(m) => TestRulesResponse {
            matched: true,
            rule_id: Some(m.rule_id),
            category_id: Some(m.category_id),
            payee: m.payee,
        },
        None => TestRulesResponse {
            matched: false,
            rule_id: None,
            category_id: None,
            payee: None,
        },
    };
    Ok(Json(response))
}
