//! Tally Web Server
//!
//! Axum-based REST API for the Tally household finance tracker.
//!
//! Tenancy: every request is resolved to a household via the
//! `X-Household-Id` header, falling back to the configured default.
//! Membership authorization is out of scope; ownership checks in the core
//! layer treat a household mismatch exactly like "not found".

use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use tally_core::db::Database;

mod handlers;

/// Maximum statement upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Header carrying the caller's household id
pub const HOUSEHOLD_HEADER: &str = "x-household-id";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Household used when the request carries no household header
    pub default_household: i64,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_household: 1,
            allowed_origins: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
}

/// Resolve the household for a request from its headers
pub(crate) fn household_from_headers(headers: &HeaderMap, config: &ServerConfig) -> i64 {
    headers
        .get(HOUSEHOLD_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(config.default_household)
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });

    let api_routes = Router::new()
        // Accounts
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route(
            "/accounts/:id",
            get(handlers::get_account).delete(handlers::delete_account),
        )
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/:id",
            axum::routing::delete(handlers::delete_category),
        )
        // Transactions
        .route("/transactions", get(handlers::list_transactions))
        // Category rules
        .route(
            "/rules",
            get(handlers::list_rules).post(handlers::create_rule),
        )
        .route("/rules/:id", axum::routing::delete(handlers::delete_rule))
        .route("/rules/test", post(handlers::test_rules))
        // Imports
        .route(
            "/imports",
            get(handlers::list_imports).post(handlers::upload_import),
        )
        .route("/imports/:id", get(handlers::get_import))
        .route("/imports/:id/rows", get(handlers::get_import_rows))
        .route("/imports/:id/confirm", post(handlers::confirm_import))
        .route("/imports/:id/cancel", post(handlers::cancel_import))
        // Recurring transactions
        .route(
            "/recurring",
            get(handlers::list_recurring).post(handlers::create_recurring),
        )
        .route(
            "/recurring/:id",
            axum::routing::delete(handlers::delete_recurring),
        )
        .route("/recurring/:id/process", post(handlers::process_recurring))
        .route("/recurring/:id/skip", post(handlers::skip_recurring))
        .route("/recurring/process-due", post(handlers::process_due_recurring));

    // Restrictive CORS: same-origin unless origins are configured
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes.
///
/// Domain errors map onto client-facing statuses; everything else becomes a
/// 500 with a sanitized body and the full error logged server-side.
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<tally_core::Error> for AppError {
    fn from(err: tally_core::Error) -> Self {
        use tally_core::Error;

        match err {
            Error::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: err.to_string(),
                internal: None,
            },
            Error::InvalidData(_) | Error::UnsupportedFormat(_) | Error::Import(_) => Self {
                status: StatusCode::BAD_REQUEST,
                message: err.to_string(),
                internal: None,
            },
            _ => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return a generic message to the client
                message: "An internal error occurred".to_string(),
                // Keep the full error for logging
                internal: Some(err.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests;
