//! Account tag routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use serde::{Deserialize, Serialize};
use tally_shared::AppError;

use super::{error_response, transactions::ledger_error_response};
use crate::AppState;

/// Creates the tag routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts/{account}/tags",
            post(add_tag).get(list_tags),
        )
        .route("/accounts/{account}/tags/{tag}", delete(remove_tag))
}

/// Request body for tagging an account.
#[derive(Debug, Deserialize)]
pub struct AddTagRequest {
    /// Tag name.
    pub tag: String,
}

/// Tags of one account.
#[derive(Debug, Serialize)]
pub struct AccountTagsResponse {
    /// Account code.
    pub account: String,
    /// Tag names in name order.
    pub tags: Vec<String>,
}

/// POST /api/v1/accounts/{account}/tags
async fn add_tag(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Json(req): Json<AddTagRequest>,
) -> impl IntoResponse {
    match state.ledger.add_account_tag(&account, &req.tag).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ledger_error_response(e),
    }
}

/// GET /api/v1/accounts/{account}/tags
async fn list_tags(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> impl IntoResponse {
    match state.ledger.registry().account_tags(&account).await {
        Ok(tags) => (StatusCode::OK, Json(AccountTagsResponse { account, tags })).into_response(),
        Err(e) => error_response(&AppError::from(e)),
    }
}

/// DELETE /api/v1/accounts/{account}/tags/{tag}
async fn remove_tag(
    State(state): State<AppState>,
    Path((account, tag)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.ledger.remove_account_tag(&account, &tag).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ledger_error_response(e),
    }
}
