//! Transaction routes: submit, read back and delete.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tally_core::ledger::{CurrencyInput, DEFAULT_DECIMALS, SplitInput, TransactionInput};
use tally_db::{TransactionError, TransactionView};
use tally_shared::AppError;
use tracing::{error, info, warn};

use super::error_response;
use crate::AppState;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", post(submit_transaction))
        .route(
            "/transactions/{transaction_id}",
            get(get_transaction).delete(delete_transaction),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a transaction.
#[derive(Debug, Deserialize)]
pub struct SubmitTransactionRequest {
    /// Transaction identifier.
    #[serde(default)]
    pub id: String,
    /// Post date (YYYY-MM-DD).
    pub postdate: Option<NaiveDate>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Username of the poster.
    #[serde(default)]
    pub poster: String,
    /// Line items.
    #[serde(default)]
    pub splits: Vec<SplitRequest>,
}

/// One line item of a submitted transaction.
#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    /// Split identifier.
    #[serde(default)]
    pub id: String,
    /// Split date; defaults to the post date.
    pub date: Option<NaiveDate>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Currency name.
    #[serde(default)]
    pub currency: String,
    /// Currency precision.
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    /// Account codes.
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Signed amount; debits positive, credits negative.
    pub amount: Decimal,
}

const fn default_decimals() -> u32 {
    DEFAULT_DECIMALS
}

impl From<SubmitTransactionRequest> for TransactionInput {
    fn from(req: SubmitTransactionRequest) -> Self {
        let postdate = req.postdate;
        Self {
            id: req.id,
            postdate,
            description: req.description,
            poster: req.poster,
            splits: req
                .splits
                .into_iter()
                .map(|split| SplitInput {
                    id: split.id,
                    // A missing post date fails validation before this is used.
                    date: split.date.or(postdate).unwrap_or_default(),
                    description: split.description,
                    currency: CurrencyInput::new(split.currency, split.decimals),
                    accounts: split
                        .accounts
                        .into_iter()
                        .map(|code| code.trim().to_string())
                        .collect(),
                    amount: split.amount,
                })
                .collect(),
        }
    }
}

/// Response for a committed transaction.
#[derive(Debug, Serialize)]
pub struct SubmitTransactionResponse {
    /// Stored transaction identifier.
    pub transaction_id: String,
    /// Poster username.
    pub poster: String,
    /// Number of splits written.
    pub splits: usize,
}

/// Stored transaction.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction identifier.
    pub transaction_id: String,
    /// Post date.
    pub postdate: NaiveDate,
    /// Description.
    pub description: String,
    /// Poster username.
    pub poster: String,
    /// Splits in submission order.
    pub splits: Vec<SplitResponse>,
}

/// Stored split.
#[derive(Debug, Serialize)]
pub struct SplitResponse {
    /// Split identifier.
    pub split_id: String,
    /// Split date.
    pub date: NaiveDate,
    /// Description.
    pub description: String,
    /// Currency name.
    pub currency: String,
    /// Signed amount.
    pub amount: Decimal,
    /// Linked account codes.
    pub accounts: Vec<String>,
}

impl From<TransactionView> for TransactionResponse {
    fn from(view: TransactionView) -> Self {
        Self {
            transaction_id: view.transaction.transaction_id,
            postdate: view.transaction.postdate,
            description: view.transaction.brief,
            poster: view.poster,
            splits: view
                .splits
                .into_iter()
                .map(|s| SplitResponse {
                    split_id: s.split.split_id,
                    date: s.split.split_date,
                    description: s.split.description,
                    currency: s.split.currency,
                    amount: s.amount,
                    accounts: s.accounts,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Renders a ledger error. Validation failures also name the rule and split.
pub(crate) fn ledger_error_response(err: TransactionError) -> Response {
    if err.is_retryable() {
        error!(error = %err, "Ledger operation failed");
    } else {
        warn!(error = %err, "Ledger request rejected");
    }

    if let TransactionError::Validation(validation) = &err {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "VALIDATION_ERROR",
                "code": validation.error_code(),
                "rule": validation.rule(),
                "split": validation.split_index(),
                "message": validation.to_string(),
                "retryable": false,
            })),
        )
            .into_response();
    }

    error_response(&AppError::from(err))
}

/// POST /api/v1/transactions
async fn submit_transaction(
    State(state): State<AppState>,
    Json(req): Json<SubmitTransactionRequest>,
) -> impl IntoResponse {
    let input = TransactionInput::from(req);

    match state.ledger.commit(&input).await {
        Ok(committed) => {
            info!(transaction_id = %input.id, "Transaction submitted");
            (
                StatusCode::CREATED,
                Json(SubmitTransactionResponse {
                    transaction_id: committed.transaction.transaction_id,
                    poster: committed.poster.username,
                    splits: committed.split_count,
                }),
            )
                .into_response()
        }
        Err(e) => ledger_error_response(e),
    }
}

/// GET /api/v1/transactions/{transaction_id}
async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> impl IntoResponse {
    match state.ledger.get(&transaction_id).await {
        Ok(view) => (StatusCode::OK, Json(TransactionResponse::from(view))).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

/// DELETE /api/v1/transactions/{transaction_id}
async fn delete_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> impl IntoResponse {
    match state.ledger.delete(&transaction_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ledger_error_response(e),
    }
}
