//! Read side of the ledger: history, dashboard summary and lookup.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use recharge_core::error::AppError;

use crate::{
    dtos::TransactionQuery,
    models::{LedgerSummary, TransactionRecord},
    startup::AppState,
};

/// Ledger entries, newest first.
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    let records = match query.user_id.as_deref() {
        Some(user_id) => state.ledger.history_for_user(user_id).await?,
        None => state.ledger.history().await?,
    };

    Ok(Json(records))
}

pub async fn transaction_summary(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<LedgerSummary>, AppError> {
    let summary = state.ledger.summary(query.user_id.as_deref()).await?;
    Ok(Json(summary))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<TransactionRecord>, AppError> {
    tracing::debug!(transaction_id = %transaction_id, "Fetching transaction");

    let record = state
        .ledger
        .find(&transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Transaction not found")))?;

    Ok(Json(record))
}
