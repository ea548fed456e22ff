use axum::{extract::State, http::StatusCode, Json};
use recharge_core::error::AppError;

use crate::{dtos::RechargeResponse, models::RechargeRequest, startup::AppState};

/// Validate, charge and record a recharge.
pub async fn submit_recharge(
    State(state): State<AppState>,
    Json(request): Json<RechargeRequest>,
) -> Result<(StatusCode, Json<RechargeResponse>), AppError> {
    let record = state.ledger.submit(request).await?;

    Ok((StatusCode::CREATED, Json(RechargeResponse::from(record))))
}
