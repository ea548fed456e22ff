use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    dtos::PlanQuery,
    models::{Plan, OPERATORS},
    services::filter_by_type,
    startup::AppState,
};

/// Current catalog, optionally restricted to one plan type.
pub async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<PlanQuery>,
) -> Json<Vec<Plan>> {
    let plans = state.catalog.fetch_plans().await;

    let plans = match query.plan_type {
        Some(plan_type) => filter_by_type(&plans, plan_type),
        None => plans,
    };

    Json(plans)
}

pub async fn list_operators() -> Json<Vec<&'static str>> {
    Json(OPERATORS.to_vec())
}
