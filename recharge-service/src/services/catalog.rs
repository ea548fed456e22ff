//! Plan catalog resolver.
//!
//! Reads the published plans from the remote catalog and substitutes the
//! built-in catalog whenever that read fails for any reason.

use crate::config::CatalogConfig;
use crate::models::{Plan, PlanType};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Why the remote catalog could not be used. Never leaves this module.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog endpoint not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("catalog returned status {0}")]
    Status(StatusCode),

    #[error("malformed catalog body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid plan in catalog: {0}")]
    InvalidPlan(String),
}

#[derive(Clone)]
pub struct PlanCatalog {
    client: Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl PlanCatalog {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config
                .base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            timeout: config.timeout(),
        }
    }

    /// Returns the remote catalog, or the built-in one if it is unavailable.
    pub async fn fetch_plans(&self) -> Vec<Plan> {
        match self.fetch_remote().await {
            Ok(plans) => {
                tracing::debug!(count = plans.len(), "Loaded plans from remote catalog");
                plans
            }
            Err(CatalogError::NotConfigured) => fallback_plans(),
            Err(e) => {
                tracing::warn!(error = %e, "Plan catalog unavailable, serving built-in plans");
                fallback_plans()
            }
        }
    }

    async fn fetch_remote(&self) -> Result<Vec<Plan>, CatalogError> {
        let base_url = self.base_url.as_ref().ok_or(CatalogError::NotConfigured)?;
        let url = format!("{}/plans", base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }

        let body = response.text().await?;
        let plans: Vec<Plan> = serde_json::from_str(&body)?;

        if let Some(plan) = plans.iter().find(|p| p.id.is_empty() || p.price <= 0) {
            return Err(CatalogError::InvalidPlan(format!(
                "id='{}' price={}",
                plan.id, plan.price
            )));
        }

        Ok(plans)
    }
}

/// Keeps the plans of one category, preserving catalog order.
pub fn filter_by_type(plans: &[Plan], plan_type: PlanType) -> Vec<Plan> {
    plans
        .iter()
        .filter(|plan| plan.plan_type == plan_type)
        .cloned()
        .collect()
}

fn plan(
    id: &str,
    name: &str,
    price: i64,
    validity: &str,
    data: &str,
    plan_type: PlanType,
    description: &str,
) -> Plan {
    Plan {
        id: id.to_string(),
        name: name.to_string(),
        price,
        validity: validity.to_string(),
        data: data.to_string(),
        plan_type,
        description: description.to_string(),
    }
}

/// Built-in catalog served when the remote catalog is unavailable.
pub fn fallback_plans() -> Vec<Plan> {
    vec![
        plan(
            "1",
            "Basic Plan",
            199,
            "28 days",
            "1.5GB/day",
            PlanType::Prepaid,
            "Unlimited calls + SMS",
        ),
        plan(
            "2",
            "Premium Plan",
            399,
            "56 days",
            "2GB/day",
            PlanType::Prepaid,
            "Unlimited calls + SMS + Disney+ Hotstar",
        ),
        plan(
            "3",
            "Super Plan",
            599,
            "84 days",
            "3GB/day",
            PlanType::Prepaid,
            "Unlimited calls + SMS + Netflix + Prime",
        ),
        plan(
            "4",
            "Postpaid Basic",
            299,
            "30 days",
            "25GB",
            PlanType::Postpaid,
            "Unlimited calls + SMS + Bill protection",
        ),
    ]
}
