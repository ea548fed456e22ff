use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Billing category of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    #[default]
    Prepaid,
    Postpaid,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Prepaid => "prepaid",
            PlanType::Postpaid => "postpaid",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prepaid" => Ok(PlanType::Prepaid),
            "postpaid" => Ok(PlanType::Postpaid),
            other => Err(format!("unknown plan type '{}'", other)),
        }
    }
}

/// A recharge plan as published by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    /// Whole currency units.
    pub price: i64,
    pub validity: String,
    pub data: String,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    pub description: String,
}
