use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

use super::{Plan, PlanType};

/// Operators a recharge can be placed against.
pub const OPERATORS: [&str; 5] = ["Airtel", "Jio", "Vi (Vodafone Idea)", "BSNL", "Aircel"];

const PHONE_DIGITS: usize = 10;

/// A recharge as submitted by the client, consumed once by the ledger.
///
/// Missing scalar fields deserialize to empty values so that validation can
/// report every problem in one pass instead of failing on the first absent key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RechargeRequest {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please select an operator"))]
    pub operator: String,
    #[serde(default)]
    pub plan_type: PlanType,
    #[serde(default)]
    #[validate(range(min = 1, max = 100000, message = "Amount must be between 1 and 100000"))]
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_plan: Option<Plan>,
    #[serde(default)]
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
    #[serde(default = "Utc::now")]
    pub requested_at: DateTime<Utc>,
    /// Client token collapsing repeated submissions of the same recharge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub fn is_valid_phone_number(phone: &str) -> bool {
    phone.len() == PHONE_DIGITS && phone.bytes().all(|b| b.is_ascii_digit())
}

impl RechargeRequest {
    /// Runs the derived rules plus the cross-field checks and returns all
    /// violations together.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if !is_valid_phone_number(&self.phone_number) {
            errors.add(
                "phone_number",
                field_error("pattern", "Phone number must be exactly 10 digits"),
            );
        }

        if !self.operator.is_empty() && !OPERATORS.contains(&self.operator.as_str()) {
            errors.add(
                "operator",
                field_error("unknown_operator", "Operator is not supported"),
            );
        }

        if let Some(plan) = &self.selected_plan {
            if plan.id.is_empty() || plan.price <= 0 {
                errors.add(
                    "selected_plan",
                    field_error("invalid_plan", "Selected plan is not a catalog plan"),
                );
            }
            if plan.plan_type != self.plan_type {
                errors.add(
                    "selected_plan",
                    field_error(
                        "plan_type_mismatch",
                        "Selected plan does not match the chosen plan type",
                    ),
                );
            }
            if self.amount > 0 && plan.price != self.amount {
                errors.add(
                    "amount",
                    field_error("amount_mismatch", "Amount must equal the selected plan price"),
                );
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Whether `other` asks for the same recharge, regardless of when it was sent.
    pub fn same_recharge(&self, other: &RechargeRequest) -> bool {
        let plan_id = |r: &RechargeRequest| r.selected_plan.as_ref().map(|p| p.id.clone());

        self.user_id == other.user_id
            && self.phone_number == other.phone_number
            && self.operator == other.operator
            && self.plan_type == other.plan_type
            && self.amount == other.amount
            && plan_id(self) == plan_id(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn premium() -> Plan {
        Plan {
            id: "2".to_string(),
            name: "Premium Plan".to_string(),
            price: 399,
            validity: "56 days".to_string(),
            data: "2GB/day".to_string(),
            plan_type: PlanType::Prepaid,
            description: "Unlimited calls + SMS + Disney+ Hotstar".to_string(),
        }
    }

    fn request() -> RechargeRequest {
        RechargeRequest {
            phone_number: "9876543210".to_string(),
            operator: "Airtel".to_string(),
            plan_type: PlanType::Prepaid,
            amount: 399,
            selected_plan: Some(premium()),
            user_id: "u1".to_string(),
            requested_at: Utc::now(),
            idempotency_key: None,
        }
    }

    fn fields(errors: &ValidationErrors) -> Vec<String> {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|k| k.to_string())
            .collect();
        fields.sort();
        fields
    }

    #[test]
    fn accepts_well_formed_request() {
        assert!(request().check().is_ok());
    }

    #[test]
    fn rejects_phone_numbers_that_are_not_ten_digits() {
        for phone in ["", "987654321", "98765432101", "98765abcde", "+919876543"] {
            let mut req = request();
            req.phone_number = phone.to_string();
            let errors = req.check().unwrap_err();
            assert_eq!(fields(&errors), vec!["phone_number"], "phone {:?}", phone);
        }
    }

    #[test]
    fn reports_every_invalid_field_at_once() {
        let req = RechargeRequest {
            phone_number: "123".to_string(),
            operator: String::new(),
            plan_type: PlanType::Prepaid,
            amount: 0,
            selected_plan: None,
            user_id: String::new(),
            requested_at: Utc::now(),
            idempotency_key: None,
        };

        let errors = req.check().unwrap_err();

        assert_eq!(
            fields(&errors),
            vec!["amount", "operator", "phone_number", "user_id"]
        );
    }

    #[test]
    fn rejects_negative_amount() {
        let mut req = request();
        req.selected_plan = None;
        req.amount = -50;

        let errors = req.check().unwrap_err();
        assert_eq!(fields(&errors), vec!["amount"]);
    }

    #[test]
    fn rejects_amount_above_ceiling() {
        let mut req = request();
        req.selected_plan = None;
        req.amount = i64::MAX;
        assert_eq!(fields(&req.check().unwrap_err()), vec!["amount"]);

        req.amount = 100_000;
        assert!(req.check().is_ok());
    }

    #[test]
    fn rejects_selected_plan_without_id() {
        let mut req = request();
        if let Some(plan) = req.selected_plan.as_mut() {
            plan.id = String::new();
        }

        let errors = req.check().unwrap_err();
        assert_eq!(fields(&errors), vec!["selected_plan"]);
        assert_eq!(errors.field_errors()["selected_plan"][0].code, "invalid_plan");
    }

    #[test]
    fn same_recharge_ignores_timestamp_and_key() {
        let first = request();
        let mut resent = request();
        resent.requested_at = first.requested_at + chrono::Duration::seconds(5);
        resent.idempotency_key = Some("k".to_string());
        assert!(first.same_recharge(&resent));

        let mut other_user = request();
        other_user.user_id = "u2".to_string();
        assert!(!first.same_recharge(&other_user));

        let mut other_phone = request();
        other_phone.phone_number = "9000000000".to_string();
        assert!(!first.same_recharge(&other_phone));
    }

    #[test]
    fn rejects_unknown_operator() {
        let mut req = request();
        req.operator = "Telstra".to_string();

        let errors = req.check().unwrap_err();
        assert_eq!(fields(&errors), vec!["operator"]);
    }

    #[test]
    fn rejects_plan_from_other_category() {
        let mut req = request();
        req.plan_type = PlanType::Postpaid;

        let errors = req.check().unwrap_err();
        assert_eq!(fields(&errors), vec!["selected_plan"]);
    }

    #[test]
    fn rejects_amount_that_differs_from_plan_price() {
        let mut req = request();
        req.amount = 199;

        let errors = req.check().unwrap_err();
        assert_eq!(fields(&errors), vec!["amount"]);
    }

    #[test]
    fn missing_fields_deserialize_for_validation() {
        let req: RechargeRequest = serde_json::from_str(r#"{"operator":"Jio"}"#).unwrap();

        assert_eq!(req.plan_type, PlanType::Prepaid);
        let errors = req.check().unwrap_err();
        assert_eq!(fields(&errors), vec!["amount", "phone_number", "user_id"]);
    }
}
