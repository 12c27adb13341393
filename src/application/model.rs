use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::catalog::model::ProductType;
use crate::utils::error::CustomError;
use crate::utils::helpers::parse_amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Processing,
    UnderReview,
    InProgress,
    Approved,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Processing => "PROCESSING",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::InProgress => "IN_PROGRESS",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Withdrawn => "WITHDRAWN",
        }
    }

    /// Only applications nobody has decided on yet can be withdrawn.
    pub fn is_withdrawable(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Pending
                | ApplicationStatus::Processing
                | ApplicationStatus::UnderReview
                | ApplicationStatus::InProgress
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = CustomError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_uppercase().as_str() {
            "PENDING" => Ok(ApplicationStatus::Pending),
            "PROCESSING" => Ok(ApplicationStatus::Processing),
            "UNDER_REVIEW" => Ok(ApplicationStatus::UnderReview),
            "IN_PROGRESS" => Ok(ApplicationStatus::InProgress),
            "APPROVED" => Ok(ApplicationStatus::Approved),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            "WITHDRAWN" => Ok(ApplicationStatus::Withdrawn),
            other => Err(CustomError::ValidationError(format!(
                "Invalid application status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationDocument {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    #[serde(rename = "_id")]
    pub id: i64,
    pub user_id: ObjectId,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub product_id: Option<ObjectId>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub amount: f64,
    pub category_id: Option<ObjectId>,
    pub category_slug: Option<String>,
    pub category_name: Option<String>,
    pub employment_type: Option<String>,
    pub monthly_income: Option<String>,
    pub employer_name: Option<String>,
    pub work_experience: Option<String>,
    pub residence_type: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub phone: String,
    pub email: String,
    pub pan_number: Option<String>,
    pub applicant_name: String,
    pub notes: Option<String>,
    pub feedback: Option<String>,
    #[serde(default)]
    pub documents: Vec<ApplicationDocument>,
    pub reference_no: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Form fields that arrive either as JSON numbers or as formatted text
/// (`"₹ 50,000"`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrText::Number(n) => Some(*n),
            NumberOrText::Text(text) => parse_amount(text),
        }
    }

    pub fn to_text(&self) -> Option<String> {
        match self {
            NumberOrText::Number(n) => Some(n.to_string()),
            NumberOrText::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    pub name: Option<String>,
    pub email: String,
    pub phone: String,
    pub pan_number: Option<String>,
    pub employment_type: Option<String>,
    pub monthly_income: Option<NumberOrText>,
    pub employer_name: Option<String>,
    pub work_experience: Option<NumberOrText>,
    pub residence_type: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub loan_amount: Option<NumberOrText>,
    pub product_id: Option<String>,
    pub product_type: String,
    pub category_slug: Option<String>,
    pub category_name: Option<String>,
    pub documents: Option<Vec<ApplicationDocument>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    pub feedback: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_four_statuses_are_withdrawable() {
        let open = ["PENDING", "PROCESSING", "UNDER_REVIEW", "IN_PROGRESS"];
        let closed = ["APPROVED", "REJECTED", "WITHDRAWN"];

        for raw in open {
            assert!(raw.parse::<ApplicationStatus>().unwrap().is_withdrawable());
        }
        for raw in closed {
            assert!(!raw.parse::<ApplicationStatus>().unwrap().is_withdrawable());
        }
        assert!("ARCHIVED".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn loose_amounts_accept_numbers_and_text() {
        let req: CreateApplicationRequest = serde_json::from_str(
            r#"{
                "email": "a@b.co",
                "phone": "9876543210",
                "productType": "LOAN",
                "loanAmount": "₹ 5,00,000",
                "monthlyIncome": 85000,
                "workExperience": "3 years"
            }"#,
        )
        .unwrap();

        assert_eq!(req.loan_amount.and_then(|a| a.as_f64()), Some(500000.0));
        assert_eq!(req.monthly_income.as_ref().and_then(NumberOrText::as_f64), Some(85000.0));
        assert_eq!(
            req.work_experience.and_then(|w| w.to_text()).as_deref(),
            Some("3 years")
        );
    }

    #[test]
    fn status_serializes_in_screaming_case() {
        assert_eq!(
            serde_json::to_value(ApplicationStatus::UnderReview).unwrap(),
            "UNDER_REVIEW"
        );
    }
}
