use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::services::coerce;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl TryFrom<String> for ApplicationStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Everything the applicant types into the multi-step form.
///
/// Text fields are trimmed with empty values dropped; numeric and date
/// fields accept either JSON numbers or strings and become `None` when they
/// do not parse.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ApplicationDetails {
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_string", skip_serializing)]
    pub ssn: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub housing_status: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_f64")]
    pub monthly_housing_payment: Option<f64>,
    #[serde(default, deserialize_with = "coerce::opt_i32")]
    pub years_at_address: Option<i32>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub employment_status: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub employer_name: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub job_title: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_i32")]
    pub years_employed: Option<i32>,
    #[serde(default, deserialize_with = "coerce::opt_f64")]
    pub monthly_income: Option<f64>,
    #[serde(default, deserialize_with = "coerce::opt_f64")]
    pub additional_income: Option<f64>,
    #[serde(default, deserialize_with = "coerce::opt_uuid")]
    pub vehicle_id: Option<Uuid>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub vehicle_name: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_i32")]
    pub vehicle_year: Option<i32>,
    #[serde(default, deserialize_with = "coerce::opt_f64")]
    pub vehicle_price: Option<f64>,
    #[serde(default, deserialize_with = "coerce::opt_string")]
    pub vehicle_vin: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_f64")]
    pub down_payment: Option<f64>,
}

impl ApplicationDetails {
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `***-**-1234`, or `None` when no SSN was given.
    pub fn masked_ssn(&self) -> Option<String> {
        let digits: String = self
            .ssn
            .as_deref()?
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        let last4 = digits.get(digits.len().saturating_sub(4)..)?;
        Some(format!("***-**-{}", last4))
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PreApprovalApplication {
    pub id: Uuid,
    pub reference_number: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub details: ApplicationDetails,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPreApprovalApplication {
    pub reference_number: String,
    pub details: ApplicationDetails,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_ssn_keeps_last_four() {
        let details = ApplicationDetails {
            ssn: Some("123-45-6789".into()),
            ..Default::default()
        };
        assert_eq!(details.masked_ssn().as_deref(), Some("***-**-6789"));
        assert_eq!(ApplicationDetails::default().masked_ssn(), None);
    }

    #[test]
    fn test_ssn_is_never_serialized() {
        let details = ApplicationDetails {
            first_name: Some("Ana".into()),
            ssn: Some("123-45-6789".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&details).unwrap();
        assert!(!json.contains("6789"));
        assert!(json.contains("Ana"));
    }

    #[test]
    fn test_full_name_skips_missing_parts() {
        let details = ApplicationDetails {
            first_name: Some("Ana".into()),
            ..Default::default()
        };
        assert_eq!(details.full_name(), "Ana");
    }
}
