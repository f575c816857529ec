use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

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
pub enum CarStatus {
    #[default]
    Available,
    Sold,
    Pending,
}

impl TryFrom<String> for CarStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Car {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub trim: Option<String>,
    pub model_year: i32,
    pub mileage: i32,
    pub vin: String,
    pub price: Option<f64>,
    pub body_style: Option<String>,
    pub drivetrain: Option<String>,
    pub cylinders: Option<i32>,
    pub image_url: Vec<String>,
    pub views: i64,
    pub custom_id: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: CarStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Car {
    /// Identifier shown to customers: the dealer's stock number when set.
    pub fn display_id(&self) -> String {
        self.custom_id
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Columns supplied when an admin adds a car.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCar {
    pub name: String,
    pub brand: String,
    pub model: String,
    pub trim: Option<String>,
    pub model_year: i32,
    pub mileage: i32,
    pub vin: String,
    pub price: Option<f64>,
    pub body_style: Option<String>,
    pub drivetrain: Option<String>,
    pub cylinders: Option<i32>,
    pub image_url: Vec<String>,
    pub custom_id: Option<String>,
    pub status: CarStatus,
}

impl NewCar {
    /// `"{year} {brand} {model} {trim}"` without the trailing trim when absent.
    pub fn default_name(&self) -> String {
        let mut name = format!("{} {} {}", self.model_year, self.brand, self.model);
        if let Some(trim) = self.trim.as_deref().filter(|t| !t.is_empty()) {
            name.push(' ');
            name.push_str(trim);
        }
        name
    }
}
