use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Car;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enquiry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub message: String,
    /// Not a foreign key: the car may since have been deleted.
    pub car_id: Option<Uuid>,
    pub car_name_at_inquiry: Option<String>,
    pub car_year_at_inquiry: Option<i32>,
    pub car_vin_at_inquiry: Option<String>,
    pub car_price_at_inquiry: Option<f64>,
    pub car_mileage_at_inquiry: Option<i32>,
    pub car_custom_id_at_inquiry: Option<String>,
    pub enquiry_date: chrono::DateTime<chrono::Utc>,
}

/// Denormalized copy of a car taken when the enquiry is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarSnapshot {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub vin: Option<String>,
    pub price: Option<f64>,
    pub mileage: Option<i32>,
    pub custom_id: Option<String>,
}

impl From<&Car> for CarSnapshot {
    fn from(car: &Car) -> Self {
        Self {
            name: Some(car.name.clone()),
            year: Some(car.model_year),
            vin: Some(car.vin.clone()),
            price: car.price,
            mileage: Some(car.mileage),
            custom_id: car.custom_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEnquiry {
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub message: String,
    pub car_id: Option<Uuid>,
    pub snapshot: CarSnapshot,
}
