use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::AuthenticatedAdmin;
use crate::models::{
    AdminUser, ApplicationStatus, Car, CarStatus, Enquiry, NewCar, NewEnquiry,
    NewPreApprovalApplication, PreApprovalApplication,
};
use crate::services::inventory_service::CarFilter;

use super::{AdminRepository, CarRepository, EnquiryRepository, PreApprovalRepository};

#[derive(Default)]
struct Tables {
    cars: Vec<Car>,
    enquiries: Vec<Enquiry>,
    applications: Vec<PreApprovalApplication>,
    admins: Vec<AdminUser>,
}

/// Process-local store used when no database is configured, and by tests.
/// Row-level security is not modelled.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

/// A plausible available car; `created_at` is staggered by model year so
/// "newest" ordering is deterministic.
pub fn sample_car(brand: &str, model: &str, model_year: i32) -> Car {
    Car {
        id: Uuid::new_v4(),
        name: format!("{} {} {}", model_year, brand, model),
        brand: brand.to_string(),
        model: model.to_string(),
        trim: None,
        model_year,
        mileage: (2026 - model_year).max(0) * 12_000,
        vin: format!("1HGCM82633A{:06}", model_year.unsigned_abs() % 1_000_000),
        price: Some(15_000.0),
        body_style: Some("Sedan".to_string()),
        drivetrain: Some("AWD".to_string()),
        cylinders: Some(4),
        image_url: Vec::new(),
        views: 0,
        custom_id: None,
        status: CarStatus::Available,
        created_at: Utc::now() - Duration::days(i64::from(2030 - model_year)),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with a small demo inventory.
    pub async fn with_demo_inventory() -> Self {
        let store = Self::new();
        let demo = [
            ("Toyota", "Camry", 2019, Some(18_900.0), "Sedan", "FWD", Some("SE")),
            ("Honda", "CR-V", 2021, Some(27_450.0), "SUV", "AWD", Some("EX-L")),
            ("Ford", "F-150", 2018, Some(24_995.0), "Truck", "4WD", Some("XLT")),
            ("Chevrolet", "Malibu", 2017, Some(9_800.0), "Sedan", "FWD", None),
            ("Jeep", "Wrangler", 2020, Some(31_200.0), "SUV", "4WD", Some("Sport")),
            ("BMW", "X5", 2022, Some(54_000.0), "SUV", "AWD", Some("xDrive40i")),
            ("Nissan", "Altima", 2016, None, "Sedan", "FWD", Some("S")),
        ];
        for (i, (brand, model, year, price, body, drive, trim)) in demo.into_iter().enumerate() {
            let mut car = sample_car(brand, model, year);
            car.price = price;
            car.body_style = Some(body.to_string());
            car.drivetrain = Some(drive.to_string());
            car.trim = trim.map(str::to_string);
            car.custom_id = Some(format!("STK-{:04}", 1001 + i));
            if let Some(trim) = &car.trim {
                car.name = format!("{} {}", car.name, trim);
            }
            store.put_car(car).await;
        }
        store
    }

    pub async fn put_car(&self, car: Car) {
        self.tables.write().await.cars.push(car);
    }

    pub async fn put_admin(&self, admin: AdminUser) {
        self.tables.write().await.admins.push(admin);
    }

    pub async fn enquiries(&self) -> Vec<Enquiry> {
        self.tables.read().await.enquiries.clone()
    }

    pub async fn applications(&self) -> Vec<PreApprovalApplication> {
        self.tables.read().await.applications.clone()
    }
}

#[async_trait]
impl CarRepository for MemoryStore {
    async fn search(&self, filter: &CarFilter) -> AppResult<Vec<Car>> {
        let tables = self.tables.read().await;
        let mut cars: Vec<Car> = tables
            .cars
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        filter.sort_and_limit(&mut cars);
        Ok(cars)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Car>> {
        let tables = self.tables.read().await;
        Ok(tables.cars.iter().find(|c| c.id == id).cloned())
    }

    async fn view_count(&self, id: Uuid) -> AppResult<Option<i64>> {
        let tables = self.tables.read().await;
        Ok(tables.cars.iter().find(|c| c.id == id).map(|c| c.views))
    }

    async fn set_view_count(&self, id: Uuid, views: i64) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(car) = tables.cars.iter_mut().find(|c| c.id == id) {
            car.views = views;
        }
        Ok(())
    }

    async fn insert_car(&self, _admin: &AuthenticatedAdmin, car: NewCar) -> AppResult<Car> {
        let row = Car {
            id: Uuid::new_v4(),
            name: car.name,
            brand: car.brand,
            model: car.model,
            trim: car.trim,
            model_year: car.model_year,
            mileage: car.mileage,
            vin: car.vin,
            price: car.price,
            body_style: car.body_style,
            drivetrain: car.drivetrain,
            cylinders: car.cylinders,
            image_url: car.image_url,
            views: 0,
            custom_id: car.custom_id,
            status: car.status,
            created_at: Utc::now(),
        };
        self.tables.write().await.cars.push(row.clone());
        Ok(row)
    }

    async fn delete_car(&self, _admin: &AuthenticatedAdmin, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.cars.len();
        tables.cars.retain(|c| c.id != id);
        Ok(tables.cars.len() < before)
    }

    async fn set_car_status(
        &self,
        _admin: &AuthenticatedAdmin,
        id: Uuid,
        status: CarStatus,
    ) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.cars.iter_mut().find(|c| c.id == id) {
            Some(car) => {
                car.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl EnquiryRepository for MemoryStore {
    async fn insert_enquiry(&self, enquiry: NewEnquiry) -> AppResult<Enquiry> {
        let row = Enquiry {
            id: Uuid::new_v4(),
            name: enquiry.name,
            email: enquiry.email,
            phone_number: enquiry.phone_number,
            message: enquiry.message,
            car_id: enquiry.car_id,
            car_name_at_inquiry: enquiry.snapshot.name,
            car_year_at_inquiry: enquiry.snapshot.year,
            car_vin_at_inquiry: enquiry.snapshot.vin,
            car_price_at_inquiry: enquiry.snapshot.price,
            car_mileage_at_inquiry: enquiry.snapshot.mileage,
            car_custom_id_at_inquiry: enquiry.snapshot.custom_id,
            enquiry_date: Utc::now(),
        };
        self.tables.write().await.enquiries.push(row.clone());
        Ok(row)
    }

    async fn recent_enquiries(
        &self,
        _admin: &AuthenticatedAdmin,
        limit: i64,
    ) -> AppResult<Vec<Enquiry>> {
        let tables = self.tables.read().await;
        let mut rows = tables.enquiries.clone();
        rows.sort_by(|a, b| b.enquiry_date.cmp(&a.enquiry_date));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }
}

#[async_trait]
impl PreApprovalRepository for MemoryStore {
    async fn insert_application(
        &self,
        application: NewPreApprovalApplication,
    ) -> AppResult<PreApprovalApplication> {
        let row = PreApprovalApplication {
            id: Uuid::new_v4(),
            reference_number: application.reference_number,
            details: application.details,
            status: ApplicationStatus::Pending,
            created_at: Utc::now(),
        };
        self.tables.write().await.applications.push(row.clone());
        Ok(row)
    }

    async fn recent_applications(
        &self,
        _admin: &AuthenticatedAdmin,
        limit: i64,
    ) -> AppResult<Vec<PreApprovalApplication>> {
        let tables = self.tables.read().await;
        let mut rows = tables.applications.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn set_application_status(
        &self,
        _admin: &AuthenticatedAdmin,
        id: Uuid,
        status: ApplicationStatus,
    ) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.applications.iter_mut().find(|a| a.id == id) {
            Some(app) => {
                app.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AdminRepository for MemoryStore {
    async fn find_admin_by_email(&self, email: &str) -> AppResult<Option<AdminUser>> {
        let tables = self.tables.read().await;
        Ok(tables
            .admins
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}
