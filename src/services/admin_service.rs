use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use bytes::Bytes;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthenticatedAdmin;
use crate::models::{ApplicationStatus, Car, CarStatus, Enquiry, NewCar, PreApprovalApplication};
use crate::repository::Repositories;
use crate::services::coerce::{non_empty, parse_f64, parse_i32};
use crate::services::inventory_service::CarFilter;
use crate::storage::{car_image_key, StorageBackend};
use crate::web::page_cache::{car_paths, PageCache};

/// 17 characters, no I, O or Q.
static RE_VIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").unwrap());

const DASHBOARD_LIMIT: i64 = 50;

/// One file part of the add-car form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub cars: Vec<Car>,
    pub enquiries: Vec<Enquiry>,
    pub applications: Vec<PreApprovalApplication>,
}

/// Turns the add-car text fields into a row. Only brand, model and model
/// year are required; unparsable numbers are left empty.
pub fn new_car_from_fields(fields: &HashMap<String, String>) -> AppResult<NewCar> {
    let field = |name: &str| non_empty(fields.get(name).map(String::as_str));
    let required = |name: &str| {
        field(name).ok_or_else(|| AppError::Validation(format!("{} is required", name)))
    };

    let brand = required("brand")?;
    let model = required("model")?;
    let model_year = parse_i32(fields.get("model_year").map(String::as_str))
        .ok_or_else(|| AppError::Validation("model_year is required".to_string()))?;

    let vin = field("vin").map(|v| v.to_ascii_uppercase()).unwrap_or_default();
    if !vin.is_empty() && !RE_VIN.is_match(&vin) {
        return Err(AppError::Validation(format!("VIN {} is not valid", vin)));
    }

    let status = match field("status") {
        Some(s) => s
            .parse::<CarStatus>()
            .map_err(|_| AppError::Validation(format!("unknown car status: {}", s)))?,
        None => CarStatus::default(),
    };

    let mut car = NewCar {
        name: String::new(),
        brand,
        model,
        trim: field("trim"),
        model_year,
        mileage: parse_i32(fields.get("mileage").map(String::as_str)).unwrap_or(0),
        vin,
        price: parse_f64(fields.get("price").map(String::as_str)),
        body_style: field("body_style"),
        drivetrain: field("drivetrain"),
        cylinders: parse_i32(fields.get("cylinders").map(String::as_str)),
        image_url: Vec::new(),
        custom_id: field("custom_id"),
        status,
    };
    car.name = field("name").unwrap_or_else(|| car.default_name());
    Ok(car)
}

#[derive(Clone)]
pub struct AdminService {
    repos: Repositories,
    storage: Option<Arc<dyn StorageBackend>>,
    pages: Arc<PageCache>,
}

impl AdminService {
    pub fn new(
        repos: Repositories,
        storage: Option<Arc<dyn StorageBackend>>,
        pages: Arc<PageCache>,
    ) -> Self {
        Self {
            repos,
            storage,
            pages,
        }
    }

    pub async fn dashboard(&self, admin: &AuthenticatedAdmin) -> AppResult<DashboardData> {
        let cars = self.repos.cars.search(&CarFilter::latest(DASHBOARD_LIMIT)).await?;
        let enquiries = self
            .repos
            .enquiries
            .recent_enquiries(admin, DASHBOARD_LIMIT)
            .await?;
        let applications = self
            .repos
            .applications
            .recent_applications(admin, DASHBOARD_LIMIT)
            .await?;
        Ok(DashboardData {
            cars,
            enquiries,
            applications,
        })
    }

    /// Uploads every image, then inserts the car with their URLs.
    ///
    /// An upload failure aborts before the insert. Blobs uploaded before an
    /// insert failure stay in the bucket.
    pub async fn add_car(
        &self,
        admin: &AuthenticatedAdmin,
        fields: &HashMap<String, String>,
        images: Vec<ImageUpload>,
    ) -> AppResult<Car> {
        let mut car = new_car_from_fields(fields)?;

        let images: Vec<ImageUpload> = images.into_iter().filter(|i| !i.data.is_empty()).collect();
        if !images.is_empty() {
            let storage = self
                .storage
                .as_ref()
                .ok_or_else(|| AppError::Storage("no storage backend configured".to_string()))?;
            for image in &images {
                let key = car_image_key(&image.filename);
                let url = storage.upload(&key, &image.data, &image.content_type).await?;
                car.image_url.push(url);
            }
        }

        let inserted = self.repos.cars.insert_car(admin, car).await?;
        tracing::info!(
            "Car added: id={}, name={}, images={}, admin_id={}",
            inserted.id,
            inserted.name,
            inserted.image_url.len(),
            admin.admin_id
        );
        self.pages.revalidate(&car_paths(Some(inserted.id)));
        Ok(inserted)
    }

    pub async fn delete_car(&self, admin: &AuthenticatedAdmin, id: Uuid) -> AppResult<()> {
        if !self.repos.cars.delete_car(admin, id).await? {
            return Err(AppError::NotFound(format!("car {}", id)));
        }
        tracing::info!("Car deleted: id={}, admin_id={}", id, admin.admin_id);
        self.pages.revalidate(&car_paths(Some(id)));
        Ok(())
    }

    pub async fn set_car_status(
        &self,
        admin: &AuthenticatedAdmin,
        id: Uuid,
        status: &str,
    ) -> AppResult<()> {
        let status: CarStatus = status
            .trim()
            .parse()
            .map_err(|_| AppError::Validation(format!("unknown car status: {}", status)))?;
        if !self.repos.cars.set_car_status(admin, id, status).await? {
            return Err(AppError::NotFound(format!("car {}", id)));
        }
        tracing::info!("Car status changed: id={}, status={}", id, status);
        self.pages.revalidate(&car_paths(Some(id)));
        Ok(())
    }

    pub async fn set_application_status(
        &self,
        admin: &AuthenticatedAdmin,
        id: Uuid,
        status: &str,
    ) -> AppResult<()> {
        let status: ApplicationStatus = status
            .trim()
            .parse()
            .map_err(|_| AppError::Validation(format!("unknown application status: {}", status)))?;
        if !self
            .repos
            .applications
            .set_application_status(admin, id, status)
            .await?
        {
            return Err(AppError::NotFound(format!("application {}", id)));
        }
        tracing::info!("Application status changed: id={}, status={}", id, status);
        Ok(())
    }
}
