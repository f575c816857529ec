//! Data access for the four relations.
//!
//! Each table gets a narrow trait so the services can run against Postgres
//! in production and against [`memory::MemoryStore`] without a database.
//! Mutations that the row-level security policies reserve for admins take the
//! acting [`AuthenticatedAdmin`].

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::AuthenticatedAdmin;
use crate::models::{
    AdminUser, ApplicationStatus, Car, CarStatus, Enquiry, NewCar, NewEnquiry,
    NewPreApprovalApplication, PreApprovalApplication,
};
use crate::services::inventory_service::CarFilter;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait CarRepository: Send + Sync {
    async fn search(&self, filter: &CarFilter) -> AppResult<Vec<Car>>;

    async fn find(&self, id: Uuid) -> AppResult<Option<Car>>;

    /// `None` when the car does not exist.
    async fn view_count(&self, id: Uuid) -> AppResult<Option<i64>>;

    async fn set_view_count(&self, id: Uuid, views: i64) -> AppResult<()>;

    async fn insert_car(&self, admin: &AuthenticatedAdmin, car: NewCar) -> AppResult<Car>;

    /// Returns whether a row was removed.
    async fn delete_car(&self, admin: &AuthenticatedAdmin, id: Uuid) -> AppResult<bool>;

    async fn set_car_status(
        &self,
        admin: &AuthenticatedAdmin,
        id: Uuid,
        status: CarStatus,
    ) -> AppResult<bool>;
}

#[async_trait]
pub trait EnquiryRepository: Send + Sync {
    async fn insert_enquiry(&self, enquiry: NewEnquiry) -> AppResult<Enquiry>;

    async fn recent_enquiries(
        &self,
        admin: &AuthenticatedAdmin,
        limit: i64,
    ) -> AppResult<Vec<Enquiry>>;
}

#[async_trait]
pub trait PreApprovalRepository: Send + Sync {
    async fn insert_application(
        &self,
        application: NewPreApprovalApplication,
    ) -> AppResult<PreApprovalApplication>;

    async fn recent_applications(
        &self,
        admin: &AuthenticatedAdmin,
        limit: i64,
    ) -> AppResult<Vec<PreApprovalApplication>>;

    async fn set_application_status(
        &self,
        admin: &AuthenticatedAdmin,
        id: Uuid,
        status: ApplicationStatus,
    ) -> AppResult<bool>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn find_admin_by_email(&self, email: &str) -> AppResult<Option<AdminUser>>;
}

/// One handle per table, usually all backed by the same store.
#[derive(Clone)]
pub struct Repositories {
    pub cars: Arc<dyn CarRepository>,
    pub enquiries: Arc<dyn EnquiryRepository>,
    pub applications: Arc<dyn PreApprovalRepository>,
    pub admins: Arc<dyn AdminRepository>,
}

impl Repositories {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CarRepository + EnquiryRepository + PreApprovalRepository + AdminRepository + 'static,
    {
        Self {
            cars: store.clone(),
            enquiries: store.clone(),
            applications: store.clone(),
            admins: store,
        }
    }
}
