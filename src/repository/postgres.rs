use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::db::set_current_admin;
use crate::error::AppResult;
use crate::middleware::AuthenticatedAdmin;
use crate::models::{
    AdminUser, ApplicationStatus, Car, CarStatus, Enquiry, NewCar, NewEnquiry,
    NewPreApprovalApplication, PreApprovalApplication,
};
use crate::services::inventory_service::CarFilter;

use super::{AdminRepository, CarRepository, EnquiryRepository, PreApprovalRepository};

const CAR_COLUMNS: &str = "id, name, brand, model, \"trim\", model_year, mileage, vin, price, \
     body_style, drivetrain, cylinders, image_url, views, custom_id, status, created_at";

const ENQUIRY_COLUMNS: &str = "id, name, email, phone_number, message, car_id, \
     car_name_at_inquiry, car_year_at_inquiry, car_vin_at_inquiry, car_price_at_inquiry, \
     car_mileage_at_inquiry, car_custom_id_at_inquiry, enquiry_date";

const APPLICATION_COLUMNS: &str = "id, reference_number, first_name, last_name, email, phone, \
     ssn, date_of_birth, address, city, state, zip_code, housing_status, \
     monthly_housing_payment, years_at_address, employment_status, employer_name, job_title, \
     years_employed, monthly_income, additional_income, vehicle_id, vehicle_name, vehicle_year, \
     vehicle_price, vehicle_vin, down_payment, status, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a transaction with the RLS admin context set.
    async fn admin_tx(&self, admin: &AuthenticatedAdmin) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        set_current_admin(&mut *tx, &admin.admin_id.to_string()).await?;
        Ok(tx)
    }
}

#[async_trait]
impl CarRepository for PgStore {
    async fn search(&self, filter: &CarFilter) -> AppResult<Vec<Car>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM cars", CAR_COLUMNS));
        filter.push_sql(&mut qb);
        let cars = qb.build_query_as::<Car>().fetch_all(&self.pool).await?;
        Ok(cars)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Car>> {
        let sql = format!("SELECT {} FROM cars WHERE id = $1", CAR_COLUMNS);
        let car = sqlx::query_as::<_, Car>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(car)
    }

    async fn view_count(&self, id: Uuid) -> AppResult<Option<i64>> {
        let views: Option<i64> = sqlx::query_scalar("SELECT views FROM cars WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(views)
    }

    async fn set_view_count(&self, id: Uuid, views: i64) -> AppResult<()> {
        sqlx::query("SELECT set_car_views($1, $2)")
            .bind(id)
            .bind(views)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_car(&self, admin: &AuthenticatedAdmin, car: NewCar) -> AppResult<Car> {
        let mut tx = self.admin_tx(admin).await?;
        let sql = format!(
            "INSERT INTO cars (name, brand, model, \"trim\", model_year, mileage, vin, price, \
             body_style, drivetrain, cylinders, image_url, custom_id, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {}",
            CAR_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Car>(&sql)
            .bind(&car.name)
            .bind(&car.brand)
            .bind(&car.model)
            .bind(&car.trim)
            .bind(car.model_year)
            .bind(car.mileage)
            .bind(&car.vin)
            .bind(car.price)
            .bind(&car.body_style)
            .bind(&car.drivetrain)
            .bind(car.cylinders)
            .bind(&car.image_url)
            .bind(&car.custom_id)
            .bind(car.status.as_ref())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn delete_car(&self, admin: &AuthenticatedAdmin, id: Uuid) -> AppResult<bool> {
        let mut tx = self.admin_tx(admin).await?;
        let result = sqlx::query("DELETE FROM cars WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_car_status(
        &self,
        admin: &AuthenticatedAdmin,
        id: Uuid,
        status: CarStatus,
    ) -> AppResult<bool> {
        let mut tx = self.admin_tx(admin).await?;
        let result = sqlx::query("UPDATE cars SET status = $1 WHERE id = $2")
            .bind(status.as_ref())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EnquiryRepository for PgStore {
    /// Anonymous callers cannot read enquiries back, so the row is built
    /// locally instead of using `RETURNING`.
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
        let sql = format!(
            "INSERT INTO enquiries ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            ENQUIRY_COLUMNS
        );
        sqlx::query(&sql)
            .bind(row.id)
            .bind(&row.name)
            .bind(&row.email)
            .bind(&row.phone_number)
            .bind(&row.message)
            .bind(row.car_id)
            .bind(&row.car_name_at_inquiry)
            .bind(row.car_year_at_inquiry)
            .bind(&row.car_vin_at_inquiry)
            .bind(row.car_price_at_inquiry)
            .bind(row.car_mileage_at_inquiry)
            .bind(&row.car_custom_id_at_inquiry)
            .bind(row.enquiry_date)
            .execute(&self.pool)
            .await?;
        Ok(row)
    }

    async fn recent_enquiries(
        &self,
        admin: &AuthenticatedAdmin,
        limit: i64,
    ) -> AppResult<Vec<Enquiry>> {
        let mut tx = self.admin_tx(admin).await?;
        let sql = format!(
            "SELECT {} FROM enquiries ORDER BY enquiry_date DESC LIMIT $1",
            ENQUIRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, Enquiry>(&sql)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(rows)
    }
}

#[async_trait]
impl PreApprovalRepository for PgStore {
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
        let d = &row.details;
        let sql = format!(
            "INSERT INTO pre_approval_applications ({}) VALUES (\
             $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
             $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29)",
            APPLICATION_COLUMNS
        );
        sqlx::query(&sql)
            .bind(row.id)
            .bind(&row.reference_number)
            .bind(&d.first_name)
            .bind(&d.last_name)
            .bind(&d.email)
            .bind(&d.phone)
            .bind(&d.ssn)
            .bind(d.date_of_birth)
            .bind(&d.address)
            .bind(&d.city)
            .bind(&d.state)
            .bind(&d.zip_code)
            .bind(&d.housing_status)
            .bind(d.monthly_housing_payment)
            .bind(d.years_at_address)
            .bind(&d.employment_status)
            .bind(&d.employer_name)
            .bind(&d.job_title)
            .bind(d.years_employed)
            .bind(d.monthly_income)
            .bind(d.additional_income)
            .bind(d.vehicle_id)
            .bind(&d.vehicle_name)
            .bind(d.vehicle_year)
            .bind(d.vehicle_price)
            .bind(&d.vehicle_vin)
            .bind(d.down_payment)
            .bind(row.status.as_ref())
            .bind(row.created_at)
            .execute(&self.pool)
            .await?;
        Ok(row)
    }

    async fn recent_applications(
        &self,
        admin: &AuthenticatedAdmin,
        limit: i64,
    ) -> AppResult<Vec<PreApprovalApplication>> {
        let mut tx = self.admin_tx(admin).await?;
        let sql = format!(
            "SELECT {} FROM pre_approval_applications ORDER BY created_at DESC LIMIT $1",
            APPLICATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, PreApprovalApplication>(&sql)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn set_application_status(
        &self,
        admin: &AuthenticatedAdmin,
        id: Uuid,
        status: ApplicationStatus,
    ) -> AppResult<bool> {
        let mut tx = self.admin_tx(admin).await?;
        let result = sqlx::query("UPDATE pre_approval_applications SET status = $1 WHERE id = $2")
            .bind(status.as_ref())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AdminRepository for PgStore {
    async fn find_admin_by_email(&self, email: &str) -> AppResult<Option<AdminUser>> {
        let admin = sqlx::query_as::<_, AdminUser>(
            "SELECT id, email, password_hash FROM admin_users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }
}
