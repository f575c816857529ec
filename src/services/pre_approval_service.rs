use std::sync::Arc;

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::json;
use tera::Context;

use crate::error::{AppError, AppResult};
use crate::mailer::Notifier;
use crate::models::{ApplicationDetails, NewPreApprovalApplication, PreApprovalApplication};
use crate::repository::PreApprovalRepository;
use crate::services::pdf_export::group_thousands;

/// `PRE-<7 uppercase alphanumerics>-<last 6 digits of unix millis>`.
///
/// Not checked for collisions; the reference is a display handle, the row id
/// is the key.
pub fn generate_reference_number() -> String {
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    let millis = Utc::now().timestamp_millis().rem_euclid(1_000_000);
    format!("PRE-{}-{:06}", random, millis)
}

fn validate(details: &ApplicationDetails) -> AppResult<()> {
    let required = [
        ("first_name", &details.first_name),
        ("last_name", &details.last_name),
        ("email", &details.email),
        ("phone", &details.phone),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

#[derive(Clone)]
pub struct PreApprovalService {
    applications: Arc<dyn PreApprovalRepository>,
    notifier: Notifier,
}

impl PreApprovalService {
    pub fn new(applications: Arc<dyn PreApprovalRepository>, notifier: Notifier) -> Self {
        Self {
            applications,
            notifier,
        }
    }

    pub async fn submit(&self, details: ApplicationDetails) -> AppResult<PreApprovalApplication> {
        validate(&details)?;

        let application = NewPreApprovalApplication {
            reference_number: generate_reference_number(),
            details,
        };
        let saved = self.applications.insert_application(application).await?;
        tracing::info!(
            "Pre-approval application saved: id={}, reference={}",
            saved.id,
            saved.reference_number
        );

        self.notifier
            .notify_inbox(
                format!("New pre-approval application {}", saved.reference_number),
                "email_pre_approval.html",
                &application_email_context(&saved),
                saved.details.email.clone(),
            )
            .await;
        Ok(saved)
    }
}

/// Summary for the inbox. The SSN is never part of it.
fn application_email_context(application: &PreApprovalApplication) -> Context {
    let d = &application.details;
    let money = |v: Option<f64>| {
        v.map(|v| format!("${}", group_thousands(v.round() as i64)))
            .unwrap_or_else(|| "-".into())
    };
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    let employment = [&d.employment_status, &d.employer_name]
        .into_iter()
        .flatten()
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    let vehicle = d.vehicle_name.as_ref().map(|name| {
        json!({
            "name": name,
            "price": money(d.vehicle_price),
            "vin": text(&d.vehicle_vin),
        })
    });

    let mut context = Context::new();
    context.insert("reference", &application.reference_number);
    context.insert("applicant", &d.full_name());
    context.insert("email", &text(&d.email));
    context.insert("phone", &text(&d.phone));
    context.insert("employment", if employment.is_empty() { "-" } else { employment.as_str() });
    context.insert("monthly_income", &money(d.monthly_income));
    context.insert("down_payment", &money(d.down_payment));
    context.insert("vehicle", &vehicle);
    context
}
