use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tera::Context;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::mailer::Notifier;
use crate::models::{CarSnapshot, Enquiry, NewEnquiry};
use crate::repository::{CarRepository, EnquiryRepository};
use crate::services::coerce::non_empty;
use crate::services::pdf_export::group_thousands;

/// Loose shape check only; deliverability is the mail provider's problem.
pub static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Fields posted by the inquiry and contact forms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnquiryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub message: String,
}

impl EnquiryForm {
    fn validate(self) -> AppResult<NewEnquiry> {
        let name = non_empty(Some(self.name.as_str()))
            .ok_or_else(|| AppError::Validation("name is required".to_string()))?;
        let email = non_empty(Some(self.email.as_str()))
            .ok_or_else(|| AppError::Validation("email is required".to_string()))?;
        if !RE_EMAIL.is_match(&email) {
            return Err(AppError::Validation("email is not valid".to_string()));
        }
        let message = non_empty(Some(self.message.as_str()))
            .ok_or_else(|| AppError::Validation("message is required".to_string()))?;

        Ok(NewEnquiry {
            name,
            email,
            phone_number: non_empty(Some(self.phone_number.as_str())),
            message,
            car_id: None,
            snapshot: CarSnapshot::default(),
        })
    }
}

#[derive(Clone)]
pub struct EnquiryService {
    enquiries: Arc<dyn EnquiryRepository>,
    cars: Arc<dyn CarRepository>,
    notifier: Notifier,
}

impl EnquiryService {
    pub fn new(
        enquiries: Arc<dyn EnquiryRepository>,
        cars: Arc<dyn CarRepository>,
        notifier: Notifier,
    ) -> Self {
        Self {
            enquiries,
            cars,
            notifier,
        }
    }

    /// Enquiry about one car. The car's current attributes are copied into
    /// the row so it stays meaningful after the car is edited or deleted.
    pub async fn submit_inquiry(&self, car_id: Uuid, form: EnquiryForm) -> AppResult<Enquiry> {
        let mut enquiry = form.validate()?;
        enquiry.car_id = Some(car_id);

        match self.cars.find(car_id).await {
            Ok(Some(car)) => enquiry.snapshot = CarSnapshot::from(&car),
            Ok(None) => tracing::warn!("Enquiry for unknown car: car_id={}", car_id),
            Err(e) => tracing::error!("Car lookup for enquiry failed: car_id={}, error={}", car_id, e),
        }

        let saved = self.enquiries.insert_enquiry(enquiry).await?;
        tracing::info!("Enquiry saved: id={}, car_id={}", saved.id, car_id);

        let subject = match &saved.car_name_at_inquiry {
            Some(car_name) => format!("New inquiry: {}", car_name),
            None => "New vehicle inquiry".to_string(),
        };
        self.notifier
            .notify_inbox(
                subject,
                "email_enquiry.html",
                &enquiry_email_context(&saved),
                Some(saved.email.clone()),
            )
            .await;
        Ok(saved)
    }

    /// General contact form message, not tied to a car.
    pub async fn submit_contact(&self, form: EnquiryForm) -> AppResult<Enquiry> {
        let enquiry = form.validate()?;
        let saved = self.enquiries.insert_enquiry(enquiry).await?;
        tracing::info!("Contact message saved: id={}", saved.id);

        self.notifier
            .notify_inbox(
                format!("Contact form: {}", saved.name),
                "email_enquiry.html",
                &enquiry_email_context(&saved),
                Some(saved.email.clone()),
            )
            .await;
        Ok(saved)
    }
}

fn enquiry_email_context(enquiry: &Enquiry) -> Context {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let vehicle = enquiry.car_name_at_inquiry.as_ref().map(|name| {
        json!({
            "name": name,
            "vin": or_dash(&enquiry.car_vin_at_inquiry),
            "stock": or_dash(&enquiry.car_custom_id_at_inquiry),
            "price": enquiry
                .car_price_at_inquiry
                .map(|p| format!("${}", group_thousands(p.round() as i64)))
                .unwrap_or_else(|| "Call for price".to_string()),
        })
    });

    let mut context = Context::new();
    context.insert("name", &enquiry.name);
    context.insert("email", &enquiry.email);
    context.insert("phone", &or_dash(&enquiry.phone_number));
    context.insert("message_lines", &enquiry.message.lines().collect::<Vec<_>>());
    context.insert("vehicle", &vehicle);
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::tests::{notifier, RecordingMailer};
    use crate::middleware::AuthenticatedAdmin;
    use crate::repository::memory::{sample_car, MemoryStore};

    fn service(store: &Arc<MemoryStore>, mailer: Arc<RecordingMailer>) -> EnquiryService {
        EnquiryService::new(
            store.clone(),
            store.clone(),
            notifier(mailer),
        )
    }

    fn form(name: &str) -> EnquiryForm {
        EnquiryForm {
            name: name.into(),
            email: "buyer@example.com".into(),
            phone_number: " ".into(),
            message: "Is it still available?".into(),
        }
    }

    #[tokio::test]
    async fn test_inquiry_snapshots_car_and_notifies_inbox() {
        let store = Arc::new(MemoryStore::new());
        let mut car = sample_car("Subaru", "Outback", 2019);
        car.custom_id = Some("STK-9".into());
        let car_id = car.id;
        store.put_car(car).await;
        let mailer = Arc::new(RecordingMailer::default());

        let saved = service(&store, mailer.clone())
            .submit_inquiry(car_id, form("Dana"))
            .await
            .unwrap();

        assert_eq!(saved.car_id, Some(car_id));
        assert_eq!(saved.car_name_at_inquiry.as_deref(), Some("2019 Subaru Outback"));
        assert_eq!(saved.car_custom_id_at_inquiry.as_deref(), Some("STK-9"));
        assert_eq!(saved.phone_number, None);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["sales@example.com".to_string()]);
        assert_eq!(sent[0].reply_to.as_deref(), Some("buyer@example.com"));
        assert!(sent[0].html.contains("STK-9"));
    }

    #[tokio::test]
    async fn test_contact_email_escapes_markup_and_keeps_line_breaks() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let mut message = form("<script>alert(1)</script>");
        message.message = "Line one & more\nLine <two>".into();

        service(&store, mailer.clone()).submit_contact(message).await.unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let html = &sent[0].html;
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Line one &amp; more<br>Line &lt;two&gt;"));
        assert!(html.contains("<strong>Phone:</strong> -"));
        assert!(!html.contains("Vehicle"));
    }

    #[tokio::test]
    async fn test_missing_name_is_rejected_without_insert() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());

        let err = service(&store, mailer.clone())
            .submit_inquiry(Uuid::new_v4(), form("   "))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref m) if m == "name is required"));
        assert!(store.enquiries().await.is_empty());
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_email_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut bad = form("Dana");
        bad.email = "dana-at-example".into();
        let err = service(&store, Arc::new(RecordingMailer::default()))
            .submit_contact(bad)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.enquiries().await.is_empty());
    }

    #[tokio::test]
    async fn test_mail_failure_keeps_the_enquiry() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });

        let saved = service(&store, mailer).submit_contact(form("Dana")).await.unwrap();

        assert_eq!(saved.car_id, None);
        assert_eq!(store.enquiries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_car_leaves_enquiry_snapshot_intact() {
        let store = Arc::new(MemoryStore::new());
        let car = sample_car("Volvo", "XC60", 2020);
        let car_id = car.id;
        store.put_car(car).await;
        service(&store, Arc::new(RecordingMailer::default()))
            .submit_inquiry(car_id, form("Dana"))
            .await
            .unwrap();

        let admin = AuthenticatedAdmin {
            admin_id: Uuid::new_v4(),
            email: "admin@example.com".into(),
        };
        assert!(store.delete_car(&admin, car_id).await.unwrap());

        let enquiries = store.enquiries().await;
        assert_eq!(enquiries.len(), 1);
        assert_eq!(enquiries[0].car_id, Some(car_id));
        assert_eq!(enquiries[0].car_name_at_inquiry.as_deref(), Some("2020 Volvo XC60"));
    }

    #[tokio::test]
    async fn test_inquiry_for_unknown_car_is_still_saved() {
        let store = Arc::new(MemoryStore::new());
        let saved = service(&store, Arc::new(RecordingMailer::default()))
            .submit_inquiry(Uuid::new_v4(), form("Dana"))
            .await
            .unwrap();
        assert_eq!(saved.car_name_at_inquiry, None);
    }
}
