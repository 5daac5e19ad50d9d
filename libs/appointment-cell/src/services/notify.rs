// libs/appointment-cell/src/services/notify.rs
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use shared_config::AppConfig;

/// What the doctor's side gets told after a booking commits.
#[derive(Debug, Clone, Serialize)]
pub struct BookingNotice {
    pub doctor_email: String,
    pub doctor_name: String,
    pub patient_name: String,
    pub slot_date: String,
    pub slot_time: String,
}

/// Outbound notification boundary. Delivery is best effort: a failed notice
/// never fails the booking that triggered it.
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn booking_confirmed(&self, notice: &BookingNotice);
}

/// Posts booking notices to the configured webhook (the mail relay lives
/// behind it). With no URL configured the notifier is a disabled no-op.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.booking_notify_url.clone(),
        }
    }
}

#[async_trait]
impl BookingNotifier for WebhookNotifier {
    async fn booking_confirmed(&self, notice: &BookingNotice) {
        let Some(url) = self.url.as_deref() else {
            debug!("Booking notification skipped, no webhook configured");
            return;
        };

        let body = serde_json::json!({
            "event": "booking_confirmed",
            "notice": notice,
        });

        match self.client.post(url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Booking notice delivered for {}", notice.doctor_email);
            }
            Ok(response) => {
                warn!(
                    "Booking notice for {} rejected with status {}",
                    notice.doctor_email,
                    response.status()
                );
            }
            Err(e) => {
                warn!("Booking notice for {} failed: {}", notice.doctor_email, e);
            }
        }
    }
}
