//! State-change notification delivery.
//!
//! Notifications are best-effort: they are sent after the local write has
//! committed, and a delivery failure is logged without undoing anything.
//! Services call [`notify`], which never fails.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::notification::{Notification, NotificationPayload},
    services::signing,
};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes state-change notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, notification: Notification) -> Result<(), AppError>;
}

/// Publish and swallow any failure.
pub async fn notify(notifier: &dyn Notifier, notification: Notification) {
    let event_type = notification.event_type();
    if let Err(err) = notifier.publish(notification).await {
        tracing::error!(event_type, error = %err, "Failed to publish notification");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Invalid notification URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Sends each notification as a signed JSON POST.
///
/// # Headers Sent
///
/// - `Content-Type: application/json`
/// - `X-Signature: sha256=<hex hmac of the body>`
/// - `X-Event-Id: <uuid>`
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
    secret: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, secret: impl Into<String>) -> Result<Self, NotifierError> {
        let url = validate_notification_url(url)?;
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url,
            secret: secret.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn publish(&self, notification: Notification) -> Result<(), AppError> {
        let event_id = Uuid::new_v4();
        let payload = NotificationPayload::new(event_id, notification);
        let body = serde_json::to_string(&payload)
            .map_err(|e| AppError::Internal(format!("Failed to serialize notification: {e}")))?;
        let signature = signing::sign(self.secret.as_bytes(), body.as_bytes())?;

        let response = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "application/json")
            .header("X-Signature", format!("sha256={signature}"))
            .header("X-Event-Id", event_id.to_string())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%event_id, error = %e, "Notification request failed");
                AppError::ServiceUnavailable
            })?;

        if !response.status().is_success() {
            tracing::warn!(
                %event_id,
                status = response.status().as_u16(),
                "Notification endpoint rejected event"
            );
            return Err(AppError::ServiceUnavailable);
        }

        tracing::debug!(%event_id, event_type = %payload.event_type, "Notification delivered");
        Ok(())
    }
}

/// Used when no notification endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, notification: Notification) -> Result<(), AppError> {
        tracing::info!(event_type = notification.event_type(), "Notification published");
        Ok(())
    }
}

/// Validate the notification endpoint.
///
/// # Rules
///
/// - Must be valid URL
/// - Must be HTTPS (HTTP localhost allowed for development)
/// - Maximum 2048 characters
fn validate_notification_url(url: &str) -> Result<Url, NotifierError> {
    if url.len() > 2048 {
        return Err(NotifierError::InvalidUrl(
            "URL exceeds 2048 characters".to_string(),
        ));
    }

    let parsed =
        Url::parse(url).map_err(|_| NotifierError::InvalidUrl("Invalid URL format".to_string()))?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" => {
            if matches!(parsed.host_str(), Some("localhost" | "127.0.0.1" | "0.0.0.0")) {
                Ok(parsed)
            } else {
                Err(NotifierError::InvalidUrl(
                    "HTTP is only allowed for localhost. Use HTTPS for production.".to_string(),
                ))
            }
        }
        _ => Err(NotifierError::InvalidUrl(
            "URL must use HTTP or HTTPS".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::https("https://hooks.example.com/events", true)]
    #[case::localhost("http://localhost:8080/events", true)]
    #[case::loopback("http://127.0.0.1:9000/", true)]
    #[case::plain_http("http://hooks.example.com/events", false)]
    #[case::ftp("ftp://hooks.example.com", false)]
    #[case::garbage("not a url", false)]
    fn test_notification_url_rules(#[case] url: &str, #[case] valid: bool) {
        assert_eq!(validate_notification_url(url).is_ok(), valid);
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn publish(&self, _notification: Notification) -> Result<(), AppError> {
            Err(AppError::ServiceUnavailable)
        }
    }

    #[tokio::test]
    async fn test_notify_swallows_failures() {
        notify(&FailingNotifier, Notification::roles_changed(vec![Uuid::new_v4()])).await;
        notify(&LogNotifier, Notification::roles_changed(Vec::new())).await;
    }
}
