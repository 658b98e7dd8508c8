use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::metrics::NOTIFICATIONS_TOTAL;
use crate::models::{CourseRequest, RequestNotification};

/// Delivery transport for per-lecturer request notifications. Best-effort:
/// a failed delivery is logged and counted, never propagated.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn deliver(&self, notification: &RequestNotification) -> anyhow::Result<()>;
}

/// Default transport: structured log entry per recipient.
pub struct LogNotifier;

#[async_trait]
impl NotificationTransport for LogNotifier {
    async fn deliver(&self, notification: &RequestNotification) -> anyhow::Result<()> {
        tracing::info!(
            request_id = %notification.request_id,
            lecturer_id = %notification.lecturer_id,
            course_code = %notification.course_code,
            title = %notification.title,
            "Notification: new {} request",
            notification.request_type.as_str()
        );
        Ok(())
    }
}

/// POSTs each notification event to a configured webhook endpoint.
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl NotificationTransport for WebhookNotifier {
    async fn deliver(&self, notification: &RequestNotification) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .timeout(Duration::from_secs(5))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("webhook returned {}", response.status());
        }
        Ok(())
    }
}

/// Fans a newly created request out to its target lecturers on a background
/// task. One failing recipient does not affect the others, and nothing here
/// can roll back the already-committed request.
pub fn dispatch_request_notifications(
    notifier: Arc<dyn NotificationTransport>,
    request: &CourseRequest,
) {
    let events: Vec<RequestNotification> = request
        .target_lecturer_ids
        .iter()
        .map(|lecturer_id| RequestNotification {
            request_id: request.id.clone(),
            lecturer_id: lecturer_id.clone(),
            request_type: request.request_type,
            course_code: request.course_code.clone(),
            title: request.title.clone(),
            requested_by_name: request.requested_by_name.clone(),
            priority: request.priority,
        })
        .collect();

    tokio::spawn(async move {
        for event in events {
            match notifier.deliver(&event).await {
                Ok(()) => {
                    NOTIFICATIONS_TOTAL.with_label_values(&["delivered"]).inc();
                }
                Err(err) => {
                    NOTIFICATIONS_TOTAL.with_label_values(&["failed"]).inc();
                    tracing::warn!(
                        request_id = %event.request_id,
                        lecturer_id = %event.lecturer_id,
                        "Notification delivery failed: {:#}",
                        err
                    );
                }
            }
        }
    });
}
