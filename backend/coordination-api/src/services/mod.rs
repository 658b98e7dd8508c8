use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::services::notification_service::{LogNotifier, NotificationTransport, WebhookNotifier};
use crate::store::{CoordinationStore, MemoryStore, MongoStore};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn CoordinationStore>,
    pub notifier: Arc<dyn NotificationTransport>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn CoordinationStore> = match config.store_backend {
            StoreBackend::Mongo => {
                tracing::info!("Connecting to MongoDB...");
                let client = mongodb::Client::with_uri_str(&config.mongo_uri).await?;
                let db = client.database(&config.mongo_database);

                // Fail fast on an unreachable deployment instead of at the
                // first request.
                tokio::time::timeout(
                    std::time::Duration::from_secs(10),
                    db.run_command(mongodb::bson::doc! { "ping": 1 }),
                )
                .await
                .map_err(|_| anyhow::anyhow!("MongoDB ping timeout after 10s"))??;

                tracing::info!("MongoDB connection established");
                Arc::new(MongoStore::new(db))
            }
            StoreBackend::Memory => {
                tracing::info!("Using in-memory store backend");
                Arc::new(MemoryStore::new())
            }
        };

        let notifier: Arc<dyn NotificationTransport> = match &config.notifier_webhook_url {
            Some(url) => {
                tracing::info!("Notification transport: webhook ({})", url);
                Arc::new(WebhookNotifier::new(url.clone()))
            }
            None => {
                tracing::info!("Notification transport: log only");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self {
            config,
            store,
            notifier,
        })
    }
}

pub mod announcement_service;
pub mod notification_service;
pub mod registry_service;
pub mod request_service;
pub mod subscription_service;
