use crate::config::MongoConfig;
use crate::models::{Device, DEVICE_TTL};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::{ClientOptions, FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

pub const DEVICES_COLLECTION: &str = "devices";

/// Persistence for device records.
///
/// Implementations must keep at most one record per code and must never
/// return a record from `find_by_code` once it is older than [`DEVICE_TTL`].
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Inserts a record for `code`, or replaces the token of the existing one.
    async fn upsert(&self, code: &str, push_token: &str) -> Result<Device, AppError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Device>, AppError>;
    async fn list_all(&self) -> Result<Vec<Device>, AppError>;
    /// Removing an absent code is not an error.
    async fn delete_by_code(&self, code: &str) -> Result<(), AppError>;
    async fn health_check(&self) -> Result<(), AppError>;
}

/// MongoDB-backed store.
///
/// The driver client is a connection pool shared by every clone; indexes are
/// created once, on first use.
#[derive(Clone)]
pub struct MongoDeviceStore {
    client: MongoClient,
    db: Database,
    indexes: Arc<OnceCell<()>>,
}

impl MongoDeviceStore {
    pub async fn connect(config: &MongoConfig) -> Result<Self, AppError> {
        tracing::info!(database = %config.database, "Configuring MongoDB client");
        let mut options = ClientOptions::parse(&config.uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::from(e)
        })?;
        options.app_name = Some("relay-service".to_string());
        options.server_selection_timeout = Some(Duration::from_secs(config.timeout_secs));

        let client = MongoClient::with_options(options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(&config.database);

        Ok(Self {
            client,
            db,
            indexes: Arc::new(OnceCell::new()),
        })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for relay-service");

        let devices = self.db.collection::<Device>(DEVICES_COLLECTION);

        let code_index = IndexModel::builder()
            .keys(doc! { "code": 1 })
            .options(
                IndexOptions::builder()
                    .name("code_1".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        devices.create_index(code_index, None).await.map_err(|e| {
            tracing::error!("Failed to create code index: {}", e);
            AppError::from(e)
        })?;

        let ttl_index = IndexModel::builder()
            .keys(doc! { "createdAt": 1 })
            .options(
                IndexOptions::builder()
                    .name("createdAt_1".to_string())
                    .expire_after(DEVICE_TTL)
                    .build(),
            )
            .build();

        devices.create_index(ttl_index, None).await.map_err(|e| {
            tracing::error!("Failed to create createdAt TTL index: {}", e);
            AppError::from(e)
        })?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    /// Records created at or before this instant are expired.
    fn stale_cutoff() -> Result<BsonDateTime, AppError> {
        chrono::Duration::from_std(DEVICE_TTL)
            .map(|ttl| BsonDateTime::from_chrono(Utc::now() - ttl))
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))
    }

    async fn devices(&self) -> Result<Collection<Device>, AppError> {
        self.indexes
            .get_or_try_init(|| self.initialize_indexes())
            .await?;
        Ok(self.db.collection(DEVICES_COLLECTION))
    }
}

#[async_trait]
impl DeviceStore for MongoDeviceStore {
    async fn upsert(&self, code: &str, push_token: &str) -> Result<Device, AppError> {
        let devices = self.devices().await?;
        let cutoff = Self::stale_cutoff()?;

        // An expired record the TTL monitor has not swept yet counts as absent.
        devices
            .delete_one(doc! { "code": code, "createdAt": { "$lte": cutoff } }, None)
            .await
            .map_err(|e| {
                tracing::error!(code = %code, "Failed to clear expired device: {}", e);
                AppError::from(e)
            })?;

        let now = BsonDateTime::from_chrono(Utc::now());
        let update = doc! {
            "$set": { "fcmToken": push_token },
            "$setOnInsert": { "createdAt": now },
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        devices
            .find_one_and_update(doc! { "code": code }, update, options)
            .await
            .map_err(|e| {
                tracing::error!(code = %code, "Failed to upsert device: {}", e);
                AppError::from(e)
            })?
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!("upsert returned no document for {}", code))
            })
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Device>, AppError> {
        // The TTL monitor only runs periodically; filter stale records here too.
        let cutoff = Self::stale_cutoff()?;

        self.devices()
            .await?
            .find_one(doc! { "code": code, "createdAt": { "$gt": cutoff } }, None)
            .await
            .map_err(|e| {
                tracing::error!(code = %code, "Failed to find device: {}", e);
                AppError::from(e)
            })
    }

    async fn list_all(&self) -> Result<Vec<Device>, AppError> {
        let cursor = self
            .devices()
            .await?
            .find(doc! {}, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list devices: {}", e);
                AppError::from(e)
            })?;

        cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to collect devices: {}", e);
            AppError::from(e)
        })
    }

    async fn delete_by_code(&self, code: &str) -> Result<(), AppError> {
        self.devices()
            .await?
            .delete_one(doc! { "code": code }, None)
            .await
            .map_err(|e| {
                tracing::error!(code = %code, "Failed to delete device: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}
