use mongodb::{Client, Collection, Database};
use std::env;
use tokio::sync::OnceCell;

use crate::utils::error::AppError;

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

// Process-wide handle. The first caller connects; everyone after reuses the
// cached handle. A failed first attempt is not cached, so the next request
// connects again.
static MONGO: OnceCell<MongoDB> = OnceCell::const_new();

/// Shared database handle, connecting on first use.
pub async fn get() -> Result<&'static MongoDB, AppError> {
    MONGO
        .get_or_try_init(|| async {
            let url = env::var("MONGODB_URL").map_err(|_| {
                AppError::ConfigurationError("MONGODB_URL must be set".to_string())
            })?;
            let db_name = env::var("MONGODB_DB").unwrap_or_else(|_| "academy".to_string());
            MongoDB::new(&url, &db_name).await
        })
        .await
}

impl MongoDB {
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, AppError> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Invalid MongoDB URI: {}", e)))?;

        // Connection pool tuning
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)
            .map_err(|e| AppError::DatabaseError(format!("Failed to create client: {}", e)))?;

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to MongoDB: {}", e)))?;

        let mongodb = Self { client, db };

        mongodb.ensure_indexes().await?;

        log::info!("✅ MongoDB connected: {}", db_name);

        Ok(mongodb)
    }

    /// Creates the indexes the service relies on.
    ///
    /// The unique index on `users.subject_id` is what makes upsert-by-subject
    /// idempotent under concurrent deliveries of the same event.
    async fn ensure_indexes(&self) -> Result<(), AppError> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let users = self.db.collection::<mongodb::bson::Document>("users");

        let subject_index = IndexModel::builder()
            .keys(doc! { "subject_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(subject_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(subject_id) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Index: users(role, approved_instructor) - instructor listings
        let role_index = IndexModel::builder()
            .keys(doc! { "role": 1, "approved_instructor": 1 })
            .build();

        match users.create_index(role_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(role, approved_instructor)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Index: reviews(user, created_at) - per-user review listings, newest first
        let reviews = self.db.collection::<mongodb::bson::Document>("reviews");

        let reviews_index = IndexModel::builder()
            .keys(doc! { "user": 1, "created_at": -1 })
            .build();

        match reviews.create_index(reviews_index).await {
            Ok(_) => log::info!("   ✅ Index created: reviews(user, created_at)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Index: notifications(subject_id) - per-user notification feed
        let notifications = self.db.collection::<mongodb::bson::Document>("notifications");

        let notifications_index = IndexModel::builder()
            .keys(doc! { "subject_id": 1 })
            .build();

        match notifications.create_index(notifications_index).await {
            Ok(_) => log::info!("   ✅ Index created: notifications(subject_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Check if the connection is healthy
    pub async fn health_check(&self) -> Result<bool, AppError> {
        self.db
            .list_collection_names()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Health check failed: {}", e)))?;
        Ok(true)
    }
}
