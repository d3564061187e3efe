use async_trait::async_trait;
use mongodb::bson::DateTime as BsonDateTime;

use crate::{database, models::Notification, utils::error::AppError};

/// Template key for the welcome message sent after signup.
pub const TEMPLATE_WELCOME: &str = "messageWelcome";
/// Template key for the profile-updated message.
pub const TEMPLATE_PROFILE_UPDATED: &str = "messageProfileUpdated";

const NOTIFICATIONS: &str = "notifications";

/// Notification collaborator seam. The webhook handler only depends on this
/// trait, so tests can swap in a recording double.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, subject_id: &str, template_key: &str) -> Result<(), AppError>;
}

/// Stores notifications in MongoDB for the frontend to render.
pub struct MongoNotificationSender;

#[async_trait]
impl NotificationSender for MongoNotificationSender {
    async fn send(&self, subject_id: &str, template_key: &str) -> Result<(), AppError> {
        let db = database::get().await?;
        let collection = db.collection::<Notification>(NOTIFICATIONS);

        let notification = Notification {
            id: None,
            subject_id: subject_id.to_string(),
            template_key: template_key.to_string(),
            read: false,
            created_at: Some(BsonDateTime::now()),
        };

        collection.insert_one(&notification).await.map_err(|e| {
            log::error!("Error in send_notification: {}", e);
            AppError::DatabaseError("Error sending notification. Please try again.".to_string())
        })?;

        log::info!("🔔 Notification queued: {} -> {}", template_key, subject_id);

        Ok(())
    }
}
