use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// In-app notification (stored in MongoDB, `notifications` collection).
///
/// `template_key` names the message template the frontend renders; this
/// service never expands templates itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Subject id of the receiving user
    pub subject_id: String,

    pub template_key: String,

    #[serde(default)]
    pub read: bool,

    pub created_at: Option<BsonDateTime>,
}
