use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Course catalog entry (`courses` collection). Only the fields this service
/// reads - the catalog is owned by the course platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub title: String,
}
