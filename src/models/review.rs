use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// Course review (stored in MongoDB, `reviews` collection).
///
/// Read-only in this service - reviews are written by the course platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// ObjectId of the reviewing user
    pub user: ObjectId,

    /// ObjectId of the reviewed course
    pub course: ObjectId,

    pub rating: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    pub created_at: Option<BsonDateTime>,
}

/// Who wrote the review, joined from the `users` collection.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ReviewAuthor {
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// What the review is about, joined from the `courses` collection.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ReviewCourse {
    pub title: String,
}

/// Review with its user and course references resolved for display.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ReviewWithRefs {
    pub id: String,
    pub rating: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub user: ReviewAuthor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<ReviewCourse>,
    pub created_at: Option<i64>,
}
