// ==================== USER DIRECTORY ====================
// Thin data-access layer over the `users` collection, plus read joins into
// `reviews` and `courses`. Keyed by the identity-provider subject id.

use crate::{
    database,
    models::{Course, PublicProfile, Review, ReviewAuthor, ReviewCourse, ReviewWithRefs, RoleInfo, User, UserRole},
    utils::cache,
    utils::error::AppError,
};
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use mongodb::options::ReturnDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

const USERS: &str = "users";
const REVIEWS: &str = "reviews";
const COURSES: &str = "courses";

// ==================== REQUEST/RESPONSE MODELS ====================

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    pub subject_id: String,
    pub email: String,
    pub full_name: String,
    pub picture: Option<String>,
}

/// Patch update - only supplied fields are touched.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub picture: Option<String>,
    pub role: Option<UserRole>,
    pub is_admin: Option<bool>,
    pub approved_instructor: Option<bool>,
}

/// Full directory record as exposed to admin tooling.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserRecord {
    pub subject_id: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub role: UserRole,
    pub is_admin: bool,
    pub approved_instructor: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl From<User> for UserRecord {
    fn from(user: User) -> Self {
        UserRecord {
            subject_id: user.subject_id,
            email: user.email,
            full_name: user.full_name,
            picture: user.picture,
            role: user.role,
            is_admin: user.is_admin,
            approved_instructor: user.approved_instructor,
            created_at: user.created_at.map(|d| d.timestamp_millis()),
            updated_at: user.updated_at.map(|d| d.timestamp_millis()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InstructorFilter {
    /// Instructors that passed manual approval (public listing)
    Approved,
    /// Everyone with the instructor role, approved or not (admin panel)
    Role,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct InstructorQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub filter: Option<InstructorFilter>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct InstructorPage {
    pub instructors: Vec<UserRecord>,
    pub is_next: bool,
    pub total: u64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReviewsResponse {
    pub reviews: Vec<ReviewWithRefs>,
    pub count: usize,
}

// ==================== REQUEST-SCOPED MEMO ====================

/// Read-through memo for user lookups within one request. Created by the
/// handler, dropped with the request - no invalidation needed.
#[derive(Default)]
pub struct RequestScope {
    users: RwLock<HashMap<String, User>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, subject_id: &str) -> Option<User> {
        self.users.read().ok()?.get(subject_id).cloned()
    }

    fn put(&self, user: &User) {
        if let Ok(mut users) = self.users.write() {
            users.insert(user.subject_id.clone(), user.clone());
        }
    }
}

// ==================== SERVICE FUNCTIONS ====================

/// Create-or-update by subject id. Idempotent: re-delivery of the same
/// payload updates the existing record instead of inserting a duplicate.
pub async fn upsert_by_subject_id(request: CreateUserRequest) -> Result<User, AppError> {
    let db = database::get().await?;
    let collection = db.collection::<User>(USERS);

    let existing = collection
        .find_one(doc! { "subject_id": &request.subject_id })
        .await
        .map_err(|e| {
            log::error!("Error in upsert_by_subject_id: {}", e);
            AppError::DatabaseError("Error creating user. Please try again.".to_string())
        })?;

    let now = BsonDateTime::now();

    if existing.is_some() {
        let updated = collection
            .find_one_and_update(
                doc! { "subject_id": &request.subject_id },
                doc! { "$set": {
                    "email": &request.email,
                    "full_name": &request.full_name,
                    "picture": &request.picture,
                    "updated_at": now,
                } },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| {
                log::error!("Error in upsert_by_subject_id: {}", e);
                AppError::DatabaseError("Error creating user. Please try again.".to_string())
            })?;

        return updated.ok_or_else(|| {
            AppError::DatabaseError("Error creating user. Please try again.".to_string())
        });
    }

    let mut new_user = User {
        id: None,
        subject_id: request.subject_id,
        email: request.email,
        full_name: request.full_name,
        picture: request.picture,
        role: UserRole::default(),
        is_admin: false,
        approved_instructor: false,
        created_at: Some(now),
        updated_at: Some(now),
    };

    let result = collection.insert_one(&new_user).await.map_err(|e| {
        log::error!("Error in upsert_by_subject_id: {}", e);
        AppError::DatabaseError("Error creating user. Please try again.".to_string())
    })?;

    new_user.id = result.inserted_id.as_object_id();

    log::info!("✅ User created: {}", new_user.subject_id);

    Ok(new_user)
}

/// Patch-update by subject id; unspecified fields stay untouched. When a
/// logical view `path` is supplied, its cached rendering is invalidated.
pub async fn update_by_subject_id(
    subject_id: &str,
    update: UpdateUserRequest,
    path: Option<&str>,
) -> Result<User, AppError> {
    let db = database::get().await?;
    let collection = db.collection::<User>(USERS);

    let mut set = Document::new();
    if let Some(email) = update.email {
        set.insert("email", email);
    }
    if let Some(full_name) = update.full_name {
        set.insert("full_name", full_name);
    }
    if let Some(picture) = update.picture {
        set.insert("picture", picture);
    }
    if let Some(role) = update.role {
        let role = mongodb::bson::to_bson(&role).map_err(|e| {
            log::error!("Error in update_by_subject_id: {}", e);
            AppError::DatabaseError("Error updating user. Please try again.".to_string())
        })?;
        set.insert("role", role);
    }
    if let Some(is_admin) = update.is_admin {
        set.insert("is_admin", is_admin);
    }
    if let Some(approved) = update.approved_instructor {
        set.insert("approved_instructor", approved);
    }

    if set.is_empty() {
        return Err(AppError::InvalidRequest("No fields to update".to_string()));
    }

    set.insert("updated_at", BsonDateTime::now());

    let updated = collection
        .find_one_and_update(doc! { "subject_id": subject_id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await
        .map_err(|e| {
            log::error!("Error in update_by_subject_id: {}", e);
            AppError::DatabaseError("Error updating user. Please try again.".to_string())
        })?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", subject_id)))?;

    if let Some(path) = path {
        cache::invalidate_path(path);
    }

    Ok(updated)
}

/// Point lookup by subject id, memoized in the request scope.
pub async fn get_by_subject_id(
    scope: &RequestScope,
    subject_id: &str,
) -> Result<Option<User>, AppError> {
    if let Some(user) = scope.get(subject_id) {
        return Ok(Some(user));
    }

    let db = database::get().await?;
    let collection = db.collection::<User>(USERS);

    let user = collection
        .find_one(doc! { "subject_id": subject_id })
        .await
        .map_err(|e| {
            log::error!("Error in get_by_subject_id: {}", e);
            AppError::DatabaseError("Error fetching user. Please try again.".to_string())
        })?;

    if let Some(ref user) = user {
        scope.put(user);
    }

    Ok(user)
}

/// Reduced public projection. Absence is `Ok(None)`, never an error -
/// callers branch instead of catching.
pub async fn get_public_profile(subject_id: &str) -> Result<Option<PublicProfile>, AppError> {
    let db = database::get().await?;
    let collection = db.collection::<User>(USERS);

    let user = collection
        .find_one(doc! { "subject_id": subject_id })
        .await
        .map_err(|e| {
            log::error!("Error in get_public_profile: {}", e);
            AppError::DatabaseError("Error fetching user. Please try again.".to_string())
        })?;

    Ok(user.map(PublicProfile::from))
}

/// All reviews written by a user, newest first, joined with the reviewer's
/// name/picture and each course title.
pub async fn list_reviews_for_user(
    scope: &RequestScope,
    subject_id: &str,
) -> Result<Vec<ReviewWithRefs>, AppError> {
    let user = get_by_subject_id(scope, subject_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", subject_id)))?;

    let user_id = user.id.ok_or_else(|| {
        AppError::DatabaseError("Error getting user reviews".to_string())
    })?;

    let db = database::get().await?;
    let reviews_collection = db.collection::<Review>(REVIEWS);

    let options = mongodb::options::FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = reviews_collection
        .find(doc! { "user": user_id })
        .with_options(options)
        .await
        .map_err(|e| {
            log::error!("Error in list_reviews_for_user: {}", e);
            AppError::DatabaseError("Error getting user reviews".to_string())
        })?;

    let mut reviews = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(review) => reviews.push(review),
            Err(e) => log::error!("Error reading review: {}", e),
        }
    }

    // Resolve course titles in one query
    let course_ids: Vec<ObjectId> = reviews.iter().map(|r| r.course).collect();
    let courses = fetch_course_titles(&course_ids).await?;

    let joined = reviews
        .into_iter()
        .map(|review| ReviewWithRefs {
            id: review.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            rating: review.rating,
            summary: review.summary,
            user: ReviewAuthor {
                full_name: user.full_name.clone(),
                picture: user.picture.clone(),
            },
            course: courses
                .get(&review.course)
                .map(|title| ReviewCourse { title: title.clone() }),
            created_at: review.created_at.map(|d| d.timestamp_millis()),
        })
        .collect();

    Ok(joined)
}

async fn fetch_course_titles(ids: &[ObjectId]) -> Result<HashMap<ObjectId, String>, AppError> {
    let mut titles = HashMap::new();
    if ids.is_empty() {
        return Ok(titles);
    }

    let db = database::get().await?;
    let collection = db.collection::<Course>(COURSES);

    let mut cursor = collection
        .find(doc! { "_id": { "$in": ids } })
        .await
        .map_err(|e| {
            log::error!("Error in fetch_course_titles: {}", e);
            AppError::DatabaseError("Error getting user reviews".to_string())
        })?;

    while let Some(result) = cursor.next().await {
        match result {
            Ok(course) => {
                if let Some(id) = course.id {
                    titles.insert(id, course.title);
                }
            }
            Err(e) => log::error!("Error reading course: {}", e),
        }
    }

    Ok(titles)
}

/// Offset-paginated instructor listing, newest first.
pub async fn list_instructors(query: InstructorQuery) -> Result<InstructorPage, AppError> {
    let db = database::get().await?;
    let collection = db.collection::<User>(USERS);

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(3).max(1);
    let skip = skip_amount(page, page_size);

    let filter = match query.filter.unwrap_or(InstructorFilter::Approved) {
        InstructorFilter::Approved => doc! { "approved_instructor": true },
        InstructorFilter::Role => doc! { "role": "instructor" },
    };

    let options = mongodb::options::FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .skip(skip)
        .limit(page_size as i64)
        .build();

    let mut cursor = collection
        .find(filter.clone())
        .with_options(options)
        .await
        .map_err(|e| {
            log::error!("Error in list_instructors: {}", e);
            AppError::DatabaseError("Error getting instructors".to_string())
        })?;

    let mut instructors = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(user) => instructors.push(UserRecord::from(user)),
            Err(e) => log::error!("Error reading instructor: {}", e),
        }
    }

    let total = collection.count_documents(filter).await.map_err(|e| {
        log::error!("Error in list_instructors: {}", e);
        AppError::DatabaseError("Error getting instructors".to_string())
    })?;

    let is_next = has_next(total, skip, instructors.len());

    Ok(InstructorPage {
        instructors,
        is_next,
        total,
    })
}

/// Role and admin flag for authorization checks.
pub async fn get_role_and_admin_flag(subject_id: &str) -> Result<Option<RoleInfo>, AppError> {
    let db = database::get().await?;
    let collection = db.collection::<User>(USERS);

    let user = collection
        .find_one(doc! { "subject_id": subject_id })
        .await
        .map_err(|e| {
            log::error!("Error in get_role_and_admin_flag: {}", e);
            AppError::DatabaseError("Error getting role".to_string())
        })?;

    Ok(user.map(|u| RoleInfo {
        role: u.role,
        is_admin: u.is_admin,
    }))
}

fn skip_amount(page: u64, page_size: u64) -> u64 {
    (page - 1) * page_size
}

fn has_next(total: u64, skip: u64, fetched: usize) -> bool {
    total > skip + fetched as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_seven_instructors() {
        // 7 instructors, page size 3: page 2 returns 3 with a next page,
        // page 3 returns the final one.
        assert_eq!(skip_amount(2, 3), 3);
        assert!(has_next(7, skip_amount(2, 3), 3));

        assert_eq!(skip_amount(3, 3), 6);
        assert!(!has_next(7, skip_amount(3, 3), 1));
    }

    #[test]
    fn test_pagination_first_page() {
        assert_eq!(skip_amount(1, 3), 0);
        assert!(has_next(7, 0, 3));
        assert!(!has_next(3, 0, 3));
        assert!(!has_next(0, 0, 0));
    }

    #[test]
    fn test_request_scope_memoizes() {
        let scope = RequestScope::new();
        assert!(scope.get("user_1").is_none());

        let user = User {
            id: None,
            subject_id: "user_1".to_string(),
            email: "ada@example.com".to_string(),
            full_name: "Ada Lovelace".to_string(),
            picture: None,
            role: UserRole::Learner,
            is_admin: false,
            approved_instructor: false,
            created_at: None,
            updated_at: None,
        };
        scope.put(&user);

        let cached = scope.get("user_1").expect("memoized user");
        assert_eq!(cached.email, "ada@example.com");
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_upsert_is_idempotent() {
        dotenv::dotenv().ok();

        let subject_id = format!("user_{}", uuid::Uuid::new_v4().simple());
        let request = || CreateUserRequest {
            subject_id: subject_id.clone(),
            email: "ada@example.com".to_string(),
            full_name: "Ada Lovelace".to_string(),
            picture: None,
        };

        let first = upsert_by_subject_id(request()).await.unwrap();
        let second = upsert_by_subject_id(request()).await.unwrap();
        assert_eq!(first.id, second.id);

        let db = database::get().await.unwrap();
        let count = db
            .collection::<User>(USERS)
            .count_documents(doc! { "subject_id": &subject_id })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_public_profile_of_unknown_user_is_none() {
        dotenv::dotenv().ok();

        let profile = get_public_profile("user_does_not_exist").await.unwrap();
        assert!(profile.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_update_unknown_user_is_not_found() {
        dotenv::dotenv().ok();

        let update = UpdateUserRequest {
            full_name: Some("Nobody".to_string()),
            ..Default::default()
        };
        let result = update_by_subject_id("user_does_not_exist", update, None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result =
            update_by_subject_id("user_does_not_exist", UpdateUserRequest::default(), None).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }
}
