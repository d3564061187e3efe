use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::services::user_service::{
    self, CreateUserRequest, InstructorQuery, RequestScope, ReviewsResponse, UpdateUserRequest,
    UserRecord,
};
use crate::utils::error::AppError;

fn error_response(e: &AppError) -> HttpResponse {
    HttpResponse::build(e.status_code()).json(serde_json::json!({
        "success": false,
        "error": e.to_string()
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    /// Logical view path to invalidate after the write
    pub path: Option<String>,
}

/// POST /api/v1/users - direct signup, upsert by subject id
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created or updated", body = UserRecord),
        (status = 500, description = "Store failure")
    )
)]
pub async fn create_user(request: web::Json<CreateUserRequest>) -> impl Responder {
    log::info!("📝 POST /users - subject: {}", request.subject_id);

    match user_service::upsert_by_subject_id(request.into_inner()).await {
        Ok(user) => HttpResponse::Created().json(serde_json::json!({
            "message": "User created",
            "user": UserRecord::from(user)
        })),
        Err(e) => {
            log::error!("❌ Error creating user: {}", e);
            error_response(&e)
        }
    }
}

/// PATCH /api/v1/users/{subject_id} - partial admin edit
#[utoipa::path(
    patch,
    path = "/api/v1/users/{subject_id}",
    tag = "Users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserRecord),
        (status = 404, description = "Unknown subject id")
    )
)]
pub async fn update_user(
    subject_id: web::Path<String>,
    query: web::Query<UpdateQuery>,
    request: web::Json<UpdateUserRequest>,
) -> impl Responder {
    log::info!("🔧 PATCH /users/{}", subject_id);

    match user_service::update_by_subject_id(
        &subject_id,
        request.into_inner(),
        query.path.as_deref(),
    )
    .await
    {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({
            "message": "User updated",
            "user": UserRecord::from(user)
        })),
        Err(e) => {
            log::warn!("❌ Error updating user {}: {}", subject_id, e);
            error_response(&e)
        }
    }
}

/// GET /api/v1/users/{subject_id} - full directory record
#[utoipa::path(
    get,
    path = "/api/v1/users/{subject_id}",
    tag = "Users",
    responses(
        (status = 200, description = "Directory record", body = UserRecord),
        (status = 404, description = "Unknown subject id")
    )
)]
pub async fn get_user(subject_id: web::Path<String>) -> impl Responder {
    log::info!("👤 GET /users/{}", subject_id);

    let scope = RequestScope::new();
    match user_service::get_by_subject_id(&scope, &subject_id).await {
        Ok(Some(user)) => HttpResponse::Ok().json(UserRecord::from(user)),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": format!("User not found: {}", subject_id)
        })),
        Err(e) => {
            log::error!("❌ Error fetching user {}: {}", subject_id, e);
            error_response(&e)
        }
    }
}

/// GET /api/v1/users/{subject_id}/profile - public projection
#[utoipa::path(
    get,
    path = "/api/v1/users/{subject_id}/profile",
    tag = "Users",
    responses(
        (status = 200, description = "Public profile", body = crate::models::PublicProfile),
        (status = 404, description = "Unknown subject id")
    )
)]
pub async fn get_profile(subject_id: web::Path<String>) -> impl Responder {
    log::info!("👤 GET /users/{}/profile", subject_id);

    match user_service::get_public_profile(&subject_id).await {
        Ok(Some(profile)) => HttpResponse::Ok().json(profile),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": format!("User not found: {}", subject_id)
        })),
        Err(e) => {
            log::error!("❌ Error fetching profile {}: {}", subject_id, e);
            error_response(&e)
        }
    }
}

/// GET /api/v1/users/{subject_id}/reviews - reviews by the user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/users/{subject_id}/reviews",
    tag = "Users",
    responses(
        (status = 200, description = "Joined review list", body = ReviewsResponse),
        (status = 404, description = "Unknown subject id")
    )
)]
pub async fn get_reviews(subject_id: web::Path<String>) -> impl Responder {
    log::info!("⭐ GET /users/{}/reviews", subject_id);

    let scope = RequestScope::new();
    match user_service::list_reviews_for_user(&scope, &subject_id).await {
        Ok(reviews) => {
            let count = reviews.len();
            HttpResponse::Ok().json(ReviewsResponse { reviews, count })
        }
        Err(e) => {
            log::error!("❌ Error listing reviews for {}: {}", subject_id, e);
            error_response(&e)
        }
    }
}

/// GET /api/v1/users/{subject_id}/role - role and admin flag
#[utoipa::path(
    get,
    path = "/api/v1/users/{subject_id}/role",
    tag = "Users",
    responses(
        (status = 200, description = "Role info", body = crate::models::RoleInfo),
        (status = 404, description = "Unknown subject id")
    )
)]
pub async fn get_role(subject_id: web::Path<String>) -> impl Responder {
    log::info!("🔑 GET /users/{}/role", subject_id);

    match user_service::get_role_and_admin_flag(&subject_id).await {
        Ok(Some(info)) => HttpResponse::Ok().json(info),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": format!("User not found: {}", subject_id)
        })),
        Err(e) => {
            log::error!("❌ Error fetching role {}: {}", subject_id, e);
            error_response(&e)
        }
    }
}

/// GET /api/v1/instructors - paginated instructor listing
#[utoipa::path(
    get,
    path = "/api/v1/instructors",
    tag = "Users",
    params(InstructorQuery),
    responses(
        (status = 200, description = "One page of instructors", body = user_service::InstructorPage)
    )
)]
pub async fn list_instructors(query: web::Query<InstructorQuery>) -> impl Responder {
    log::info!("📋 GET /instructors - page: {:?}", query.page);

    match user_service::list_instructors(query.into_inner()).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => {
            log::error!("❌ Error listing instructors: {}", e);
            error_response(&e)
        }
    }
}
