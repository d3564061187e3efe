use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Academy User Service API",
        version = "1.0.0",
        description = "User directory for the academy platform.\n\n**Features:**\n- Identity-provider webhook ingestion (signed user.created / user.updated events)\n- User upsert and patch updates keyed by subject id\n- Public profiles, roles and review listings\n- Paginated instructor listings",
        contact(
            name = "Academy Platform Team",
            email = "support@academy.example.com"
        )
    ),
    paths(
        // Webhook
        crate::api::webhook::handle_event,

        // Users
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::get_user,
        crate::api::users::get_profile,
        crate::api::users::get_reviews,
        crate::api::users::get_role,
        crate::api::users::list_instructors,

        // Health
        crate::api::health::health_check,
    ),
    components(
        schemas(
            // Users
            crate::services::user_service::CreateUserRequest,
            crate::services::user_service::UpdateUserRequest,
            crate::services::user_service::UserRecord,
            crate::services::user_service::InstructorPage,
            crate::services::user_service::ReviewsResponse,
            crate::models::PublicProfile,
            crate::models::RoleInfo,
            crate::models::UserRole,
            crate::models::ReviewWithRefs,
            crate::models::ReviewAuthor,
            crate::models::ReviewCourse,

            // Health
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Webhook", description = "Inbound identity-provider events. Requests are authenticated with svix signature headers against the shared webhook secret."),
        (name = "Users", description = "User directory endpoints. Records are keyed by the identity-provider subject id."),
        (name = "Health", description = "Health check endpoint for monitoring service status."),
    )
)]
pub struct ApiDoc;
