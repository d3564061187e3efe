mod api;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

use std::env;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use services::notification_service::{MongoNotificationSender, NotificationSender};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Get configuration from environment
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3002".to_string());

    log::info!("🚀 Starting Academy User Service...");

    if env::var("WEBHOOK_SECRET").map(|s| s.is_empty()).unwrap_or(true) {
        log::warn!("⚠️  WEBHOOK_SECRET is not set - webhook requests will be rejected");
    }

    // Warm the MongoDB connection. Failure is not fatal here: the handle is
    // lazily initialized and the first request retries.
    match database::get().await {
        Ok(_) => log::info!("✅ MongoDB connected successfully"),
        Err(e) => log::warn!("⚠️  MongoDB not reachable yet ({}), retrying on first request", e),
    }

    // Notification collaborator, injected so handlers only see the trait
    let notifier: Arc<dyn NotificationSender> = Arc::new(MongoNotificationSender);
    let notifier_data = web::Data::from(notifier);

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000") // Frontend web
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_methods(vec!["GET", "POST", "PATCH", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(notifier_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))
            // Identity-provider webhook
            .route("/api/webhook", web::post().to(api::webhook::handle_event))
            // Instructor listings
            .service(
                web::scope("/api/v1/instructors")
                    .route("", web::get().to(api::users::list_instructors)),
            )
            // User directory
            .service(
                web::scope("/api/v1/users")
                    .route("", web::post().to(api::users::create_user))
                    .route("/{subject_id}", web::patch().to(api::users::update_user))
                    .route("/{subject_id}", web::get().to(api::users::get_user))
                    .route("/{subject_id}/profile", web::get().to(api::users::get_profile))
                    .route("/{subject_id}/reviews", web::get().to(api::users::get_reviews))
                    .route("/{subject_id}/role", web::get().to(api::users::get_role)),
            )
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
