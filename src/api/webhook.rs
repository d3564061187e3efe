// ==================== IDENTITY WEBHOOK ====================
// Inbound `user.created` / `user.updated` events from the identity provider.
// Verify, extract, upsert, notify - in that order. Rejected requests must
// leave no side effects.

use actix_web::{web, HttpRequest, HttpResponse};
use std::env;

use crate::{
    models::{PublicProfile, UserEventData, WebhookEvent},
    services::notification_service::{NotificationSender, TEMPLATE_PROFILE_UPDATED, TEMPLATE_WELCOME},
    services::user_service::{self, CreateUserRequest, UpdateUserRequest},
    utils::crypto,
    utils::error::AppError,
};

const HEADER_ID: &str = "svix-id";
const HEADER_TIMESTAMP: &str = "svix-timestamp";
const HEADER_SIGNATURE: &str = "svix-signature";

const EVENT_USER_CREATED: &str = "user.created";
const EVENT_USER_UPDATED: &str = "user.updated";

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().body("Internal server error")
}

#[utoipa::path(
    post,
    path = "/api/webhook",
    tag = "Webhook",
    request_body = String,
    responses(
        (status = 200, description = "Event processed or acknowledged"),
        (status = 400, description = "Missing headers, malformed JSON or bad signature"),
        (status = 500, description = "Missing secret or processing failure")
    )
)]
pub async fn handle_event(
    req: HttpRequest,
    body: web::Bytes,
    notifier: web::Data<dyn NotificationSender>,
) -> HttpResponse {
    let secret = match env::var("WEBHOOK_SECRET") {
        Ok(s) if !s.is_empty() => s,
        _ => {
            log::error!("WEBHOOK_SECRET is missing in environment variables");
            return HttpResponse::InternalServerError().body("Server error: missing webhook secret");
        }
    };

    let (Some(msg_id), Some(timestamp), Some(signature)) = (
        header(&req, HEADER_ID),
        header(&req, HEADER_TIMESTAMP),
        header(&req, HEADER_SIGNATURE),
    ) else {
        return HttpResponse::BadRequest().body("Missing signature headers");
    };

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            log::error!("Failed to parse JSON payload: {}", e);
            return HttpResponse::BadRequest().body("Invalid JSON");
        }
    };

    if let Err(e) = crypto::verify_signature(&secret, msg_id, timestamp, &body, signature) {
        log::error!("Webhook verification failed: {}", e);
        return HttpResponse::BadRequest().body("Unauthorized webhook");
    }

    match event.event_type.as_str() {
        EVENT_USER_CREATED => match process_created(event.data, notifier.get_ref()).await {
            Ok(user) => {
                log::info!("✅ Webhook user.created processed: {}", user.subject_id);
                HttpResponse::Ok().json(serde_json::json!({
                    "message": "User created",
                    "user": user
                }))
            }
            Err(e) => {
                log::error!("Error processing user.created: {}", e);
                internal_error()
            }
        },
        EVENT_USER_UPDATED => match process_updated(event.data, notifier.get_ref()).await {
            Ok(user) => {
                log::info!("✅ Webhook user.updated processed: {}", user.subject_id);
                HttpResponse::Ok().json(serde_json::json!({
                    "message": "User updated",
                    "user": user
                }))
            }
            Err(e) => {
                log::error!("Error processing user.updated: {}", e);
                internal_error()
            }
        },
        other => {
            log::info!("Unhandled webhook event: {}", other);
            HttpResponse::Ok().body(format!("Unhandled event type: {}", other))
        }
    }
}

async fn process_created(
    data: serde_json::Value,
    notifier: &dyn NotificationSender,
) -> Result<PublicProfile, AppError> {
    let data: UserEventData = serde_json::from_value(data)
        .map_err(|e| AppError::ValidationError(format!("Malformed user event payload: {}", e)))?;

    let user = user_service::upsert_by_subject_id(CreateUserRequest {
        subject_id: data.id.clone(),
        email: data.primary_email(),
        full_name: data.full_name(),
        picture: data.image_url.clone(),
    })
    .await?;

    notifier.send(&data.id, TEMPLATE_WELCOME).await?;

    Ok(PublicProfile::from(user))
}

async fn process_updated(
    data: serde_json::Value,
    notifier: &dyn NotificationSender,
) -> Result<PublicProfile, AppError> {
    let data: UserEventData = serde_json::from_value(data)
        .map_err(|e| AppError::ValidationError(format!("Malformed user event payload: {}", e)))?;

    let update = UpdateUserRequest {
        email: Some(data.primary_email()),
        full_name: Some(data.full_name()),
        picture: data.image_url.clone(),
        ..Default::default()
    };

    let user = match user_service::update_by_subject_id(&data.id, update, None).await {
        Ok(user) => user,
        // Delivery order is not guaranteed; an update can arrive before the
        // create it follows.
        Err(AppError::NotFound(_)) => {
            user_service::upsert_by_subject_id(CreateUserRequest {
                subject_id: data.id.clone(),
                email: data.primary_email(),
                full_name: data.full_name(),
                picture: data.image_url.clone(),
            })
            .await?
        }
        Err(e) => return Err(e),
    };

    notifier.send(&data.id, TEMPLATE_PROFILE_UPDATED).await?;

    Ok(PublicProfile::from(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    /// Records every dispatched notification instead of touching the store.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl NotificationSender for RecordingNotifier {
        async fn send(&self, subject_id: &str, template_key: &str) -> Result<(), AppError> {
            self.sent
                .lock()
                .unwrap()
                .push((subject_id.to_string(), template_key.to_string()));
            Ok(())
        }
    }

    fn sign(msg_id: &str, timestamp: &str, body: &[u8]) -> String {
        let key = crypto::decode_secret(SECRET).unwrap();
        format!("v1,{}", crypto::sign_payload(&key, msg_id, timestamp, body))
    }

    async fn post_webhook(
        notifier: Arc<RecordingNotifier>,
        headers: Vec<(&'static str, String)>,
        body: &'static [u8],
    ) -> actix_web::dev::ServiceResponse {
        std::env::set_var("WEBHOOK_SECRET", SECRET);

        let sender: Arc<dyn NotificationSender> = notifier;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(sender))
                .route("/api/webhook", web::post().to(handle_event)),
        )
        .await;

        let mut request = test::TestRequest::post().uri("/api/webhook");
        for (name, value) in headers {
            request = request.insert_header((name, value));
        }
        test::call_service(&app, request.set_payload(body).to_request()).await
    }

    #[actix_web::test]
    async fn test_missing_headers_is_rejected() {
        let notifier = Arc::new(RecordingNotifier::default());
        let body: &[u8] = br#"{"type":"user.created","data":{"id":"user_1"}}"#;

        // Signature header missing entirely
        let response = post_webhook(
            notifier.clone(),
            vec![
                (HEADER_ID, "msg_1".to_string()),
                (HEADER_TIMESTAMP, "1706400000".to_string()),
            ],
            body,
        )
        .await;

        assert_eq!(response.status(), 400);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_malformed_json_is_rejected() {
        let notifier = Arc::new(RecordingNotifier::default());
        let body: &[u8] = b"not json at all";

        let response = post_webhook(
            notifier.clone(),
            vec![
                (HEADER_ID, "msg_1".to_string()),
                (HEADER_TIMESTAMP, "1706400000".to_string()),
                (HEADER_SIGNATURE, "v1,AAAA".to_string()),
            ],
            body,
        )
        .await;

        assert_eq!(response.status(), 400);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_tampered_body_is_rejected() {
        let notifier = Arc::new(RecordingNotifier::default());
        let signed: &[u8] = br#"{"type":"user.created","data":{"id":"user_1"}}"#;
        let tampered: &[u8] = br#"{"type":"user.created","data":{"id":"user_666"}}"#;

        let response = post_webhook(
            notifier.clone(),
            vec![
                (HEADER_ID, "msg_1".to_string()),
                (HEADER_TIMESTAMP, "1706400000".to_string()),
                (HEADER_SIGNATURE, sign("msg_1", "1706400000", signed)),
            ],
            tampered,
        )
        .await;

        assert_eq!(response.status(), 400);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_unknown_event_type_is_acknowledged() {
        let notifier = Arc::new(RecordingNotifier::default());
        let body: &[u8] = br#"{"type":"session.ended","data":{"id":"sess_1"}}"#;

        let response = post_webhook(
            notifier.clone(),
            vec![
                (HEADER_ID, "msg_1".to_string()),
                (HEADER_TIMESTAMP, "1706400000".to_string()),
                (HEADER_SIGNATURE, sign("msg_1", "1706400000", body)),
            ],
            body,
        )
        .await;

        // Providers retry on non-2xx; unknown types must be acknowledged
        assert_eq!(response.status(), 200);
        let payload = test::read_body(response).await;
        assert_eq!(payload, "Unhandled event type: session.ended".as_bytes());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_user_created_event_upserts_and_notifies() {
        dotenv::dotenv().ok();

        let notifier = Arc::new(RecordingNotifier::default());
        let body: &'static [u8] = br#"{
            "type": "user.created",
            "data": {
                "id": "user_webhook_test",
                "email_addresses": [{ "email_address": "ada@example.com" }],
                "image_url": "https://img.example.com/ada.png",
                "first_name": "Ada",
                "last_name": "Lovelace"
            }
        }"#;

        let headers = || {
            vec![
                (HEADER_ID, "msg_1".to_string()),
                (HEADER_TIMESTAMP, "1706400000".to_string()),
                (HEADER_SIGNATURE, sign("msg_1", "1706400000", body)),
            ]
        };

        let response = post_webhook(notifier.clone(), headers(), body).await;
        assert_eq!(response.status(), 200);

        // Re-delivery of the same event updates in place
        let response = post_webhook(notifier.clone(), headers(), body).await;
        assert_eq!(response.status(), 200);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "user_webhook_test");
        assert_eq!(sent[0].1, TEMPLATE_WELCOME);
    }
}
