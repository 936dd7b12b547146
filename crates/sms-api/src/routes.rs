//! Route wiring for the queue-operator surface and carrier webhooks (§6).

use actix_web::{web, HttpResponse, Scope};

use crate::handlers::{health, queue, webhooks};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(api_v1_routes()).route("/", web::get().to(root_handler));
}

fn api_v1_routes() -> Scope {
    web::scope("/api/v1")
        .service(queue_routes())
        .service(webhook_routes())
}

fn queue_routes() -> Scope {
    web::scope("/queue")
        .route("/stats", web::get().to(queue::stats))
        .route("/health", web::get().to(health::queue_health))
        .route("/items", web::get().to(queue::list_items))
        .route("/items/{id}/cancel", web::post().to(queue::cancel_item))
        .route("/items/{id}/retry", web::post().to(queue::retry_item))
        .route("/messages/{id}/timeline", web::get().to(queue::message_timeline))
        .route("/campaigns/{id}/stats", web::get().to(queue::campaign_stats))
        .route("/failed-messages", web::get().to(queue::failed_messages))
        .route("/cleanup", web::post().to(queue::cleanup))
}

fn webhook_routes() -> Scope {
    web::scope("/webhooks/sms")
        .route("/delivery", web::post().to(webhooks::delivery_webhook))
        .route("/status/{message_id}", web::post().to(webhooks::internal_status_webhook))
}

async fn root_handler() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "sms-dispatch-core",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn root_returns_service_name() {
        let app = test::init_service(App::new().route("/", web::get().to(root_handler))).await;
        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["service"], "sms-dispatch-core");
    }
}
