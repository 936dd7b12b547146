//! `GET /queue/health` — unauthenticated operational health for the queue.

use actix_web::{web, HttpResponse};
use serde::Serialize;
use tracing::info;

use crate::middleware::error_handler::ApiResult;
use crate::state::AppState;

const PENDING_WARNING_THRESHOLD: i64 = 10_000;
const PROCESSING_WARNING_THRESHOLD: i64 = 1_000;
const SUCCESS_RATE_WARNING_THRESHOLD: f64 = 90.0;

#[derive(Debug, Serialize)]
pub struct QueueHealthResponse {
    pub status: &'static str,
    pub pending: i64,
    pub processing: i64,
    pub success_rate_pct: f64,
    pub database_healthy: bool,
}

/// `GET /queue/health`. Maps `pending>10000 / success_rate<90 / processing>1000`
/// to `warning`; a failed database check reports 503 `unhealthy`.
pub async fn queue_health(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    info!("queue health check requested");

    let health = data.health_check().await;
    if !health.healthy {
        let body = QueueHealthResponse {
            status: "unhealthy",
            pending: 0,
            processing: 0,
            success_rate_pct: 0.0,
            database_healthy: false,
        };
        return Ok(HttpResponse::ServiceUnavailable().json(body));
    }

    let stats = data.queue_service.stats().await?;
    let pending = stats.counts_by_status.get("pending").copied().unwrap_or(0);
    let processing = stats.counts_by_status.get("processing").copied().unwrap_or(0);
    let sent = stats.counts_by_status.get("sent").copied().unwrap_or(0);
    let failed = stats.counts_by_status.get("failed").copied().unwrap_or(0);
    let success_rate_pct = if sent + failed > 0 {
        100.0 * sent as f64 / (sent + failed) as f64
    } else {
        100.0
    };

    let status = if pending > PENDING_WARNING_THRESHOLD
        || processing > PROCESSING_WARNING_THRESHOLD
        || success_rate_pct < SUCCESS_RATE_WARNING_THRESHOLD
    {
        "warning"
    } else {
        "healthy"
    };

    Ok(HttpResponse::Ok().json(QueueHealthResponse {
        status,
        pending,
        processing,
        success_rate_pct,
        database_healthy: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_match_the_configured_constants() {
        assert_eq!(PENDING_WARNING_THRESHOLD, 10_000);
        assert_eq!(PROCESSING_WARNING_THRESHOLD, 1_000);
        assert_eq!(SUCCESS_RATE_WARNING_THRESHOLD, 90.0);
    }
}
